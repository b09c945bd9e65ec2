// offer 재전송 정책: 지수 백오프 + 횟수 제한
//
// attempt 0 : 최초 offer 후 base 만큼 대기
// attempt n : base * factor^n (max 로 상한), ±jitter
// max_retries 를 넘기면 None → 호출측이 failed 로 전이

use rand::Rng;

use crate::config;

#[derive(Debug, Clone)]
pub struct OfferRetry {
    pub base_ms:      u64,
    pub factor:       u32,
    pub max_delay_ms: u64,
    pub max_retries:  u32,
    pub jitter_ratio: f64,
}

impl Default for OfferRetry {
    fn default() -> Self {
        Self {
            base_ms:      config::OFFER_TIMEOUT_MS,
            factor:       config::OFFER_BACKOFF_FACTOR,
            max_delay_ms: config::OFFER_BACKOFF_MAX_MS,
            max_retries:  config::OFFER_MAX_RETRIES,
            jitter_ratio: config::OFFER_JITTER_RATIO,
        }
    }
}

impl OfferRetry {
    /// 지터 없는 고정 정책 (테스트/결정적 동작용)
    pub fn fixed(base_ms: u64, max_retries: u32) -> Self {
        Self {
            base_ms,
            factor: 2,
            max_delay_ms: u64::MAX,
            max_retries,
            jitter_ratio: 0.0,
        }
    }

    /// attempt 번째 offer 이후의 대기 시간 (지터 제외)
    pub fn base_delay(&self, attempt: u32) -> u64 {
        let mult = (self.factor as u64).saturating_pow(attempt);
        self.base_ms.saturating_mul(mult).min(self.max_delay_ms)
    }

    /// attempt 번째 offer 이후의 대기 시간 (지터 포함)
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let base = self.base_delay(attempt);
        if self.jitter_ratio <= 0.0 || base == 0 {
            return base;
        }
        let spread = (base as f64 * self.jitter_ratio) as i64;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        (base as i64 + offset).max(0) as u64
    }

    /// 이미 보낸 retry 횟수 기준으로 재전송 가능 여부
    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}
