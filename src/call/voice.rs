// Voice Activity Monitor
//
// 파이프라인:
//   마이크 PCM → low-pass (8kHz biquad) → gain(1.2) → analyser(Blackman + real FFT + smoothing)
//       → byte 주파수 데이터(0..=255) → 평균 × 0.85 → volume (0..=128)
//
// analyser 는 WebAudio AnalyserNode.getByteFrequencyData 와 같은 스케일을 쓴다.
// frame() 은 애니메이션 프레임(~60Hz)마다 1회 호출하는 것을 전제로 한다.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::Serialize;
use tracing::warn;

use crate::config;
use crate::protocol::message::VoiceDataPayload;

// ----------------------------------------------------------------------------
// [프로파일]
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceProfile {
    pub fft_size:  usize,
    pub smoothing: f32,
    pub threshold: f32,
}

impl VoiceProfile {
    pub const DESKTOP: VoiceProfile = VoiceProfile {
        fft_size:  config::DESKTOP_FFT_SIZE,
        smoothing: config::DESKTOP_SMOOTHING,
        threshold: config::DESKTOP_SPEAKING_THRESHOLD,
    };

    pub const MOBILE: VoiceProfile = VoiceProfile {
        fft_size:  config::MOBILE_FFT_SIZE,
        smoothing: config::MOBILE_SMOOTHING,
        threshold: config::MOBILE_SPEAKING_THRESHOLD,
    };
}

// ----------------------------------------------------------------------------
// [샘플] 1 프레임 결과
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSample {
    pub volume:      f32,
    pub is_speaking: bool,
    pub timestamp:   u64,
}

impl VoiceSample {
    pub fn to_payload(&self, user_id: &str, recipient_id: &str) -> VoiceDataPayload {
        VoiceDataPayload {
            user_id:      user_id.to_string(),
            recipient_id: recipient_id.to_string(),
            volume:       self.volume,
            is_speaking:  self.is_speaking,
            timestamp:    self.timestamp,
        }
    }
}

/// byte 주파수 bin 평균 → 완화 계수 적용 → [0, 128]
pub fn volume_from_bins(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    let mean = sum as f32 / bins.len() as f32;
    (mean * config::VOICE_SOFTENING).clamp(0.0, config::VOICE_MAX_VOLUME)
}

pub fn is_speaking(volume: f32, threshold: f32) -> bool {
    volume > threshold
}

// ----------------------------------------------------------------------------
// [Biquad low-pass] RBJ cookbook
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
    x1: f32, x2: f32,
    y1: f32, y2: f32,
}

impl Biquad {
    pub fn lowpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        // 컷오프는 나이퀴스트 미만이어야 함
        let nyquist = sample_rate / 2.0;
        let f0      = cutoff_hz.min(nyquist * 0.99).max(1.0);

        let w0    = 2.0 * PI * f0 / sample_rate;
        let cos   = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0    = 1.0 + alpha;

        Self {
            b0: ((1.0 - cos) / 2.0) / a0,
            b1: (1.0 - cos) / a0,
            b2: ((1.0 - cos) / 2.0) / a0,
            a1: (-2.0 * cos) / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0, x2: 0.0,
            y1: 0.0, y2: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
              - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

// ----------------------------------------------------------------------------
// [Analyser] AnalyserNode 대응
// ----------------------------------------------------------------------------

pub struct Analyser {
    fft_size:  usize,
    smoothing: f32,
    window:    Vec<f32>,
    r2c:       Arc<dyn RealToComplex<f32>>,
    input:     Vec<f32>,
    spectrum:  Vec<Complex<f32>>,
    scratch:   Vec<Complex<f32>>,
    buffer:    VecDeque<f32>,   // 최근 fft_size 개 time-domain 샘플
    smoothed:  Vec<f32>,        // bin 별 지수 평활 magnitude
}

impl Analyser {
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        let r2c = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let input    = r2c.make_input_vec();
        let spectrum = r2c.make_output_vec();
        let scratch  = r2c.make_scratch_vec();

        Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            window,
            r2c,
            input,
            spectrum,
            scratch,
            buffer:   VecDeque::with_capacity(fft_size),
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn push(&mut self, sample: f32) {
        if self.buffer.len() == self.fft_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(sample);
    }

    /// getByteFrequencyData 와 같은 스케일의 bin 배열
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let n   = self.fft_size;
        let pad = n - self.buffer.len();

        // 샘플이 모자라면 앞을 0으로 채움
        let samples = std::iter::repeat(0.0).take(pad).chain(self.buffer.iter().copied());
        for ((slot, x), w) in self.input.iter_mut().zip(samples).zip(self.window.iter()) {
            *slot = x * w;
        }

        if let Err(e) = self.r2c.process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch) {
            warn!("[voice] fft failed: {}", e);
            return vec![0; self.bin_count()];
        }

        let range = config::ANALYSER_MAX_DB - config::ANALYSER_MIN_DB;
        let mut bins = Vec::with_capacity(self.bin_count());

        for k in 0..self.bin_count() {
            let c = self.spectrum[k];
            let magnitude = (c.re * c.re + c.im * c.im).sqrt() / n as f32;

            let s = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
            self.smoothed[k] = s;

            let byte = if s <= 0.0 {
                0
            } else {
                let db = 20.0 * s.log10();
                ((db - config::ANALYSER_MIN_DB) / range * 255.0).clamp(0.0, 255.0) as u8
            };
            bins.push(byte);
        }
        bins
    }
}

// ----------------------------------------------------------------------------
// [VoiceMonitor]
// ----------------------------------------------------------------------------

pub struct VoiceMonitor {
    profile:  VoiceProfile,
    lowpass:  Biquad,
    gain:     f32,
    analyser: Analyser,
}

impl VoiceMonitor {
    pub fn new(profile: VoiceProfile, sample_rate: f32) -> Self {
        Self {
            profile,
            lowpass:  Biquad::lowpass(sample_rate, config::VOICE_LOWPASS_HZ, std::f32::consts::FRAC_1_SQRT_2),
            gain:     config::VOICE_GAIN,
            analyser: Analyser::new(profile.fft_size, profile.smoothing),
        }
    }

    pub fn desktop() -> Self {
        Self::new(VoiceProfile::DESKTOP, config::VOICE_SAMPLE_RATE)
    }

    pub fn mobile() -> Self {
        Self::new(VoiceProfile::MOBILE, config::VOICE_SAMPLE_RATE)
    }

    pub fn profile(&self) -> VoiceProfile {
        self.profile
    }

    /// 마이크 콜백에서 받은 PCM 블록 투입
    pub fn push_samples(&mut self, pcm: &[f32]) {
        for &x in pcm {
            let y = self.lowpass.process(x) * self.gain;
            self.analyser.push(y);
        }
    }

    /// 애니메이션 프레임 1회분 샘플
    pub fn frame(&mut self, now_ms: u64) -> VoiceSample {
        let bins   = self.analyser.byte_frequency_data();
        let volume = volume_from_bins(&bins);
        VoiceSample {
            volume,
            is_speaking: is_speaking(volume, self.profile.threshold),
            timestamp:   now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sine(freq: f32, amp: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(xs: &[f32]) -> f32 {
        (xs.iter().map(|x| x * x).sum::<f32>() / xs.len() as f32).sqrt()
    }

    #[test]
    fn volume_from_bins_scales_and_clamps() {
        assert_eq!(volume_from_bins(&[]), 0.0);
        assert!((volume_from_bins(&[10; 64]) - 8.5).abs() < 1e-4);
        assert_eq!(volume_from_bins(&[255; 64]), 128.0);
    }

    #[test]
    fn speaking_is_strictly_above_threshold() {
        assert!(!is_speaking(10.0, 10.0));
        assert!(is_speaking(10.01, 10.0));
        // 같은 볼륨이라도 프로파일 임계값에 따라 달라짐
        let v = volume_from_bins(&[11; 64]); // 9.35
        assert!(!is_speaking(v, VoiceProfile::DESKTOP.threshold));
        assert!(is_speaking(v, VoiceProfile::MOBILE.threshold));
    }

    #[test]
    fn silence_is_not_speaking() {
        let mut mon = VoiceMonitor::desktop();
        mon.push_samples(&vec![0.0; 1024]);
        let s = mon.frame(42);
        assert_eq!(s.volume, 0.0);
        assert!(!s.is_speaking);
        assert_eq!(s.timestamp, 42);
    }

    #[test]
    fn loud_input_is_speaking() {
        let mut rng = rand::thread_rng();
        let mut mon = VoiceMonitor::desktop();
        let mut last = mon.frame(0);
        for _ in 0..10 {
            let noise: Vec<f32> = (0..256).map(|_| rng.gen_range(-0.5..0.5)).collect();
            mon.push_samples(&noise);
            last = mon.frame(0);
        }
        assert!(last.is_speaking, "volume={}", last.volume);
    }

    #[test]
    fn volume_always_within_bounds() {
        let mut rng = rand::thread_rng();
        for profile in [VoiceProfile::DESKTOP, VoiceProfile::MOBILE] {
            let mut mon = VoiceMonitor::new(profile, config::VOICE_SAMPLE_RATE);
            for _ in 0..20 {
                let noise: Vec<f32> = (0..256).map(|_| rng.gen_range(-4.0..4.0)).collect();
                mon.push_samples(&noise);
                let s = mon.frame(0);
                assert!((0.0..=128.0).contains(&s.volume), "volume={}", s.volume);
                assert_eq!(s.is_speaking, s.volume > profile.threshold);
            }
        }
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let fs = config::VOICE_SAMPLE_RATE;
        let mut low  = Biquad::lowpass(fs, config::VOICE_LOWPASS_HZ, std::f32::consts::FRAC_1_SQRT_2);
        let mut high = low.clone();

        let pass: Vec<f32> = sine(1_000.0, 1.0, fs, 4800).into_iter().map(|x| low.process(x)).collect();
        let stop: Vec<f32> = sine(20_000.0, 1.0, fs, 4800).into_iter().map(|x| high.process(x)).collect();

        // 과도 응답 구간 제외
        let pass_rms = rms(&pass[480..]);
        let stop_rms = rms(&stop[480..]);
        assert!(stop_rms < pass_rms * 0.3, "pass={} stop={}", pass_rms, stop_rms);
    }

    #[test]
    fn analyser_bin_count_follows_fft_size() {
        let mut a = Analyser::new(VoiceProfile::MOBILE.fft_size, 0.9);
        assert_eq!(a.bin_count(), 64);
        assert_eq!(a.byte_frequency_data().len(), 64);
    }

    #[test]
    fn analyser_peaks_at_tone_bin() {
        // 48kHz / 256 = 187.5Hz 간격, 1125Hz 는 정확히 bin 6
        let mut a = Analyser::new(256, 0.0);
        for x in sine(1_125.0, 0.01, config::VOICE_SAMPLE_RATE, 256) {
            a.push(x);
        }
        let bins = a.byte_frequency_data();
        let peak = (0..bins.len()).max_by_key(|&k| bins[k]).unwrap();
        assert_eq!(peak, 6, "bins={:?}", &bins[..12]);
        assert!(bins[40] < bins[6]);
    }

    #[test]
    fn sample_to_payload_carries_fields() {
        let s = VoiceSample { volume: 20.0, is_speaking: true, timestamp: 7 };
        let p = s.to_payload("alice", "bob");
        assert_eq!(p.user_id, "alice");
        assert_eq!(p.recipient_id, "bob");
        assert!(p.is_speaking);
    }
}
