// 매직 넘버를 배제하고 시스템 전체의 동작과 한계를 제어하는 상수 모음입니다.

/// 웹소켓 시그널링 서버 TCP 포트
pub const SIGNALING_PORT: u16 = 8080;

/// 기본 바인드 주소
pub const SIGNALING_HOST: &str = "0.0.0.0";

/// 송신(Egress) 큐 사이즈. 세션당 1개.
pub const EGRESS_QUEUE_SIZE: usize = 2048;

/// 클라이언트가 heartbeat를 보내야 하는 주기 (밀리초)
pub const HEARTBEAT_INTERVAL_MS: u64 = 15_000;

/// 좀비 세션 reaper 실행 주기 (10초)
pub const REAPER_INTERVAL_MS: u64 = 10_000;

/// 연결이 끊긴 좀비 세션을 정리하기 위한 타임아웃 (30초)
pub const ZOMBIE_TIMEOUT_MS: u64 = 30_000;

// ----------------------------------------------------------------------------
// 채팅방
// ----------------------------------------------------------------------------

/// 방당 최대 수용 인원
pub const MAX_MEMBERS_PER_ROOM: usize = 100;

/// 채팅 메시지 최대 길이 (bytes)
pub const MAX_MESSAGE_LENGTH: usize = 2_000;

/// history 요청 시 반환하는 최대 메시지 수
pub const HISTORY_LIMIT: usize = 50;

/// 방별 메시지 보관 한도. 초과 시 오래된 것부터 삭제
pub const MESSAGES_PER_ROOM: usize = HISTORY_LIMIT;

/// 사전 생성 방 (room_id, name, capacity)
pub const PRESET_ROOMS: &[(&str, &str, usize)] = &[
    ("general", "General", MAX_MEMBERS_PER_ROOM),
    ("random",  "Random",  MAX_MEMBERS_PER_ROOM),
];

// ----------------------------------------------------------------------------
// 통화 (offer 재전송 정책)
// ----------------------------------------------------------------------------

/// 최초 offer 응답 대기 시간 (10초)
pub const OFFER_TIMEOUT_MS: u64 = 10_000;

/// 재전송 간격 증가 배수
pub const OFFER_BACKOFF_FACTOR: u32 = 2;

/// 재전송 간격 상한 (60초)
pub const OFFER_BACKOFF_MAX_MS: u64 = 60_000;

/// 최대 재전송 횟수: 초과 시 failed 로 종료
pub const OFFER_MAX_RETRIES: u32 = 5;

/// 재전송 간격 지터 비율 (±10%)
pub const OFFER_JITTER_RATIO: f64 = 0.1;

/// offer 타임아웃 감시 주기
pub const OFFER_WATCH_INTERVAL_MS: u64 = 500;

/// remote description 이전에 도착한 ICE candidate 보관 한도
pub const MAX_PENDING_CANDIDATES: usize = 64;

/// STUN 전용 ICE 서버 목록
pub const STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

// ----------------------------------------------------------------------------
// 음성 활동 감지 (Voice Activity Monitor)
// ----------------------------------------------------------------------------

/// 기본 샘플레이트
pub const VOICE_SAMPLE_RATE: f32 = 48_000.0;

/// low-pass 컷오프 (Hz)
pub const VOICE_LOWPASS_HZ: f32 = 8_000.0;

/// 게인 단계 배율
pub const VOICE_GAIN: f32 = 1.2;

/// 평균 볼륨에 곱하는 완화 계수
pub const VOICE_SOFTENING: f32 = 0.85;

/// 볼륨 상한 (0..=128 스케일)
pub const VOICE_MAX_VOLUME: f32 = 128.0;

/// 분석기 dB 범위 (WebAudio AnalyserNode 기본값)
pub const ANALYSER_MIN_DB: f32 = -100.0;
pub const ANALYSER_MAX_DB: f32 = -30.0;

/// 데스크톱 프로파일
pub const DESKTOP_FFT_SIZE: usize = 256;
pub const DESKTOP_SMOOTHING: f32 = 0.8;
pub const DESKTOP_SPEAKING_THRESHOLD: f32 = 10.0;

/// 모바일 프로파일
pub const MOBILE_FFT_SIZE: usize = 128;
pub const MOBILE_SMOOTHING: f32 = 0.9;
pub const MOBILE_SPEAKING_THRESHOLD: f32 = 8.0;
