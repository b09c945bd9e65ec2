// 클라이언트 측 통화 엔진
//
// 시그널링 서버와는 {event, data} JSON 으로만 통신하고,
// 마이크/피어 커넥션은 media 모듈의 trait 뒤에 숨긴다.

pub mod media;
pub mod retry;
pub mod role;
pub mod sdp;
pub mod session;
pub mod voice;

pub use media::{LocalAudio, MediaDevices, PeerConnection, PeerConnectionFactory, RtcConfig};
pub use retry::OfferRetry;
pub use role::{is_caller, Role};
pub use session::{watch_offer_timeout, CallSession, ConnectionState, SignalingState};
pub use voice::{VoiceMonitor, VoiceProfile, VoiceSample};
