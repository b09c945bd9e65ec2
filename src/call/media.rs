// 네이티브 미디어 경계 (마이크 / 피어 커넥션)
//
// 브라우저의 getUserMedia / RTCPeerConnection 에 해당하는 부분은 호스트마다 다르므로
// trait 으로만 정의한다. CallSession 은 이 trait 들에만 의존한다.

use async_trait::async_trait;
use serde::Serialize;

use crate::config;
use crate::error::{CallError, CallResult};
use crate::protocol::message::{IceCandidate, SessionDescription};

// ----------------------------------------------------------------------------
// [ICE 설정] STUN 전용
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IceServer {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RtcConfig {
    pub ice_servers: Vec<IceServer>,
}

impl RtcConfig {
    pub fn stun_only() -> Self {
        Self {
            ice_servers: config::STUN_SERVERS
                .iter()
                .map(|url| IceServer { urls: vec![url.to_string()] })
                .collect(),
        }
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self::stun_only()
    }
}

// ----------------------------------------------------------------------------
// [마이크]
// ----------------------------------------------------------------------------

/// 획득한 로컬 오디오 스트림
pub trait LocalAudio: Send + Sync {
    fn track_ids(&self) -> Vec<String>;
    /// mute 토글 (track.enabled)
    fn set_enabled(&mut self, enabled: bool);
    /// 모든 트랙 정지. 여러 번 호출돼도 안전해야 함
    fn stop(&mut self);
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// 오디오 전용 getUserMedia
    async fn get_user_media(&self) -> CallResult<Box<dyn LocalAudio>>;
}

// ----------------------------------------------------------------------------
// [피어 커넥션]
// ----------------------------------------------------------------------------

#[async_trait]
pub trait PeerConnection: Send + Sync {
    fn add_track(&mut self, track_id: &str) -> CallResult<()>;
    async fn create_offer(&mut self) -> CallResult<SessionDescription>;
    async fn create_answer(&mut self) -> CallResult<SessionDescription>;
    async fn set_local_description(&mut self, desc: &SessionDescription) -> CallResult<()>;
    async fn set_remote_description(&mut self, desc: &SessionDescription) -> CallResult<()>;
    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> CallResult<()>;
    /// 진행 중인 작업을 기다리지 않고 즉시 닫는다
    fn close(&mut self);
}

pub trait PeerConnectionFactory: Send + Sync {
    fn create(&self, config: &RtcConfig) -> CallResult<Box<dyn PeerConnection>>;
}

/// getUserMedia 가 던지는 DOMException 이름 → CallError
pub fn from_dom_error(name: &str, message: &str) -> CallError {
    match name {
        "NotAllowedError" | "PermissionDeniedError"  => CallError::PermissionDenied,
        "NotFoundError" | "DevicesNotFoundError"     => CallError::DeviceNotFound,
        "SecurityError"                              => CallError::InsecureContext,
        "NotReadableError" | "TrackStartError"
        | "AbortError"                               => CallError::DeviceBusy,
        "TypeError" if message.contains("undefined") => CallError::Unsupported("mediaDevices".to_string()),
        other => CallError::Unsupported(format!("{}: {}", other, message)),
    }
}
