use serde::{Deserialize, Serialize};

use crate::store::ChatMessage;

// ----------------------------------------------------------------------------
// [공통] 소켓 패킷 봉투 (Envelope)
// ----------------------------------------------------------------------------

/// 모든 WebSocket 메시지의 최상위 구조체
/// 수신/송신 공통으로 사용하며, data는 event에 따라 해석합니다.
///
/// 예시:
///   { "event": "offer", "data": { "offer": {...}, "recipientId": "bob", "userId": "alice" } }
#[derive(Serialize, Deserialize, Debug)]
pub struct SocketPacket {
    /// 이벤트 이름 (protocol::event 참조)
    pub event: String,
    /// payload. event에 따라 구조가 달라지므로 raw JSON으로 보관
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SocketPacket {
    pub fn new(event: &str, payload: impl Serialize) -> Self {
        Self {
            event: event.to_string(),
            data:  Some(serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)),
        }
    }

    pub fn no_data(event: &str) -> Self {
        Self { event: event.to_string(), data: None }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// [시그널링] offer / answer / ice-candidate / voiceData
// 서버는 recipientId 소켓에만 전달, userId는 서버가 발신자로 덮어쓴다
// ----------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// RTCSessionDescriptionInit 대응
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp:  String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { kind: SdpType::Offer, sdp: sdp.into() }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { kind: SdpType::Answer, sdp: sdp.into() }
    }
}

/// RTCIceCandidateInit 대응
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

/// event: offer
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub offer:        SessionDescription,
    pub recipient_id: String,
    #[serde(default)]
    pub user_id:      String,
}

/// event: answer
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub answer:       SessionDescription,
    pub recipient_id: String,
    #[serde(default)]
    pub user_id:      String,
}

/// event: ice-candidate
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub candidate:    IceCandidate,
    pub recipient_id: String,
    #[serde(default)]
    pub user_id:      String,
}

/// event: voiceData
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDataPayload {
    #[serde(default)]
    pub user_id:      String,
    pub recipient_id: String,
    pub volume:       f32,
    pub is_speaking:  bool,
    pub timestamp:    u64,
}

// ----------------------------------------------------------------------------
// [C→S] 세션/채팅 요청 payload
// ----------------------------------------------------------------------------

/// event: identify
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPayload {
    pub user_id: String,
}

/// event: join-room / leave-room / history
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: String,
}

/// event: chat-message (C→S)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatCreatePayload {
    pub room_id: String,
    pub content: String,
}

/// event: avatar-pose: pose 구조는 해석하지 않고 그대로 전달
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPosePayload {
    pub room_id: String,
    #[serde(default)]
    pub user_id: String,
    pub pose:    serde_json::Value,
}

// ----------------------------------------------------------------------------
// [S→C] 서버 응답 payload
// ----------------------------------------------------------------------------

/// event: hello: 연결 직후 heartbeat 주기 안내
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// event: ready: identify 성공 응답
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub session_id:   String,
    pub user_id:      String,
    pub online_users: Vec<String>,
}

/// event: ack: 요청 성공 응답
#[derive(Serialize, Debug)]
pub struct AckPayload {
    pub event: String,
    pub data:  serde_json::Value,
}

/// ack > join-room 성공 시 data
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinAckData {
    pub room_id: String,
    pub name:    String,
    pub members: Vec<String>,
}

/// event: room-event: 방 멤버 변동 브로드캐스트
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomEventPayload {
    /// "join" | "leave"
    pub event:   String,
    pub room_id: String,
    pub user_id: String,
}

/// event: history (S→C)
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPayload {
    pub room_id:  String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// event: presence
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: String,
    pub status:  PresenceStatus,
}

/// event: error
#[derive(Serialize, Debug)]
pub struct ErrorPayload {
    pub code:   u16,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offer_payload_uses_wire_names() {
        let p = OfferPayload {
            offer:        SessionDescription::offer("v=0"),
            recipient_id: "bob".into(),
            user_id:      "alice".into(),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["offer"]["type"], "offer");
        assert_eq!(v["recipientId"], "bob");
        assert_eq!(v["userId"], "alice");
    }

    #[test]
    fn ice_candidate_parses_browser_shape() {
        let v = json!({
            "candidate": {
                "candidate": "candidate:1 1 udp 2113937151 10.0.0.1 5000 typ host",
                "sdpMid": "0",
                "sdpMLineIndex": 0
            },
            "recipientId": "bob"
        });
        let p: IceCandidatePayload = serde_json::from_value(v).unwrap();
        assert_eq!(p.candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(p.candidate.sdp_m_line_index, Some(0));
        assert!(p.user_id.is_empty());
    }

    #[test]
    fn voice_data_camel_case() {
        let v = json!({ "recipientId": "bob", "volume": 12.5, "isSpeaking": true, "timestamp": 5 });
        let p: VoiceDataPayload = serde_json::from_value(v).unwrap();
        assert!(p.is_speaking);
        assert_eq!(p.timestamp, 5);
    }

    #[test]
    fn missing_recipient_is_rejected() {
        let v = json!({ "offer": { "type": "offer", "sdp": "v=0" } });
        assert!(serde_json::from_value::<OfferPayload>(v).is_err());
    }

    #[test]
    fn packet_without_data_omits_field() {
        let json = SocketPacket::no_data("heartbeat-ack").to_json();
        assert_eq!(json, r#"{"event":"heartbeat-ack"}"#);
    }
}
