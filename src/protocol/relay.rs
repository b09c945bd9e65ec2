// WebRTC 시그널링 릴레이
//
// offer / answer / ice-candidate / voiceData 를 recipientId 소켓에만 전달한다.
//   - 발신자 userId는 서버가 identify된 값으로 덮어쓴다 (스푸핑 방지)
//   - 수신자가 오프라인이면 drop (로그 + trace 만 남김)
//   - 서버는 SDP 내용을 검증하지 않는다

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::{CallError, CallResult};
use crate::protocol::message::{
    AnswerPayload, IceCandidatePayload, OfferPayload, SocketPacket, VoiceDataPayload,
};
use crate::protocol::{event::server, make_packet, parse_payload, AppState};
use crate::trace::{TraceDir, TraceEvent};

/// 수신자 지정 시그널링 payload 공통 동작
pub trait Addressed: Serialize + serde::de::DeserializeOwned {
    /// S→C 이벤트 이름
    const EVENT: &'static str;
    /// 60Hz로 들어오는 payload는 trace 버스에 싣지 않는다
    const TRACED: bool = true;

    fn recipient(&self) -> &str;
    fn stamp_sender(&mut self, user_id: &str);
}

impl Addressed for OfferPayload {
    const EVENT: &'static str = server::OFFER;
    fn recipient(&self) -> &str { &self.recipient_id }
    fn stamp_sender(&mut self, user_id: &str) { self.user_id = user_id.to_string(); }
}

impl Addressed for AnswerPayload {
    const EVENT: &'static str = server::ANSWER;
    fn recipient(&self) -> &str { &self.recipient_id }
    fn stamp_sender(&mut self, user_id: &str) { self.user_id = user_id.to_string(); }
}

impl Addressed for IceCandidatePayload {
    const EVENT: &'static str = server::ICE_CANDIDATE;
    fn recipient(&self) -> &str { &self.recipient_id }
    fn stamp_sender(&mut self, user_id: &str) { self.user_id = user_id.to_string(); }
}

impl Addressed for VoiceDataPayload {
    const EVENT: &'static str = server::VOICE_DATA;
    const TRACED: bool = false;
    fn recipient(&self) -> &str { &self.recipient_id }
    fn stamp_sender(&mut self, user_id: &str) { self.user_id = user_id.to_string(); }
}

/// 시그널링 이벤트 1건 중계. 수신자 전달 여부 반환
pub async fn handle_signal<P: Addressed>(
    sender: &str,
    state:  &AppState,
    packet: SocketPacket,
) -> CallResult<bool> {
    let mut payload = parse_payload::<P>(packet.data)?;
    let recipient   = payload.recipient().to_string();

    if recipient.trim().is_empty() {
        return Err(CallError::InvalidPayload("recipientId 필수".to_string()));
    }
    if recipient == sender {
        return Err(CallError::SelfCall(recipient));
    }

    payload.stamp_sender(sender);
    let json = make_packet(P::EVENT, &payload);

    let delivered = state.user_hub.send_to(&recipient, json).await;
    if delivered {
        trace!("relay {} {} → {}", P::EVENT, sender, recipient);
        if P::TRACED {
            state.trace_hub.publish(TraceEvent::new(
                TraceDir::Out, None, Some(sender), P::EVENT,
                format!("{} → {}", sender, recipient),
            ));
        }
    } else {
        warn!("relay drop ({}): recipient offline {} → {}", P::EVENT, sender, recipient);
        if P::TRACED {
            state.trace_hub.publish(TraceEvent::new(
                TraceDir::Sys, None, Some(sender), P::EVENT,
                format!("dropped: {} offline", recipient),
            ));
        }
    }

    Ok(delivered)
}
