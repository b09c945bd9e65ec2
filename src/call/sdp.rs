// 원격 SDP 검증
//
// 상대가 보낸 offer/answer 를 setRemoteDescription 에 넘기기 전에 파싱해 본다.
// 파싱 실패나 type 불일치는 협상 에러로 처리한다.

use webrtc_sdp::media_type::SdpMediaValue;
use webrtc_sdp::parse_sdp;

use crate::error::{CallError, CallResult};
use crate::protocol::message::{SdpType, SessionDescription};

/// 검증 통과 시 audio m-line 개수 반환
pub fn validate_description(desc: &SessionDescription, expected: SdpType) -> CallResult<usize> {
    if desc.kind != expected {
        return Err(CallError::Negotiation(format!(
            "expected {:?} description, got {:?}", expected, desc.kind
        )));
    }

    let session = parse_sdp(&desc.sdp, false)
        .map_err(|e| CallError::Negotiation(format!("sdp parse: {}", e)))?;

    let audio = session.media.iter()
        .filter(|m| matches!(m.get_type(), SdpMediaValue::Audio))
        .count();
    if audio == 0 {
        return Err(CallError::Negotiation("no audio section".to_string()));
    }
    Ok(audio)
}

#[cfg(test)]
pub(crate) const TEST_AUDIO_SDP: &str = "v=0\r\n\
o=- 1 1 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtpmap:111 opus/48000/2\r\n";
