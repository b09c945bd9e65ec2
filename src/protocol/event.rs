/// Client → Server 이벤트
pub mod client {
    /// 클라이언트가 살아있음을 알림
    pub const HEARTBEAT:     &str = "heartbeat";
    /// 연결 직후 user_id 등록 (socket ↔ user 매핑)
    pub const IDENTIFY:      &str = "identify";

    /// 방 참여
    pub const JOIN_ROOM:     &str = "join-room";
    /// 방 나가기
    pub const LEAVE_ROOM:    &str = "leave-room";
    /// 채팅 메시지 전송
    pub const CHAT_MESSAGE:  &str = "chat-message";
    /// 방 최근 메시지 조회
    pub const HISTORY:       &str = "history";
    /// 아바타 포즈 데이터 (방 멤버에게 중계)
    pub const AVATAR_POSE:   &str = "avatar-pose";

    // --- WebRTC 시그널링 (수신자 1명에게만 중계) ---
    pub const OFFER:         &str = "offer";
    pub const ANSWER:        &str = "answer";
    pub const ICE_CANDIDATE: &str = "ice-candidate";
    pub const VOICE_DATA:    &str = "voiceData";
}

/// Server → Client 이벤트
pub mod server {
    /// 연결 직후 서버가 heartbeat 주기를 알려줌
    pub const HELLO:         &str = "hello";
    /// HEARTBEAT 수신 확인
    pub const HEARTBEAT_ACK: &str = "heartbeat-ack";
    /// IDENTIFY 성공. 세션 정보 전달
    pub const READY:         &str = "ready";

    /// 방 멤버 변경 이벤트 (join/leave)
    pub const ROOM_EVENT:    &str = "room-event";
    pub const CHAT_MESSAGE:  &str = "chat-message";
    pub const HISTORY:       &str = "history";
    pub const AVATAR_POSE:   &str = "avatar-pose";
    /// 유저 온라인/오프라인
    pub const PRESENCE:      &str = "presence";

    pub const OFFER:         &str = "offer";
    pub const ANSWER:        &str = "answer";
    pub const ICE_CANDIDATE: &str = "ice-candidate";
    pub const VOICE_DATA:    &str = "voiceData";

    /// 요청 성공 응답
    pub const ACK:           &str = "ack";
    /// 에러 응답
    pub const ERROR:         &str = "error";
}
