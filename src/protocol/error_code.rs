use crate::error::CallError;

/// 1xxx: 세션
pub const NOT_AUTHENTICATED:  u16 = 1000;
pub const INVALID_EVENT:      u16 = 1003;
pub const INVALID_PAYLOAD:    u16 = 1004;

/// 2xxx: 방
pub const ROOM_NOT_FOUND:     u16 = 2000;
pub const ROOM_FULL:          u16 = 2001;
pub const ALREADY_IN_ROOM:    u16 = 2003;
pub const NOT_IN_ROOM:        u16 = 2004;

/// 3xxx: 메시지
pub const EMPTY_MESSAGE:      u16 = 3000;
pub const MESSAGE_TOO_LONG:   u16 = 3001;

/// 4xxx: 통화
pub const SELF_CALL:          u16 = 4000;
pub const INVALID_CALL_STATE: u16 = 4001;
pub const NEGOTIATION_FAILED: u16 = 4002;
pub const NEGOTIATION_TIMEOUT: u16 = 4003;
pub const MEDIA_UNAVAILABLE:  u16 = 4010;

/// 9xxx: 서버 내부
pub const INTERNAL_ERROR:     u16 = 9000;

/// CallError → 에러 코드 변환
/// 에러 응답 패킷 생성 시 사용
pub fn to_error_code(err: &CallError) -> u16 {
    match err {
        CallError::NotAuthenticated        => NOT_AUTHENTICATED,
        CallError::InvalidEvent(_)         => INVALID_EVENT,
        CallError::InvalidPayload(_)       => INVALID_PAYLOAD,

        CallError::RoomNotFound(_)         => ROOM_NOT_FOUND,
        CallError::RoomFull(_)             => ROOM_FULL,
        CallError::AlreadyInRoom(_)        => ALREADY_IN_ROOM,
        CallError::NotInRoom(_)            => NOT_IN_ROOM,

        CallError::EmptyMessage            => EMPTY_MESSAGE,
        CallError::MessageTooLong(_)       => MESSAGE_TOO_LONG,

        CallError::SelfCall(_)             => SELF_CALL,
        CallError::InvalidState(_)         => INVALID_CALL_STATE,
        CallError::Negotiation(_)          => NEGOTIATION_FAILED,
        CallError::NegotiationTimeout(_)   => NEGOTIATION_TIMEOUT,

        CallError::PermissionDenied
        | CallError::DeviceNotFound
        | CallError::InsecureContext
        | CallError::DeviceBusy
        | CallError::Unsupported(_)        => MEDIA_UNAVAILABLE,

        CallError::InternalError(_)
        | CallError::IoError(_)            => INTERNAL_ERROR,
    }
}
