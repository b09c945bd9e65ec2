use std::fmt;

#[derive(Debug)]
pub enum CallError {
    // 세션
    NotAuthenticated,
    InvalidEvent(String),
    InvalidPayload(String),

    // 채팅방
    RoomNotFound(String),
    RoomFull(String),
    AlreadyInRoom(String),
    NotInRoom(String),

    // 메시지
    EmptyMessage,
    MessageTooLong(usize),

    // 통화: 장치/환경
    PermissionDenied,
    DeviceNotFound,
    InsecureContext,
    DeviceBusy,
    Unsupported(String),

    // 통화: 협상
    SelfCall(String),
    InvalidState(String),
    Negotiation(String),
    NegotiationTimeout(u32),

    InternalError(String),
    IoError(std::io::Error),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::NotAuthenticated      => write!(f, "Not authenticated: identify first"),
            CallError::InvalidEvent(ev)      => write!(f, "Unknown event: {}", ev),
            CallError::InvalidPayload(msg)   => write!(f, "Invalid payload: {}", msg),

            CallError::RoomNotFound(id)      => write!(f, "Room not found: {}", id),
            CallError::RoomFull(id)          => write!(f, "Capacity exceeded for room: {}", id),
            CallError::AlreadyInRoom(id)     => write!(f, "Already in room: {}", id),
            CallError::NotInRoom(id)         => write!(f, "Not in room: {}", id),

            CallError::EmptyMessage          => write!(f, "Message content is empty"),
            CallError::MessageTooLong(len)   => write!(f, "Message too long: {} bytes", len),

            CallError::PermissionDenied      => write!(f, "Microphone permission denied"),
            CallError::DeviceNotFound        => write!(f, "No microphone found"),
            CallError::InsecureContext       => write!(f, "Microphone requires a secure context (HTTPS)"),
            CallError::DeviceBusy            => write!(f, "Microphone is in use by another application"),
            CallError::Unsupported(what)     => write!(f, "Unsupported environment: {}", what),

            CallError::SelfCall(id)          => write!(f, "Cannot call yourself: {}", id),
            CallError::InvalidState(msg)     => write!(f, "Invalid call state: {}", msg),
            CallError::Negotiation(msg)      => write!(f, "Negotiation failed: {}", msg),
            CallError::NegotiationTimeout(n) => write!(f, "No answer after {} offer attempt(s)", n),

            CallError::InternalError(msg)    => write!(f, "Internal error: {}", msg),
            CallError::IoError(err)          => write!(f, "Network I/O error: {}", err),
        }
    }
}

impl std::error::Error for CallError {}

impl From<std::io::Error> for CallError {
    fn from(err: std::io::Error) -> Self {
        CallError::IoError(err)
    }
}

pub type CallResult<T> = Result<T, CallError>;
