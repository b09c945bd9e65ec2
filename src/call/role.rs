// 발신/수신 역할 결정
//
// 두 user_id를 바이트 단위로 비교해서 큰 쪽이 offer를 보낸다.
// 양쪽 피어가 추가 왕복 없이 같은 결론에 도달하므로 동시 offer(glare)가 생기지 않는다.

use serde::Serialize;

use crate::error::{CallError, CallResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    pub fn decide(local_id: &str, remote_id: &str) -> CallResult<Self> {
        if is_caller(local_id, remote_id)? {
            Ok(Role::Caller)
        } else {
            Ok(Role::Callee)
        }
    }

    pub fn is_caller(self) -> bool {
        self == Role::Caller
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Caller => write!(f, "caller"),
            Role::Callee => write!(f, "callee"),
        }
    }
}

/// 같은 id 끼리의 통화(self-call)는 역할이 정의되지 않으므로 거부
pub fn is_caller(local_id: &str, remote_id: &str) -> CallResult<bool> {
    if local_id == remote_id {
        return Err(CallError::SelfCall(local_id.to_string()));
    }
    Ok(local_id > remote_id)
}
