// HTTP 응답 DTO: Admin / 일반 조회 공용

use serde::Serialize;

use crate::store::ChatMessage;

// ----------------------------------------------------------------------------
// [일반 조회]
// ----------------------------------------------------------------------------

/// GET /rooms 응답 아이템
#[derive(Serialize)]
pub struct RoomSummary {
    pub room_id:      String,
    pub name:         String,
    pub member_count: usize,
    pub capacity:     usize,
    pub created_at:   u64,
}

/// GET /rooms/{id} 응답
#[derive(Serialize)]
pub struct RoomDetail {
    pub room_id:      String,
    pub name:         String,
    pub member_count: usize,
    pub capacity:     usize,
    pub created_at:   u64,
    pub members:      Vec<String>,
}

// ----------------------------------------------------------------------------
// [Admin]
// ----------------------------------------------------------------------------

/// GET /admin/status
#[derive(Serialize)]
pub struct ServerStatus {
    pub uptime_secs:   u64,
    pub user_count:    usize,
    pub room_count:    usize,
    pub message_count: usize,
}

/// GET /admin/users 아이템
#[derive(Serialize)]
pub struct AdminUserSummary {
    pub user_id:      String,
    pub session_id:   String,
    pub connected_at: u64,
    pub last_seen_ms: u64,   // Unix millis
    pub idle_secs:    u64,   // 마지막 수신 이후 경과 초
}

/// GET /admin/users/{user_id}
#[derive(Serialize)]
pub struct AdminUserDetail {
    pub user_id:      String,
    pub session_id:   String,
    pub connected_at: u64,
    pub last_seen_ms: u64,
    pub idle_secs:    u64,
    pub rooms:        Vec<String>,
}

/// GET /admin/rooms 아이템
#[derive(Serialize)]
pub struct AdminRoomSummary {
    pub room_id:       String,
    pub name:          String,
    pub member_count:  usize,
    pub online_count:  usize,
    pub capacity:      usize,
    pub message_count: usize,
}

/// GET /admin/rooms/{room_id}
#[derive(Serialize)]
pub struct AdminRoomDetail {
    pub room_id:    String,
    pub name:       String,
    pub capacity:   usize,
    pub created_at: u64,
    pub members:    Vec<String>,
    pub recent:     Vec<ChatMessage>,
}
