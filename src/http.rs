// HTTP REST / SSE 핸들러
//
// GET /rooms                 → 방 목록
// GET /rooms/{id}            → 방 상세 + 멤버
// GET /admin/*               → 운영 조회 (admin.rs)
// GET /trace[/{room_id}]     → 시그널링 trace SSE

pub mod admin;
pub mod dto;
pub mod room;
pub mod state;
pub mod trace;

pub use admin::{admin_get_room, admin_get_user, admin_list_rooms, admin_list_users, admin_status};
pub use room::{get_room, list_rooms};
pub use state::HttpState;
pub use trace::trace_stream;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};

pub(crate) fn not_found(what: &str, id: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({
        "error": format!("{} not found: {}", what, id)
    }))).into_response()
}
