// Admin REST API 핸들러
//
//   GET /admin/status               → 서버 상태 요약
//   GET /admin/users                → User 전체 목록
//   GET /admin/users/{user_id}      → User 상세 (소속 방)
//   GET /admin/rooms                → Room 전체 목록
//   GET /admin/rooms/{room_id}      → Room 상세 (멤버 + 최근 메시지)

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::atomic::Ordering;

use crate::config;
use crate::store::{recent_messages, ChatMessage};
use crate::utils::current_timestamp;

use super::dto::*;
use super::not_found;
use super::state::HttpState;

/// GET /admin/status
pub async fn admin_status(State(state): State<HttpState>) -> impl IntoResponse {
    let now_ms      = current_timestamp();
    let uptime_secs = now_ms.saturating_sub(state.start_time_ms) / 1000;

    Json(ServerStatus {
        uptime_secs,
        user_count:    state.user_hub.count(),
        room_count:    state.room_hub.count(),
        message_count: state.message_store.len(),
    })
}

/// GET /admin/users
pub async fn admin_list_users(State(state): State<HttpState>) -> impl IntoResponse {
    let now = current_timestamp();
    let mut list: Vec<AdminUserSummary> = state.user_hub
        .all_users()
        .into_iter()
        .map(|(uid, user)| {
            let last_seen_ms = user.last_seen.load(Ordering::Relaxed);
            AdminUserSummary {
                user_id:      uid,
                session_id:   user.session_id.clone(),
                connected_at: user.connected_at,
                last_seen_ms,
                idle_secs:    now.saturating_sub(last_seen_ms) / 1000,
            }
        })
        .collect();
    list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    Json(list)
}

/// GET /admin/users/{user_id}
pub async fn admin_get_user(
    State(state): State<HttpState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let user = match state.user_hub.get(&user_id) {
        Some(u) => u,
        None    => return not_found("User", &user_id),
    };

    let now          = current_timestamp();
    let last_seen_ms = user.last_seen.load(Ordering::Relaxed);
    let mut rooms    = state.room_hub.rooms_of(&user_id);
    rooms.sort();

    Json(AdminUserDetail {
        session_id:   user.session_id.clone(),
        connected_at: user.connected_at,
        last_seen_ms,
        idle_secs:    now.saturating_sub(last_seen_ms) / 1000,
        rooms,
        user_id,
    }).into_response()
}

/// GET /admin/rooms
pub async fn admin_list_rooms(State(state): State<HttpState>) -> impl IntoResponse {
    let mut list: Vec<AdminRoomSummary> = state.room_hub
        .all_rooms()
        .into_iter()
        .map(|room| {
            let members = room.get_members();
            let online  = members.iter().filter(|m| state.user_hub.is_online(m)).count();
            let room_id = room.room_id.clone();
            AdminRoomSummary {
                name:          room.name.clone(),
                member_count:  members.len(),
                online_count:  online,
                capacity:      room.capacity,
                message_count: state.message_store.query(&|m: &ChatMessage| m.room_id == room_id).len(),
                room_id,
            }
        })
        .collect();
    list.sort_by(|a, b| a.room_id.cmp(&b.room_id));
    Json(list)
}

/// GET /admin/rooms/{room_id}
pub async fn admin_get_room(
    State(state): State<HttpState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let room = match state.room_hub.get(&room_id) {
        Some(r) => r,
        None    => return not_found("Room", &room_id),
    };

    let mut members: Vec<String> = room.get_members().into_iter().collect();
    members.sort();

    Json(AdminRoomDetail {
        room_id:    room.room_id.clone(),
        name:       room.name.clone(),
        capacity:   room.capacity,
        created_at: room.created_at,
        members,
        recent:     recent_messages(state.message_store.as_ref(), &room_id, config::HISTORY_LIMIT),
    }).into_response()
}
