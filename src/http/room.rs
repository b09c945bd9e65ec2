// 일반 방 조회 핸들러
//   GET /rooms          → 방 목록
//   GET /rooms/{id}     → 방 상세 + 멤버

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use super::dto::{RoomDetail, RoomSummary};
use super::not_found;
use super::state::HttpState;

/// GET /rooms
pub async fn list_rooms(State(state): State<HttpState>) -> impl IntoResponse {
    let mut list: Vec<RoomSummary> = state.room_hub
        .all_rooms()
        .into_iter()
        .map(|room| RoomSummary {
            room_id:      room.room_id.clone(),
            name:         room.name.clone(),
            member_count: room.member_count(),
            capacity:     room.capacity,
            created_at:   room.created_at,
        })
        .collect();
    list.sort_by(|a, b| a.room_id.cmp(&b.room_id));

    Json(list)
}

/// GET /rooms/{id}
pub async fn get_room(
    State(state): State<HttpState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let room = match state.room_hub.get(&room_id) {
        Some(r) => r,
        None    => return not_found("Room", &room_id),
    };

    let mut members: Vec<String> = room.get_members().into_iter().collect();
    members.sort();

    Json(RoomDetail {
        room_id:      room.room_id.clone(),
        name:         room.name.clone(),
        member_count: members.len(),
        capacity:     room.capacity,
        created_at:   room.created_at,
        members,
    }).into_response()
}
