use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config;
use crate::core::{RoomHub, UserHub};
use crate::error::{CallError, CallResult};
use crate::protocol::{
    error_packet, make_no_data, make_packet, parse_payload, send,
    event::{client, server},
    message::{
        AckPayload, AnswerPayload, AvatarPosePayload, ChatCreatePayload, HelloPayload,
        HistoryPayload, IceCandidatePayload, IdentifyPayload, OfferPayload, PresencePayload,
        PresenceStatus, ReadyPayload, RoomEventPayload, RoomJoinAckData, RoomPayload,
        SocketPacket, VoiceDataPayload,
    },
    relay::handle_signal,
};
use crate::store::{append_message, purge_room, recent_messages, ChatMessage, Store};
use crate::trace::{TraceDir, TraceEvent, TraceHub};
use crate::utils::random_id;

// ----------------------------------------------------------------------------
// [공유 상태]
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub user_hub:      Arc<UserHub>,
    pub room_hub:      Arc<RoomHub>,
    pub message_store: Arc<dyn Store<ChatMessage>>,
    pub trace_hub:     Arc<TraceHub>,
}

// ----------------------------------------------------------------------------
// [WS 진입점]
// ----------------------------------------------------------------------------

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

// ----------------------------------------------------------------------------
// [세션 상태]: 개별 WS 연결마다 보유
// ----------------------------------------------------------------------------

struct Session {
    session_id: String,
    user_id:    Option<String>,
}

impl Session {
    fn new() -> Self {
        Self { session_id: format!("sess_{}", random_id(12)), user_id: None }
    }

    fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    fn require_user(&self) -> CallResult<String> {
        self.user_id.clone().ok_or(CallError::NotAuthenticated)
    }
}

// ----------------------------------------------------------------------------
// [핵심] 개별 클라이언트 WS 생명주기
// ----------------------------------------------------------------------------

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (egress_tx, mut egress_rx) = mpsc::channel::<String>(config::EGRESS_QUEUE_SIZE);

    let mut session = Session::new();
    debug!("WS 연결: {}", session.session_id);

    let hello = make_packet(server::HELLO, HelloPayload {
        heartbeat_interval: config::HEARTBEAT_INTERVAL_MS,
    });
    if ws_tx.send(Message::Text(hello.into())).await.is_err() {
        return;
    }

    // [egress_loop] egress_rx → WS 송신
    let egress_loop = tokio::spawn(async move {
        while let Some(json) = egress_rx.recv().await {
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // [ingress] WS 수신 → 핸들러 dispatch
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t))  => t,
            Ok(Message::Close(_)) => break,
            Err(e) => { warn!("WS 에러: {}", e); break; }
            _ => continue,
        };

        let packet: SocketPacket = match serde_json::from_str(&text) {
            Ok(p)  => p,
            Err(e) => {
                warn!("잘못된 패킷 포맷: {}", e);
                let _ = egress_tx.send(error_packet(&CallError::InvalidPayload(e.to_string()))).await;
                continue;
            }
        };

        // identify / heartbeat 외에는 식별 필요
        if packet.event != client::IDENTIFY && packet.event != client::HEARTBEAT
            && !session.is_authenticated()
        {
            let _ = egress_tx.send(error_packet(&CallError::NotAuthenticated)).await;
            continue;
        }

        if let Some(user_id) = &session.user_id {
            if let Some(user) = state.user_hub.get(user_id) {
                user.touch();
            }
        }

        let event  = packet.event.clone();
        let result = dispatch(&egress_tx, &mut session, &state, packet).await;

        if let Err(e) = result {
            warn!("핸들러 에러: event={} user={:?} err={}", event, session.user_id, e);
            let _ = egress_tx.send(error_packet(&e)).await;
        }
    }

    cleanup(&mut session, &state).await;
    egress_loop.abort();
}

async fn dispatch(
    tx:      &mpsc::Sender<String>,
    session: &mut Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    match packet.event.as_str() {
        client::HEARTBEAT     => handle_heartbeat(tx).await,
        client::IDENTIFY      => handle_identify(tx, session, state, packet).await,
        client::JOIN_ROOM     => handle_join_room(tx, session, state, packet).await,
        client::LEAVE_ROOM    => handle_leave_room(tx, session, state, packet).await,
        client::CHAT_MESSAGE  => handle_chat_message(session, state, packet).await,
        client::HISTORY       => handle_history(tx, state, packet).await,
        client::AVATAR_POSE   => handle_avatar_pose(session, state, packet).await,
        client::OFFER         => relay::<OfferPayload>(session, state, packet).await,
        client::ANSWER        => relay::<AnswerPayload>(session, state, packet).await,
        client::ICE_CANDIDATE => relay::<IceCandidatePayload>(session, state, packet).await,
        client::VOICE_DATA    => relay::<VoiceDataPayload>(session, state, packet).await,
        unknown               => Err(CallError::InvalidEvent(unknown.to_string())),
    }
}

async fn relay<P: crate::protocol::relay::Addressed>(
    session: &Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let user_id = session.require_user()?;
    handle_signal::<P>(&user_id, state, packet).await.map(|_| ())
}

// ----------------------------------------------------------------------------
// [이벤트 핸들러들]
// ----------------------------------------------------------------------------

async fn handle_heartbeat(tx: &mpsc::Sender<String>) -> CallResult<()> {
    trace!("heartbeat 수신");
    send(tx, make_no_data(server::HEARTBEAT_ACK)).await
}

async fn handle_identify(
    tx:      &mpsc::Sender<String>,
    session: &mut Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let payload = parse_payload::<IdentifyPayload>(packet.data)?;
    let user_id = payload.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(CallError::InvalidPayload("userId 필수".to_string()));
    }
    if let Some(current) = &session.user_id {
        if current != &user_id {
            return Err(CallError::InvalidPayload(format!("already identified as {}", current)));
        }
    }
    trace!("identify - user_id: {}", user_id);

    state.user_hub.register(&user_id, &session.session_id, tx.clone());
    session.user_id = Some(user_id.clone());

    let mut online_users: Vec<String> = state.user_hub.all_users()
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| id != &user_id)
        .collect();
    online_users.sort();

    send(tx, make_packet(server::READY, ReadyPayload {
        session_id:   session.session_id.clone(),
        user_id:      user_id.clone(),
        online_users,
    })).await?;

    let presence = make_packet(server::PRESENCE, PresencePayload {
        user_id: user_id.clone(),
        status:  PresenceStatus::Online,
    });
    state.user_hub.broadcast_all(&presence, Some(&user_id)).await;

    info!("[identify] user={} session={}", user_id, session.session_id);
    state.trace_hub.publish(TraceEvent::new(
        TraceDir::In, None, Some(&user_id), client::IDENTIFY,
        format!("session={}", session.session_id),
    ));
    Ok(())
}

async fn handle_join_room(
    tx:      &mpsc::Sender<String>,
    session: &mut Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let payload = parse_payload::<RoomPayload>(packet.data)?;
    let user_id = session.require_user()?;
    trace!("join-room - user:{} room:{}", user_id, payload.room_id);

    if payload.room_id.trim().is_empty() {
        return Err(CallError::InvalidPayload("roomId 필수".to_string()));
    }

    // Socket.IO room 과 동일하게 없으면 생성
    let room = state.room_hub.join(&payload.room_id, &payload.room_id, config::MAX_MEMBERS_PER_ROOM, &user_id)?;

    let mut members: Vec<String> = room.get_members().into_iter().collect();
    members.sort();
    send(tx, make_packet(server::ACK, AckPayload {
        event: client::JOIN_ROOM.to_string(),
        data:  serde_json::to_value(RoomJoinAckData {
            room_id: room.room_id.clone(),
            name:    room.name.clone(),
            members,
        }).unwrap_or_default(),
    })).await?;

    let event_json = make_packet(server::ROOM_EVENT, RoomEventPayload {
        event:   "join".to_string(),
        room_id: payload.room_id.clone(),
        user_id: user_id.clone(),
    });
    state.user_hub.broadcast_to(&room.get_members(), &event_json, Some(&user_id)).await;

    state.trace_hub.publish(TraceEvent::new(
        TraceDir::In, Some(&payload.room_id), Some(&user_id), client::JOIN_ROOM,
        format!("members={}", room.member_count()),
    ));
    Ok(())
}

async fn handle_leave_room(
    tx:      &mpsc::Sender<String>,
    session: &mut Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let payload = parse_payload::<RoomPayload>(packet.data)?;
    let user_id = session.require_user()?;
    trace!("leave-room - user:{} room:{}", user_id, payload.room_id);

    let room = state.room_hub.get(&payload.room_id)
        .ok_or_else(|| CallError::RoomNotFound(payload.room_id.clone()))?;
    if !room.remove_member(&user_id) {
        return Err(CallError::NotInRoom(payload.room_id));
    }

    let event_json = make_packet(server::ROOM_EVENT, RoomEventPayload {
        event:   "leave".to_string(),
        room_id: payload.room_id.clone(),
        user_id: user_id.clone(),
    });
    state.user_hub.broadcast_to(&room.get_members(), &event_json, None).await;
    release_if_idle(&payload.room_id, &state.room_hub, state.message_store.as_ref());

    state.trace_hub.publish(TraceEvent::new(
        TraceDir::In, Some(&payload.room_id), Some(&user_id), client::LEAVE_ROOM, "left",
    ));

    send(tx, make_packet(server::ACK, AckPayload {
        event: client::LEAVE_ROOM.to_string(),
        data:  serde_json::json!({ "roomId": payload.room_id }),
    })).await
}

async fn handle_chat_message(
    session: &Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let payload = parse_payload::<ChatCreatePayload>(packet.data)?;
    let user_id = session.require_user()?;
    trace!("chat-message - user:{} room:{}", user_id, payload.room_id);

    if payload.content.trim().is_empty() {
        return Err(CallError::EmptyMessage);
    }
    if payload.content.len() > config::MAX_MESSAGE_LENGTH {
        return Err(CallError::MessageTooLong(payload.content.len()));
    }

    let room = state.room_hub.get(&payload.room_id)
        .ok_or_else(|| CallError::RoomNotFound(payload.room_id.clone()))?;
    if !room.is_member(&user_id) {
        return Err(CallError::NotInRoom(payload.room_id));
    }

    let message = ChatMessage::new(payload.room_id, user_id, payload.content);
    let pruned  = append_message(state.message_store.as_ref(), message.clone(), config::MESSAGES_PER_ROOM);
    if pruned > 0 {
        trace!("chat-message - room:{} pruned {} old message(s)", message.room_id, pruned);
    }

    // 발신자 포함 전원에게 브로드캐스트
    let event_json = make_packet(server::CHAT_MESSAGE, &message);
    state.user_hub.broadcast_to(&room.get_members(), &event_json, None).await;
    Ok(())
}

async fn handle_history(
    tx:     &mpsc::Sender<String>,
    state:  &AppState,
    packet: SocketPacket,
) -> CallResult<()> {
    let payload = parse_payload::<RoomPayload>(packet.data)?;
    if state.room_hub.get(&payload.room_id).is_none() {
        return Err(CallError::RoomNotFound(payload.room_id));
    }

    let messages = recent_messages(state.message_store.as_ref(), &payload.room_id, config::HISTORY_LIMIT);
    send(tx, make_packet(server::HISTORY, HistoryPayload {
        room_id: payload.room_id,
        messages,
    })).await
}

async fn handle_avatar_pose(
    session: &Session,
    state:   &AppState,
    packet:  SocketPacket,
) -> CallResult<()> {
    let mut payload = parse_payload::<AvatarPosePayload>(packet.data)?;
    let user_id     = session.require_user()?;

    let room = state.room_hub.get(&payload.room_id)
        .ok_or_else(|| CallError::RoomNotFound(payload.room_id.clone()))?;
    if !room.is_member(&user_id) {
        return Err(CallError::NotInRoom(payload.room_id));
    }

    payload.user_id = user_id.clone();
    let event_json  = make_packet(server::AVATAR_POSE, &payload);
    state.user_hub.broadcast_to(&room.get_members(), &event_json, Some(&user_id)).await;
    Ok(())
}

// ----------------------------------------------------------------------------
// [내부 유틸]
// ----------------------------------------------------------------------------

/// 유저를 모든 방에서 빼고 남은 멤버에게 leave 이벤트 전파
pub(crate) async fn evict_from_rooms(
    user_id:  &str,
    room_hub: &RoomHub,
    user_hub: &UserHub,
    store:    &dyn Store<ChatMessage>,
) {
    for room in room_hub.remove_member_everywhere(user_id) {
        let event_json = make_packet(server::ROOM_EVENT, RoomEventPayload {
            event:   "leave".to_string(),
            room_id: room.room_id.clone(),
            user_id: user_id.to_string(),
        });
        user_hub.broadcast_to(&room.get_members(), &event_json, None).await;
        release_if_idle(&room.room_id, room_hub, store);
    }
}

/// 마지막 멤버가 나간 방 제거 + 메시지 삭제. 사전 정의 방은 유지
pub(crate) fn release_if_idle(room_id: &str, room_hub: &RoomHub, store: &dyn Store<ChatMessage>) {
    if config::PRESET_ROOMS.iter().any(|(id, _, _)| *id == room_id) {
        return;
    }
    if room_hub.remove_if_empty(room_id) {
        let purged = purge_room(store, room_id);
        debug!("[room] {} removed (empty), {} message(s) purged", room_id, purged);
    }
}

pub(crate) async fn announce_offline(user_id: &str, user_hub: &UserHub) {
    let presence = make_packet(server::PRESENCE, PresencePayload {
        user_id: user_id.to_string(),
        status:  PresenceStatus::Offline,
    });
    user_hub.broadcast_all(&presence, Some(user_id)).await;
}

/// WS 종료 시 클린업
async fn cleanup(session: &mut Session, state: &AppState) {
    let user_id = match session.user_id.take() {
        Some(uid) => uid,
        None      => return,
    };

    // 같은 user_id로 재접속한 새 세션이 있으면 그쪽 상태는 건드리지 않는다
    if !state.user_hub.unregister_session(&user_id, &session.session_id) {
        trace!("cleanup skipped (superseded) - user:{}", user_id);
        return;
    }

    trace!("cleanup - user:{}", user_id);
    evict_from_rooms(&user_id, &state.room_hub, &state.user_hub, state.message_store.as_ref()).await;
    announce_offline(&user_id, &state.user_hub).await;

    state.trace_hub.publish(TraceEvent::new(
        TraceDir::Sys, None, Some(&user_id), "disconnect",
        format!("session={}", session.session_id),
    ));
}
