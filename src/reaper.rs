// 좀비 세션 자동 종료 태스크
//
// 주기마다 수행:
//   1. heartbeat가 끊긴 User 제거
//   2. 소속 방 멤버에서 제외 + leave 이벤트 전파
//   3. offline presence 브로드캐스트

use std::sync::Arc;
use tracing::{info, trace};

use crate::config;
use crate::core::{RoomHub, UserHub};
use crate::protocol::handler::{announce_offline, evict_from_rooms};
use crate::store::{ChatMessage, Store};
use crate::trace::{TraceDir, TraceEvent, TraceHub};

pub async fn run_zombie_reaper(
    user_hub:      Arc<UserHub>,
    room_hub:      Arc<RoomHub>,
    message_store: Arc<dyn Store<ChatMessage>>,
    trace_hub:     Arc<TraceHub>,
) {
    let interval  = tokio::time::Duration::from_millis(config::REAPER_INTERVAL_MS);
    let mut timer = tokio::time::interval(interval);
    timer.tick().await; // 첫 틱 skip (startup 시 즉시 실행 방지)

    info!("[zombie-reaper] Started (interval={}ms, timeout={}ms)",
        config::REAPER_INTERVAL_MS, config::ZOMBIE_TIMEOUT_MS);

    loop {
        timer.tick().await;
        let reaped = reap_once(
            &user_hub, &room_hub, message_store.as_ref(), &trace_hub, config::ZOMBIE_TIMEOUT_MS,
        ).await;
        if !reaped.is_empty() {
            info!("[zombie-reaper] Cleaned {} user(s)", reaped.len());
        }
    }
}

/// 1회 정리. 제거된 user_id 목록 반환
pub async fn reap_once(
    user_hub:   &UserHub,
    room_hub:   &RoomHub,
    store:      &dyn Store<ChatMessage>,
    trace_hub:  &TraceHub,
    timeout_ms: u64,
) -> Vec<String> {
    let stale = user_hub.find_zombies(timeout_ms);
    reap_sessions(stale, user_hub, room_hub, store, trace_hub).await
}

/// 지정한 (user_id, session_id) 정리. 그 사이 재접속한 세션은 건드리지 않는다
async fn reap_sessions(
    stale:     Vec<(String, String)>,
    user_hub:  &UserHub,
    room_hub:  &RoomHub,
    store:     &dyn Store<ChatMessage>,
    trace_hub: &TraceHub,
) -> Vec<String> {
    let mut reaped = Vec::with_capacity(stale.len());
    for (uid, session_id) in stale {
        if !user_hub.unregister_session(&uid, &session_id) {
            trace!("[zombie-reaper] user={} superseded by a new session, skipped", uid);
            continue;
        }
        evict_from_rooms(&uid, room_hub, user_hub, store).await;
        announce_offline(&uid, user_hub).await;
        info!("[zombie-reaper] user={} removed (no heartbeat)", uid);
        trace_hub.publish(TraceEvent::new(
            TraceDir::Sys, None, Some(&uid), "reap", "no heartbeat",
        ));
        reaped.push(uid);
    }
    reaped
}
