pub mod call;
pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod protocol;
pub mod reaper;
pub mod store;
pub mod trace;
pub mod utils;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::core::{RoomHub, UserHub};
use crate::error::CallResult;
use crate::http::HttpState;
use crate::protocol::{ws_handler, AppState};
use crate::store::{ChatMessage, MemoryStore, Store};
use crate::trace::TraceHub;

/// CLI에서 주입되는 런타임 설정
/// - 기본값은 config.rs 상수
pub struct ServerArgs {
    pub host: String,
    pub port: u16,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self { host: config::SIGNALING_HOST.to_string(), port: config::SIGNALING_PORT }
    }
}

/// 허브/저장소를 묶어 라우터 구성 (테스트에서도 사용)
pub fn build_router(
    user_hub:      Arc<UserHub>,
    room_hub:      Arc<RoomHub>,
    message_store: Arc<dyn Store<ChatMessage>>,
    trace_hub:     Arc<TraceHub>,
) -> Router {
    let app_state = AppState {
        user_hub:      Arc::clone(&user_hub),
        room_hub:      Arc::clone(&room_hub),
        message_store: Arc::clone(&message_store),
        trace_hub:     Arc::clone(&trace_hub),
    };

    let http_state = HttpState::new(user_hub, room_hub, message_store, trace_hub);

    let admin_router = Router::new()
        .route("/admin/status",            get(http::admin_status))
        .route("/admin/users",             get(http::admin_list_users))
        .route("/admin/users/{user_id}",   get(http::admin_get_user))
        .route("/admin/rooms",             get(http::admin_list_rooms))
        .route("/admin/rooms/{room_id}",   get(http::admin_get_room))
        .route("/trace",                   get(http::trace_stream))
        .route("/trace/{room_id}",         get(http::trace_stream))
        .route("/rooms",                   get(http::list_rooms))
        .route("/rooms/{id}",              get(http::get_room))
        .with_state(http_state);

    // CORS: 전체 허용 (Admin 대시보드, 브라우저 클라이언트 로컬 접속)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(app_state)
        .merge(admin_router)
        .layer(cors)
}

pub async fn run_server(args: ServerArgs) -> CallResult<()> {
    let user_hub  = Arc::new(UserHub::new());
    let room_hub  = Arc::new(RoomHub::new());
    let trace_hub = TraceHub::new();
    let message_store: Arc<dyn Store<ChatMessage>> = Arc::new(MemoryStore::new());

    // 사전 정의 방 생성
    for (room_id, name, capacity) in config::PRESET_ROOMS {
        room_hub.create(room_id, name, *capacity);
        info!("[room] preset created: {} name={} cap={}", room_id, name, capacity);
    }

    // 좀비 세션 자동 종료 태스크
    tokio::spawn(reaper::run_zombie_reaper(
        Arc::clone(&user_hub),
        Arc::clone(&room_hub),
        Arc::clone(&message_store),
        Arc::clone(&trace_hub),
    ));

    let app = build_router(user_hub, room_hub, message_store, trace_hub);

    let addr     = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("[mini-voicecall] Signaling Server on ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
