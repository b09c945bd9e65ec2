// TraceHub: 시그널링 이벤트 실시간 관찰 버스
//
// 구조:
//   핸들러(protocol/handler.rs, protocol/relay.rs)
//       └── TraceHub::publish(event)
//               └── broadcast::Sender
//                       ├── SSE subscriber (vctrace 프로세스 1)
//                       └── SSE subscriber (vctrace 프로세스 2)
//
// 구독자가 없을 때 publish는 그냥 drop
// 구독자가 느리면 lagged 에러 반환: 구독자 쪽에서 처리

use std::sync::Arc;
use tokio::sync::broadcast;
use serde::Serialize;
use crate::utils::current_timestamp;

/// 구독자가 느릴 때 최대 보유 이벤트 수: 초과 시 오래된 이벤트 drop
const TRACE_BUF: usize = 512;

/// 이벤트 방향
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TraceDir {
    /// 클라이언트 → 서버 (C→S)
    In,
    /// 서버 → 클라이언트 (S→C)
    Out,
    /// 서버 내부 (시스템)
    Sys,
}

/// 하나의 시그널링 이벤트
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// Unix millis
    pub ts:      u64,
    pub dir:     TraceDir,
    /// 방 ID (시그널링/identify 등은 None)
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    /// 와이어 이벤트 이름 (예: "offer") 또는 내부 이벤트 이름
    pub event:   String,
    pub summary: String,
}

impl TraceEvent {
    pub fn new(
        dir:     TraceDir,
        room_id: Option<&str>,
        user_id: Option<&str>,
        event:   &str,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            ts:      current_timestamp(),
            dir,
            room_id: room_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            event:   event.to_string(),
            summary: summary.into(),
        }
    }
}

pub struct TraceHub {
    tx: broadcast::Sender<TraceEvent>,
}

impl TraceHub {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(TRACE_BUF);
        Arc::new(Self { tx })
    }

    /// 이벤트 publish: 구독자가 없으면 조용히 무시
    pub fn publish(&self, event: TraceEvent) {
        let _ = self.tx.send(event);
    }

    /// SSE 구독자 생성: 각 HTTP 연결마다 호출
    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.tx.subscribe()
    }
}
