// Trace SSE 스트림 핸들러
//
// GET /trace           : 전체 이벤트 스트림
// GET /trace/{room_id} : 특정 방 필터 후 스트림

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Sse},
};
use axum::response::sse::{Event, KeepAlive};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::trace::TraceEvent;

use super::state::HttpState;

fn passes(event: &TraceEvent, room: Option<&str>) -> bool {
    match room {
        None     => true,
        Some(id) => event.room_id.as_deref() == Some(id),
    }
}

pub async fn trace_stream(
    State(state): State<HttpState>,
    room_filter: Option<Path<String>>,
) -> impl IntoResponse {
    let rx     = state.trace_hub.subscribe();
    let filter = room_filter.map(|Path(id)| id);

    let stream = BroadcastStream::new(rx)
        .filter_map(move |result| match result {
            Err(_lagged) => None,
            Ok(event) if passes(&event, filter.as_deref()) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok::<Event, std::convert::Infallible>(Event::default().data(json)))
            }
            Ok(_) => None,
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceDir;

    #[test]
    fn room_filter() {
        let ev = TraceEvent::new(TraceDir::In, Some("general"), Some("alice"), "chat-message", "hi");
        assert!(passes(&ev, None));
        assert!(passes(&ev, Some("general")));
        assert!(!passes(&ev, Some("random")));

        let sys = TraceEvent::new(TraceDir::Sys, None, Some("alice"), "offer", "drop");
        assert!(!passes(&sys, Some("general")));
    }
}
