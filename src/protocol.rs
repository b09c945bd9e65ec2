pub mod error_code;
pub mod event;
pub mod handler;
pub mod message;
pub mod relay;

pub use handler::{ws_handler, AppState};

use tokio::sync::mpsc;

use crate::error::CallError;
use error_code::to_error_code;
use message::{ErrorPayload, SocketPacket};

// ----------------------------------------------------------------------------
// [패킷 유틸] handler / relay 공용
// ----------------------------------------------------------------------------

pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(
    d: Option<serde_json::Value>,
) -> Result<T, CallError> {
    let value = d.ok_or_else(|| CallError::InvalidPayload("missing payload".to_string()))?;
    serde_json::from_value(value).map_err(|e| CallError::InvalidPayload(e.to_string()))
}

pub(crate) fn make_packet(event: &str, payload: impl serde::Serialize) -> String {
    SocketPacket::new(event, payload).to_json()
}

pub(crate) fn make_no_data(event: &str) -> String {
    SocketPacket::no_data(event).to_json()
}

pub(crate) fn error_packet(err: &CallError) -> String {
    make_packet(event::server::ERROR, ErrorPayload {
        code:   to_error_code(err),
        reason: err.to_string(),
    })
}

pub(crate) async fn send(tx: &mpsc::Sender<String>, json: String) -> Result<(), CallError> {
    tx.send(json).await.map_err(|e| CallError::InternalError(e.to_string()))
}
