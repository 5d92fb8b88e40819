//! The per-device write target ("display sink").

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("device detached")]
    Detached,

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Something that can put text on a wearable display.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    fn is_attached(&self) -> bool;

    /// Show `text` for `duration`. Returns once the write was handed off.
    async fn show_text(&self, text: &str, duration: Duration) -> Result<(), DisplayError>;
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Outbound<'a> {
    #[serde(rename_all = "camelCase")]
    Display { text: &'a str, duration_ms: u64 },
}

/// Sink backed by a device WebSocket; frames go to the socket's writer task.
pub struct WsDisplay {
    tx: mpsc::UnboundedSender<String>,
}

impl WsDisplay {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self { Self { tx } }
}

#[async_trait]
impl DisplaySink for WsDisplay {
    fn is_attached(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn show_text(&self, text: &str, duration: Duration) -> Result<(), DisplayError> {
        let frame = serde_json::to_string(&Outbound::Display {
            text,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        })
        .map_err(|e| DisplayError::Rejected(e.to_string()))?;
        self.tx.send(frame).map_err(|_| DisplayError::Detached)
    }
}
