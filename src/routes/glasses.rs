//! Device transport: one WebSocket per pair of glasses.
//!
//! Outbound frames come from the session's delivery queue. Inbound frames are
//! transcriptions and button presses; a final transcription from a user who
//! is live is broadcast as if it had been posted to `/send`.

use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Extension},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    services::{
        delivery::DeliveryPipeline,
        directory::{Session, SessionDirectory},
        display::{DisplaySink, WsDisplay},
    },
    state::{Directory, Registry},
    utils::auth::AuthUser,
};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inbound {
    #[serde(rename_all = "camelCase")]
    Transcription { text: String, #[serde(default)] is_final: bool },
    Button(Value),
}

pub fn router() -> Router {
    Router::new().route("/glasses", get(ws_handler))
}

async fn ws_handler(
    AuthUser(uid): AuthUser,
    ws: WebSocketUpgrade,
    Extension(dir): Extension<Directory>,
    Extension(reg): Extension<Registry>,
    Extension(pipeline): Extension<DeliveryPipeline>,
) -> impl IntoResponse {
    ws.on_upgrade(move |s| device_ws(s, uid, dir, reg, pipeline))
}

/* ---------------- per device ---------------- */
async fn device_ws(
    sock: WebSocket,
    uid: String,
    dir: Directory, reg: Registry,
    pipeline: DeliveryPipeline,
) {
    let (mut out, mut inc) = sock.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if out.send(Message::Text(frame)).await.is_err() { break; }
        }
    });

    let conn = uuid::Uuid::new_v4().to_string();
    let display: Arc<dyn DisplaySink> = Arc::new(WsDisplay::new(tx));
    let session = dir.attach(Session::new(&conn, &uid, display, &pipeline)).await;

    serve_device(&mut inc, &session, &dir, &reg).await;
    writer.abort();
}

/// Feed inbound frames to `on_frame` until the device closes or errors, then detach it.
pub async fn serve_device<S>(inc: &mut S, session: &Session, dir: &SessionDirectory, reg: &Registry)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let conn = &session.connection_id;
    while let Some(Ok(msg)) = inc.next().await {
        match msg {
            Message::Text(raw) => match parse_frame(&raw) {
                Some(frame) => on_frame(session, reg, frame).await,
                None        => debug!(%conn, "unrecognised frame ignored"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    dir.detach(conn).await;
}

pub fn parse_frame(raw: &str) -> Option<Inbound> {
    serde_json::from_str(raw).ok()
}

pub async fn on_frame(session: &Session, reg: &Registry, frame: Inbound) {
    match frame {
        Inbound::Transcription { text, is_final } => {
            if is_final {
                debug!(user = %session.user_id, %text, "transcription");
            }
            session.record_transcript(text.clone(), is_final).await;
            if is_final && !text.trim().is_empty() && reg.is_live(&session.user_id).await {
                reg.send(&session.user_id, &text).await;
            }
        }
        Inbound::Button(data) => {
            debug!(user = %session.user_id, ?data, "button");
            session.record_event("button", data).await;
        }
    }
}
