//! Attached devices, keyed by connection id.
//!
//! Lookup by user is a linear scan; one device per user is assumed, and when
//! that doesn't hold the earliest attached session wins.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::{
    delivery::{DeliveryPipeline, DeliveryQueue},
    display::DisplaySink,
};
use crate::state::SessionLog;

pub struct Session {
    pub connection_id: String,
    pub user_id:       String,
    sink:  Arc<dyn DisplaySink>,
    queue: DeliveryQueue,
    log:   Mutex<SessionLog>,
    seq:   u64,
}

impl Session {
    /// Builds the session and starts its delivery worker.
    pub fn new(
        connection_id: impl Into<String>,
        user_id: impl Into<String>,
        sink: Arc<dyn DisplaySink>,
        pipeline: &DeliveryPipeline,
    ) -> Self {
        let connection_id = connection_id.into();
        let queue = pipeline.spawn_queue(&connection_id, Arc::clone(&sink));
        Self {
            connection_id,
            user_id: user_id.into(),
            sink,
            queue,
            log: Mutex::new(SessionLog::default()),
            seq: 0,
        }
    }

    pub fn is_attached(&self) -> bool { self.sink.is_attached() }

    /// Hand `text` to this device's delivery queue.
    pub fn enqueue(&self, text: String) -> bool { self.queue.push(text) }

    pub async fn record_transcript(&self, text: String, is_final: bool) {
        self.log.lock().await.record_transcript(text, is_final);
    }

    pub async fn record_event(&self, kind: &str, data: Value) {
        self.log.lock().await.record_event(kind, data);
    }

    pub async fn log_sizes(&self) -> (usize, usize) {
        let log = self.log.lock().await;
        (log.transcripts.len(), log.events.len())
    }
}

#[derive(Default)]
pub struct SessionDirectory {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    next_seq: AtomicU64,
}

impl SessionDirectory {
    pub fn new() -> Self { Self::default() }

    /// Register a device. Re-attaching a known connection id replaces it.
    pub async fn attach(&self, mut session: Session) -> Arc<Session> {
        session.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(session);
        let mut m = self.sessions.write().await;
        m.insert(session.connection_id.clone(), Arc::clone(&session));
        info!(user = %session.user_id, conn = %session.connection_id, total = m.len(), "device attached");
        session
    }

    pub async fn detach(&self, connection_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(connection_id);
        if let Some(s) = &removed {
            info!(user = %s.user_id, conn = %connection_id, "device detached");
        }
        removed
    }

    pub async fn by_connection(&self, connection_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(connection_id).cloned()
    }

    pub async fn by_user(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .min_by_key(|s| s.seq)
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn connected_users(&self) -> Vec<String> {
        let mut users: Vec<String> =
            self.sessions.read().await.values().map(|s| s.user_id.clone()).collect();
        users.sort();
        users
    }
}
