//! Live broadcasts, their listeners and recent history.
//!
//! Every lifecycle call is idempotent and returns a success-shaped result;
//! "not live" is an ordinary outcome, never an error.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use super::{delivery::truncate, directory::SessionDirectory};
use crate::state::{BroadcastState, Message};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StartReport { pub live: bool }

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StopReport { pub stopped: bool }

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LeaveReport { pub left: bool }

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JoinReport {
    pub joined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:  Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub live:           bool,
    pub listener_count: usize,
}

/// Per-listener result of handing a message off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Queued { connection_id: String },
    NoDevice,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SendReport {
    pub sent:    bool,
    /// Listeners whose device took the message; not confirmed renders.
    pub reached: usize,
    #[serde(skip)]
    pub dispatches: Vec<(String, Dispatch)>,
}

pub struct BroadcastRegistry {
    broadcasts: RwLock<HashMap<String, BroadcastState>>,
    sessions:   Arc<SessionDirectory>,
}

impl BroadcastRegistry {
    pub fn new(sessions: Arc<SessionDirectory>) -> Self {
        Self { broadcasts: RwLock::default(), sessions }
    }

    pub async fn start(&self, broadcaster: &str) -> StartReport {
        let mut m = self.broadcasts.write().await;
        if !m.contains_key(broadcaster) {
            let mut st = BroadcastState::default();
            // broadcasters see their own text
            st.listeners.insert(broadcaster.to_string());
            m.insert(broadcaster.to_string(), st);
            info!(%broadcaster, "live");
        }
        StartReport { live: true }
    }

    pub async fn stop(&self, broadcaster: &str) -> StopReport {
        if self.broadcasts.write().await.remove(broadcaster).is_some() {
            info!(%broadcaster, "stopped");
        }
        StopReport { stopped: true }
    }

    pub async fn send(&self, broadcaster: &str, text: &str) -> SendReport {
        let text = truncate(text);

        // append and snapshot listeners under one lock; deliver outside it
        let listeners: Vec<String> = {
            let mut m = self.broadcasts.write().await;
            let Some(st) = m.get_mut(broadcaster) else {
                return SendReport { sent: false, reached: 0, dispatches: Vec::new() };
            };
            st.append(Message::now(text.clone()));
            st.listeners.iter().cloned().collect()
        };

        let mut dispatches = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let d = match self.sessions.by_user(&listener).await {
                Some(s) if s.is_attached() && s.enqueue(text.clone()) => {
                    Dispatch::Queued { connection_id: s.connection_id.clone() }
                }
                _ => Dispatch::NoDevice,
            };
            dispatches.push((listener, d));
        }

        let reached = dispatches
            .iter()
            .filter(|(_, d)| matches!(d, Dispatch::Queued { .. }))
            .count();
        let preview: String = text.chars().take(30).collect();
        info!(%broadcaster, %preview, reached, "sent");

        SendReport { sent: true, reached, dispatches }
    }

    pub async fn join(&self, listener: &str, broadcaster: &str) -> JoinReport {
        let mut m = self.broadcasts.write().await;
        let Some(st) = m.get_mut(broadcaster) else {
            return JoinReport { joined: false, error: Some("Broadcaster not live".into()) };
        };
        if st.listeners.insert(listener.to_string()) {
            info!(%listener, %broadcaster, "joined");
        }
        JoinReport { joined: true, error: None }
    }

    pub async fn leave(&self, listener: &str, broadcaster: &str) -> LeaveReport {
        if let Some(st) = self.broadcasts.write().await.get_mut(broadcaster) {
            if st.listeners.remove(listener) {
                info!(%listener, %broadcaster, "left");
            }
        }
        LeaveReport { left: true }
    }

    pub async fn status(&self, broadcaster: &str) -> StatusReport {
        let m = self.broadcasts.read().await;
        StatusReport {
            live:           m.contains_key(broadcaster),
            listener_count: m.get(broadcaster).map_or(0, |st| st.listeners.len()),
        }
    }

    pub async fn history(&self, broadcaster: &str) -> Vec<Message> {
        self.broadcasts
            .read()
            .await
            .get(broadcaster)
            .map(|st| st.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn is_live(&self, broadcaster: &str) -> bool {
        self.broadcasts.read().await.contains_key(broadcaster)
    }

    pub async fn listeners(&self, broadcaster: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .broadcasts
            .read()
            .await
            .get(broadcaster)
            .map(|st| st.listeners.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        delivery::{DeliveryPipeline, MAX_TEXT_CHARS, QUEUE_CAP},
        directory::Session,
        display::{testing::RecordingSink, DisplaySink},
    };
    use crate::state::HISTORY_CAP;
    use std::time::Duration;

    fn registry() -> (BroadcastRegistry, Arc<SessionDirectory>) {
        let dir = Arc::new(SessionDirectory::new());
        (BroadcastRegistry::new(Arc::clone(&dir)), dir)
    }

    async fn attach(dir: &SessionDirectory, conn: &str, user: &str) -> Arc<RecordingSink> {
        let sink = Arc::new(RecordingSink::default());
        let dyn_sink: Arc<dyn DisplaySink> = sink.clone();
        let pipeline = DeliveryPipeline::new(Duration::from_millis(3000));
        dir.attach(Session::new(conn, user, dyn_sink, &pipeline)).await;
        sink
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let (reg, _) = registry();
        assert!(!reg.is_live("a").await);

        assert_eq!(reg.start("a").await, StartReport { live: true });
        assert!(reg.is_live("a").await);
        assert_eq!(reg.listeners("a").await, vec!["a"]);

        assert_eq!(reg.stop("a").await, StopReport { stopped: true });
        assert!(!reg.is_live("a").await);
        assert!(reg.history("a").await.is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (reg, _) = registry();
        reg.start("a").await;
        reg.join("b", "a").await;
        reg.send("a", "keep me").await;

        reg.start("a").await;
        assert_eq!(reg.listeners("a").await, vec!["a", "b"]);
        assert_eq!(reg.history("a").await.len(), 1);
    }

    #[tokio::test]
    async fn stop_when_not_live_is_fine() {
        let (reg, _) = registry();
        assert_eq!(reg.stop("ghost").await, StopReport { stopped: true });
    }

    #[tokio::test]
    async fn send_to_dead_broadcast_has_no_side_effects() {
        let (reg, _) = registry();
        let r = reg.send("a", "hello").await;
        assert!(!r.sent);
        assert_eq!(r.reached, 0);
        assert!(!reg.is_live("a").await);
    }

    #[tokio::test]
    async fn history_keeps_newest_fifty_in_order() {
        let (reg, _) = registry();
        reg.start("a").await;
        for i in 0..=HISTORY_CAP {
            reg.send("a", &format!("m{i}")).await;
        }
        let h = reg.history("a").await;
        assert_eq!(h.len(), HISTORY_CAP);
        assert_eq!(h[0].text, "m1");
        assert_eq!(h[HISTORY_CAP - 1].text, format!("m{HISTORY_CAP}"));
    }

    #[tokio::test]
    async fn join_requires_live_broadcaster() {
        let (reg, _) = registry();
        let r = reg.join("b", "a").await;
        assert!(!r.joined);
        assert_eq!(r.error.as_deref(), Some("Broadcaster not live"));

        reg.start("a").await;
        let before = reg.status("a").await.listener_count;
        assert!(reg.join("b", "a").await.joined);
        assert_eq!(reg.status("a").await.listener_count, before + 1);

        // joining twice changes nothing
        reg.join("b", "a").await;
        assert_eq!(reg.status("a").await.listener_count, before + 1);
    }

    #[tokio::test]
    async fn leave_always_succeeds() {
        let (reg, _) = registry();
        assert!(reg.leave("b", "a").await.left);

        reg.start("a").await;
        reg.join("b", "a").await;
        assert!(reg.leave("b", "a").await.left);
        assert!(reg.leave("b", "a").await.left);
        assert_eq!(reg.status("a").await.listener_count, 1);
    }

    #[tokio::test]
    async fn status_of_dead_broadcast() {
        let (reg, _) = registry();
        assert_eq!(reg.status("a").await, StatusReport { live: false, listener_count: 0 });
    }

    #[tokio::test]
    async fn reached_counts_listeners_with_devices() {
        let (reg, dir) = registry();
        reg.start("a").await;
        reg.join("b", "a").await;
        assert_eq!(reg.send("a", "hello").await.reached, 0);

        attach(&dir, "ca", "a").await;
        let r = reg.send("a", "hello").await;
        assert_eq!(r.reached, 1);
        assert!(r.dispatches.contains(&("b".to_string(), Dispatch::NoDevice)));

        attach(&dir, "cb", "b").await;
        assert_eq!(reg.send("a", "hello").await.reached, 2);
    }

    #[tokio::test]
    async fn detached_sink_is_not_reached() {
        let (reg, dir) = registry();
        reg.start("a").await;
        let sink = attach(&dir, "ca", "a").await;
        sink.detach();
        assert_eq!(reg.send("a", "hello").await.reached, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn devices_receive_the_text() {
        let (reg, dir) = registry();
        reg.start("a").await;
        reg.join("b", "a").await;
        let sa = attach(&dir, "ca", "a").await;
        let sb = attach(&dir, "cb", "b").await;

        reg.send("a", "hello").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sa.texts(), vec!["hello"]);
        assert_eq!(sb.texts(), vec!["hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_text_is_capped_in_history_and_delivery() {
        let (reg, dir) = registry();
        reg.start("a").await;
        let sink = attach(&dir, "ca", "a").await;

        reg.send("a", &"x".repeat(5000)).await;
        assert_eq!(reg.history("a").await[0].text.len(), MAX_TEXT_CHARS);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.texts().concat().len(), MAX_TEXT_CHARS);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listener_does_not_affect_others() {
        let (reg, dir) = registry();
        reg.start("a").await;
        reg.join("b", "a").await;
        let sa = attach(&dir, "ca", "a").await;
        let sb = attach(&dir, "cb", "b").await;
        sb.reject_writes();

        let r = reg.send("a", "hello").await;
        assert!(r.sent);
        assert_eq!(r.reached, 2);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sa.texts(), vec!["hello"]);
        assert!(sb.texts().is_empty());

        // the failure left nothing behind for the next message
        assert_eq!(reg.send("a", "again").await.reached, 2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sa.texts(), vec!["hello", "again"]);
    }

    #[tokio::test(start_paused = true)]
    async fn backlogged_device_counts_as_not_reached() {
        let (reg, dir) = registry();
        reg.start("a").await;
        attach(&dir, "ca", "a").await;

        // the first message keeps the worker busy for minutes of virtual time
        let long = "x".repeat(MAX_TEXT_CHARS);
        let mut last = None;
        for _ in 0..QUEUE_CAP + 2 {
            last = Some(reg.send("a", &long).await);
        }
        let last = last.unwrap();
        assert!(last.sent);
        assert_eq!(last.reached, 0);
        assert_eq!(last.dispatches, vec![("a".to_string(), Dispatch::NoDevice)]);
        assert_eq!(reg.history("a").await.len(), QUEUE_CAP + 2);
    }

    #[tokio::test]
    async fn history_visible_once_send_returns() {
        let (reg, _) = registry();
        reg.start("a").await;
        let r = reg.send("a", "first").await;
        assert!(r.sent);
        assert_eq!(reg.history("a").await.last().unwrap().text, "first");
    }
}
