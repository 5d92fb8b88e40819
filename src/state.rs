use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::services::{directory::SessionDirectory, registry::BroadcastRegistry};
use crate::utils::ring::push_capped;

pub const HISTORY_CAP:    usize = 50;
pub const TRANSCRIPT_CAP: usize = 100;
pub const EVENT_CAP:      usize = 50;

/* ------------ broadcasts ---------------- */
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    #[serde(rename = "time")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn now(text: String) -> Self {
        Self { text, created_at: Utc::now() }
    }
}

#[derive(Default)]
pub struct BroadcastState {
    pub listeners: HashSet<String>,     // user identities
    pub history:   VecDeque<Message>,   // newest 50
}

impl BroadcastState {
    pub fn append(&mut self, msg: Message) {
        push_capped(&mut self.history, msg, HISTORY_CAP);
    }
}

/* ------------ attached devices ---------- */
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub text:      String,
    pub is_final:  bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceEvent {
    #[serde(rename = "type")]
    pub kind:      String,
    pub data:      Value,
    pub timestamp: DateTime<Utc>,
}

/// Recent inbound traffic from one device, kept for debugging.
#[derive(Default)]
pub struct SessionLog {
    pub transcripts: VecDeque<Transcript>,  // newest 100
    pub events:      VecDeque<DeviceEvent>, // newest 50
}

impl SessionLog {
    pub fn record_transcript(&mut self, text: String, is_final: bool) {
        let t = Transcript { text, is_final, timestamp: Utc::now() };
        push_capped(&mut self.transcripts, t, TRANSCRIPT_CAP);
    }

    pub fn record_event(&mut self, kind: &str, data: Value) {
        let e = DeviceEvent { kind: kind.into(), data, timestamp: Utc::now() };
        push_capped(&mut self.events, e, EVENT_CAP);
    }
}

/* ------------ shared handles ------------ */
pub type Registry  = Arc<BroadcastRegistry>;
pub type Directory = Arc<SessionDirectory>;
