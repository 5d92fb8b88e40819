//! Renders a message onto one device: truncate, cut into fixed-width chunks,
//! pace one chunk per display period.
//!
//! Every attached device gets its own FIFO queue drained by a single worker,
//! so two messages sent back to back never interleave their chunks. The
//! queue is bounded; a device that is [`QUEUE_CAP`] messages behind takes no more.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::display::DisplaySink;

pub const CHUNK_SIZE:     usize = 120;
pub const MAX_TEXT_CHARS: usize = 2000;
/// Messages a device may have waiting behind the one on screen.
pub const QUEUE_CAP:      usize = 8;

/// What happened when one listener's device was handed one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { writes: usize },
    /// No device was attached when delivery started.
    Skipped,
    /// At least one write was refused; `writes` counts the ones that landed.
    Failed { reason: String, writes: usize },
}

/// Cap `text` at [`MAX_TEXT_CHARS`] characters.
pub fn truncate(text: &str) -> String {
    text.chars().take(MAX_TEXT_CHARS).collect()
}

/// Hard fixed-width cut into [`CHUNK_SIZE`]-character pieces.
pub fn chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(CHUNK_SIZE).map(|c| c.iter().collect()).collect()
}

#[derive(Debug, Clone)]
pub struct DeliveryPipeline {
    duration: Duration,
}

impl DeliveryPipeline {
    pub fn new(duration: Duration) -> Self { Self { duration } }

    pub async fn deliver(&self, sink: &dyn DisplaySink, text: &str) -> DeliveryOutcome {
        if !sink.is_attached() {
            return DeliveryOutcome::Skipped;
        }

        let text = truncate(text);
        if text.chars().count() <= CHUNK_SIZE {
            return match sink.show_text(&text, self.duration).await {
                Ok(())  => DeliveryOutcome::Delivered { writes: 1 },
                Err(e)  => DeliveryOutcome::Failed { reason: e.to_string(), writes: 0 },
            };
        }

        let mut writes = 0;
        let mut first_err: Option<String> = None;
        for (i, chunk) in chunks(&text).iter().enumerate() {
            match sink.show_text(chunk, self.duration).await {
                Ok(()) => writes += 1,
                Err(e) => {
                    warn!(chunk = i, error = %e, "chunk write failed");
                    first_err.get_or_insert_with(|| e.to_string());
                }
            }
            // one chunk on screen at a time, the last one included
            tokio::time::sleep(self.duration).await;
        }

        match first_err {
            None         => DeliveryOutcome::Delivered { writes },
            Some(reason) => DeliveryOutcome::Failed { reason, writes },
        }
    }

    /// Start the single worker that drains one device's queue.
    /// The worker ends once the returned queue is dropped and drained.
    pub fn spawn_queue(&self, connection_id: &str, sink: Arc<dyn DisplaySink>) -> DeliveryQueue {
        let (tx, mut rx) = mpsc::channel::<String>(QUEUE_CAP);
        let pipeline = self.clone();
        let conn = connection_id.to_string();

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                match pipeline.deliver(sink.as_ref(), &text).await {
                    DeliveryOutcome::Delivered { writes } => {
                        debug!(%conn, writes, "delivered");
                    }
                    DeliveryOutcome::Skipped => {
                        debug!(%conn, "device gone, delivery skipped");
                    }
                    DeliveryOutcome::Failed { reason, writes } => {
                        warn!(%conn, writes, %reason, "delivery failed");
                    }
                }
            }
            debug!(%conn, "delivery queue closed");
        });

        DeliveryQueue { tx, conn: connection_id.to_string() }
    }
}

impl Default for DeliveryPipeline {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_DISPLAY_MS))
    }
}

/// Sending half of a device's delivery queue.
pub struct DeliveryQueue {
    tx:   mpsc::Sender<String>,
    conn: String,
}

impl DeliveryQueue {
    /// Enqueue without waiting. `false` if the queue is full or the worker is gone.
    pub fn push(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn = %self.conn, cap = QUEUE_CAP, "delivery queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
