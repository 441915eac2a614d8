//! Ordered delivery of stream events to one client.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use crate::stream_event::StreamEvent;

/// Sending half of a turn's event stream.
///
/// Backed by a bounded channel: `emit` waits while the client is slow. Once
/// the receiver is gone the sink is marked disconnected and every later
/// `emit` is a no-op.
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    disconnected: AtomicBool,
}

impl EventSink {
    /// Create a sink and the receiver the transport reads from.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                tx,
                disconnected: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Deliver one event. Returns `false` if the client is gone.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        if self.is_disconnected() {
            return false;
        }
        if self.tx.send(event).await.is_err() {
            tracing::info!("Client disconnected; dropping further events");
            self.disconnected.store(true, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}
