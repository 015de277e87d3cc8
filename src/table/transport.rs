use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use super::events::EgressEvent;

const LOG_TARGET: &str = "plo_server::table::transport";

/// Seam between the table and a client connection. Sends must never
/// block the table actor: implementations enqueue and report delivery
/// as a boolean.
pub trait ClientTransport: Send + Sync {
    /// Queue one event; false when the peer is gone or the queue is full.
    fn send(&self, event: &EgressEvent) -> bool;
    fn is_connected(&self) -> bool;
}

/// mpsc-backed transport: the socket pump drains the receiver and writes
/// frames. Dropping the receiver marks the transport disconnected.
pub struct ChannelTransport {
    tx: mpsc::Sender<EgressEvent>,
    dropped: AtomicBool,
}

impl ChannelTransport {
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<EgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Arc::new(Self {
                tx,
                dropped: AtomicBool::new(false),
            }),
            rx,
        )
    }
}

impl ClientTransport for ChannelTransport {
    fn send(&self, event: &EgressEvent) -> bool {
        match self.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(target: LOG_TARGET, event = event.event_name(), "slow client, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.store(true, Ordering::Relaxed);
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        !self.dropped.load(Ordering::Relaxed) && !self.tx.is_closed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Captures every event for ordering assertions in tests.
    pub struct RecordingTransport {
        events: Mutex<Vec<EgressEvent>>,
        connected: AtomicBool,
    }

    impl RecordingTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                connected: AtomicBool::new(true),
            })
        }

        pub fn events(&self) -> Vec<EgressEvent> {
            self.events.lock().clone()
        }

        pub fn event_names(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(|e| e.event_name()).collect()
        }

        pub fn disconnect(&self) {
            self.connected.store(false, Ordering::Relaxed);
        }
    }

    impl ClientTransport for RecordingTransport {
        fn send(&self, event: &EgressEvent) -> bool {
            if !self.is_connected() {
                return false;
            }
            self.events.lock().push(event.clone());
            true
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }
    }
}
