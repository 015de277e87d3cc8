use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::events::EgressEvent;
use super::transport::ClientTransport;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    Room,
    Player(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: &'static str,
    pub target: LogTarget,
    pub data: serde_json::Value,
}

/// Room-scoped fan-out plus a bounded ring buffer of recent messages for
/// admin introspection. Membership is owned by the seat/spectator
/// managers; this service only writes to the transports it is handed.
pub struct BroadcastService {
    cap: usize,
    log: Mutex<VecDeque<MessageLogEntry>>,
}

impl BroadcastService {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            log: Mutex::new(VecDeque::with_capacity(cap)),
        }
    }

    /// Fan one event out to every transport bound to the room.
    pub fn room_emit<'a, I>(&self, transports: I, event: &EgressEvent)
    where
        I: IntoIterator<Item = &'a Arc<dyn ClientTransport>>,
    {
        for t in transports {
            t.send(event);
        }
        self.push(LogTarget::Room, event);
    }

    /// Targeted emit, annotated with the recipient in the message log.
    pub fn socket_emit(&self, transport: &dyn ClientTransport, player_id: &str, event: &EgressEvent) {
        transport.send(event);
        self.push(LogTarget::Player(player_id.to_string()), event);
    }

    /// Log a fan-out performed by the caller (per-seat projections go
    /// through individual sends but count as one room message).
    pub fn note_room_event(&self, event: &EgressEvent) {
        self.push(LogTarget::Room, event);
    }

    pub fn recent(&self) -> Vec<MessageLogEntry> {
        self.log.lock().iter().cloned().collect()
    }

    fn push(&self, target: LogTarget, event: &EgressEvent) {
        let entry = MessageLogEntry {
            timestamp: Utc::now(),
            event: event.event_name(),
            target,
            data: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        };
        let mut log = self.log.lock();
        if log.len() == self.cap {
            log.pop_front();
        }
        log.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_is_bounded() {
        let svc = BroadcastService::new(3);
        for i in 0..5 {
            svc.note_room_event(&EgressEvent::TableBusted {
                message: format!("m{i}"),
            });
        }
        let recent = svc.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].data["message"], "m2");
        assert_eq!(recent[2].data["message"], "m4");
        assert!(recent.iter().all(|e| e.event == "table:busted"));
    }
}
