use std::sync::Arc;

use uuid::Uuid;

use super::transport::ClientTransport;

/// Privileged read-only viewers: they receive every room broadcast and
/// the unmasked state projection (all hole cards face-up).
#[derive(Default)]
pub struct SpectatorManager {
    spectators: Vec<(Uuid, Arc<dyn ClientTransport>)>,
}

impl SpectatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: Uuid, transport: Arc<dyn ClientTransport>) {
        self.spectators.retain(|(existing, _)| *existing != id);
        self.spectators.push((id, transport));
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.spectators.len();
        self.spectators.retain(|(existing, _)| *existing != id);
        self.spectators.len() != before
    }

    /// Drop spectators whose connection has gone away.
    pub fn prune(&mut self) {
        self.spectators.retain(|(_, t)| t.is_connected());
    }

    pub fn transports(&self) -> Vec<Arc<dyn ClientTransport>> {
        self.spectators.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.spectators.len()
    }
}
