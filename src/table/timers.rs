use std::time::Duration;

use tokio::sync::mpsc;
use tracing::Instrument;

use super::command::{TableCommand, TimerKind};

/// Generation-token timers. Each scheduled callback re-enters the table
/// actor as a `Timer` command carrying its token; the actor accepts it
/// only if the slot still holds that token, so a cancelled or superseded
/// timer dies on arrival instead of firing against stale state.
///
/// At most one of the action and street-transition slots is live at any
/// time; the turn controller maintains that invariant.
#[derive(Default)]
pub struct Timers {
    next_token: u64,
    action: Option<u64>,
    animation: Option<u64>,
    street: Option<u64>,
    runout: Option<u64>,
    completion: Option<u64>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        &mut self,
        tx: &mpsc::Sender<TableCommand>,
        delay: Duration,
        kind: TimerKind,
    ) {
        self.next_token += 1;
        let token = self.next_token;
        *self.slot_mut(&kind) = Some(token);

        let tx = tx.clone();
        let span = tracing::debug_span!("table_timer", token, ?kind);
        tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                // A closed inbox means the table already shut down; the
                // token check on arrival handles everything else.
                let _ = tx.send(TableCommand::Timer { token, kind }).await;
            }
            .instrument(span),
        );
    }

    /// True when the fired timer is still current; clears the slot.
    pub fn accept(&mut self, token: u64, kind: &TimerKind) -> bool {
        let slot = self.slot_mut(kind);
        if *slot == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, kind: &TimerKind) {
        *self.slot_mut(kind) = None;
    }

    pub fn cancel_turn_timers(&mut self) {
        self.action = None;
        self.animation = None;
        self.street = None;
    }

    pub fn cancel_all(&mut self) {
        self.cancel_turn_timers();
        self.runout = None;
        self.completion = None;
    }

    pub fn action_pending(&self) -> bool {
        self.action.is_some()
    }

    fn slot_mut(&mut self, kind: &TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::ActionTimeout { .. } => &mut self.action,
            TimerKind::ActionAnimation => &mut self.animation,
            TimerKind::StreetTransition => &mut self.street,
            TimerKind::RunoutReveal => &mut self.runout,
            TimerKind::Completion { .. } => &mut self.completion,
        }
    }
}
