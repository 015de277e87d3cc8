use std::sync::Arc;

use tracing::debug;

use crate::engine::types::{Chips, SeatIndex, MAX_PLAYERS};

use super::transport::ClientTransport;

const LOG_TARGET: &str = "plo_server::table::seats";

/// Table-layer occupant of one seat. Distinct from the engine's
/// `HandPlayer`: this record outlives individual hands.
#[derive(Clone)]
pub struct Seat {
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub transport: Option<Arc<dyn ClientTransport>>,
    pub chips: Chips,
    pub buy_in: Chips,
    /// Seated mid-hand; dealt in from the next hand start.
    pub waiting_for_next_hand: bool,
    /// Migrated away by the fast-fold router; kept for display and
    /// history until the hand ends, then evicted.
    pub left_for_fast_fold: bool,
}

impl Seat {
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }
}

pub struct SeatRequest {
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub transport: Option<Arc<dyn ClientTransport>>,
    pub buy_in: Chips,
    pub preferred_seat: Option<SeatIndex>,
}

/// Fixed six-slot seat array with the seating policy: preferred seat if
/// free, else first free. Seat indices are stable while occupied.
#[derive(Default)]
pub struct SeatManager {
    seats: [Option<Seat>; MAX_PLAYERS],
}

impl SeatManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seat_player(&mut self, req: SeatRequest, hand_in_progress: bool) -> Option<SeatIndex> {
        if self.find_by_external_id(&req.external_id).is_some() {
            debug!(target: LOG_TARGET, external_id = %req.external_id, "already seated");
            return None;
        }
        let index = match req.preferred_seat {
            Some(seat) if seat < MAX_PLAYERS && self.seats[seat].is_none() => seat,
            _ => self.seats.iter().position(|s| s.is_none())?,
        };
        self.seats[index] = Some(Seat {
            external_id: req.external_id,
            display_name: req.display_name,
            avatar_ref: req.avatar_ref,
            transport: req.transport,
            chips: req.buy_in,
            buy_in: req.buy_in,
            waiting_for_next_hand: hand_in_progress,
            left_for_fast_fold: false,
        });
        Some(index)
    }

    pub fn get(&self, seat: SeatIndex) -> Option<&Seat> {
        self.seats.get(seat).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, seat: SeatIndex) -> Option<&mut Seat> {
        self.seats.get_mut(seat).and_then(|s| s.as_mut())
    }

    pub fn remove(&mut self, seat: SeatIndex) -> Option<Seat> {
        self.seats.get_mut(seat).and_then(|s| s.take())
    }

    pub fn find_by_external_id(&self, external_id: &str) -> Option<SeatIndex> {
        self.occupied()
            .find(|(_, s)| s.external_id == external_id)
            .map(|(i, _)| i)
    }

    pub fn occupied(&self) -> impl Iterator<Item = (SeatIndex, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|seat| (i, seat)))
    }

    /// Seats that would be dealt into the next hand. Sitting-out and
    /// empty seats never count toward the start threshold.
    pub fn startable_count(&self) -> usize {
        self.occupied()
            .filter(|(_, s)| s.chips > 0 && !s.left_for_fast_fold)
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    /// Every bound transport, for room fan-out.
    pub fn transports(&self) -> Vec<Arc<dyn ClientTransport>> {
        self.occupied()
            .filter_map(|(_, s)| s.transport.clone())
            .collect()
    }

    pub fn clear_waiting_flags(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.waiting_for_next_hand = false;
        }
    }

    pub fn mark_left_for_fast_fold(&mut self, seat: SeatIndex) {
        if let Some(s) = self.get_mut(seat) {
            s.left_for_fast_fold = true;
            s.transport = None;
        }
    }

    /// Hand-end chip sync from the engine; waiting seats never played.
    pub fn update_chips(&mut self, seat: SeatIndex, chips: Chips) {
        if let Some(s) = self.get_mut(seat) {
            if !s.waiting_for_next_hand {
                s.chips = chips;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: &str, preferred: Option<SeatIndex>) -> SeatRequest {
        SeatRequest {
            external_id: id.to_string(),
            display_name: id.to_string(),
            avatar_ref: None,
            transport: None,
            buy_in: 400,
            preferred_seat: preferred,
        }
    }

    #[test]
    fn preferred_seat_wins_when_free() {
        let mut mgr = SeatManager::new();
        assert_eq!(mgr.seat_player(req("a", Some(3)), false), Some(3));
        assert_eq!(mgr.seat_player(req("b", Some(3)), false), Some(0));
        assert_eq!(mgr.seat_player(req("c", None), false), Some(1));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let mut mgr = SeatManager::new();
        assert_eq!(mgr.seat_player(req("a", None), false), Some(0));
        assert_eq!(mgr.seat_player(req("a", None), false), None);
    }

    #[test]
    fn table_fills_to_six() {
        let mut mgr = SeatManager::new();
        for i in 0..MAX_PLAYERS {
            assert!(mgr.seat_player(req(&format!("p{i}"), None), false).is_some());
        }
        assert_eq!(mgr.seat_player(req("late", None), false), None);
        assert_eq!(mgr.occupied_count(), MAX_PLAYERS);
    }

    #[test]
    fn mid_hand_joiners_wait_for_the_next_hand() {
        let mut mgr = SeatManager::new();
        let seat = mgr.seat_player(req("a", None), true).unwrap();
        assert!(mgr.get(seat).unwrap().waiting_for_next_hand);
        // Waiting seats keep their stack through the hand-end sync.
        mgr.update_chips(seat, 0);
        assert_eq!(mgr.get(seat).unwrap().chips, 400);
        mgr.clear_waiting_flags();
        mgr.update_chips(seat, 350);
        assert_eq!(mgr.get(seat).unwrap().chips, 350);
    }

    #[test]
    fn fast_fold_leavers_do_not_count_toward_start() {
        let mut mgr = SeatManager::new();
        let a = mgr.seat_player(req("a", None), false).unwrap();
        mgr.seat_player(req("b", None), false).unwrap();
        assert_eq!(mgr.startable_count(), 2);
        mgr.mark_left_for_fast_fold(a);
        assert_eq!(mgr.startable_count(), 1);
        assert!(mgr.get(a).is_some(), "seat retained until hand end");
    }
}
