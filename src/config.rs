use std::time::Duration;

use crate::engine::types::{Blinds, Chips};

pub const MAX_PLAYERS: usize = crate::engine::MAX_PLAYERS;
pub const MIN_PLAYERS_TO_START: usize = 3;
pub const MESSAGE_LOG_CAP: usize = 50;

pub const ACTION_TIMEOUT: Duration = Duration::from_millis(20_000);
pub const ACTION_ANIMATION_DELAY: Duration = Duration::from_millis(1_200);
pub const STREET_TRANSITION_DELAY: Duration = Duration::from_millis(800);
pub const SHOWDOWN_DELAY: Duration = Duration::from_millis(2_000);
pub const HAND_COMPLETE_DELAY: Duration = Duration::from_millis(2_000);
pub const NEXT_HAND_DELAY: Duration = Duration::from_millis(2_000);
pub const NEXT_HAND_SHOWDOWN_DELAY: Duration = Duration::from_millis(5_000);
pub const RUNOUT_STREET_DELAY: Duration = Duration::from_millis(1_500);

/// Per-table configuration. Production tables use the frozen pacing
/// values; tests shrink the delays to keep paused-clock runs tight.
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub blinds: Blinds,
    pub max_players: usize,
    pub is_fast_fold: bool,
    pub default_buy_in: Chips,
    pub action_timeout: Duration,
    pub action_animation_delay: Duration,
    pub street_transition_delay: Duration,
    pub showdown_delay: Duration,
    pub hand_complete_delay: Duration,
    pub next_hand_delay: Duration,
    pub next_hand_showdown_delay: Duration,
    pub runout_street_delay: Duration,
    pub message_log_cap: usize,
}

impl TableConfig {
    pub fn new(small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            blinds: Blinds::new(small_blind, big_blind),
            max_players: MAX_PLAYERS,
            is_fast_fold: false,
            default_buy_in: 200 * big_blind,
            action_timeout: ACTION_TIMEOUT,
            action_animation_delay: ACTION_ANIMATION_DELAY,
            street_transition_delay: STREET_TRANSITION_DELAY,
            showdown_delay: SHOWDOWN_DELAY,
            hand_complete_delay: HAND_COMPLETE_DELAY,
            next_hand_delay: NEXT_HAND_DELAY,
            next_hand_showdown_delay: NEXT_HAND_SHOWDOWN_DELAY,
            runout_street_delay: RUNOUT_STREET_DELAY,
            message_log_cap: MESSAGE_LOG_CAP,
        }
    }

    pub fn fast_fold(small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            is_fast_fold: true,
            ..Self::new(small_blind, big_blind)
        }
    }

    /// Fast-fold tables only deal once every seat is filled; regular
    /// tables start three-handed.
    pub fn min_players_to_start(&self) -> usize {
        if self.is_fast_fold {
            self.max_players
        } else {
            MIN_PLAYERS_TO_START
        }
    }

    /// The river reveal waits 1.5x the regular street spacing.
    pub fn runout_river_delay(&self) -> Duration {
        self.runout_street_delay + self.runout_street_delay / 2
    }
}
