use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::TableConfig;
use crate::engine::apply::{apply_action, ActionOutcome};
use crate::engine::errors::ActionError;
use crate::engine::legals::{valid_actions, ValidAction};
use crate::engine::pots::calculate_side_pots;
use crate::engine::start::start_new_hand;
use crate::engine::state::GameState;
use crate::engine::types::{
    ActionKind, Chips, HandPlayer, Position, SeatIndex, Street, MAX_PLAYERS,
};
use crate::equity::{EquityContender, EquityEstimator, EquityRequest, EvProfits};
use crate::history::{CompletedHand, HandHistoryStore, PlayerHandSnapshot};

use super::actor;
use super::broadcast::BroadcastService;
use super::command::{
    CompletionStage, FastFoldHooks, ReseatCandidate, SeatPlayerRequest, SeatSummary, TableCommand,
    TableHandle, TableStatus, TimerKind,
};
use super::events::{
    ClientGameState, EgressEvent, ProjectedPlayer, ShowdownReveal, ShowdownWinner, WinnerSummary,
};
use super::fold::{process_fold, process_silent_fold, FoldRequest};
use super::seats::{SeatManager, SeatRequest};
use super::spectator::SpectatorManager;
use super::timers::Timers;

const LOG_TARGET: &str = "plo_server::table";
const INBOX_CAPACITY: usize = 128;

/// The acting turn currently out with a client.
pub(crate) struct PendingAction {
    pub seat: SeatIndex,
    pub player_id: String,
    pub valid_actions: Vec<ValidAction>,
    pub requested_at: DateTime<Utc>,
    pub timeout_ms: u64,
}

/// Per-table state machine. One instance per table, owned by its actor
/// task; client actions, timer callbacks and disconnects all arrive
/// serialized through the inbox.
pub struct TableInstance {
    id: Uuid,
    config: TableConfig,
    seats: SeatManager,
    spectators: SpectatorManager,
    broadcast: BroadcastService,
    game_state: Option<GameState>,
    last_dealer: Option<SeatIndex>,
    is_hand_in_progress: bool,
    is_paused: bool,
    pending_start_hand: bool,
    is_run_out_in_progress: bool,
    showdown_sent_during_run_out: bool,
    /// Folds submitted ahead of turn, executed when the seat comes up.
    pending_early_folds: HashMap<SeatIndex, String>,
    pending_action: Option<PendingAction>,
    timers: Timers,
    rng: StdRng,
    /// Identity of every dealt seat, frozen at hand start so departures
    /// cannot erase it from the record.
    hand_external_ids: HashMap<SeatIndex, String>,
    hand_start_stacks: HashMap<SeatIndex, Chips>,
    hand_started_at: Option<DateTime<Utc>>,
    all_in_ev: Option<EvProfits>,
    /// Board cards already shown to clients during a runout.
    runout_revealed: usize,
    completion_was_showdown: bool,
    history: Arc<dyn HandHistoryStore>,
    equity: Arc<dyn EquityEstimator>,
    hooks: FastFoldHooks,
    self_tx: mpsc::Sender<TableCommand>,
}

impl TableInstance {
    pub fn spawn(
        config: TableConfig,
        history: Arc<dyn HandHistoryStore>,
        equity: Arc<dyn EquityEstimator>,
        hooks: FastFoldHooks,
    ) -> TableHandle {
        Self::spawn_with_rng(config, history, equity, hooks, StdRng::from_entropy())
    }

    /// Deterministic deals for tests.
    pub fn spawn_seeded(
        config: TableConfig,
        history: Arc<dyn HandHistoryStore>,
        equity: Arc<dyn EquityEstimator>,
        hooks: FastFoldHooks,
        seed: u64,
    ) -> TableHandle {
        Self::spawn_with_rng(config, history, equity, hooks, StdRng::seed_from_u64(seed))
    }

    fn spawn_with_rng(
        config: TableConfig,
        history: Arc<dyn HandHistoryStore>,
        equity: Arc<dyn EquityEstimator>,
        hooks: FastFoldHooks,
        rng: StdRng,
    ) -> TableHandle {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let message_log_cap = config.message_log_cap;
        let instance = Self {
            id,
            config,
            seats: SeatManager::new(),
            spectators: SpectatorManager::new(),
            broadcast: BroadcastService::new(message_log_cap),
            game_state: None,
            last_dealer: None,
            is_hand_in_progress: false,
            is_paused: false,
            pending_start_hand: false,
            is_run_out_in_progress: false,
            showdown_sent_during_run_out: false,
            pending_early_folds: HashMap::new(),
            pending_action: None,
            timers: Timers::new(),
            rng,
            hand_external_ids: HashMap::new(),
            hand_start_stacks: HashMap::new(),
            hand_started_at: None,
            all_in_ev: None,
            runout_revealed: 0,
            completion_was_showdown: false,
            history,
            equity,
            hooks,
            self_tx: tx.clone(),
        };
        let span = tracing::info_span!("table", table_id = %id);
        tokio::spawn(actor::run(instance, rx).instrument(span));
        TableHandle::new(id, tx)
    }

    // ---- command dispatch -------------------------------------------------

    /// Returns false to stop the actor.
    pub(crate) fn dispatch(&mut self, cmd: TableCommand) -> bool {
        match cmd {
            TableCommand::SeatPlayer { req, reply } => {
                let _ = reply.send(self.handle_seat_player(req));
            }
            TableCommand::TriggerMaybeStartHand => self.maybe_start_hand(),
            TableCommand::UnseatPlayer { external_id } => self.handle_unseat(&external_id),
            TableCommand::UnseatForFastFold { external_id, reply } => {
                let _ = reply.send(self.handle_unseat_for_fast_fold(&external_id));
            }
            TableCommand::PlayerAction {
                external_id,
                action,
                amount,
                reply,
            } => {
                let accepted = self.handle_player_action(&external_id, action, amount);
                if let Some(reply) = reply {
                    let _ = reply.send(accepted);
                }
            }
            TableCommand::EarlyFold { external_id, reply } => {
                let accepted = self.handle_early_fold(&external_id);
                if let Some(reply) = reply {
                    let _ = reply.send(accepted);
                }
            }
            TableCommand::SetChips { external_id, chips } => {
                self.handle_set_chips(&external_id, chips)
            }
            TableCommand::AddSpectator { id, transport } => {
                self.spectators.add(id, transport);
                self.broadcast_state();
            }
            TableCommand::RemoveSpectator { id } => {
                self.spectators.remove(id);
            }
            TableCommand::SetPaused { paused } => self.handle_set_paused(paused),
            TableCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            TableCommand::Timer { token, kind } => {
                if self.timers.accept(token, &kind) {
                    self.handle_timer(kind);
                }
            }
            TableCommand::Shutdown => {
                info!(target: LOG_TARGET, table_id = %self.id, "table shutting down");
                self.timers.cancel_all();
                return false;
            }
        }
        true
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::ActionTimeout { seat } => self.handle_action_timeout(seat),
            TimerKind::ActionAnimation => {
                // New street becomes visible, then the next turn begins
                // after the transition delay.
                self.broadcast_state();
                self.timers.schedule(
                    &self.self_tx,
                    self.config.street_transition_delay,
                    TimerKind::StreetTransition,
                );
            }
            TimerKind::StreetTransition => {
                self.request_next_action();
                self.broadcast_state();
            }
            TimerKind::RunoutReveal => self.runout_reveal(),
            TimerKind::Completion { stage } => self.completion_step(stage),
        }
    }

    // ---- seating ----------------------------------------------------------

    fn handle_seat_player(&mut self, req: SeatPlayerRequest) -> Option<SeatIndex> {
        let buy_in = req.buy_in.unwrap_or(self.config.default_buy_in);
        let external_id = req.external_id.clone();
        let seat = self.seats.seat_player(
            SeatRequest {
                external_id: req.external_id,
                display_name: req.display_name,
                avatar_ref: req.avatar_ref,
                transport: req.transport,
                buy_in,
                preferred_seat: req.preferred_seat,
            },
            self.is_hand_in_progress,
        )?;
        info!(
            target: LOG_TARGET,
            table_id = %self.id,
            external_id = %external_id,
            seat,
            buy_in,
            waiting = self.is_hand_in_progress,
            "player seated"
        );
        if !req.suppress_joined {
            if let Some(s) = self.seats.get(seat) {
                if let Some(t) = &s.transport {
                    self.broadcast.socket_emit(
                        t.as_ref(),
                        &external_id,
                        &EgressEvent::TableJoined {
                            table_id: self.id,
                            seat,
                        },
                    );
                }
            }
        }
        self.broadcast_state();
        // Deliberately no maybe_start_hand here: the caller triggers it
        // once its own bookkeeping is done, which keeps table:joined
        // ahead of game:hole_cards.
        Some(seat)
    }

    fn handle_unseat(&mut self, external_id: &str) {
        let Some(seat) = self.seats.find_by_external_id(external_id) else {
            return;
        };
        let in_hand = self
            .game_state
            .as_ref()
            .is_some_and(|st| st.players[seat].in_hand());
        if self.is_hand_in_progress && in_hand && !self.is_run_out_in_progress {
            let acting = self.game_state.as_ref().and_then(|st| st.current_player) == Some(seat);
            if acting {
                self.apply_out_of_band_fold(seat);
            } else {
                // Folding now would leak that the seat was weak before
                // its turn; defer until the action reaches it.
                self.pending_early_folds
                    .insert(seat, external_id.to_string());
            }
        }
        if let Some(seat_rec) = self.seats.remove(seat) {
            if let Some(t) = &seat_rec.transport {
                self.broadcast.socket_emit(
                    t.as_ref(),
                    external_id,
                    &EgressEvent::TableLeft { table_id: self.id },
                );
            }
        }
        info!(target: LOG_TARGET, table_id = %self.id, external_id = %external_id, seat, "player left");
        self.broadcast_state();
    }

    fn handle_unseat_for_fast_fold(&mut self, external_id: &str) -> Option<ReseatCandidate> {
        let seat = self.seats.find_by_external_id(external_id)?;
        let seat_rec = self.seats.get(seat)?;
        let display_name = seat_rec.display_name.clone();
        let avatar_ref = seat_rec.avatar_ref.clone();
        let transport = seat_rec.transport.clone();
        let mut chips = seat_rec.chips;

        let dealt = self
            .game_state
            .as_ref()
            .is_some_and(|st| !st.players[seat].hole_cards.is_empty());
        if self.is_hand_in_progress && dealt {
            let st = self.game_state.as_ref().expect("dealt implies state");
            chips = st.players[seat].chips;
            if st.players[seat].in_hand() {
                if st.current_player == Some(seat) {
                    self.apply_out_of_band_fold(seat);
                } else {
                    self.pending_early_folds
                        .insert(seat, external_id.to_string());
                }
            }
            // Seat stays on display until the hand ends; no table:left.
            self.seats.mark_left_for_fast_fold(seat);
        } else {
            self.seats.remove(seat);
        }
        debug!(
            target: LOG_TARGET,
            table_id = %self.id,
            external_id = %external_id,
            seat,
            chips,
            "fast-fold migration"
        );
        self.broadcast_state();
        Some(ReseatCandidate {
            external_id: external_id.to_string(),
            display_name,
            avatar_ref,
            chips,
            transport,
        })
    }

    // ---- hand lifecycle ---------------------------------------------------

    fn maybe_start_hand(&mut self) {
        if self.is_paused || self.is_hand_in_progress {
            self.pending_start_hand = true;
            return;
        }
        if self.seats.startable_count() < self.config.min_players_to_start() {
            return;
        }
        self.start_hand();
    }

    fn handle_set_paused(&mut self, paused: bool) {
        self.is_paused = paused;
        info!(target: LOG_TARGET, table_id = %self.id, paused, "maintenance flag updated");
        if !paused && self.pending_start_hand {
            self.pending_start_hand = false;
            self.maybe_start_hand();
        }
    }

    fn start_hand(&mut self) {
        self.seats.clear_waiting_flags();
        let mut base = GameState::initial(0, self.config.blinds);
        base.dealer_position = self.last_dealer.unwrap_or(MAX_PLAYERS - 1);
        for i in 0..MAX_PLAYERS {
            base.players[i] = match self.seats.get(i) {
                Some(s) if s.chips > 0 && !s.left_for_fast_fold => {
                    HandPlayer::active(i, s.display_name.clone(), s.chips)
                }
                _ => HandPlayer::sitting_out(i),
            };
        }

        let state = match start_new_hand(&base, &mut self.rng) {
            Ok(state) => state,
            Err(err) => {
                debug!(target: LOG_TARGET, table_id = %self.id, %err, "hand not started");
                return;
            }
        };

        self.hand_external_ids = self
            .seats
            .occupied()
            .filter(|(i, _)| !state.players[*i].hole_cards.is_empty())
            .map(|(i, s)| (i, s.external_id.clone()))
            .collect();
        self.hand_start_stacks = base
            .players
            .iter()
            .filter(|p| !p.is_sitting_out)
            .map(|p| (p.seat, p.chips))
            .collect();
        self.hand_started_at = Some(Utc::now());
        self.pending_start_hand = false;
        self.showdown_sent_during_run_out = false;
        self.runout_revealed = 0;
        self.all_in_ev = None;
        self.completion_was_showdown = false;
        self.is_hand_in_progress = true;
        self.game_state = Some(state);

        info!(
            target: LOG_TARGET,
            table_id = %self.id,
            dealer = self.game_state.as_ref().map(|s| s.dealer_position),
            players = self.hand_external_ids.len(),
            "hand started"
        );

        // Hole cards are strictly per-seat; the room state that follows
        // is masked.
        if let Some(state) = &self.game_state {
            for (i, seat_rec) in self.seats.occupied() {
                let cards = &state.players[i].hole_cards;
                if cards.len() == 4 {
                    if let Some(t) = &seat_rec.transport {
                        self.broadcast.socket_emit(
                            t.as_ref(),
                            &seat_rec.external_id,
                            &EgressEvent::HoleCards {
                                cards: cards.clone(),
                            },
                        );
                    }
                }
            }
        }
        self.broadcast_state();

        let complete = self
            .game_state
            .as_ref()
            .is_some_and(|s| s.is_hand_complete);
        if complete {
            // Blinds alone put everyone all-in.
            self.begin_runout(0);
        } else {
            self.request_next_action();
        }
    }

    // ---- acting turn FSM --------------------------------------------------

    fn request_next_action(&mut self) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        if state.is_hand_complete {
            return;
        }
        let Some(seat) = state.current_player else {
            error!(
                target: LOG_TARGET,
                table_id = %self.id,
                "no acting player on an open hand"
            );
            self.recover_idle("missing acting player");
            return;
        };

        // Deferred folds chain through the normal fold path until a real
        // actor is found or the hand ends.
        if self.pending_early_folds.remove(&seat).is_some() {
            self.apply_out_of_band_fold(seat);
            return;
        }

        // An unreachable actor is folded silently and the game advances;
        // observers just see a fold.
        let connected = self.seats.get(seat).is_some_and(|s| s.is_connected());
        if !connected {
            self.apply_silent_fold(seat);
            return;
        }

        let legal = valid_actions(state, seat);
        let seat_rec = self.seats.get(seat).expect("connected seat exists");
        let pending = PendingAction {
            seat,
            player_id: seat_rec.external_id.clone(),
            valid_actions: legal.clone(),
            requested_at: Utc::now(),
            timeout_ms: self.config.action_timeout.as_millis() as u64,
        };
        if let Some(t) = &seat_rec.transport {
            self.broadcast.socket_emit(
                t.as_ref(),
                &pending.player_id,
                &EgressEvent::ActionRequired {
                    player_id: pending.player_id.clone(),
                    valid_actions: legal,
                    timeout_ms: pending.timeout_ms,
                },
            );
        }
        self.pending_action = Some(pending);
        self.timers.schedule(
            &self.self_tx,
            self.config.action_timeout,
            TimerKind::ActionTimeout { seat },
        );
    }

    fn handle_player_action(&mut self, external_id: &str, kind: ActionKind, amount: Chips) -> bool {
        let Some(state) = self.game_state.as_ref() else {
            debug!(target: LOG_TARGET, table_id = %self.id, %external_id, "action with no hand");
            return false;
        };
        if state.is_hand_complete || self.is_run_out_in_progress {
            debug!(target: LOG_TARGET, table_id = %self.id, %external_id, "action after betting closed");
            return false;
        }
        let Some(seat) = self.seats.find_by_external_id(external_id) else {
            debug!(target: LOG_TARGET, table_id = %self.id, %external_id, "action from unseated player");
            return false;
        };
        if state.current_player != Some(seat) {
            debug!(target: LOG_TARGET, table_id = %self.id, %external_id, seat, "action out of turn");
            return false;
        }
        if let Some(pending) = &self.pending_action {
            if pending.seat == seat && !pending.valid_actions.iter().any(|a| a.kind == kind) {
                debug!(
                    target: LOG_TARGET,
                    table_id = %self.id,
                    %external_id,
                    seat,
                    ?kind,
                    "action not among the offered actions"
                );
                return false;
            }
        }

        let prior_board = state.community_cards.len();
        match apply_action(state, seat, kind, amount) {
            Ok((next, outcome)) => {
                self.clear_turn();
                self.game_state = Some(next);
                self.after_action_applied(outcome, prior_board);
                true
            }
            Err(err) => {
                // The client learns nothing beyond the next game:state;
                // a rejection must not stall the table.
                debug!(
                    target: LOG_TARGET,
                    table_id = %self.id,
                    %external_id,
                    seat,
                    ?kind,
                    amount,
                    %err,
                    "action rejected"
                );
                false
            }
        }
    }

    fn handle_early_fold(&mut self, external_id: &str) -> bool {
        let Some(state) = self.game_state.as_ref() else {
            return false;
        };
        if state.is_hand_complete || self.is_run_out_in_progress {
            return false;
        }
        let Some(seat) = self.seats.find_by_external_id(external_id) else {
            return false;
        };
        let p = &state.players[seat];
        if !p.in_hand() {
            return false;
        }
        if state.current_street == Street::Preflop && p.position == Some(Position::BigBlind) {
            // The big blind keeps its option until the action reaches it.
            let err = ActionError::BigBlindEarlyFold;
            debug!(target: LOG_TARGET, table_id = %self.id, %external_id, %err, "early fold rejected");
            return false;
        }
        if state.current_player == Some(seat) {
            return self.handle_player_action(external_id, ActionKind::Fold, 0);
        }
        self.pending_early_folds
            .insert(seat, external_id.to_string());
        debug!(target: LOG_TARGET, table_id = %self.id, %external_id, seat, "early fold queued");
        true
    }

    fn handle_action_timeout(&mut self, seat: SeatIndex) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        if state.is_hand_complete
            || self.is_run_out_in_progress
            || state.current_player != Some(seat)
        {
            return;
        }
        self.pending_action = None;

        let legal = valid_actions(state, seat);
        let kind = if legal.iter().any(|a| a.kind == ActionKind::Check) {
            ActionKind::Check
        } else {
            ActionKind::Fold
        };
        info!(
            target: LOG_TARGET,
            table_id = %self.id,
            seat,
            ?kind,
            "action timeout"
        );

        let prior_board = state.community_cards.len();
        match apply_action(state, seat, kind, 0) {
            Ok((next, outcome)) => {
                self.game_state = Some(next);
                if kind == ActionKind::Fold && self.config.is_fast_fold {
                    if let (Some(hook), Some(ext)) = (
                        self.hooks.on_timeout_fold.as_ref(),
                        self.hand_external_ids.get(&seat),
                    ) {
                        hook(self.id, ext);
                    }
                }
                self.after_action_applied(outcome, prior_board);
            }
            Err(err) => {
                error!(
                    target: LOG_TARGET,
                    table_id = %self.id,
                    seat,
                    %err,
                    "timeout fallback action rejected"
                );
                self.recover_idle("timeout fallback rejected");
            }
        }
    }

    /// Fold applied on behalf of a seat that left or pre-folded.
    fn apply_out_of_band_fold(&mut self, seat: SeatIndex) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        let player_id = self
            .hand_external_ids
            .get(&seat)
            .cloned()
            .unwrap_or_default();
        let was_current = state.current_player == Some(seat);
        let result = process_fold(
            state,
            &FoldRequest {
                seat,
                player_id,
                was_current_player: was_current,
            },
        );
        self.finish_out_of_band_fold(seat, result);
    }

    /// Fold for an acting seat with no reachable transport.
    fn apply_silent_fold(&mut self, seat: SeatIndex) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        let result = process_silent_fold(state, seat);
        self.finish_out_of_band_fold(seat, result);
    }

    fn finish_out_of_band_fold(
        &mut self,
        seat: SeatIndex,
        result: Result<(GameState, ActionOutcome, bool), ActionError>,
    ) {
        let prior_board = self
            .game_state
            .as_ref()
            .map(|st| st.community_cards.len())
            .unwrap_or(0);
        match result {
            Ok((next, outcome, advanced)) => {
                if advanced {
                    self.clear_turn();
                }
                self.game_state = Some(next);
                if advanced {
                    self.after_action_applied(outcome, prior_board);
                } else {
                    self.emit_action_taken(&outcome);
                    if outcome.hand_complete {
                        self.broadcast_state();
                        self.begin_completion(false);
                    } else {
                        self.broadcast_state();
                    }
                }
            }
            Err(err) => {
                debug!(target: LOG_TARGET, table_id = %self.id, seat, %err, "out-of-band fold rejected");
            }
        }
    }

    /// Every applied action cancels the outstanding per-turn timers
    /// before new ones are started.
    fn clear_turn(&mut self) {
        self.timers.cancel_turn_timers();
        self.pending_action = None;
    }

    fn emit_action_taken(&self, outcome: &ActionOutcome) {
        if let Some((kind, amount)) = outcome.applied.action.wire_form() {
            let player_id = self
                .hand_external_ids
                .get(&outcome.applied.seat)
                .cloned()
                .unwrap_or_default();
            self.room_emit(&EgressEvent::ActionTaken {
                player_id,
                action: kind,
                amount,
            });
        }
    }

    /// Post-action classification: runout, completion, street animation,
    /// or the next actor on the same street.
    fn after_action_applied(&mut self, outcome: ActionOutcome, prior_board: usize) {
        self.emit_action_taken(&outcome);

        if outcome.hand_complete && outcome.board_grew {
            self.begin_runout(prior_board);
        } else if outcome.hand_complete {
            self.broadcast_state();
            self.begin_completion(outcome.went_to_showdown);
        } else if outcome.street_changed {
            self.timers.schedule(
                &self.self_tx,
                self.config.action_animation_delay,
                TimerKind::ActionAnimation,
            );
        } else {
            self.request_next_action();
            self.broadcast_state();
        }
    }

    // ---- all-in runout ----------------------------------------------------

    fn begin_runout(&mut self, prior_board: usize) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        self.is_run_out_in_progress = true;
        self.runout_revealed = prior_board;
        self.timers.cancel_turn_timers();
        self.pending_action = None;

        // Freeze expectations against the board as it stood before any
        // reveal; failures are logged and the hand continues without EV.
        let request = EquityRequest {
            prior_board: state.community_cards[..prior_board].to_vec(),
            players: state
                .players
                .iter()
                .filter(|p| !p.hole_cards.is_empty())
                .map(|p| EquityContender {
                    seat: p.seat,
                    hole_cards: p.hole_cards.clone(),
                    folded: p.folded,
                    total_bet: p.total_bet_this_round,
                })
                .collect(),
        };
        match self.equity.all_in_ev_profits(&request) {
            Ok(profits) => self.all_in_ev = Some(profits),
            Err(err) => {
                warn!(target: LOG_TARGET, table_id = %self.id, %err, "all-in EV estimate failed");
                self.all_in_ev = None;
            }
        }

        // Cards go face-up now; winners stay hidden until the board is
        // fully out.
        let reveals = self.showdown_reveals(false);
        self.room_emit(&EgressEvent::Showdown {
            winners: Vec::new(),
            players: reveals,
        });
        self.showdown_sent_during_run_out = true;

        info!(
            target: LOG_TARGET,
            table_id = %self.id,
            prior_board,
            "all-in runout started"
        );
        self.schedule_next_reveal();
    }

    fn schedule_next_reveal(&mut self) {
        let delay = if self.runout_revealed == 4 {
            self.config.runout_river_delay()
        } else {
            self.config.runout_street_delay
        };
        self.timers
            .schedule(&self.self_tx, delay, TimerKind::RunoutReveal);
    }

    fn runout_reveal(&mut self) {
        if !self.is_run_out_in_progress || self.game_state.is_none() {
            return;
        }
        self.runout_revealed = match self.runout_revealed {
            0 => 3,
            n => n + 1,
        };
        if self.runout_revealed < 5 {
            self.broadcast_state();
            self.schedule_next_reveal();
        } else {
            self.is_run_out_in_progress = false;
            self.broadcast_state();
            self.begin_completion(true);
        }
    }

    // ---- hand completion --------------------------------------------------

    fn begin_completion(&mut self, went_to_showdown: bool) {
        self.timers.cancel_turn_timers();
        self.pending_action = None;
        self.is_run_out_in_progress = false;
        self.completion_was_showdown = went_to_showdown;

        let contenders = self
            .game_state
            .as_ref()
            .map(|s| s.contenders().len())
            .unwrap_or(0);
        let needs_showdown_event =
            went_to_showdown && !self.showdown_sent_during_run_out && contenders >= 2;
        let (delay, stage) = if needs_showdown_event {
            (self.config.showdown_delay, CompletionStage::SendShowdown)
        } else {
            (
                self.config.hand_complete_delay,
                CompletionStage::SendHandComplete,
            )
        };
        self.timers
            .schedule(&self.self_tx, delay, TimerKind::Completion { stage });
    }

    fn completion_step(&mut self, stage: CompletionStage) {
        match stage {
            CompletionStage::SendShowdown => {
                let event = EgressEvent::Showdown {
                    winners: self.showdown_winners(),
                    players: self.showdown_reveals(true),
                };
                self.room_emit(&event);
                self.timers.schedule(
                    &self.self_tx,
                    self.config.hand_complete_delay,
                    TimerKind::Completion {
                        stage: CompletionStage::SendHandComplete,
                    },
                );
            }
            CompletionStage::SendHandComplete => {
                let event = EgressEvent::HandComplete {
                    winners: self.winner_summaries(),
                    rake: 0,
                };
                self.room_emit(&event);
                self.record_history();
                self.sync_chips_to_seats();
                let delay = if self.completion_was_showdown {
                    self.config.next_hand_showdown_delay
                } else {
                    self.config.next_hand_delay
                };
                self.timers.schedule(
                    &self.self_tx,
                    delay,
                    TimerKind::Completion {
                        stage: CompletionStage::StartNextHand,
                    },
                );
            }
            CompletionStage::StartNextHand => self.finish_hand_cycle(),
        }
    }

    fn sync_chips_to_seats(&mut self) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        let updates: Vec<(SeatIndex, Chips)> = state
            .players
            .iter()
            .filter(|p| !p.hole_cards.is_empty())
            .map(|p| (p.seat, p.chips))
            .collect();
        for (seat, chips) in updates {
            if self
                .seats
                .get(seat)
                .is_some_and(|s| !s.left_for_fast_fold)
            {
                self.seats.update_chips(seat, chips);
            }
        }
    }

    fn finish_hand_cycle(&mut self) {
        if let Some(state) = &self.game_state {
            self.last_dealer = Some(state.dealer_position);
        }
        self.game_state = None;
        self.is_hand_in_progress = false;
        self.showdown_sent_during_run_out = false;
        self.is_run_out_in_progress = false;
        self.pending_early_folds.clear();
        self.pending_action = None;
        self.hand_external_ids.clear();
        self.hand_start_stacks.clear();
        self.all_in_ev = None;

        // Evictions: fast-fold leavers quietly, busted seats with notice.
        for seat in 0..MAX_PLAYERS {
            let Some(s) = self.seats.get(seat) else { continue };
            if s.left_for_fast_fold {
                self.seats.remove(seat);
            } else if s.chips == 0 && !s.waiting_for_next_hand {
                let removed = self.seats.remove(seat).expect("seat checked above");
                if let Some(t) = &removed.transport {
                    self.broadcast.socket_emit(
                        t.as_ref(),
                        &removed.external_id,
                        &EgressEvent::TableBusted {
                            message: "You are out of chips.".to_string(),
                        },
                    );
                }
                info!(target: LOG_TARGET, table_id = %self.id, seat, external_id = %removed.external_id, "player busted");
            }
        }
        self.broadcast_state();

        if self.config.is_fast_fold && self.hooks.on_fast_fold_reassign.is_some() {
            let candidates: Vec<ReseatCandidate> = (0..MAX_PLAYERS)
                .filter_map(|seat| self.seats.remove(seat))
                .map(|s| ReseatCandidate {
                    external_id: s.external_id,
                    display_name: s.display_name,
                    avatar_ref: s.avatar_ref,
                    chips: s.chips,
                    transport: s.transport,
                })
                .collect();
            if let Some(hook) = &self.hooks.on_fast_fold_reassign {
                hook(self.id, candidates);
            }
            return;
        }

        self.pending_start_hand = false;
        self.maybe_start_hand();
    }

    fn record_history(&self) {
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        let players: Vec<PlayerHandSnapshot> = state
            .players
            .iter()
            .filter(|p| p.hole_cards.len() == 4)
            .map(|p| {
                let starting = self.hand_start_stacks.get(&p.seat).copied().unwrap_or(0);
                PlayerHandSnapshot {
                    seat: p.seat,
                    external_id: self
                        .hand_external_ids
                        .get(&p.seat)
                        .cloned()
                        .unwrap_or_default(),
                    display_name: p.display_name.clone(),
                    starting_chips: starting,
                    hole_cards: p.hole_cards.clone(),
                    finishing_chips: p.chips,
                    profit: p.chips as i64 - starting as i64,
                    all_in_ev_profit: self
                        .all_in_ev
                        .as_ref()
                        .and_then(|m| m.get(&p.seat).copied()),
                }
            })
            .collect();
        let hand = CompletedHand {
            table_id: self.id,
            small_blind: self.config.blinds.small_blind,
            big_blind: self.config.blinds.big_blind,
            started_at: self.hand_started_at.unwrap_or_else(Utc::now),
            completed_at: Utc::now(),
            dealer_seat: state.dealer_position,
            actions: state.hand_history.clone(),
            board: state.community_cards.clone(),
            pot: state.winners.iter().map(|w| w.amount).sum(),
            rake: 0,
            winners: state.winners.clone(),
            players,
        };
        let store = Arc::clone(&self.history);
        let table_id = self.id;
        // Fire and forget: persistence never blocks the table.
        let span = tracing::info_span!("hand_history", table_id = %table_id);
        tokio::spawn(
            async move {
                if let Err(err) = store.record_hand(hand).await {
                    warn!(target: LOG_TARGET, table_id = %table_id, %err, "hand history dropped");
                }
            }
            .instrument(span),
        );
    }

    // ---- admin & recovery -------------------------------------------------

    fn handle_set_chips(&mut self, external_id: &str, chips: Chips) {
        let Some(seat) = self.seats.find_by_external_id(external_id) else {
            return;
        };
        warn!(
            target: LOG_TARGET,
            table_id = %self.id,
            external_id = %external_id,
            seat,
            chips,
            "admin chip override"
        );
        let dealt = self
            .game_state
            .as_ref()
            .is_some_and(|st| !st.players[seat].hole_cards.is_empty());
        if self.is_hand_in_progress && dealt {
            if let Some(state) = self.game_state.as_mut() {
                state.players[seat].chips = chips;
            }
        } else if let Some(s) = self.seats.get_mut(seat) {
            s.chips = chips;
        }
        self.broadcast_state();
    }

    /// Last-resort recovery from an invariant breach: drop the hand and
    /// return to a consistent idle table rather than crash the process.
    fn recover_idle(&mut self, reason: &str) {
        error!(
            target: LOG_TARGET,
            table_id = %self.id,
            reason,
            had_state = self.game_state.is_some(),
            "recovering table to idle"
        );
        self.timers.cancel_all();
        self.pending_action = None;
        self.pending_early_folds.clear();
        self.game_state = None;
        self.is_hand_in_progress = false;
        self.is_run_out_in_progress = false;
        self.showdown_sent_during_run_out = false;
        self.broadcast_state();
    }

    // ---- projections & fan-out --------------------------------------------

    fn room_emit(&self, event: &EgressEvent) {
        let mut transports = self.seats.transports();
        transports.extend(self.spectators.transports());
        self.broadcast.room_emit(transports.iter(), event);
    }

    /// Per-seat masked snapshots; spectators get the unmasked view.
    fn broadcast_state(&self) {
        for (i, seat_rec) in self.seats.occupied() {
            if let Some(t) = &seat_rec.transport {
                let state = self.project_for(Some(i));
                t.send(&EgressEvent::State { state });
            }
        }
        let unmasked = self.project_for(None);
        for t in self.spectators.transports() {
            t.send(&EgressEvent::State {
                state: unmasked.clone(),
            });
        }
        self.broadcast.note_room_event(&EgressEvent::State { state: unmasked });
    }

    fn project_for(&self, viewer: Option<SeatIndex>) -> ClientGameState {
        let state = self.game_state.as_ref();
        let runout_slice = if self.is_run_out_in_progress {
            Some(self.runout_revealed)
        } else {
            None
        };
        let winnings: HashMap<SeatIndex, Chips> = state
            .map(|st| st.winners.iter().map(|w| (w.seat, w.amount)).collect())
            .unwrap_or_default();

        let mut players = Vec::new();
        for (i, seat_rec) in self.seats.occupied() {
            let engine_p = state.map(|st| &st.players[i]);
            let dealt = engine_p.is_some_and(|p| !p.hole_cards.is_empty());
            let (chips, current_bet, folded, is_all_in, position) = match engine_p {
                Some(p) if dealt => {
                    let mut chips = p.chips;
                    if runout_slice.is_some() {
                        // Winnings are paid inside the engine the moment
                        // the hand settles; the animated view keeps the
                        // pre-payout stacks until the board is out.
                        chips -= winnings.get(&i).copied().unwrap_or(0);
                    }
                    (chips, p.current_bet, p.folded, p.is_all_in, p.position)
                }
                _ => (seat_rec.chips, 0, false, false, None),
            };
            let show_cards = dealt && (viewer.is_none() || viewer == Some(i));
            players.push(ProjectedPlayer {
                seat: i,
                player_id: seat_rec.external_id.clone(),
                display_name: seat_rec.display_name.clone(),
                avatar_ref: seat_rec.avatar_ref.clone(),
                position,
                chips,
                current_bet,
                folded,
                is_all_in,
                is_connected: seat_rec.is_connected(),
                waiting_for_next_hand: seat_rec.waiting_for_next_hand,
                hole_cards: if show_cards {
                    engine_p.map(|p| p.hole_cards.clone())
                } else {
                    None
                },
            });
        }

        let (community_cards, current_street, is_hand_complete, winners, pot) =
            match (state, runout_slice) {
                (Some(st), Some(n)) => (
                    st.community_cards[..n].to_vec(),
                    Street::for_board_len(n),
                    false,
                    Vec::new(),
                    st.winners.iter().map(|w| w.amount).sum(),
                ),
                (Some(st), None) => (
                    st.community_cards.clone(),
                    st.current_street,
                    st.is_hand_complete,
                    if st.is_hand_complete {
                        self.winner_summaries()
                    } else {
                        Vec::new()
                    },
                    st.pot,
                ),
                _ => (Vec::new(), Street::Preflop, false, Vec::new(), 0),
            };

        ClientGameState {
            table_id: self.id,
            players,
            community_cards,
            pot,
            side_pots: state.map(|st| calculate_side_pots(&st.players)).unwrap_or_default(),
            current_street,
            dealer_seat: state.map(|st| st.dealer_position).or(self.last_dealer),
            current_player_seat: state.and_then(|st| st.current_player),
            current_bet: state.map(|st| st.current_bet).unwrap_or(0),
            min_raise: state
                .map(|st| st.min_raise)
                .unwrap_or(self.config.blinds.big_blind),
            small_blind: self.config.blinds.small_blind,
            big_blind: self.config.blinds.big_blind,
            is_hand_in_progress: self.is_hand_in_progress,
            is_hand_complete,
            winners,
            action_timeout_at: self.pending_action.as_ref().map(|p| {
                (p.requested_at + chrono::Duration::milliseconds(p.timeout_ms as i64))
                    .timestamp_millis()
            }),
            action_timeout_ms: self.pending_action.as_ref().map(|p| p.timeout_ms),
        }
    }

    fn showdown_reveals(&self, with_names: bool) -> Vec<ShowdownReveal> {
        let Some(state) = self.game_state.as_ref() else {
            return Vec::new();
        };
        state
            .players
            .iter()
            .filter(|p| p.in_hand())
            .map(|p| {
                let hand_name = if with_names && state.community_cards.len() == 5 {
                    Some(
                        crate::cards::best_omaha_hand(&p.hole_cards, &state.community_cards)
                            .category
                            .display_name()
                            .to_string(),
                    )
                } else {
                    None
                };
                ShowdownReveal {
                    seat_index: p.seat,
                    player_id: self
                        .hand_external_ids
                        .get(&p.seat)
                        .cloned()
                        .unwrap_or_default(),
                    cards: p.hole_cards.clone(),
                    hand_name,
                }
            })
            .collect()
    }

    fn showdown_winners(&self) -> Vec<ShowdownWinner> {
        let Some(state) = self.game_state.as_ref() else {
            return Vec::new();
        };
        state
            .winners
            .iter()
            .map(|w| ShowdownWinner {
                player_id: self
                    .hand_external_ids
                    .get(&w.seat)
                    .cloned()
                    .unwrap_or_default(),
                amount: w.amount,
                hand_name: w.hand_name.clone(),
                cards: w.cards.clone(),
            })
            .collect()
    }

    fn winner_summaries(&self) -> Vec<WinnerSummary> {
        let Some(state) = self.game_state.as_ref() else {
            return Vec::new();
        };
        state
            .winners
            .iter()
            .map(|w| WinnerSummary {
                player_id: self
                    .hand_external_ids
                    .get(&w.seat)
                    .cloned()
                    .unwrap_or_default(),
                seat: w.seat,
                amount: w.amount,
                hand_name: w.hand_name.clone(),
            })
            .collect()
    }

    fn status(&self) -> TableStatus {
        TableStatus {
            table_id: self.id,
            is_fast_fold: self.config.is_fast_fold,
            is_paused: self.is_paused,
            is_hand_in_progress: self.is_hand_in_progress,
            is_run_out_in_progress: self.is_run_out_in_progress,
            seats: self
                .seats
                .occupied()
                .map(|(i, s)| SeatSummary {
                    seat: i,
                    external_id: s.external_id.clone(),
                    display_name: s.display_name.clone(),
                    chips: s.chips,
                    is_connected: s.is_connected(),
                    waiting_for_next_hand: s.waiting_for_next_hand,
                    left_for_fast_fold: s.left_for_fast_fold,
                })
                .collect(),
            spectators: self.spectators.count(),
            message_log: self.broadcast.recent(),
        }
    }
}
