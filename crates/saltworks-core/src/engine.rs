//! Game engine - main entry point for running a play session

use crate::config::{LaunchOptions, RuntimeConfig};
use crate::countdown::Countdown;
use crate::events::{EventLog, FailReason, GameEvent, GameEventKind};
use crate::keeper::{BoardKeeper, LevelContext, ReplenishReport};
use crate::lifecycle::{ActiveChallenge, ChallengeStatus, OptionOutcome};
use crate::schedule::{
    RemovedIons, ScheduledTask, Scheduler, TaskAction, LEVEL_TRANSITION_DELAY_MS,
    REPLENISH_DELAY_MS,
};
use crate::snapshot::{ChecklistItem, DebugSnapshot, FocusStatus, HudSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use saltworks_logic::board::{Board, TokenId};
use saltworks_logic::catalog::{Catalog, FocusCompound};
use saltworks_logic::challenge::{build_challenge, ChallengeError, QuizTrack};
use saltworks_logic::chemistry::IonKind;
use saltworks_logic::generator::{missing_ions_for_compound, solvable_compounds, SolvableCompound};
use saltworks_logic::requirements::{can_level_up, progress_lines};
use saltworks_logic::scoring::{ProgressTracker, ScoringRules};
use saltworks_logic::selection::{SelectedIon, SelectionError, SelectionSet};
use saltworks_logic::species::CompoundKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a player command was refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("the session has not started")]
    SessionInactive,
    #[error("time has run out")]
    TimeExpired,
    #[error("a challenge is already open")]
    ChallengeOpen,
    #[error("no challenge is open")]
    NoChallenge,
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    #[error("Select at least two ions.")]
    SelectionTooSmall,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error("the {0:?} track is already solved")]
    TrackSolved(QuizTrack),
    #[error("the challenge is already resolved")]
    ChallengeResolved,
    #[error("{0:?} is not one of the options")]
    UnknownOption(String),
    #[error("{0:?} was already tried")]
    OptionDisabled(String),
    #[error("level {0} is not in the catalog")]
    UnknownLevel(u32),
}

/// Snapshot of a level at the moment it was completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub level: u32,
    /// Focus compounds mastered during the level
    pub mastered: Vec<CompoundKey>,
    pub archived_at_ms: u64,
}

/// Main game engine
pub struct GameEngine {
    catalog: Catalog,
    config: RuntimeConfig,
    options: LaunchOptions,
    rng: StdRng,
    progress: ProgressTracker,
    keeper: BoardKeeper,
    selection: SelectionSet,
    /// Open challenge, if any. Successes close on their own; failures
    /// stay open until `close_challenge`.
    challenge: Option<ActiveChallenge>,
    scheduler: Scheduler,
    countdown: Countdown,
    events: EventLog,
    level_history: BTreeMap<u32, LevelRecord>,
    level: u32,
    focus: Vec<FocusCompound>,
    session_active: bool,
    /// Engine clock in milliseconds
    now_ms: u64,
}

fn level_context<'a>(
    catalog: &'a Catalog,
    level: u32,
    focus: &'a [FocusCompound],
    progress: &'a ProgressTracker,
) -> LevelContext<'a> {
    LevelContext {
        catalog,
        level,
        focus,
        solved: progress.current_level_solved(),
        mastered: progress.mastered_focus(),
    }
}

impl GameEngine {
    /// Create an engine seeded from OS entropy and load the starting level
    pub fn new(catalog: Catalog, config: RuntimeConfig, options: LaunchOptions) -> Self {
        Self::with_rng(catalog, config, options, StdRng::from_entropy())
    }

    /// Deterministic engine for tests and the simulation harness
    pub fn with_seed(catalog: Catalog, config: RuntimeConfig, options: LaunchOptions, seed: u64) -> Self {
        Self::with_rng(catalog, config, options, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Catalog, config: RuntimeConfig, options: LaunchOptions, rng: StdRng) -> Self {
        let level = initial_level(&catalog, options.level);
        let progress = ProgressTracker::new(&config.scoring_rules);
        let countdown = Countdown::new(
            config.scoring_rules.countdown_seconds,
            config.scoring_rules.warning_threshold,
        );
        let mut engine = Self {
            catalog,
            config,
            options,
            rng,
            progress,
            keeper: BoardKeeper::new(),
            selection: SelectionSet::new(),
            challenge: None,
            scheduler: Scheduler::new(),
            countdown,
            events: EventLog::new(),
            level_history: BTreeMap::new(),
            level,
            focus: Vec::new(),
            session_active: false,
            now_ms: 0,
        };
        engine.load_level(level);
        engine
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Start the countdown and accept input
    pub fn start_session(&mut self) {
        if self.session_active {
            return;
        }
        self.session_active = true;
        self.countdown.reset();
        self.countdown.start();
        log::info!(
            "session started at level {} ({}s on the clock)",
            self.level,
            self.countdown.total()
        );
    }

    /// Tap a board slot. Returns true if the token is now selected.
    pub fn toggle_selection(&mut self, slot: usize) -> Result<bool, CommandError> {
        self.ensure_board_input()?;
        let token = self
            .keeper
            .board()
            .token_at(slot)
            .ok_or(CommandError::EmptySlot(slot))?;
        let ion = SelectedIon {
            token: token.id,
            slot,
            symbol: token.symbol.clone(),
            charge: self.catalog.ion_charge(&token.symbol),
        };
        Ok(self.selection.toggle(ion))
    }

    pub fn clear_selection(&mut self) -> Result<(), CommandError> {
        if self.challenge.is_some() {
            return Err(CommandError::ChallengeOpen);
        }
        self.selection.clear();
        Ok(())
    }

    /// Check the selection and open a challenge for it.
    ///
    /// A selection that fails a chemistry check, or has no challenge, is
    /// cleared and reported with a `SelectionRejected` event. In fast mode
    /// the challenge succeeds immediately.
    pub fn submit_selection(&mut self) -> Result<ChallengeStatus, CommandError> {
        self.ensure_board_input()?;
        if self.selection.len() < 2 {
            return Err(CommandError::SelectionTooSmall);
        }
        if let Err(e) = self.selection.validate() {
            self.reject(e.to_string());
            return Err(e.into());
        }

        let pair = match (
            self.selection.first_of(IonKind::Cation),
            self.selection.first_of(IonKind::Anion),
        ) {
            (Some(c), Some(a)) => Some((c.symbol.clone(), a.symbol.clone())),
            _ => None,
        };
        let Some((cation, anion)) = pair else {
            let e = SelectionError::MixedChargeRequired;
            self.reject(e.to_string());
            return Err(e.into());
        };

        let built = match (self.catalog.species(&cation), self.catalog.species(&anion)) {
            (Some(c), Some(a)) => {
                let key = CompoundKey::new(cation.as_str(), anion.as_str());
                build_challenge(c, a, self.catalog.pairing(&key), self.level, &mut self.rng)
            }
            _ => Err(ChallengeError::NoChallengeAvailable),
        };
        let challenge = match built {
            Ok(challenge) => challenge,
            Err(e) => {
                self.reject(e.to_string());
                return Err(e.into());
            }
        };

        let key = challenge.key.clone();
        log::info!("challenge opened: {}", key);
        self.emit(GameEventKind::ChallengeStarted { key: key.clone() });

        let mut active = ActiveChallenge::new(challenge);
        if self.options.fast_mode {
            log::debug!("fast mode: skipping quiz for {}", key);
            active.solve_instantly();
            self.challenge = Some(active);
            self.complete_success();
            return Ok(ChallengeStatus::Succeeded);
        }
        self.challenge = Some(active);
        Ok(ChallengeStatus::Active)
    }

    /// Pick an option on one quiz track
    pub fn choose_option(&mut self, track: QuizTrack, value: &str) -> Result<OptionOutcome, CommandError> {
        let max_attempts = self.config.scoring_rules.max_attempts;
        let (outcome, complete, key) = {
            let active = self.challenge.as_mut().ok_or(CommandError::NoChallenge)?;
            if !active.is_active() {
                return Err(CommandError::ChallengeResolved);
            }
            if active.track(track).solved {
                return Err(CommandError::TrackSolved(track));
            }
            if !active.challenge.has_option(track, value) {
                return Err(CommandError::UnknownOption(value.to_string()));
            }
            if active.track(track).disabled.contains(value) {
                return Err(CommandError::OptionDisabled(value.to_string()));
            }
            let outcome = active.record_choice(track, value, max_attempts);
            (outcome, active.both_solved(), active.challenge.key.clone())
        };

        match outcome {
            OptionOutcome::Correct { track, .. } if complete => {
                let points = self.complete_success();
                Ok(OptionOutcome::Correct { track, points })
            }
            OptionOutcome::Correct { .. } => Ok(outcome),
            OptionOutcome::Retry { tries_remaining } => {
                self.progress.record_incorrect(&self.config.scoring_rules);
                log::debug!("{}: wrong {:?} pick, {} tries left", key, track, tries_remaining);
                Ok(outcome)
            }
            OptionOutcome::Exhausted => {
                self.progress.record_incorrect(&self.config.scoring_rules);
                log::info!("{}: attempts exhausted", key);
                self.emit(GameEventKind::ChallengeFailed {
                    key,
                    reason: FailReason::AttemptsExhausted,
                });
                Ok(outcome)
            }
        }
    }

    /// Dismiss the challenge. Closing one still in progress counts as giving up.
    pub fn close_challenge(&mut self) -> Result<(), CommandError> {
        let max_attempts = self.config.scoring_rules.max_attempts;
        let active = self.challenge.as_mut().ok_or(CommandError::NoChallenge)?;
        if active.is_active() {
            active.fail(FailReason::Abandoned, max_attempts);
            let key = active.challenge.key.clone();
            self.progress.record_incorrect(&self.config.scoring_rules);
            log::info!("{}: challenge abandoned", key);
            self.emit(GameEventKind::ChallengeFailed {
                key,
                reason: FailReason::Abandoned,
            });
        }
        self.challenge = None;
        self.selection.clear();
        Ok(())
    }

    /// Advance the engine clock
    pub fn update(&mut self, delta_ms: u64) {
        self.now_ms += delta_ms;
        if self.countdown.advance(delta_ms) {
            self.expire();
        }
        for task in self.scheduler.take_due(self.now_ms) {
            self.run_task(task);
        }
    }

    /// Start over at the current level with a fresh score and clock
    pub fn replay(&mut self) {
        self.progress = ProgressTracker::new(&self.config.scoring_rules);
        self.countdown = Countdown::new(
            self.config.scoring_rules.countdown_seconds,
            self.config.scoring_rules.warning_threshold,
        );
        self.session_active = false;
        self.level_history.clear();
        log::info!("replaying from level {}", self.level);
        self.load_level(self.level);
    }

    /// Jump to another level. Score and streak are kept; the clock restarts.
    pub fn change_level(&mut self, level: u32) -> Result<(), CommandError> {
        if self.catalog.level(level).is_none() {
            return Err(CommandError::UnknownLevel(level));
        }
        self.countdown.reset();
        if self.session_active {
            self.countdown.start();
        }
        self.load_level(level);
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn ensure_board_input(&self) -> Result<(), CommandError> {
        if !self.session_active {
            return Err(CommandError::SessionInactive);
        }
        if self.countdown.is_expired() {
            return Err(CommandError::TimeExpired);
        }
        if self.challenge.is_some() {
            return Err(CommandError::ChallengeOpen);
        }
        Ok(())
    }

    fn emit(&mut self, kind: GameEventKind) {
        self.events.push(self.now_ms, kind);
    }

    fn reject(&mut self, message: String) {
        log::info!("selection rejected: {}", message);
        self.selection.clear();
        self.emit(GameEventKind::SelectionRejected { message });
    }

    fn load_level(&mut self, level: u32) {
        self.level = level;
        self.focus = self.catalog.focus_compounds(level);
        self.progress.enter_level();
        self.selection.clear();
        self.challenge = None;
        self.scheduler.clear();

        let ctx = level_context(&self.catalog, self.level, &self.focus, &self.progress);
        let report = self.keeper.enter_level(&ctx, &mut self.rng);
        log::info!(
            "level {} loaded: {} focus compounds, {} tokens",
            level,
            self.focus.len(),
            report.tokens
        );
        self.emit(GameEventKind::BoardGenerated {
            level,
            generation: report.generation,
            tokens: report.tokens,
            fill_target: report.fill_target,
        });
    }

    /// Score the open challenge, clear its tokens, and schedule the refill.
    fn complete_success(&mut self) -> Option<u32> {
        let mut active = self.challenge.take()?;
        active.succeed();
        let key = active.challenge.key.clone();

        let points = self.progress.record_correct(&key, &self.config.scoring_rules);
        log::info!(
            "[score] {} +{} | streak {} | x{:.2} | total {}",
            key,
            points,
            self.progress.streak_count,
            self.progress.multiplier(&self.config.scoring_rules),
            self.progress.score
        );
        self.emit(GameEventKind::ChallengeSucceeded { key, points });

        let ids: Vec<TokenId> = self.selection.entries().iter().map(|e| e.token).collect();
        let taken = self.keeper.remove_tokens(&ids);
        let removed = RemovedIons {
            total_charge: taken.iter().map(|t| self.catalog.ion_charge(&t.symbol)).sum(),
            symbols: taken.into_iter().map(|t| t.symbol).collect(),
        };
        log::debug!(
            "removed {} (total charge {})",
            removed.symbols.join(", "),
            removed.total_charge
        );
        self.selection.clear();
        self.progress.advance_round();
        self.schedule_follow_up(removed);
        Some(points)
    }

    fn schedule_follow_up(&mut self, removed: RemovedIons) {
        let generation = self.keeper.board().generation();
        if can_level_up(self.level, self.progress.current_level_solved()) {
            match self.catalog.next_level(self.level) {
                Some(next) => {
                    self.archive_level();
                    log::info!("level {} complete, moving to {}", self.level, next);
                    self.scheduler.schedule(
                        self.now_ms,
                        LEVEL_TRANSITION_DELAY_MS,
                        generation,
                        TaskAction::LevelTransition {
                            from_level: self.level,
                            next_level: next,
                            removed,
                        },
                    );
                    return;
                }
                None => log::info!("level {} complete, no further level", self.level),
            }
        }
        log::debug!("round {} ready", self.progress.round);
        self.scheduler.schedule(
            self.now_ms,
            REPLENISH_DELAY_MS,
            generation,
            TaskAction::Replenish { removed },
        );
    }

    fn archive_level(&mut self) {
        let record = LevelRecord {
            level: self.level,
            mastered: self.progress.mastered_focus().iter().cloned().collect(),
            archived_at_ms: self.now_ms,
        };
        self.level_history.insert(self.level, record);
    }

    fn run_task(&mut self, task: ScheduledTask) {
        let current = self.keeper.board().generation();
        match task.action {
            TaskAction::Replenish { .. } if task.generation != current => {
                log::debug!(
                    "dropping refill from board generation {} (now {})",
                    task.generation,
                    current
                );
                return;
            }
            TaskAction::LevelTransition { from_level, .. } if from_level != self.level => {
                log::debug!(
                    "dropping transition from level {} (now {})",
                    from_level,
                    self.level
                );
                return;
            }
            TaskAction::Replenish { removed } => {
                let ctx = level_context(&self.catalog, self.level, &self.focus, &self.progress);
                let report = self.keeper.replenish(&ctx, removed.count(), &mut self.rng);
                self.after_replenish(report);
            }
            TaskAction::LevelTransition {
                next_level,
                removed,
                ..
            } => self.transition_to(next_level, removed),
        }
        self.prune_selection();
    }

    fn transition_to(&mut self, next: u32, removed: RemovedIons) {
        let from = self.level;
        self.level = next;
        self.focus = self.catalog.focus_compounds(next);
        self.progress.enter_level();

        let ctx = level_context(&self.catalog, self.level, &self.focus, &self.progress);
        self.keeper.transition(&ctx, removed.total_charge, &mut self.rng);
        let report = self.keeper.replenish(&ctx, removed.count(), &mut self.rng);

        let rationale = self.catalog.level(next).map(|d| d.rationale.as_str()).unwrap_or("");
        log::info!("level {} -> {}: {}", from, next, rationale);
        self.emit(GameEventKind::LevelUp { from, to: next });
        self.after_replenish(report);
    }

    fn after_replenish(&mut self, report: ReplenishReport) {
        if let Some(regen) = &report.regenerated {
            self.emit(GameEventKind::BoardGenerated {
                level: self.level,
                generation: regen.generation,
                tokens: regen.tokens,
                fill_target: regen.fill_target,
            });
        }
        self.emit(GameEventKind::BoardReplenished {
            added: report.added,
            fill_target: report.fill_target,
            regenerated: report.regenerated.is_some(),
        });
    }

    /// Drop selected tokens that are no longer on the board.
    fn prune_selection(&mut self) {
        let board = self.keeper.board();
        self.selection.retain(|s| board.slot_of(s.token).is_some());
    }

    fn expire(&mut self) {
        let max_attempts = self.config.scoring_rules.max_attempts;
        let failed = match self.challenge.as_mut() {
            Some(active) if active.is_active() => {
                active.fail(FailReason::TimeUp, max_attempts);
                Some(active.challenge.key.clone())
            }
            _ => None,
        };
        if self.challenge.is_none() {
            self.selection.clear();
        }
        if let Some(key) = failed {
            self.emit(GameEventKind::ChallengeFailed {
                key,
                reason: FailReason::TimeUp,
            });
        }

        let rounds = self.progress.rounds_played();
        log::info!(
            "time expired: score {}, best streak {}, rounds {}",
            self.progress.score,
            self.progress.best_streak,
            rounds
        );
        self.emit(GameEventKind::SessionEnded {
            score: self.progress.score,
            best_streak: self.progress.best_streak,
            rounds,
        });
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn options(&self) -> LaunchOptions {
        self.options
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.config.scoring_rules
    }

    pub fn board(&self) -> &Board {
        self.keeper.board()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn active_challenge(&self) -> Option<&ActiveChallenge> {
        self.challenge.as_ref()
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn current_level(&self) -> u32 {
        self.level
    }

    pub fn focus_compounds(&self) -> &[FocusCompound] {
        &self.focus
    }

    /// Objective lines for the current level
    pub fn requirement_progress(&self) -> Vec<String> {
        progress_lines(self.level, self.progress.current_level_solved())
    }

    pub fn can_level_up(&self) -> bool {
        can_level_up(self.level, self.progress.current_level_solved())
    }

    pub fn level_checklist(&self) -> Vec<ChecklistItem> {
        self.catalog
            .level_checklist(self.level)
            .iter()
            .map(|entry| ChecklistItem {
                key: entry.key.clone(),
                formula: entry.formula.clone(),
                name: entry.name.clone(),
                solved: CompoundKey::parse(&entry.key)
                    .is_some_and(|k| self.progress.session_completed().contains(&k)),
            })
            .collect()
    }

    /// Focus compounds the board can form right now
    pub fn solvable_compounds(&self) -> Vec<SolvableCompound> {
        solvable_compounds(&self.keeper.board().symbols(), &self.focus, &self.catalog)
    }

    /// Tokens the board lacks to form one unit of `key`
    pub fn missing_ions(&self, key: &CompoundKey) -> Vec<String> {
        missing_ions_for_compound(&self.keeper.board().symbols(), key, &self.catalog)
    }

    pub fn level_history(&self) -> impl Iterator<Item = &LevelRecord> {
        self.level_history.values()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    pub fn is_expired(&self) -> bool {
        self.countdown.is_expired()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending_tasks(&self) -> &[ScheduledTask] {
        self.scheduler.pending()
    }

    pub fn events(&self) -> &[GameEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn hud(&self) -> HudSnapshot {
        let board = self.keeper.board();
        HudSnapshot {
            level: self.level,
            score: self.progress.score,
            streak: self.progress.streak_count,
            best_streak: self.progress.best_streak,
            multiplier: self.progress.multiplier(&self.config.scoring_rules),
            round: self.progress.round,
            time_left: self.countdown.remaining(),
            time_warning: self.countdown.is_warning(),
            session_active: self.session_active,
            time_expired: self.countdown.is_expired(),
            tokens_on_board: board.token_count(),
            fill_target: board.fill_target(),
        }
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let board = self.keeper.board();
        DebugSnapshot {
            hud: self.hud(),
            visible: self.config.debug_panel_visible,
            fast_mode: self.options.fast_mode,
            generation: board.generation(),
            regenerations: self.keeper.regenerations(),
            slots: board
                .slots()
                .iter()
                .map(|s| s.as_ref().map(|t| t.symbol.clone()))
                .collect(),
            focus: self
                .focus
                .iter()
                .map(|f| FocusStatus {
                    key: f.key.to_string(),
                    formula: f.formula.clone(),
                    name: f.name.clone(),
                    mastered: self.progress.is_mastered(&f.key),
                })
                .collect(),
            requirement_progress: self.requirement_progress(),
            can_level_up: self.can_level_up(),
            solvable: self.solvable_compounds(),
            pending_tasks: self.scheduler.pending().len(),
            level_history: self.level_history.values().cloned().collect(),
        }
    }
}

fn initial_level(catalog: &Catalog, requested: u32) -> u32 {
    if catalog.level(requested).is_some() {
        return requested;
    }
    let fallback = catalog.first_level().unwrap_or(requested);
    log::warn!(
        "level {} is not in the catalog, starting at level {}",
        requested,
        fallback
    );
    fallback
}
