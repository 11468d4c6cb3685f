//! Integration tests for full play sessions on the shipped catalog.
//!
//! Exercises: DataSources → Catalog → GameEngine → selection → challenge
//! → scoring → scheduled refill / level transition → countdown expiry.

use saltworks_core::config::{LaunchOptions, RuntimeConfig};
use saltworks_core::engine::{CommandError, GameEngine};
use saltworks_core::events::{FailReason, GameEventKind};
use saltworks_core::lifecycle::{ChallengeStatus, OptionOutcome, TIME_UP_MESSAGE};
use saltworks_core::loader::DataSources;
use saltworks_core::schedule::{TaskAction, LEVEL_TRANSITION_DELAY_MS, REPLENISH_DELAY_MS};
use saltworks_logic::board::BOARD_SLOTS;
use saltworks_logic::catalog::Catalog;
use saltworks_logic::challenge::QuizTrack;
use saltworks_logic::generator::compound_need;
use saltworks_logic::requirements::{meets_any, unmet_requirements};
use saltworks_logic::selection::SelectionError;
use saltworks_logic::species::CompoundKey;

// ── Helpers ────────────────────────────────────────────────────────────

fn shipped_sources() -> DataSources {
    DataSources {
        ions: include_str!("../../../data/ions.json").into(),
        pairings: Some(include_str!("../../../data/compound_pairings.json").into()),
        levels: include_str!("../../../data/levels.json").into(),
        level_species: Some(include_str!("../../../data/level_species.json").into()),
        species_html: Some(include_str!("../../../data/species_html.json").into()),
    }
}

fn shipped_catalog() -> Catalog {
    shipped_sources().load().unwrap().catalog
}

fn shipped_config() -> RuntimeConfig {
    RuntimeConfig::from_json_str(include_str!("../../../data/config.json")).unwrap()
}

fn started(level: u32, fast_mode: bool, seed: u64) -> GameEngine {
    let options = LaunchOptions { level, fast_mode };
    let mut engine = GameEngine::with_seed(shipped_catalog(), shipped_config(), options, seed);
    engine.start_session();
    engine
}

/// First seed whose opening board satisfies `accept`.
fn find_engine(level: u32, fast_mode: bool, accept: impl Fn(&GameEngine) -> bool) -> GameEngine {
    (0..500)
        .map(|seed| started(level, fast_mode, seed))
        .find(|e| accept(e))
        .expect("no seed produced a suitable board")
}

fn has_symbol(engine: &GameEngine, symbol: &str) -> bool {
    engine.board().tokens().any(|(_, t)| t.symbol == symbol)
}

fn slots_of(engine: &GameEngine, symbol: &str) -> Vec<usize> {
    engine
        .board()
        .tokens()
        .filter(|(_, t)| t.symbol == symbol)
        .map(|(slot, _)| slot)
        .collect()
}

/// Select one formula unit of `key`.
fn select_compound(engine: &mut GameEngine, key: &CompoundKey) {
    let need = compound_need(engine.catalog(), key).unwrap();
    let cations = slots_of(engine, &key.cation);
    let anions = slots_of(engine, &key.anion);
    for slot in cations.into_iter().take(need.cations as usize) {
        engine.toggle_selection(slot).unwrap();
    }
    for slot in anions.into_iter().take(need.anions as usize) {
        engine.toggle_selection(slot).unwrap();
    }
}

/// Pick what a sensible player would: a compound for an unmet requirement,
/// then something not yet solved this level, then anything.
fn choose_target(engine: &GameEngine) -> Option<CompoundKey> {
    let solvable = engine.solvable_compounds();
    let solved = engine.progress().current_level_solved();
    let unmet = unmet_requirements(engine.current_level(), solved);
    solvable
        .iter()
        .find(|s| meets_any(&s.key, &unmet))
        .or_else(|| solvable.iter().find(|s| !solved.contains(&s.key)))
        .or_else(|| solvable.first())
        .map(|s| s.key.clone())
}

fn open_sodium_chloride() -> GameEngine {
    let key = CompoundKey::new("Na+", "Cl-");
    let mut engine = find_engine(1, false, |e| has_symbol(e, "Na+") && has_symbol(e, "Cl-"));
    select_compound(&mut engine, &key);
    assert_eq!(engine.submit_selection(), Ok(ChallengeStatus::Active));
    engine
}

// ── Loading ────────────────────────────────────────────────────────────

#[test]
fn loads_shipped_data_directory() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data");
    let report = DataSources::from_dir(dir).unwrap().load().unwrap();
    assert!(report.skipped.is_empty());
    assert_eq!(report.catalog.first_level(), Some(1));
    assert!(report.catalog.pairing_count() > 40);
}

#[test]
fn shipped_config_overrides_defaults() {
    let config = shipped_config();
    assert!(!config.debug_panel_visible);
    assert_eq!(config.scoring_rules.countdown_seconds, 600);
    assert_eq!(config.scoring_rules.max_attempts, 2);
}

// ── Selection checks ───────────────────────────────────────────────────

#[test]
fn sodium_chloride_uses_curated_answers() {
    let engine = open_sodium_chloride();
    let challenge = &engine.active_challenge().unwrap().challenge;
    assert_eq!(challenge.key, CompoundKey::new("Na+", "Cl-"));
    assert_eq!(challenge.correct_formula, "NaCl");
    assert_eq!(challenge.correct_name, "sodium chloride");
    assert_eq!(challenge.difficulty, "Level 1");
    assert!(challenge.has_option(QuizTrack::Formula, "NaCl2"));
}

#[test]
fn unbalanced_calcium_chloride_is_rejected() {
    let mut engine = find_engine(2, false, |e| has_symbol(e, "Ca2+") && has_symbol(e, "Cl-"));
    let ca = slots_of(&engine, "Ca2+")[0];
    let cl = slots_of(&engine, "Cl-")[0];
    engine.toggle_selection(ca).unwrap();
    engine.toggle_selection(cl).unwrap();

    let err = engine.submit_selection().unwrap_err();
    assert!(matches!(
        err,
        CommandError::Selection(SelectionError::ChargeImbalance { net: 1, .. })
    ));
    assert!(engine.selection().is_empty());
    assert!(engine.active_challenge().is_none());

    let message = engine
        .events()
        .iter()
        .rev()
        .find_map(|e| match &e.kind {
            GameEventKind::SelectionRejected { message } => Some(message.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        message,
        "Ca2+ ion charge: 2+ | Cl- ion charge: 1- • Balance the charges."
    );
}

#[test]
fn two_cations_are_rejected() {
    let mut engine = started(1, false, 3);
    let cations: Vec<usize> = engine
        .board()
        .tokens()
        .filter(|(_, t)| engine.catalog().ion_charge(&t.symbol) > 0)
        .map(|(slot, _)| slot)
        .take(2)
        .collect();
    assert_eq!(cations.len(), 2);
    for slot in cations {
        engine.toggle_selection(slot).unwrap();
    }
    assert_eq!(
        engine.submit_selection(),
        Err(CommandError::Selection(SelectionError::MixedChargeRequired))
    );
    assert!(engine.selection().is_empty());
}

#[test]
fn toggling_twice_deselects() {
    let mut engine = started(1, false, 4);
    let slot = engine.board().tokens().next().unwrap().0;
    assert_eq!(engine.toggle_selection(slot), Ok(true));
    assert_eq!(engine.toggle_selection(slot), Ok(false));
    assert!(engine.selection().is_empty());
    assert_eq!(engine.toggle_selection(BOARD_SLOTS + 1), Err(CommandError::EmptySlot(BOARD_SLOTS + 1)));
}

// ── Challenge lifecycle ────────────────────────────────────────────────

#[test]
fn exhausted_attempts_wait_for_close() {
    let mut engine = open_sodium_chloride();
    let tokens = engine.board().token_count();

    assert_eq!(
        engine.choose_option(QuizTrack::Formula, "NaCl2"),
        Ok(OptionOutcome::Retry { tries_remaining: 1 })
    );
    assert_eq!(
        engine.choose_option(QuizTrack::Formula, "ClNa"),
        Ok(OptionOutcome::Exhausted)
    );

    let active = engine.active_challenge().unwrap();
    assert_eq!(active.status, ChallengeStatus::Failed);
    assert_eq!(
        active.message.as_deref(),
        Some("Correct formula: NaCl • Correct name: sodium chloride.")
    );
    assert_eq!(
        engine.choose_option(QuizTrack::Name, "sodium chloride"),
        Err(CommandError::ChallengeResolved)
    );
    assert_eq!(engine.submit_selection(), Err(CommandError::ChallengeOpen));

    engine.close_challenge().unwrap();
    assert!(engine.active_challenge().is_none());
    assert!(engine.selection().is_empty());
    assert_eq!(engine.board().token_count(), tokens);
    assert_eq!(engine.progress().score, 0);
    assert_eq!(engine.progress().streak_count, 0);
}

#[test]
fn unknown_option_is_refused() {
    let mut engine = open_sodium_chloride();
    assert_eq!(
        engine.choose_option(QuizTrack::Formula, "Na3Cl"),
        Err(CommandError::UnknownOption("Na3Cl".into()))
    );
    assert_eq!(engine.active_challenge().unwrap().attempts(), 0);
}

#[test]
fn streak_multiplier_grows_and_resets() {
    let mut engine = find_engine(1, true, |e| e.solvable_compounds().len() >= 2);
    for _ in 0..3 {
        let key = choose_target(&engine).unwrap();
        select_compound(&mut engine, &key);
        assert_eq!(engine.submit_selection(), Ok(ChallengeStatus::Succeeded));
        engine.update(REPLENISH_DELAY_MS);
    }
    assert_eq!(engine.progress().streak_count, 3);
    assert!((engine.hud().multiplier - 1.75).abs() < 1e-9);
    assert_eq!(engine.progress().best_streak, 3);
}

// ── Board cycle ────────────────────────────────────────────────────────

#[test]
fn fast_mode_sweep_keeps_board_invariants() {
    let mut engine = started(1, true, 42);
    let rules = engine.rules().clone();
    let mut levels_seen = vec![engine.current_level()];

    for round in 0..60 {
        let key = choose_target(&engine)
            .unwrap_or_else(|| panic!("round {}: level {} board unsolvable", round, engine.current_level()));
        select_compound(&mut engine, &key);
        assert_eq!(engine.submit_selection(), Ok(ChallengeStatus::Succeeded));
        engine.update(1000);

        let board = engine.board();
        assert!(board.token_count() <= BOARD_SLOTS);
        assert!(board.fill_target() <= BOARD_SLOTS);
        let m = engine.hud().multiplier;
        assert!(m >= rules.min_multiplier && m <= rules.max_multiplier);
        assert!(engine.pending_tasks().is_empty());
        if *levels_seen.last().unwrap() != engine.current_level() {
            levels_seen.push(engine.current_level());
        }
    }

    assert!(levels_seen.len() > 1, "never left level 1");
    assert!(levels_seen.windows(2).all(|w| w[0] < w[1]));
    assert!(engine.level_history().any(|r| r.level == 1));
    let level_ups = engine
        .events()
        .iter()
        .filter(|e| matches!(e.kind, GameEventKind::LevelUp { .. }))
        .count();
    assert_eq!(level_ups, levels_seen.len() - 1);
}

#[test]
fn level_transition_waits_for_its_delay() {
    let mut engine = started(1, true, 7);
    let mut transition = false;
    for _ in 0..40 {
        let key = choose_target(&engine).unwrap();
        select_compound(&mut engine, &key);
        engine.submit_selection().unwrap();
        if matches!(
            engine.pending_tasks().first().map(|t| &t.action),
            Some(TaskAction::LevelTransition { .. })
        ) {
            transition = true;
            break;
        }
        engine.update(REPLENISH_DELAY_MS);
    }
    assert!(transition, "never qualified for a level-up");

    engine.update(LEVEL_TRANSITION_DELAY_MS - 1);
    assert_eq!(engine.current_level(), 1);
    engine.update(1);
    assert_eq!(engine.current_level(), 2);
    assert!(engine.progress().current_level_solved().is_empty());
    assert!(!engine.solvable_compounds().is_empty());
    assert!(engine
        .events()
        .iter()
        .any(|e| matches!(e.kind, GameEventKind::LevelUp { from: 1, to: 2 })));
}

#[test]
fn checklist_marks_solved_compounds() {
    let mut engine = started(1, true, 9);
    let key = choose_target(&engine).unwrap();
    select_compound(&mut engine, &key);
    engine.submit_selection().unwrap();

    let checklist = engine.level_checklist();
    assert!(!checklist.is_empty());
    let item = checklist.iter().find(|i| i.key == key.to_string()).unwrap();
    assert!(item.solved);
    assert_eq!(checklist.iter().filter(|i| i.solved).count(), 1);
}

// ── Countdown ──────────────────────────────────────────────────────────

#[test]
fn timeout_force_fails_open_challenge() {
    let mut engine = open_sodium_chloride();
    engine.update(599_000);
    assert!(!engine.is_expired());
    assert!(engine.hud().time_warning);
    engine.update(1_000);
    assert!(engine.is_expired());

    let active = engine.active_challenge().unwrap();
    assert_eq!(active.status, ChallengeStatus::Failed);
    assert_eq!(active.fail_reason, Some(FailReason::TimeUp));
    assert!(active.message.as_deref().unwrap().starts_with(TIME_UP_MESSAGE));

    let kinds: Vec<_> = engine.drain_events().into_iter().map(|e| e.kind).collect();
    assert!(kinds.iter().any(|k| matches!(
        k,
        GameEventKind::ChallengeFailed {
            reason: FailReason::TimeUp,
            ..
        }
    )));
    assert!(matches!(
        kinds.last(),
        Some(GameEventKind::SessionEnded {
            score: 0,
            rounds: 1,
            ..
        })
    ));

    engine.close_challenge().unwrap();
    let slot = engine.board().tokens().next().unwrap().0;
    assert_eq!(engine.toggle_selection(slot), Err(CommandError::TimeExpired));
}

#[test]
fn replay_restarts_clock_at_same_level() {
    let mut engine = started(2, false, 5);
    engine.update(600_000);
    assert!(engine.is_expired());

    engine.replay();
    assert_eq!(engine.current_level(), 2);
    assert!(!engine.is_expired());
    engine.start_session();
    assert_eq!(engine.hud().time_left, 600);
    let slot = engine.board().tokens().next().unwrap().0;
    assert_eq!(engine.toggle_selection(slot), Ok(true));
}
