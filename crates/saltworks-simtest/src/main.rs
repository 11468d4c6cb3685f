//! Saltworks Headless Simulation Harness
//!
//! Validates the shipped catalog and plays seeded sessions in-process.
//! No rendering, no timers: the engine clock is advanced by hand.
//!
//! Usage:
//!   cargo run -p saltworks-simtest
//!   cargo run -p saltworks-simtest -- --verbose

use saltworks_core::config::{LaunchOptions, RuntimeConfig};
use saltworks_core::engine::GameEngine;
use saltworks_core::events::GameEventKind;
use saltworks_core::lifecycle::ChallengeStatus;
use saltworks_core::loader::DataSources;
use saltworks_logic::board::BOARD_SLOTS;
use saltworks_logic::catalog::Catalog;
use saltworks_logic::chemistry::stoichiometric_counts;
use saltworks_logic::generator::compound_need;
use saltworks_logic::requirements::{meets_any, requirements_for_level, unmet_requirements};
use saltworks_logic::species::CompoundKey;

// ── Shipped data (same files the engine loads from disk) ────────────────
const IONS_JSON: &str = include_str!("../../../data/ions.json");
const PAIRINGS_JSON: &str = include_str!("../../../data/compound_pairings.json");
const LEVELS_JSON: &str = include_str!("../../../data/levels.json");
const LEVEL_SPECIES_JSON: &str = include_str!("../../../data/level_species.json");
const SPECIES_HTML_JSON: &str = include_str!("../../../data/species_html.json");
const CONFIG_JSON: &str = include_str!("../../../data/config.json");

const BOARD_SEEDS: u64 = 200;
const SWEEP_SEEDS: u64 = 12;
const SWEEP_ROUNDS: usize = 80;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    println!("=== Saltworks Simulation Harness ===\n");

    let sources = DataSources {
        ions: IONS_JSON.into(),
        pairings: Some(PAIRINGS_JSON.into()),
        levels: LEVELS_JSON.into(),
        level_species: Some(LEVEL_SPECIES_JSON.into()),
        species_html: Some(SPECIES_HTML_JSON.into()),
    };
    let report = match sources.load() {
        Ok(report) => report,
        Err(e) => {
            println!("  ✗ catalog_load: {}", e);
            std::process::exit(1);
        }
    };
    let config = match RuntimeConfig::from_json_str(CONFIG_JSON) {
        Ok(config) => config,
        Err(e) => {
            println!("  ✗ config_parse: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();
    results.push(TestResult {
        name: "catalog_load".into(),
        passed: report.skipped.is_empty(),
        detail: format!(
            "{} species, {} pairings, {} levels, {} skipped files",
            report.catalog.species_count(),
            report.catalog.pairing_count(),
            report.catalog.levels().len(),
            report.skipped.len()
        ),
    });

    // 1. Catalog integrity
    results.extend(validate_catalog(&report.catalog, verbose));

    // 2. Requirements are reachable
    results.extend(validate_requirements(&report.catalog));

    // 3. Fresh boards
    results.extend(validate_fresh_boards(&report.catalog, &config));

    // 4. Fast-mode session sweep
    results.extend(validate_session_sweep(&report.catalog, &config, verbose));

    // 5. Countdown expiry
    results.extend(validate_expiry(&report.catalog, &config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn level_numbers(catalog: &Catalog) -> Vec<u32> {
    catalog.levels().iter().map(|l| l.level).collect()
}

// ── 1. Catalog Integrity ────────────────────────────────────────────────

fn validate_catalog(catalog: &Catalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Catalog Integrity ---");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "catalog_no_warnings".into(),
        passed: catalog.warnings().is_empty(),
        detail: if catalog.warnings().is_empty() {
            "no assembly warnings".into()
        } else {
            catalog.warnings().join("; ")
        },
    });

    // Every symbol a level names has a species
    let mut unknown = Vec::new();
    for def in catalog.levels() {
        for symbol in def.cations.iter().chain(&def.anions) {
            if catalog.species(symbol).is_none() {
                unknown.push(format!("L{}:{}", def.level, symbol));
            }
        }
    }
    results.push(TestResult {
        name: "catalog_level_species".into(),
        passed: unknown.is_empty(),
        detail: if unknown.is_empty() {
            "every level symbol has a species".into()
        } else {
            format!("unknown symbols: {}", unknown.join(", "))
        },
    });

    // Every level has focus compounds, each backed by a pairing
    let mut thin = Vec::new();
    for level in level_numbers(catalog) {
        let focus = catalog.focus_compounds(level);
        if focus.is_empty() || focus.iter().any(|f| catalog.pairing(&f.key).is_none()) {
            thin.push(level);
        }
        if verbose {
            println!("  level {:2}: {} focus compounds", level, focus.len());
        }
    }
    results.push(TestResult {
        name: "catalog_focus_pairings".into(),
        passed: thin.is_empty(),
        detail: if thin.is_empty() {
            "every level has paired focus compounds".into()
        } else {
            format!("levels without usable focus: {:?}", thin)
        },
    });

    // Each pairing is a cation and an anion that balance
    let mut mismatched = Vec::new();
    for pairing in catalog.pairings() {
        let (Some(cation), Some(anion)) = (
            catalog.species(&pairing.cation),
            catalog.species(&pairing.anion),
        ) else {
            continue;
        };
        let counts = stoichiometric_counts(cation.charge_magnitude, anion.charge_magnitude);
        let positive = counts.cations as i32 * cation.charge();
        let negative = counts.anions as i32 * anion.charge();
        if cation.charge() <= 0 || anion.charge() >= 0 || positive + negative != 0 {
            mismatched.push(pairing.key().to_string());
        }
    }
    results.push(TestResult {
        name: "catalog_stoichiometry".into(),
        passed: mismatched.is_empty(),
        detail: if mismatched.is_empty() {
            format!("{} pairings are charge-neutral", catalog.pairing_count())
        } else {
            format!("not neutral: {}", mismatched.join(", "))
        },
    });

    results
}

// ── 2. Requirements ─────────────────────────────────────────────────────

fn validate_requirements(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Level Requirements ---");
    let mut results = Vec::new();

    let mut unreachable = Vec::new();
    for level in level_numbers(catalog) {
        let focus = catalog.focus_compounds(level);
        for req in requirements_for_level(level) {
            if !focus.iter().any(|f| req.matches(&f.key)) {
                unreachable.push(format!("L{} {}", level, req.label()));
            }
        }
    }
    results.push(TestResult {
        name: "requirements_satisfiable".into(),
        passed: unreachable.is_empty(),
        detail: if unreachable.is_empty() {
            "every requirement matches a focus compound".into()
        } else {
            format!("unreachable: {}", unreachable.join(", "))
        },
    });

    results
}

// ── 3. Fresh Boards ─────────────────────────────────────────────────────

fn validate_fresh_boards(catalog: &Catalog, config: &RuntimeConfig) -> Vec<TestResult> {
    println!("--- Fresh Boards ---");
    let mut results = Vec::new();

    for level in level_numbers(catalog) {
        let mut failures = Vec::new();
        let mut sizes = (BOARD_SLOTS, 0);
        for seed in 0..BOARD_SEEDS {
            let options = LaunchOptions {
                level,
                fast_mode: false,
            };
            let engine = GameEngine::with_seed(catalog.clone(), config.clone(), options, seed);
            let tokens = engine.board().token_count();
            sizes = (sizes.0.min(tokens), sizes.1.max(tokens));
            let expected = engine.focus_compounds().len().min(3);
            if engine.solvable_compounds().len() < expected || tokens > BOARD_SLOTS {
                failures.push(seed);
            }
        }
        results.push(TestResult {
            name: format!("fresh_board_level_{}", level),
            passed: failures.is_empty(),
            detail: if failures.is_empty() {
                format!(
                    "{} seeds solvable, {}-{} tokens",
                    BOARD_SEEDS, sizes.0, sizes.1
                )
            } else {
                format!("{} seeds unsolvable, first {}", failures.len(), failures[0])
            },
        });
    }

    results
}

// ── 4. Session Sweep ────────────────────────────────────────────────────

/// Prefer a compound for an unmet requirement, then an unsolved one.
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

fn play_compound(engine: &mut GameEngine, key: &CompoundKey) -> bool {
    let Some(need) = compound_need(engine.catalog(), key) else {
        return false;
    };
    let pick = |symbol: &str, count: u32| -> Vec<usize> {
        engine
            .board()
            .tokens()
            .filter(|(_, t)| t.symbol == symbol)
            .map(|(slot, _)| slot)
            .take(count as usize)
            .collect()
    };
    let slots: Vec<usize> = pick(&key.cation, need.cations)
        .into_iter()
        .chain(pick(&key.anion, need.anions))
        .collect();
    for slot in slots {
        if engine.toggle_selection(slot).is_err() {
            return false;
        }
    }
    matches!(engine.submit_selection(), Ok(ChallengeStatus::Succeeded))
}

fn validate_session_sweep(catalog: &Catalog, config: &RuntimeConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Fast-Mode Session Sweep ---");
    let mut results = Vec::new();
    let rules = &config.scoring_rules;

    let mut overfull = 0;
    let mut bad_multiplier = 0;
    let mut unsolvable = 0;
    let mut failed_plays = 0;
    let mut highest = 0;
    let mut level_ups = 0;

    for seed in 0..SWEEP_SEEDS {
        let options = LaunchOptions {
            level: 1,
            fast_mode: true,
        };
        let mut engine = GameEngine::with_seed(catalog.clone(), config.clone(), options, seed);
        engine.start_session();

        for _ in 0..SWEEP_ROUNDS {
            let Some(key) = choose_target(&engine) else {
                unsolvable += 1;
                break;
            };
            if !play_compound(&mut engine, &key) {
                failed_plays += 1;
                break;
            }
            engine.update(1000);

            if engine.board().token_count() > BOARD_SLOTS {
                overfull += 1;
            }
            let m = engine.hud().multiplier;
            if m < rules.min_multiplier || m > rules.max_multiplier {
                bad_multiplier += 1;
            }
        }

        level_ups += engine
            .drain_events()
            .iter()
            .filter(|e| matches!(e.kind, GameEventKind::LevelUp { .. }))
            .count();
        highest = highest.max(engine.current_level());
        if verbose {
            let hud = engine.hud();
            println!(
                "  seed {:2}: level {:2}, score {}, best streak {}",
                seed, hud.level, hud.score, hud.best_streak
            );
            log::debug!("final debug view: {:?}", engine.debug_snapshot().to_json());
        }
    }

    results.push(TestResult {
        name: "sweep_board_size".into(),
        passed: overfull == 0,
        detail: format!("{} rounds over {} tokens", overfull, BOARD_SLOTS),
    });
    results.push(TestResult {
        name: "sweep_multiplier_bounds".into(),
        passed: bad_multiplier == 0,
        detail: format!(
            "{} rounds outside [{}, {}]",
            bad_multiplier, rules.min_multiplier, rules.max_multiplier
        ),
    });
    results.push(TestResult {
        name: "sweep_solvable_after_refill".into(),
        passed: unsolvable == 0 && failed_plays == 0,
        detail: format!(
            "{} unsolvable boards, {} rejected plays",
            unsolvable, failed_plays
        ),
    });
    results.push(TestResult {
        name: "sweep_progression".into(),
        passed: level_ups > 0,
        detail: format!("{} level-ups, highest level {}", level_ups, highest),
    });

    results
}

// ── 5. Countdown Expiry ─────────────────────────────────────────────────

fn validate_expiry(catalog: &Catalog, config: &RuntimeConfig) -> Vec<TestResult> {
    println!("--- Countdown Expiry ---");
    let mut results = Vec::new();

    let mut engine = GameEngine::with_seed(catalog.clone(), config.clone(), LaunchOptions::default(), 0);
    engine.start_session();
    let total_ms = u64::from(config.scoring_rules.countdown_seconds) * 1000;
    engine.update(total_ms);

    let ended = engine
        .events()
        .iter()
        .filter(|e| matches!(e.kind, GameEventKind::SessionEnded { .. }))
        .count();
    let first_slot = engine.board().tokens().next().map(|(slot, _)| slot);
    let locked = match first_slot {
        Some(slot) => engine.toggle_selection(slot).is_err(),
        None => true,
    };

    results.push(TestResult {
        name: "expiry_ends_session".into(),
        passed: engine.is_expired() && ended == 1 && locked,
        detail: format!(
            "expired={} session_ended_events={} board_locked={}",
            engine.is_expired(),
            ended,
            locked
        ),
    });

    results
}
