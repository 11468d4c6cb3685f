//! Integration tests against the shipped `data/` catalog.
//!
//! Exercises: ions + pairings + levels → Catalog → focus compounds
//! → requirements → board token lists → solvability.
//!
//! All tests are pure logic: the JSON is compiled in, no engine, no timers.

use rand::rngs::StdRng;
use rand::SeedableRng;
use saltworks_logic::board::BOARD_SLOTS;
use saltworks_logic::catalog::{Catalog, LevelDefinition};
use saltworks_logic::challenge::{build_challenge, MAX_OPTIONS};
use saltworks_logic::chemistry::stoichiometric_counts;
use saltworks_logic::generator::{
    build_token_list, calculate_required_board_size, mandatory_tokens,
    select_priority_focus_compounds, validate_board_has_focus_compounds, PRIORITY_COUNT,
};
use saltworks_logic::requirements::{requirements_for_level, unmet_requirements};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

// ── Helpers ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LevelFile {
    #[serde(rename = "GameDifficultyLevels")]
    levels: Vec<LevelDefinition>,
}

fn shipped_catalog() -> Catalog {
    let ions = serde_json::from_str(include_str!("../../../data/ions.json")).unwrap();
    let pairings = serde_json::from_str(include_str!("../../../data/compound_pairings.json")).unwrap();
    let levels: LevelFile = serde_json::from_str(include_str!("../../../data/levels.json")).unwrap();
    let level_species =
        serde_json::from_str(include_str!("../../../data/level_species.json")).unwrap();
    let mut catalog = Catalog::from_parts(ions, pairings, levels.levels, level_species).unwrap();
    let hints: BTreeMap<String, String> =
        serde_json::from_str(include_str!("../../../data/species_html.json")).unwrap();
    catalog.merge_html_hints(&hints);
    catalog
}

fn level_numbers(catalog: &Catalog) -> Vec<u32> {
    catalog.levels().iter().map(|l| l.level).collect()
}

// ── Catalog integrity ──────────────────────────────────────────────────

#[test]
fn shipped_catalog_loads_without_warnings() {
    let catalog = shipped_catalog();
    assert!(catalog.warnings().is_empty(), "{:?}", catalog.warnings());
    assert_eq!(catalog.first_level(), Some(1));
    assert!(catalog.pairing_count() > 40);
}

#[test]
fn every_level_symbol_has_a_species() {
    let catalog = shipped_catalog();
    for level in catalog.levels() {
        for symbol in level.cations.iter().chain(&level.anions) {
            assert!(
                catalog.species(symbol).is_some(),
                "level {} symbol {} has no species",
                level.level,
                symbol
            );
        }
    }
}

#[test]
fn every_focus_key_has_a_pairing() {
    let catalog = shipped_catalog();
    for level in level_numbers(&catalog) {
        let focus = catalog.focus_compounds(level);
        assert!(focus.len() >= PRIORITY_COUNT, "level {} focus too small", level);
        for f in focus {
            assert!(catalog.pairing(&f.key).is_some(), "{} missing", f.key);
        }
    }
}

#[test]
fn checklist_matches_focus_compounds() {
    let catalog = shipped_catalog();
    for level in level_numbers(&catalog) {
        let focus: BTreeSet<String> = catalog
            .focus_compounds(level)
            .iter()
            .map(|f| f.key.to_string())
            .collect();
        let checklist: BTreeSet<String> = catalog
            .level_checklist(level)
            .iter()
            .map(|e| e.key.clone())
            .collect();
        assert_eq!(focus, checklist, "level {}", level);
    }
}

#[test]
fn pairings_are_stoichiometrically_neutral() {
    let catalog = shipped_catalog();
    for pairing in catalog.pairings() {
        let cation = catalog.species(&pairing.cation).unwrap();
        let anion = catalog.species(&pairing.anion).unwrap();
        let s = stoichiometric_counts(cation.charge_magnitude, anion.charge_magnitude);
        assert_eq!(s.cations * cation.charge_magnitude, s.lcm);
        assert_eq!(s.anions * anion.charge_magnitude, s.lcm);
    }
}

#[test]
fn curated_challenges_match_pairings() {
    let catalog = shipped_catalog();
    let mut rng = StdRng::seed_from_u64(3);
    for pairing in catalog.pairings() {
        let cation = catalog.species(&pairing.cation).unwrap();
        let anion = catalog.species(&pairing.anion).unwrap();
        let challenge = build_challenge(cation, anion, Some(pairing), 1, &mut rng).unwrap();
        assert_eq!(Some(challenge.correct_formula.as_str()), pairing.correct.formula.as_deref());
        assert!(challenge.formula_options.len() <= MAX_OPTIONS);
        assert!(challenge.name_options.len() <= MAX_OPTIONS);
    }
}

#[test]
fn unpaired_ions_use_fallback_options() {
    let catalog = shipped_catalog();
    let mut rng = StdRng::seed_from_u64(5);
    let sodium = catalog.species("Na+").unwrap();
    let iodide = catalog.species("I-").unwrap();
    let challenge = build_challenge(sodium, iodide, None, 1, &mut rng).unwrap();
    assert_eq!(challenge.correct_formula, "NaI");
    assert_eq!(challenge.correct_name, "sodium iodide");
    assert_eq!(challenge.formula_options.len(), MAX_OPTIONS);
    assert_eq!(challenge.name_options.len(), MAX_OPTIONS);
}

#[test]
fn species_html_hints_merge_only_plain_markup() {
    let catalog = shipped_catalog();
    let hydroxide = catalog.species("OH-").unwrap();
    assert_eq!(hydroxide.html.as_deref(), Some("OH<sup>−</sup>"));
    let sodium = catalog.species("Na+").unwrap();
    assert_eq!(sodium.html.as_deref(), Some("Na<sup>+</sup>"));
}

// ── Requirements ───────────────────────────────────────────────────────

#[test]
fn every_requirement_is_satisfiable_by_focus() {
    let catalog = shipped_catalog();
    for level in level_numbers(&catalog) {
        let focus = catalog.focus_compounds(level);
        for req in requirements_for_level(level) {
            assert!(
                focus.iter().any(|f| req.matches(&f.key)),
                "level {} requirement {} unreachable",
                level,
                req.label()
            );
        }
    }
}

// ── Board generation ───────────────────────────────────────────────────

#[test]
fn fresh_boards_are_solvable_across_seeds() {
    let catalog = shipped_catalog();
    for level in level_numbers(&catalog) {
        let focus = catalog.focus_compounds(level);
        let unmet = unmet_requirements(level, &BTreeSet::new());
        let ions: Vec<String> = catalog
            .level_cations(level)
            .into_iter()
            .chain(catalog.level_anions(level))
            .collect();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let priority =
                select_priority_focus_compounds(&focus, &unmet, &BTreeSet::new(), PRIORITY_COUNT, &mut rng);
            let target = calculate_required_board_size(&priority, &catalog).max(8);
            let mandatory = mandatory_tokens(&priority, &catalog);
            let tokens = build_token_list(&mandatory, &ions, target, &mut rng);

            assert!(tokens.len() <= BOARD_SLOTS);
            assert_eq!(tokens.len(), target);
            assert!(
                validate_board_has_focus_compounds(&tokens, &priority, &catalog, priority.len()),
                "level {} seed {} unsolvable: {:?}",
                level,
                seed,
                tokens
            );
        }
    }
}

#[test]
fn priority_compounds_cover_unmet_requirements() {
    let catalog = shipped_catalog();
    let focus = catalog.focus_compounds(2);
    let unmet = unmet_requirements(2, &BTreeSet::new());
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let priority = select_priority_focus_compounds(&focus, &unmet, &BTreeSet::new(), 3, &mut rng);
        assert_eq!(priority.len(), 3);
        assert!(priority.iter().all(|p| unmet.iter().any(|r| r.matches(&p.key))));
    }
}
