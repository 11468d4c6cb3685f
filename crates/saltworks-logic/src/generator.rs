//! Board composition algorithms.
//!
//! Everything here is pure: callers pass the catalog, the level's focus
//! compounds, and an RNG, and get token symbols back. Placement on the
//! [`crate::board::Board`] and logging happen in the engine.

use crate::catalog::{Catalog, FocusCompound};
use crate::chemistry::{group_by_charge_magnitude, stoichiometric_counts, ChargeBuckets, ChargedIon, Stoichiometry};
use crate::requirements::{meets_any, Requirement};
use crate::species::CompoundKey;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Compounds the board is built around each cycle.
pub const PRIORITY_COUNT: usize = 3;

/// Extra share of tokens added on top of the mandatory ions, in percent.
pub const DISTRACTOR_BUFFER_PERCENT: usize = 20;

/// Ion counts needed to form one unit of `key`, if both ions are known.
pub fn compound_need(catalog: &Catalog, key: &CompoundKey) -> Option<Stoichiometry> {
    let cation = catalog.species(&key.cation)?;
    let anion = catalog.species(&key.anion)?;
    Some(stoichiometric_counts(
        cation.charge_magnitude,
        anion.charge_magnitude,
    ))
}

/// Focus compounds that would satisfy an unmet requirement.
/// With no unmet requirements this is every focus compound.
pub fn requirement_candidates(focus: &[FocusCompound], unmet: &[Requirement]) -> Vec<FocusCompound> {
    if unmet.is_empty() {
        return focus.to_vec();
    }
    focus
        .iter()
        .filter(|f| meets_any(&f.key, unmet))
        .cloned()
        .collect()
}

/// Pick up to `count` compounds to guarantee on the board.
///
/// Compounds serving an unmet requirement come first, then unmastered
/// compounds, then the rest. Each tier is shuffled and no compound is
/// picked twice.
pub fn select_priority_focus_compounds(
    focus: &[FocusCompound],
    unmet: &[Requirement],
    mastered: &BTreeSet<CompoundKey>,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<FocusCompound> {
    let mut selected: Vec<FocusCompound> = Vec::new();
    if focus.is_empty() || count == 0 {
        return selected;
    }

    if !unmet.is_empty() {
        let mut required = requirement_candidates(focus, unmet);
        required.shuffle(rng);
        selected.extend(required.into_iter().take(count));
    }

    for unmastered_only in [true, false] {
        if selected.len() >= count {
            break;
        }
        let mut pool: Vec<FocusCompound> = focus
            .iter()
            .filter(|f| !unmastered_only || !mastered.contains(&f.key))
            .filter(|f| !selected.iter().any(|s| s.key == f.key))
            .cloned()
            .collect();
        pool.shuffle(rng);
        let wanted = count - selected.len();
        selected.extend(pool.into_iter().take(wanted));
    }
    selected
}

/// Tokens needed for every compound plus the distractor buffer, capped at 16.
pub fn calculate_required_board_size(compounds: &[FocusCompound], catalog: &Catalog) -> usize {
    let mandatory: usize = compounds
        .iter()
        .filter_map(|c| compound_need(catalog, &c.key))
        .map(|s| s.total() as usize)
        .sum();
    let buffered = (mandatory * (100 + DISTRACTOR_BUFFER_PERCENT) + 99) / 100;
    buffered.min(crate::board::BOARD_SLOTS)
}

/// One token per required ion of each compound, e.g. Ca2+ ×3 and PO43- ×2.
pub fn mandatory_tokens(compounds: &[FocusCompound], catalog: &Catalog) -> Vec<String> {
    let mut tokens = Vec::new();
    for compound in compounds {
        let Some(need) = compound_need(catalog, &compound.key) else {
            continue;
        };
        tokens.extend(std::iter::repeat(compound.key.cation.clone()).take(need.cations as usize));
        tokens.extend(std::iter::repeat(compound.key.anion.clone()).take(need.anions as usize));
    }
    tokens
}

/// Build exactly `target` tokens (fewer only if the level has no ions).
///
/// Mandatory ions come first, then duplicates of mandatory ions up to half of
/// the remaining room, then the level's other ions, then random repeats.
pub fn build_token_list(
    mandatory: &[String],
    level_ions: &[String],
    target: usize,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut tokens: Vec<String> = mandatory.to_vec();

    let duplicates = target.saturating_sub(tokens.len()) / 2;
    let mut shuffled = mandatory.to_vec();
    shuffled.shuffle(rng);
    tokens.extend(shuffled.into_iter().take(duplicates));

    if tokens.len() < target {
        let mut others: Vec<String> = level_ions
            .iter()
            .filter(|s| !mandatory.contains(s))
            .cloned()
            .collect();
        others.shuffle(rng);
        let room = target - tokens.len();
        tokens.extend(others.into_iter().take(room));

        while tokens.len() < target {
            match level_ions.choose(rng) {
                Some(ion) => tokens.push(ion.clone()),
                None => break,
            }
        }
    }

    tokens.truncate(target);
    tokens
}

fn count_symbols(tokens: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

/// How many of `compounds` can be formed from `tokens`.
pub fn count_satisfiable(tokens: &[String], compounds: &[FocusCompound], catalog: &Catalog) -> usize {
    let counts = count_symbols(tokens);
    compounds
        .iter()
        .filter(|c| {
            let Some(need) = compound_need(catalog, &c.key) else {
                return false;
            };
            let have_c = counts.get(c.key.cation.as_str()).copied().unwrap_or(0);
            let have_a = counts.get(c.key.anion.as_str()).copied().unwrap_or(0);
            have_c >= need.cations && have_a >= need.anions
        })
        .count()
}

/// At least `min_count` compounds must be fully formable from `tokens`.
pub fn validate_board_has_focus_compounds(
    tokens: &[String],
    compounds: &[FocusCompound],
    catalog: &Catalog,
    min_count: usize,
) -> bool {
    count_satisfiable(tokens, compounds, catalog) >= min_count
}

/// Choose `count` ions for refilling holes after a round.
///
/// Each pick favors whichever of cations/anions has been picked less so far;
/// ties pick from the whole level.
pub fn pick_replenishment_ions(
    cations: &[String],
    anions: &[String],
    count: usize,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut picked = Vec::with_capacity(count);
    let (mut n_cat, mut n_an) = (0usize, 0usize);
    if cations.is_empty() && anions.is_empty() {
        return picked;
    }
    for _ in 0..count {
        let take_cation = if n_cat < n_an && !cations.is_empty() {
            true
        } else if n_an < n_cat && !anions.is_empty() {
            false
        } else {
            rng.gen_range(0..cations.len() + anions.len()) < cations.len()
        };
        let source = if take_cation { cations } else { anions };
        if let Some(ion) = source.choose(rng) {
            picked.push(ion.clone());
            if take_cation {
                n_cat += 1;
            } else {
                n_an += 1;
            }
        }
    }
    picked
}

const BALANCING_ORDER: [i32; 6] = [3, 2, 1, -1, -2, -3];

/// Ions that move a running charge total by `needed` toward zero.
///
/// Prefers single ions that close the gap without overshooting, largest
/// magnitude first. With no such ion it pads with neutral ±1 pairs while
/// slots remain, and stops when neither is possible.
pub fn find_balancing_ions(
    buckets: &ChargeBuckets,
    needed: i32,
    max_slots: usize,
    rng: &mut impl Rng,
) -> Vec<ChargedIon> {
    let mut ions = Vec::new();
    let mut remaining = needed;

    while remaining != 0 && ions.len() < max_slots {
        let step = BALANCING_ORDER.iter().copied().find(|&charge| {
            !buckets.get(charge).is_empty()
                && ((remaining > 0 && charge > 0 && charge <= remaining)
                    || (remaining < 0 && charge < 0 && charge >= remaining))
        });
        match step {
            Some(charge) => {
                if let Some(ion) = buckets.get(charge).choose(rng) {
                    ions.push(ion.clone());
                    remaining -= charge;
                }
            }
            None => {
                let plus = buckets.get(1).choose(rng);
                let minus = buckets.get(-1).choose(rng);
                match (plus, minus) {
                    (Some(p), Some(m)) if ions.len() + 1 < max_slots => {
                        ions.push(p.clone());
                        ions.push(m.clone());
                    }
                    _ => break,
                }
            }
        }
    }
    ions
}

/// Fill `slots` holes from `pool` so the added charge approaches `target`.
///
/// Seeds one ion of each charge bucket (+1, -1, +2, -2, +3, -3) for variety,
/// balances toward `target`, then pads: a same-direction ion while still off
/// target, or a neutral ±1 pair once balanced.
pub fn select_balanced_replacement_ions(
    pool: &[ChargedIon],
    target: i32,
    slots: usize,
    rng: &mut impl Rng,
) -> Vec<ChargedIon> {
    let buckets = group_by_charge_magnitude(pool);
    let mut selected: Vec<ChargedIon> = Vec::new();
    let mut current = 0;

    for charge in [1, -1, 2, -2, 3, -3] {
        if selected.len() >= slots {
            break;
        }
        if let Some(ion) = buckets.get(charge).choose(rng) {
            current += ion.charge;
            selected.push(ion.clone());
        }
    }

    let needed = target - current;
    if needed != 0 && selected.len() < slots {
        for ion in find_balancing_ions(&buckets, needed, slots - selected.len(), rng) {
            current += ion.charge;
            selected.push(ion);
        }
    }

    while selected.len() < slots {
        let need = target - current;
        let choice: Vec<ChargedIon> = if need > 0 {
            buckets.positive().choose(rng).map(|i| vec![(*i).clone()]).unwrap_or_default()
        } else if need < 0 {
            buckets.negative().choose(rng).map(|i| vec![(*i).clone()]).unwrap_or_default()
        } else {
            match (buckets.get(1).choose(rng), buckets.get(-1).choose(rng)) {
                (Some(p), Some(m)) if selected.len() + 1 < slots => vec![p.clone(), m.clone()],
                _ => Vec::new(),
            }
        };
        if choice.is_empty() {
            break;
        }
        for ion in choice {
            current += ion.charge;
            selected.push(ion);
        }
    }
    selected
}

/// A level pairing the current tokens can form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvableCompound {
    pub key: CompoundKey,
    pub formula: String,
    pub need: Stoichiometry,
    pub available_cations: u32,
    pub available_anions: u32,
    /// Whole formula units formable at once.
    pub copies: u32,
}

/// Every focus compound formable from `tokens`, with counts.
pub fn solvable_compounds(
    tokens: &[String],
    focus: &[FocusCompound],
    catalog: &Catalog,
) -> Vec<SolvableCompound> {
    let counts = count_symbols(tokens);
    focus
        .iter()
        .filter_map(|f| {
            let need = compound_need(catalog, &f.key)?;
            let available_cations = counts.get(f.key.cation.as_str()).copied().unwrap_or(0);
            let available_anions = counts.get(f.key.anion.as_str()).copied().unwrap_or(0);
            let copies = (available_cations / need.cations).min(available_anions / need.anions);
            (copies > 0).then(|| SolvableCompound {
                key: f.key.clone(),
                formula: f.formula.clone(),
                need,
                available_cations,
                available_anions,
                copies,
            })
        })
        .collect()
}

/// Ions `tokens` lacks to form one unit of `key`, one entry per missing token.
pub fn missing_ions_for_compound(tokens: &[String], key: &CompoundKey, catalog: &Catalog) -> Vec<String> {
    let Some(need) = compound_need(catalog, key) else {
        return Vec::new();
    };
    let counts = count_symbols(tokens);
    let have_c = counts.get(key.cation.as_str()).copied().unwrap_or(0);
    let have_a = counts.get(key.anion.as_str()).copied().unwrap_or(0);
    let mut missing = Vec::new();
    missing.extend(std::iter::repeat(key.cation.clone()).take(need.cations.saturating_sub(have_c) as usize));
    missing.extend(std::iter::repeat(key.anion.clone()).take(need.anions.saturating_sub(have_a) as usize));
    missing
}
