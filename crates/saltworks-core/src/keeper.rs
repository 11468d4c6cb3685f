//! Board keeper - owns the board and runs its generation cycle.
//!
//! The board is rebuilt from scratch when a level loads, refilled after
//! each successful round, and regenerated when a refill leaves no priority
//! compound formable. Level transitions fill the holes with a charge-balanced
//! mix of the new level's ions before the regular refill runs.

use rand::seq::SliceRandom;
use rand::Rng;
use saltworks_logic::board::{Board, BoardToken, TokenId, BOARD_SLOTS, MIN_FILL_TARGET};
use saltworks_logic::catalog::{Catalog, FocusCompound};
use saltworks_logic::generator::{
    build_token_list, calculate_required_board_size, mandatory_tokens, pick_replenishment_ions,
    requirement_candidates, select_balanced_replacement_ions, select_priority_focus_compounds,
    validate_board_has_focus_compounds, PRIORITY_COUNT,
};
use saltworks_logic::requirements::{unmet_requirements, Requirement};
use saltworks_logic::species::CompoundKey;
use serde::Serialize;
use std::collections::BTreeSet;

/// Regenerations allowed within a level before the board is forced to full size.
pub const MAX_REGENERATIONS: u32 = 20;

/// Priority compounds a fresh board must make formable.
pub const FRESH_VALIDATION_COUNT: usize = 3;

/// Priority compounds that must stay formable after a refill.
pub const REPLENISH_VALIDATION_COUNT: usize = 1;

/// Everything the keeper needs to know about the level being played.
#[derive(Debug, Clone, Copy)]
pub struct LevelContext<'a> {
    pub catalog: &'a Catalog,
    pub level: u32,
    pub focus: &'a [FocusCompound],
    /// Compounds solved since entering the level.
    pub solved: &'a BTreeSet<CompoundKey>,
    pub mastered: &'a BTreeSet<CompoundKey>,
}

impl<'a> LevelContext<'a> {
    pub fn unmet(&self) -> Vec<Requirement> {
        unmet_requirements(self.level, self.solved)
    }

    fn level_ions(&self) -> Vec<String> {
        self.catalog
            .level_cations(self.level)
            .into_iter()
            .chain(self.catalog.level_anions(self.level))
            .collect()
    }

    /// Focus compounds serving an unmet requirement, or all of them.
    fn requirement_priority(&self) -> Vec<FocusCompound> {
        let unmet = self.unmet();
        let candidates = requirement_candidates(self.focus, &unmet);
        if candidates.is_empty() {
            log::warn!(
                "level {}: no focus compound meets the unmet requirements, using all",
                self.level
            );
            return self.focus.to_vec();
        }
        candidates
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub generation: u64,
    pub priority: Vec<CompoundKey>,
    pub fill_target: usize,
    pub tokens: usize,
    /// The first token list failed validation and was rebuilt at full size.
    pub retried: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplenishReport {
    pub added: Vec<String>,
    pub fill_target: usize,
    /// Set when the refill left the board unsolvable and it was rebuilt.
    pub regenerated: Option<GenerationReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardKeeper {
    board: Board,
    /// Regenerations since the level was entered.
    regenerations: u32,
}

impl BoardKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn regenerations(&self) -> u32 {
        self.regenerations
    }

    /// Build the first board of a level.
    pub fn enter_level(&mut self, ctx: &LevelContext<'_>, rng: &mut impl Rng) -> GenerationReport {
        self.regenerations = 0;
        self.generate(ctx, true, rng)
    }

    /// Throw the board away and build a new one for the same level.
    pub fn regenerate(&mut self, ctx: &LevelContext<'_>, rng: &mut impl Rng) -> GenerationReport {
        self.regenerations += 1;
        if self.regenerations > MAX_REGENERATIONS {
            log::error!(
                "level {}: {} regenerations, forcing a full board",
                ctx.level,
                self.regenerations
            );
            self.board.raise_fill_target(BOARD_SLOTS);
        }
        self.generate(ctx, false, rng)
    }

    fn generate(&mut self, ctx: &LevelContext<'_>, fresh: bool, rng: &mut impl Rng) -> GenerationReport {
        let generation = self.board.advance_generation();
        let unmet = ctx.unmet();
        let priority =
            select_priority_focus_compounds(ctx.focus, &unmet, ctx.mastered, PRIORITY_COUNT, rng);
        log::info!(
            "[board gen {}] level {} priority: {}",
            generation,
            ctx.level,
            priority.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        let required = calculate_required_board_size(&priority, ctx.catalog);
        if fresh {
            self.board.reset_fill_target(required.max(MIN_FILL_TARGET));
        } else {
            self.board.raise_fill_target(required);
        }

        let mandatory = mandatory_tokens(&priority, ctx.catalog);
        let ions = ctx.level_ions();
        let min_count = FRESH_VALIDATION_COUNT.min(priority.len());
        let mut tokens = build_token_list(&mandatory, &ions, self.board.fill_target(), rng);
        log::debug!(
            "[board gen {}] mandatory {:?}, {} tokens (target {})",
            generation,
            mandatory,
            tokens.len(),
            self.board.fill_target()
        );

        let mut retried = false;
        if !validate_board_has_focus_compounds(&tokens, &priority, ctx.catalog, min_count) {
            log::error!("[board gen {}] validation failed after sizing", generation);
            if self.board.fill_target() < BOARD_SLOTS {
                self.board.raise_fill_target(BOARD_SLOTS);
                tokens = build_token_list(&mandatory, &ions, BOARD_SLOTS, rng);
                retried = true;
            }
        }

        self.board.clear();
        let mut slots: Vec<usize> = (0..BOARD_SLOTS).collect();
        slots.shuffle(rng);
        for (slot, symbol) in slots.into_iter().zip(tokens) {
            self.board.place(slot, symbol);
        }
        log::info!(
            "[board gen {}] complete: {} tokens",
            generation,
            self.board.token_count()
        );

        GenerationReport {
            generation,
            priority: priority.into_iter().map(|c| c.key).collect(),
            fill_target: self.board.fill_target(),
            tokens: self.board.token_count(),
            retried,
        }
    }

    /// Take tokens off the board, leaving holes.
    pub fn remove_tokens(&mut self, ids: &[TokenId]) -> Vec<BoardToken> {
        ids.iter().filter_map(|id| self.board.remove(*id)).collect()
    }

    /// Refill after a round that removed `removed_count` tokens.
    ///
    /// Adds one more token than was removed, never past 16 on the board,
    /// into empty slots in slot order. Afterwards at least one priority
    /// compound must be formable or the board is regenerated.
    pub fn replenish(
        &mut self,
        ctx: &LevelContext<'_>,
        removed_count: usize,
        rng: &mut impl Rng,
    ) -> ReplenishReport {
        let on_board = self.board.token_count();
        let to_add = (removed_count + 1).min(BOARD_SLOTS - on_board);
        self.board.raise_fill_target(self.board.fill_target() + 1);

        if !ctx.focus.is_empty() {
            let priority: Vec<FocusCompound> = ctx
                .requirement_priority()
                .into_iter()
                .take(PRIORITY_COUNT)
                .collect();
            let required = calculate_required_board_size(&priority, ctx.catalog);
            if self.board.fill_target() < required {
                self.board.raise_fill_target(required);
                log::info!(
                    "[replenish] raising board target to {} to keep compounds solvable",
                    self.board.fill_target()
                );
            }
        }

        let cations = ctx.catalog.level_cations(ctx.level);
        let anions = ctx.catalog.level_anions(ctx.level);
        if cations.is_empty() && anions.is_empty() {
            log::warn!("[replenish] no ions available for level {}", ctx.level);
            return ReplenishReport {
                added: Vec::new(),
                fill_target: self.board.fill_target(),
                regenerated: None,
            };
        }

        let empty = self.board.empty_slots();
        let picks = pick_replenishment_ions(&cations, &anions, to_add.min(empty.len()), rng);
        for (slot, symbol) in empty.into_iter().zip(&picks) {
            self.board.place(slot, symbol.clone());
        }
        log::info!(
            "[replenish] removed {}, added {}: {} (target {})",
            removed_count,
            picks.len(),
            picks.join(", "),
            self.board.fill_target()
        );

        let mut regenerated = None;
        if !ctx.focus.is_empty() {
            let priority = ctx.requirement_priority();
            let symbols = self.board.symbols();
            if !validate_board_has_focus_compounds(
                &symbols,
                &priority,
                ctx.catalog,
                REPLENISH_VALIDATION_COUNT,
            ) {
                log::warn!("[replenish] board became unsolvable, regenerating");
                regenerated = Some(self.regenerate(ctx, rng));
            }
        }

        ReplenishReport {
            added: picks,
            fill_target: self.board.fill_target(),
            regenerated,
        }
    }

    /// Start a new level on the existing board: bump the generation and fill
    /// every hole with the new level's ions, balancing the added charge
    /// toward `target_charge`.
    pub fn transition(
        &mut self,
        ctx: &LevelContext<'_>,
        target_charge: i32,
        rng: &mut impl Rng,
    ) -> Vec<String> {
        self.regenerations = 0;
        let generation = self.board.advance_generation();
        let pool = ctx.catalog.level_pool(ctx.level);
        let empty = self.board.empty_slots();
        if pool.is_empty() || empty.is_empty() {
            return Vec::new();
        }

        let mut ions = select_balanced_replacement_ions(&pool, target_charge, empty.len(), rng);
        ions.shuffle(rng);
        let mut added = Vec::with_capacity(ions.len());
        for (slot, ion) in empty.into_iter().zip(ions) {
            self.board.place(slot, ion.symbol.clone());
            added.push(ion.symbol);
        }
        log::info!(
            "[board gen {}] level {} transition: target charge {}, added {}",
            generation,
            ctx.level,
            target_charge,
            added.join(", ")
        );
        added
    }
}
