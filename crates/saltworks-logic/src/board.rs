//! The 16-slot token board.
//!
//! Slots are an arena: each holds at most one token, empty slots are holes
//! left behind by removed ions. Tokens carry a [`TokenId`] that stays unique
//! for the lifetime of the board, so selections never alias a refilled slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of slots on the board and the hard cap on tokens.
pub const BOARD_SLOTS: usize = 16;

/// Fill target of a fresh board when the focus set needs fewer tokens.
pub const MIN_FILL_TARGET: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardToken {
    pub id: TokenId,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    slots: Vec<Option<BoardToken>>,
    fill_target: usize,
    generation: u64,
    next_token_id: u32,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            slots: vec![None; BOARD_SLOTS],
            fill_target: MIN_FILL_TARGET,
            generation: 0,
            next_token_id: 1,
        }
    }

    /// Current board epoch. Deferred work tagged with an older value is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn fill_target(&self) -> usize {
        self.fill_target
    }

    /// Set the target for a fresh level, clamped to the board size.
    pub fn reset_fill_target(&mut self, target: usize) {
        self.fill_target = target.min(BOARD_SLOTS);
    }

    /// Raise the target, never lowering it and never past the board size.
    pub fn raise_fill_target(&mut self, target: usize) {
        self.fill_target = self.fill_target.max(target.min(BOARD_SLOTS));
    }

    pub fn slots(&self) -> &[Option<BoardToken>] {
        &self.slots
    }

    pub fn token_at(&self, slot: usize) -> Option<&BoardToken> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slot_of(&self, id: TokenId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|t| t.id == id))
    }

    /// Occupied slots with their tokens, in slot order.
    pub fn tokens(&self) -> impl Iterator<Item = (usize, &BoardToken)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|t| (i, t)))
    }

    pub fn token_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Symbols of every token on the board, in slot order.
    pub fn symbols(&self) -> Vec<String> {
        self.tokens().map(|(_, t)| t.symbol.clone()).collect()
    }

    /// Token count per symbol.
    pub fn counts(&self) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for (_, t) in self.tokens() {
            *counts.entry(t.symbol.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn empty_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Empty every slot. Token ids keep counting up.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Put a new token in an empty slot. Returns `None` if the slot is
    /// occupied or out of range.
    pub fn place(&mut self, slot: usize, symbol: impl Into<String>) -> Option<TokenId> {
        let cell = self.slots.get_mut(slot)?;
        if cell.is_some() {
            return None;
        }
        let id = TokenId(self.next_token_id);
        self.next_token_id += 1;
        *cell = Some(BoardToken {
            id,
            symbol: symbol.into(),
        });
        Some(id)
    }

    /// Remove a token by id, leaving a hole.
    pub fn remove(&mut self, id: TokenId) -> Option<BoardToken> {
        let slot = self.slot_of(id)?;
        self.slots[slot].take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.slots().len(), BOARD_SLOTS);
        assert_eq!(board.token_count(), 0);
        assert_eq!(board.fill_target(), MIN_FILL_TARGET);
        assert_eq!(board.empty_slots().len(), BOARD_SLOTS);
    }

    #[test]
    fn test_place_and_remove() {
        let mut board = Board::new();
        let a = board.place(3, "Na+").unwrap();
        let b = board.place(5, "Cl-").unwrap();
        assert_ne!(a, b);
        assert!(board.place(3, "K+").is_none());
        assert!(board.place(BOARD_SLOTS, "K+").is_none());
        assert_eq!(board.slot_of(b), Some(5));
        assert_eq!(board.remove(a).unwrap().symbol, "Na+");
        assert!(board.token_at(3).is_none());
        assert_eq!(board.symbols(), vec!["Cl-"]);
    }

    #[test]
    fn test_token_ids_unique_after_refill() {
        let mut board = Board::new();
        let first = board.place(0, "Na+").unwrap();
        board.remove(first);
        let second = board.place(0, "Na+").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_fill_target_never_lowers_on_raise() {
        let mut board = Board::new();
        board.raise_fill_target(12);
        board.raise_fill_target(9);
        assert_eq!(board.fill_target(), 12);
        board.raise_fill_target(40);
        assert_eq!(board.fill_target(), BOARD_SLOTS);
        board.reset_fill_target(6);
        assert_eq!(board.fill_target(), 6);
    }

    #[test]
    fn test_counts() {
        let mut board = Board::new();
        board.place(0, "Na+");
        board.place(1, "Na+");
        board.place(2, "Cl-");
        let counts = board.counts();
        assert_eq!(counts["Na+"], 2);
        assert_eq!(counts["Cl-"], 1);
    }
}
