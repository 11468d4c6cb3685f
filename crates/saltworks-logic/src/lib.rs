//! Pure game rules for Saltworks, an ionic-compound naming game.
//!
//! This crate contains all game logic that is independent of timers, I/O, or
//! presentation. Functions take plain data (and an RNG where randomness is
//! involved) and return results, so they are unit-testable and can be driven
//! by the session engine, the headless harness, or any future front end.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`board`] | 16-slot token arena with stable token ids and a fill target |
//! | [`catalog`] | Ion, pairing, and level records; species library; focus compounds |
//! | [`challenge`] | Formula/name quiz construction with curated or procedural distractors |
//! | [`chemistry`] | Charge parsing, GCD/LCM stoichiometry, charge buckets, formula text |
//! | [`generator`] | Priority compounds, board sizing, token lists, solvability, refills |
//! | [`requirements`] | Ion groups, per-level requirements, level-up gating |
//! | [`scoring`] | Points, streak multiplier, solved/mastered sets |
//! | [`selection`] | Selected tokens and the three chemistry checks |
//! | [`species`] | Ion species and `cation|anion` compound keys |

pub mod board;
pub mod catalog;
pub mod challenge;
pub mod chemistry;
pub mod generator;
pub mod requirements;
pub mod scoring;
pub mod selection;
pub mod species;
