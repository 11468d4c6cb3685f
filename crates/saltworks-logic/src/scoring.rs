//! Points, streaks, and per-level solved sets.

use crate::species::CompoundKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tunable scoring and timing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRules {
    pub first_time_points: u32,
    pub repeat_points: u32,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    pub multiplier_increment: f64,
    pub max_attempts: u32,
    pub countdown_seconds: u32,
    pub warning_threshold: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            first_time_points: 100,
            repeat_points: 50,
            min_multiplier: 1.0,
            max_multiplier: 3.0,
            multiplier_increment: 0.25,
            max_attempts: 2,
            countdown_seconds: 9999,
            warning_threshold: 20,
        }
    }
}

impl ScoringRules {
    /// Clamp a raw multiplier into `[min, max]`; NaN and infinities become min.
    pub fn safe_multiplier(&self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return self.min_multiplier;
        }
        raw.clamp(self.min_multiplier, self.max_multiplier.max(self.min_multiplier))
    }
}

/// Session progress: score, streak, and which compounds have been solved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressTracker {
    pub score: u64,
    pub streak_count: u32,
    pub best_streak: u32,
    streak_multiplier: f64,
    /// Rounds started this session, beginning at 1.
    pub round: u32,
    session_completed: BTreeSet<CompoundKey>,
    current_level_solved: BTreeSet<CompoundKey>,
    mastered_focus: BTreeSet<CompoundKey>,
}

impl ProgressTracker {
    pub fn new(rules: &ScoringRules) -> Self {
        Self {
            score: 0,
            streak_count: 0,
            best_streak: 0,
            streak_multiplier: rules.min_multiplier,
            round: 1,
            session_completed: BTreeSet::new(),
            current_level_solved: BTreeSet::new(),
            mastered_focus: BTreeSet::new(),
        }
    }

    pub fn multiplier(&self, rules: &ScoringRules) -> f64 {
        rules.safe_multiplier(self.streak_multiplier)
    }

    /// Base points before the multiplier.
    pub fn base_points(&self, key: &CompoundKey, rules: &ScoringRules) -> u32 {
        if self.session_completed.contains(key) {
            rules.repeat_points
        } else {
            rules.first_time_points
        }
    }

    /// Apply a full challenge success. Returns the points awarded.
    pub fn record_correct(&mut self, key: &CompoundKey, rules: &ScoringRules) -> u32 {
        let base = self.base_points(key, rules);
        let multiplier = self.multiplier(rules);
        let points = (base as f64 * multiplier).round() as u32;
        self.score += points as u64;

        self.streak_count += 1;
        self.best_streak = self.best_streak.max(self.streak_count);
        self.streak_multiplier = rules.safe_multiplier(multiplier + rules.multiplier_increment);

        self.session_completed.insert(key.clone());
        self.mastered_focus.insert(key.clone());
        self.current_level_solved.insert(key.clone());
        points
    }

    /// A wrong sub-answer or a give-up.
    pub fn record_incorrect(&mut self, rules: &ScoringRules) {
        self.streak_count = 0;
        self.streak_multiplier = rules.min_multiplier;
    }

    /// Forget the per-level sets when the active level changes.
    pub fn enter_level(&mut self) {
        self.current_level_solved.clear();
        self.mastered_focus.clear();
    }

    pub fn advance_round(&mut self) {
        self.round += 1;
    }

    /// Rounds actually played, for the session summary.
    pub fn rounds_played(&self) -> u32 {
        self.round.saturating_sub(1).max(1)
    }

    pub fn session_completed(&self) -> &BTreeSet<CompoundKey> {
        &self.session_completed
    }

    pub fn current_level_solved(&self) -> &BTreeSet<CompoundKey> {
        &self.current_level_solved
    }

    pub fn mastered_focus(&self) -> &BTreeSet<CompoundKey> {
        &self.mastered_focus
    }

    pub fn is_mastered(&self, key: &CompoundKey) -> bool {
        self.mastered_focus.contains(key)
    }
}
