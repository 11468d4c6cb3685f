//! The open challenge and its two quiz tracks.
//!
//! A challenge is `Active` until both tracks are solved (`Succeeded`) or a
//! track runs out of attempts, the player gives up, or time expires
//! (`Failed`). Scoring side effects are applied by the engine; this module
//! only tracks attempts, disabled options, and the message to show.

use crate::events::FailReason;
use saltworks_logic::challenge::{Challenge, Feedback, QuizTrack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const FORMULA_SOLVED_MESSAGE: &str = "Formula locked in. Now choose the correct name.";
pub const NAME_SOLVED_MESSAGE: &str = "Name locked in. Great work!";
pub const RETRY_MESSAGE: &str = "Not quite. Give it another shot.";
pub const EXHAUSTED_MESSAGE: &str = "Attempts exhausted. Revealing the correct answers.";
pub const TIME_UP_MESSAGE: &str = "Time is up!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Active,
    Succeeded,
    Failed,
}

/// Attempts on one quiz track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackProgress {
    pub attempts: u32,
    pub solved: bool,
    /// Wrong options already picked.
    pub disabled: BTreeSet<String>,
}

impl TrackProgress {
    pub fn tries_remaining(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }
}

/// Result of picking one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionOutcome {
    /// The track is solved. `points` is set when this completed the challenge.
    Correct {
        track: QuizTrack,
        points: Option<u32>,
    },
    /// Wrong, with tries left on this track.
    Retry { tries_remaining: u32 },
    /// Wrong, and the track is out of tries. The challenge has failed.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChallenge {
    pub challenge: Challenge,
    pub status: ChallengeStatus,
    pub formula: TrackProgress,
    pub name: TrackProgress,
    /// Text for the feedback area. HTML when `message_is_html`.
    pub message: Option<String>,
    pub message_is_html: bool,
    pub fail_reason: Option<FailReason>,
}

impl ActiveChallenge {
    pub fn new(challenge: Challenge) -> Self {
        Self {
            challenge,
            status: ChallengeStatus::Active,
            formula: TrackProgress::default(),
            name: TrackProgress::default(),
            message: None,
            message_is_html: false,
            fail_reason: None,
        }
    }

    pub fn track(&self, track: QuizTrack) -> &TrackProgress {
        match track {
            QuizTrack::Formula => &self.formula,
            QuizTrack::Name => &self.name,
        }
    }

    fn track_mut(&mut self, track: QuizTrack) -> &mut TrackProgress {
        match track {
            QuizTrack::Formula => &mut self.formula,
            QuizTrack::Name => &mut self.name,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ChallengeStatus::Active
    }

    pub fn both_solved(&self) -> bool {
        self.formula.solved && self.name.solved
    }

    /// Total attempts across both tracks.
    pub fn attempts(&self) -> u32 {
        self.formula.attempts + self.name.attempts
    }

    /// Mark both tracks solved without a quiz (fast mode).
    pub fn solve_instantly(&mut self) {
        self.formula.solved = true;
        self.name.solved = true;
    }

    /// Record a pick. The caller has already checked the challenge is
    /// active, the track unsolved, and the option available.
    pub fn record_choice(&mut self, track: QuizTrack, value: &str, max_attempts: u32) -> OptionOutcome {
        let correct = self.challenge.is_correct(track, value);
        let progress = self.track_mut(track);
        progress.attempts = (progress.attempts + 1).min(max_attempts);

        if correct {
            progress.solved = true;
            self.set_message(
                match track {
                    QuizTrack::Formula => FORMULA_SOLVED_MESSAGE,
                    QuizTrack::Name => NAME_SOLVED_MESSAGE,
                },
                false,
            );
            return OptionOutcome::Correct { track, points: None };
        }

        progress.disabled.insert(value.to_string());
        let tries_remaining = progress.tries_remaining(max_attempts);

        let feedback = self.challenge.feedback_for(track, value).cloned();
        match feedback {
            Some(feedback) => self.set_feedback(&feedback, tries_remaining),
            None if tries_remaining > 0 => self.set_message(RETRY_MESSAGE, false),
            None => self.set_message(EXHAUSTED_MESSAGE, false),
        }

        if tries_remaining == 0 {
            self.fail(FailReason::AttemptsExhausted, max_attempts);
            OptionOutcome::Exhausted
        } else {
            OptionOutcome::Retry { tries_remaining }
        }
    }

    /// End the challenge unsuccessfully and reveal the answers.
    pub fn fail(&mut self, reason: FailReason, max_attempts: u32) {
        if !self.is_active() {
            return;
        }
        self.status = ChallengeStatus::Failed;
        self.fail_reason = Some(reason);
        self.formula.attempts = max_attempts;
        self.name.attempts = max_attempts;
        let reveal = self.challenge.reveal_text();
        let text = match reason {
            FailReason::TimeUp => format!("{} {}", TIME_UP_MESSAGE, reveal),
            _ => reveal,
        };
        self.set_message(&text, false);
    }

    pub fn succeed(&mut self) {
        if self.is_active() {
            self.status = ChallengeStatus::Succeeded;
        }
    }

    fn set_message(&mut self, text: &str, html: bool) {
        self.message = Some(text.to_string());
        self.message_is_html = html;
    }

    fn set_feedback(&mut self, feedback: &Feedback, tries_remaining: u32) {
        let (base, html) = match (&feedback.html, &feedback.text) {
            (Some(html), _) => (html.clone(), true),
            (None, Some(text)) => (text.clone(), false),
            (None, None) => (String::new(), false),
        };
        let suffix = match (tries_remaining, html) {
            (0, _) => String::new(),
            (n, true) => format!("<br><br>Tries remaining: {}", n),
            (n, false) => format!("\n\nTries remaining: {}", n),
        };
        self.set_message(&format!("{}{}", base, suffix), html);
    }
}
