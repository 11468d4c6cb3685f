//! Session events - what happened, for the presentation layer.
//!
//! The engine records an event for every outcome a front end would react to
//! (a board redraw, a flash message, a celebration, the end-of-session
//! summary). Front ends drain the log once per frame.

use saltworks_logic::species::CompoundKey;
use serde::{Deserialize, Serialize};

/// Why a challenge ended without success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    /// A quiz track ran out of attempts
    AttemptsExhausted,
    /// The player closed the challenge before finishing
    Abandoned,
    /// The session countdown reached zero
    TimeUp,
}

/// Types of events the engine emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    /// A level board was built from scratch
    BoardGenerated {
        level: u32,
        generation: u64,
        tokens: usize,
        fill_target: usize,
    },
    /// Holes were refilled after a round
    BoardReplenished {
        added: Vec<String>,
        fill_target: usize,
        regenerated: bool,
    },
    /// A submission failed a chemistry check or had no challenge
    SelectionRejected { message: String },
    ChallengeStarted { key: CompoundKey },
    ChallengeSucceeded { key: CompoundKey, points: u32 },
    ChallengeFailed { key: CompoundKey, reason: FailReason },
    LevelUp { from: u32, to: u32 },
    /// The countdown expired
    SessionEnded {
        score: u64,
        best_streak: u32,
        rounds: u32,
    },
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Unique event ID
    pub id: u32,
    /// Engine clock when the event happened (ms)
    pub at_ms: u64,
    pub kind: GameEventKind,
}

/// Pending events, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<GameEvent>,
    /// Next event ID
    next_id: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and return its ID
    pub fn push(&mut self, at_ms: u64, kind: GameEventKind) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(GameEvent { id, at_ms, kind });
        id
    }

    /// Events not yet drained
    pub fn pending(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_across_drains() {
        let mut log = EventLog::new();
        let a = log.push(0, GameEventKind::LevelUp { from: 1, to: 2 });
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());

        let b = log.push(10, GameEventKind::LevelUp { from: 2, to: 3 });
        assert!(b > a);
        assert_eq!(log.pending()[0].at_ms, 10);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let kind = GameEventKind::SessionEnded {
            score: 250,
            best_streak: 2,
            rounds: 3,
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains(r#""type":"session_ended""#));
        assert!(json.contains(r#""rounds":3"#));
    }
}
