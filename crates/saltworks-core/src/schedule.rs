//! Deferred board work.
//!
//! After a successful round the board is refilled a little later so a front
//! end can play its removal animation. Each task carries the board
//! generation it was scheduled against. A refill whose generation no longer
//! matches is dropped when it comes due. A level transition only checks that
//! the level it was scheduled from is still being played.

use serde::{Deserialize, Serialize};

/// Delay before refilling holes after a success.
pub const REPLENISH_DELAY_MS: u64 = 600;

/// Delay before switching to the next level after a level-up.
pub const LEVEL_TRANSITION_DELAY_MS: u64 = 400;

/// Ions taken off the board by the round that scheduled the task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedIons {
    pub symbols: Vec<String>,
    /// Signed charge total of the removed ions.
    pub total_charge: i32,
}

impl RemovedIons {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    Replenish { removed: RemovedIons },
    LevelTransition {
        from_level: u32,
        next_level: u32,
        removed: RemovedIons,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub due_at_ms: u64,
    pub generation: u64,
    pub action: TaskAction,
}

/// Pending tasks in scheduling order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, generation: u64, action: TaskAction) {
        self.tasks.push(ScheduledTask {
            due_at_ms: now_ms + delay_ms,
            generation,
            action,
        });
    }

    /// Remove and return every task due at `now_ms`, earliest first.
    /// Tasks due at the same time keep their scheduling order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<ScheduledTask> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.due_at_ms <= now_ms);
        self.tasks = rest;
        due.sort_by_key(|t| t.due_at_ms);
        due
    }

    pub fn pending(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
