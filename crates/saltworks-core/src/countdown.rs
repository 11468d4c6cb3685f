//! Session countdown, ticking once per elapsed second.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    total_seconds: u32,
    warning_threshold: u32,
    remaining: u32,
    running: bool,
    expired: bool,
    /// Milliseconds accumulated toward the next tick.
    carry_ms: u64,
}

impl Countdown {
    pub fn new(total_seconds: u32, warning_threshold: u32) -> Self {
        Self {
            total_seconds,
            warning_threshold,
            remaining: total_seconds,
            running: false,
            expired: false,
            carry_ms: 0,
        }
    }

    /// Stop and refill the time budget.
    pub fn reset(&mut self) {
        self.remaining = self.total_seconds;
        self.running = false;
        self.expired = false;
        self.carry_ms = 0;
    }

    /// Start ticking. Has no effect once expired.
    pub fn start(&mut self) {
        if !self.expired {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance the clock. Returns true only on the call that expires it.
    pub fn advance(&mut self, delta_ms: u64) -> bool {
        if !self.running {
            return false;
        }
        self.carry_ms += delta_ms;
        while self.carry_ms >= 1000 && self.remaining > 0 {
            self.carry_ms -= 1000;
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            self.carry_ms = 0;
            return true;
        }
        false
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn is_warning(&self) -> bool {
        self.remaining <= self.warning_threshold
    }
}
