//! Serializable views of the session for HUD and debug displays.

use crate::engine::LevelRecord;
use saltworks_logic::generator::SolvableCompound;
use serde::Serialize;

/// Score strip shown during play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub level: u32,
    pub score: u64,
    pub streak: u32,
    pub best_streak: u32,
    pub multiplier: f64,
    pub round: u32,
    pub time_left: u32,
    pub time_warning: bool,
    pub session_active: bool,
    pub time_expired: bool,
    pub tokens_on_board: usize,
    pub fill_target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusStatus {
    pub key: String,
    pub formula: String,
    pub name: String,
    pub mastered: bool,
}

/// One row of the per-level species checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub key: String,
    pub formula: String,
    pub name: String,
    /// Completed at least once this session.
    pub solved: bool,
}

/// Everything the debug panel shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub hud: HudSnapshot,
    /// From `debugPanelVisible` in the runtime config.
    pub visible: bool,
    pub fast_mode: bool,
    pub generation: u64,
    pub regenerations: u32,
    /// Symbol per slot, `None` for holes.
    pub slots: Vec<Option<String>>,
    pub focus: Vec<FocusStatus>,
    pub requirement_progress: Vec<String>,
    pub can_level_up: bool,
    pub solvable: Vec<SolvableCompound>,
    pub pending_tasks: usize,
    pub level_history: Vec<LevelRecord>,
}

impl DebugSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
