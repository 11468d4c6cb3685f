//! Saltworks Core - Session Engine
//!
//! Drives one play session of the ionic-compound naming game: it owns the
//! catalog, the board, the player's selection, the open challenge, and the
//! session clock, and turns player commands into state changes and events.
//!
//! # Architecture
//!
//! All chemistry and board-composition rules live in `saltworks-logic`.
//! This crate adds the stateful pieces around them:
//! - **Loader**: reads the JSON catalog files into a [`saltworks_logic::catalog::Catalog`]
//! - **Keeper**: generates, replenishes, and regenerates the board
//! - **Lifecycle**: per-track attempts for the open challenge
//! - **Scheduler**: deferred board work tagged with the board generation
//! - **Engine**: commands, queries, and the `update(delta_ms)` clock
//!
//! # Example
//!
//! ```rust,no_run
//! use saltworks_core::prelude::*;
//!
//! let sources = DataSources::from_dir("data").unwrap();
//! let report = sources.load().unwrap();
//! let config = RuntimeConfig::default();
//! let options = LaunchOptions::from_query("?level=2&mode=fast");
//!
//! let mut engine = GameEngine::new(report.catalog, config, options);
//! engine.start_session();
//!
//! loop {
//!     engine.update(16); // ~60 FPS
//! }
//! ```

pub mod config;
pub mod countdown;
pub mod engine;
pub mod events;
pub mod keeper;
pub mod lifecycle;
pub mod loader;
pub mod schedule;
pub mod snapshot;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::config::{LaunchOptions, RuntimeConfig};
    pub use crate::engine::{CommandError, GameEngine};
    pub use crate::events::{GameEvent, GameEventKind};
    pub use crate::lifecycle::{ChallengeStatus, OptionOutcome};
    pub use crate::loader::{DataSources, LoadError};
    pub use saltworks_logic::challenge::QuizTrack;
}
