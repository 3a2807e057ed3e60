//! Stage Core - Concurrent Sprite Playback Engine
//!
//! A handful of characters stand on a 2D stage. Each one has a queue of
//! action blocks ("Move X by 50", "Say Hello", "Repeat", ...). Pressing Play
//! runs every queue at once: one runner per character, each pacing its own
//! steps, all of them mutating one shared table. When two characters land on
//! the same non-origin spot they trade whatever is left of their queues.
//!
//! This crate is the engine only. It has no drawing code: a renderer polls
//! [`Stage::snapshot`] or listens to [`StageEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Authoring / Rendering                        │
//! │   set_action_queue · apply_manual_delta · reset · snapshot        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                         STAGE CORE                                │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │                          Stage                              │  │
//! │  │   id → (Character, CharacterState, ActionQueue, Session)    │  │
//! │  │   CollisionDetector (runs inside every step's write lock)   │  │
//! │  └───────────────────────────▲────────────────────────────────┘  │
//! │                              │ run_step                           │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │   PlaybackScheduler ── Runner × N (tokio tasks)            │  │
//! │  │        ActionExecutor (ActionVerb → StepOutcome)           │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use stage_core::{CharacterId, PlaybackConfig, PlaybackScheduler, Stage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let stage = Arc::new(Stage::with_default_cast());
//!     let cat = CharacterId::new("1");
//!     stage.set_action_queue(&cat, ["Move X by 50", "Say Hello", "Repeat"]).unwrap();
//!
//!     let scheduler = PlaybackScheduler::new(Arc::clone(&stage), PlaybackConfig::default());
//!     let report = scheduler.play().await.unwrap();
//!
//!     println!("{} steps, cat at {}", report.total_steps(),
//!         stage.character_state(&cat).unwrap().position);
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`actions`]: The action catalog (verbs, display tokens, effects)
//! - [`character`]: Character identity and visual state
//! - [`collision`]: Collision detection and swap planning
//! - [`config`]: TOML / environment / CLI configuration
//! - [`events`]: Observable playback events
//! - [`executor`]: Applies one verb and reports its pacing
//! - [`playback`]: The Play scheduler and per-character runners
//! - [`queue`]: Authored queues and session working copies
//! - [`stage`]: The shared character table

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod character;
pub mod collision;
pub mod config;
pub mod events;
pub mod executor;
pub mod playback;
pub mod queue;
pub mod stage;

// Re-exports for convenience
pub use actions::{ActionCatalog, ActionToken, ActionVerb, StepTiming};
pub use character::{default_cast, Axis, Character, CharacterId, CharacterState, Position};
pub use collision::{CollisionDetector, CollisionEvent};
pub use events::{EventSink, StageEvent};
pub use executor::{ActionExecutor, StepOutcome};
pub use queue::{ActionQueue, SessionQueue};
pub use stage::{CharacterSnapshot, Stage, StageError, StageResult, StageSnapshot};

// Playback exports
pub use playback::{
    ActionWarning, ConcurrentPlayPolicy, PlayReport, PlaybackConfig, PlaybackError,
    PlaybackScheduler, RunnerReport, RunnerStatus, SwapScope,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, StageConfigFile, StageConfigToml,
};
