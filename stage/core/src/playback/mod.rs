//! Playback - Running Every Character's Queue
//!
//! `play()` starts one runner per character that has something queued. Runners
//! are independent tokio tasks: different characters' steps interleave with
//! no ordering between them, while each runner walks its own queue strictly
//! in order, waiting out every delay before taking the next step.
//!
//! # Architecture
//!
//! ```text
//!                 PlaybackScheduler::play()
//!                           │
//!            Stage::begin_session()  (one session at a time)
//!                           │
//!        ┌──────────────────┼──────────────────┐
//!        │                  │                  │
//!   ┌────▼────┐        ┌────▼────┐        ┌────▼────┐
//!   │ Runner  │        │ Runner  │        │ Runner  │
//!   │  "1"    │        │  "2"    │        │  "3"    │
//!   └────┬────┘        └────┬────┘        └────┬────┘
//!        │  Stage::run_step (write lock: apply + collision scan)
//!        │  sleep(clear_after) → clear_message
//!        │  sleep(step_delay)
//!        └──────────────────┴──────────────────┘
//!                           │
//!                      PlayReport
//! ```
//!
//! # Concurrent Play
//!
//! Only one session runs at a time. What happens to a second `play()` is set
//! by [`ConcurrentPlayPolicy`]: rejected with an error (default) or skipped
//! with an empty report. Either way no character is ever driven twice.
//!
//! `play()` is cancel safe: dropping its future aborts the session's runners
//! before the session ends, and any step a runner was still taking is turned
//! away by the session generation check in [`Stage::run_step`].

mod report;
mod runner;

pub use report::{PlayReport, RunnerReport};
pub use runner::RunnerStatus;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::DEFAULT_RANDOM_EXTENT;
use crate::character::CharacterId;
use crate::events::{EventSink, StageEvent};
use crate::executor::ActionExecutor;
use crate::stage::Stage;

use runner::{Runner, RunnerHandles};

/// Default pause between two steps of one runner
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// Default lifetime of a transient message
pub const DEFAULT_TRANSIENT_MESSAGE_DURATION: Duration = Duration::from_millis(1000);

// ============================================================================
// Errors
// ============================================================================

/// Errors from starting playback
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// A Play session is already running
    #[error("a play session is already running")]
    ConcurrentPlayConflict,
}

/// Problems with a single step that do not stop the runner
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionWarning {
    /// The token is not in the action catalog
    #[error("unknown action {token:?} for character {character}")]
    UnknownAction {
        /// Character whose queue held the token
        character: CharacterId,
        /// Token as authored
        token: String,
        /// Position in the queue (`None` inside a repeat pass)
        index: Option<usize>,
    },
}

// ============================================================================
// Policies
// ============================================================================

/// What to do with `play()` while a session is running
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrentPlayPolicy {
    /// Fail with [`PlaybackError::ConcurrentPlayConflict`]
    #[default]
    Reject,
    /// Return a skipped report and change nothing
    Ignore,
}

impl ConcurrentPlayPolicy {
    /// Parse from configuration text
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" | "error" => Some(Self::Reject),
            "ignore" | "noop" | "no-op" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// How much of two colliding characters' queues changes hands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapScope {
    /// Remaining session steps and the authored queues
    #[default]
    Full,
    /// Remaining session steps only
    Pending,
}

impl SwapScope {
    /// Parse from configuration text
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Some(Self::Full),
            "pending" | "session" => Some(Self::Pending),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Playback configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Pause after every step
    pub step_delay: Duration,
    /// How long "Say Hello for 1 sec" keeps its message up
    pub transient_message_duration: Duration,
    /// Exclusive upper bound for random placement
    pub random_extent: f64,
    /// Second-`play()` policy
    pub concurrent_play: ConcurrentPlayPolicy,
    /// Collision swap scope
    pub swap_scope: SwapScope,
    /// Seed for reproducible random placement (`None` = entropy)
    pub random_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
            transient_message_duration: DEFAULT_TRANSIENT_MESSAGE_DURATION,
            random_extent: DEFAULT_RANDOM_EXTENT,
            concurrent_play: ConcurrentPlayPolicy::default(),
            swap_scope: SwapScope::default(),
            random_seed: None,
        }
    }
}

impl PlaybackConfig {
    /// Configuration with every delay set to zero (for tests and dry runs)
    #[must_use]
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            transient_message_duration: Duration::ZERO,
            ..Self::default()
        }
    }

    fn rng_for(&self, runner_index: usize) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(runner_index as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs Play sessions on a stage
pub struct PlaybackScheduler {
    stage: Arc<Stage>,
    config: PlaybackConfig,
    executor: ActionExecutor,
    events: EventSink,
    runners: Arc<DashMap<CharacterId, RunnerStatus>>,
    sessions: AtomicU64,
}

impl PlaybackScheduler {
    /// Create a scheduler for `stage`
    #[must_use]
    pub fn new(stage: Arc<Stage>, config: PlaybackConfig) -> Self {
        Self {
            executor: ActionExecutor::from_config(&config),
            stage,
            config,
            events: EventSink::disabled(),
            runners: Arc::new(DashMap::new()),
            sessions: AtomicU64::new(0),
        }
    }

    /// Send stage events to `events`
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// The stage being played
    #[must_use]
    pub fn stage(&self) -> &Arc<Stage> {
        &self.stage
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Last known status of a character's runner
    #[must_use]
    pub fn runner_status(&self, id: &CharacterId) -> Option<RunnerStatus> {
        self.runners.get(id).map(|s| *s)
    }

    /// Number of sessions started so far
    #[must_use]
    pub fn sessions_started(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Play every character's queue
    ///
    /// Resolves once every runner is idle or faulted. Unknown tokens and
    /// runner faults are reported in the [`PlayReport`], never as an error.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::ConcurrentPlayConflict`] if a session is already
    /// running and the policy is [`ConcurrentPlayPolicy::Reject`].
    pub async fn play(&self) -> Result<PlayReport, PlaybackError> {
        let Some(guard) = self.stage.begin_session() else {
            self.events.emit(StageEvent::PlayRejected);
            return match self.config.concurrent_play {
                ConcurrentPlayPolicy::Reject => {
                    tracing::warn!("Play requested while a session is running, rejecting");
                    Err(PlaybackError::ConcurrentPlayConflict)
                }
                ConcurrentPlayPolicy::Ignore => {
                    tracing::info!("Play requested while a session is running, ignoring");
                    Ok(PlayReport::skipped())
                }
            };
        };

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let participants = guard.participants().to_vec();
        let generation = guard.generation();

        tracing::info!(
            session,
            runners = participants.len(),
            "Play session started"
        );
        self.events.emit(StageEvent::PlayStarted {
            session,
            characters: participants.clone(),
        });

        self.runners.clear();
        let mut handles = RunnerHandles::default();
        for (index, id) in participants.iter().enumerate() {
            self.runners.insert(id.clone(), RunnerStatus::Idle);
            handles.spawn(Runner {
                id: id.clone(),
                generation,
                stage: Arc::clone(&self.stage),
                executor: self.executor.clone(),
                swap_scope: self.config.swap_scope,
                events: self.events.clone(),
                statuses: Arc::clone(&self.runners),
                rng: self.config.rng_for(index),
            });
        }

        let mut report = PlayReport::new(session);
        for (id, handle) in handles.iter_mut() {
            let runner_report = match handle.await {
                Ok(runner_report) => runner_report,
                Err(e) => {
                    tracing::error!(character = %id, error = %e, "Runner task failed");
                    self.runners.insert(id.clone(), RunnerStatus::Faulted);
                    self.events.emit(StageEvent::RunnerStatusChanged {
                        character: id.clone(),
                        status: RunnerStatus::Faulted,
                    });
                    RunnerReport::faulted(id.clone(), format!("runner task failed: {e}"))
                }
            };
            report.add_runner(runner_report);
        }

        drop(handles);
        drop(guard);

        tracing::info!(
            session,
            steps = report.total_steps(),
            collisions = report.collisions.len(),
            warnings = report.warning_count(),
            "Play session finished"
        );
        self.events.emit(StageEvent::PlayFinished {
            session,
            steps: report.total_steps(),
            collisions: report.collisions.len(),
        });

        Ok(report)
    }
}
