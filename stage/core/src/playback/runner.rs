//! Per-character runner
//!
//! A runner owns nothing but its character id and its pacing. Every step goes
//! through [`Stage::run_step`], which pops the next token from the session
//! queue stored in the stage, applies it and scans for collisions under one
//! write lock. The runner then waits out the step's timing before asking for
//! the next one.
//!
//! Runner tasks belong to the `play()` call that spawned them: dropping that
//! future aborts them through [`RunnerHandles`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::report::RunnerReport;
use super::SwapScope;
use crate::character::CharacterId;
use crate::events::{EventSink, StageEvent};
use crate::executor::ActionExecutor;
use crate::stage::{AppliedKind, Stage};

/// Lifecycle of one character's runner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    /// Not executing (never started, or queue drained)
    #[default]
    Idle,
    /// Working through its queue
    Running,
    /// Stopped by an internal error
    Faulted,
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Faulted => "Faulted",
        };
        f.write_str(label)
    }
}

/// Drives one character through its session queue
pub(super) struct Runner {
    pub(super) id: CharacterId,
    pub(super) generation: u64,
    pub(super) stage: Arc<Stage>,
    pub(super) executor: ActionExecutor,
    pub(super) swap_scope: SwapScope,
    pub(super) events: EventSink,
    pub(super) statuses: Arc<DashMap<CharacterId, RunnerStatus>>,
    pub(super) rng: StdRng,
}

impl Runner {
    pub(super) async fn run(mut self) -> RunnerReport {
        let mut report = RunnerReport::new(self.id.clone());
        self.set_status(RunnerStatus::Running);
        tracing::debug!(character = %self.id, "Runner started");

        loop {
            let applied = match self.stage.run_step(
                self.generation,
                &self.id,
                &self.executor,
                self.swap_scope,
                &mut self.rng,
            ) {
                Ok(Some(applied)) => applied,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(character = %self.id, error = %e, "Runner faulted");
                    self.set_status(RunnerStatus::Faulted);
                    report.status = RunnerStatus::Faulted;
                    report.fault = Some(e.to_string());
                    return report;
                }
            };
            let outcome = match applied.kind {
                AppliedKind::Repeat { steps } => {
                    report.repeat_passes += 1;
                    tracing::debug!(character = %self.id, steps, "Repeat pass loaded");
                    self.events.emit(StageEvent::RepeatStarted {
                        character: self.id.clone(),
                        steps,
                    });
                    continue;
                }
                AppliedKind::Applied(outcome) => {
                    report.steps_executed += 1;
                    outcome
                }
                AppliedKind::Unknown { outcome, warning } => {
                    tracing::warn!(
                        character = %self.id,
                        token = %applied.step.token,
                        "Skipping unknown action"
                    );
                    report.steps_executed += 1;
                    self.events.emit(StageEvent::Warning(warning.clone()));
                    report.warnings.push(warning);
                    outcome
                }
            };

            tracing::trace!(
                character = %self.id,
                token = %applied.step.token,
                position = %outcome.state.position,
                "Step applied"
            );
            self.events.emit(StageEvent::StepApplied {
                character: self.id.clone(),
                token: applied.step.token.clone(),
                replay: applied.step.is_replay(),
                state: outcome.state.clone(),
            });

            for collision in applied.collisions {
                tracing::info!(%collision, "Collision");
                self.events.emit(StageEvent::Collision(collision.clone()));
                report.collisions.push(collision);
            }

            if let Some(window) = outcome.clear_after {
                pause(window).await;
                match self.stage.clear_message(self.generation, &self.id) {
                    Ok(true) => {
                        self.events.emit(StageEvent::MessageCleared {
                            character: self.id.clone(),
                        });
                    }
                    Ok(false) => break,
                    Err(e) => {
                        tracing::error!(character = %self.id, error = %e, "Runner faulted");
                        self.set_status(RunnerStatus::Faulted);
                        report.status = RunnerStatus::Faulted;
                        report.fault = Some(e.to_string());
                        return report;
                    }
                }
            }

            pause(outcome.step_delay).await;
        }

        tracing::debug!(
            character = %self.id,
            steps = report.steps_executed,
            "Runner finished"
        );
        self.set_status(RunnerStatus::Idle);
        report
    }

    fn set_status(&self, status: RunnerStatus) {
        self.statuses.insert(self.id.clone(), status);
        self.events.emit(StageEvent::RunnerStatusChanged {
            character: self.id.clone(),
            status,
        });
    }
}

/// Spawned runners of one session, aborted when dropped
///
/// Awaiting every handle leaves nothing to abort. Dropping the owning
/// `play()` future early takes the still-running tasks down with it.
#[derive(Default)]
pub(super) struct RunnerHandles(Vec<(CharacterId, JoinHandle<RunnerReport>)>);

impl RunnerHandles {
    pub(super) fn spawn(&mut self, runner: Runner) {
        let id = runner.id.clone();
        self.0.push((id, tokio::spawn(runner.run())));
    }

    pub(super) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut (CharacterId, JoinHandle<RunnerReport>)> {
        self.0.iter_mut()
    }
}

impl Drop for RunnerHandles {
    fn drop(&mut self) {
        for (id, handle) in &self.0 {
            if !handle.is_finished() {
                tracing::debug!(character = %id, "Aborting runner");
                handle.abort();
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
