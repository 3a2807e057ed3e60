//! Play session results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ActionWarning, RunnerStatus};
use crate::character::CharacterId;
use crate::collision::CollisionEvent;

/// What one runner did during a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerReport {
    /// Character the runner drove
    pub character: CharacterId,
    /// Status when the runner stopped
    pub status: RunnerStatus,
    /// Steps taken, unknown tokens included
    pub steps_executed: usize,
    /// `Repeat` blocks met (each loads one repeat pass; not counted as steps)
    pub repeat_passes: usize,
    /// Unknown tokens met on the way
    pub warnings: Vec<ActionWarning>,
    /// Collisions this runner's steps caused
    pub collisions: Vec<CollisionEvent>,
    /// Why the runner faulted
    pub fault: Option<String>,
}

impl RunnerReport {
    pub(super) fn new(character: CharacterId) -> Self {
        Self {
            character,
            status: RunnerStatus::Idle,
            steps_executed: 0,
            repeat_passes: 0,
            warnings: Vec::new(),
            collisions: Vec::new(),
            fault: None,
        }
    }

    pub(super) fn faulted(character: CharacterId, fault: String) -> Self {
        Self {
            status: RunnerStatus::Faulted,
            fault: Some(fault),
            ..Self::new(character)
        }
    }
}

/// Outcome of one `play()` call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayReport {
    /// Session number (0 when skipped)
    pub session: u64,
    /// True when `play()` was ignored because a session was running
    pub skipped: bool,
    /// Per-runner results, by character id
    pub runners: BTreeMap<CharacterId, RunnerReport>,
    /// Every collision in the order runners reported them
    pub collisions: Vec<CollisionEvent>,
}

impl PlayReport {
    pub(super) fn new(session: u64) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    /// Report for an ignored `play()`
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub(super) fn add_runner(&mut self, runner: RunnerReport) {
        self.collisions.extend(runner.collisions.iter().cloned());
        self.runners.insert(runner.character.clone(), runner);
    }

    /// Steps taken across all runners
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.runners.values().map(|r| r.steps_executed).sum()
    }

    /// Warnings across all runners
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.runners.values().map(|r| r.warnings.len()).sum()
    }

    /// Every warning, runner by runner
    pub fn warnings(&self) -> impl Iterator<Item = &ActionWarning> {
        self.runners.values().flat_map(|r| r.warnings.iter())
    }

    /// Whether any runner faulted
    #[must_use]
    pub fn has_faults(&self) -> bool {
        self.runners
            .values()
            .any(|r| r.status == RunnerStatus::Faulted)
    }

    /// No warnings and no faults
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warning_count() == 0 && !self.has_faults()
    }

    /// Report for one character
    #[must_use]
    pub fn runner(&self, id: &CharacterId) -> Option<&RunnerReport> {
        self.runners.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_report() {
        let report = PlayReport::skipped();
        assert!(report.skipped);
        assert_eq!(report.session, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_totals() {
        let mut report = PlayReport::new(3);
        let mut cat = RunnerReport::new(CharacterId::new("1"));
        cat.steps_executed = 4;
        cat.warnings.push(ActionWarning::UnknownAction {
            character: CharacterId::new("1"),
            token: "Moonwalk".to_string(),
            index: Some(2),
        });
        report.add_runner(cat);
        report.add_runner(RunnerReport::faulted(
            CharacterId::new("2"),
            "boom".to_string(),
        ));

        assert_eq!(report.total_steps(), 4);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has_faults());
        assert!(!report.is_clean());
        assert_eq!(
            report.runner(&CharacterId::new("2")).and_then(|r| r.fault.as_deref()),
            Some("boom")
        );
    }
}
