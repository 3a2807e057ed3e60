//! Stage Events
//!
//! Everything observable that happens during playback, for surfaces that
//! want more than polling snapshots (logs, timelines, test harnesses).
//!
//! Delivery is best-effort: events are pushed with `try_send` so a slow or
//! absent consumer never holds up a runner. Renderers that only need the
//! current picture should poll [`Stage::snapshot`](crate::stage::Stage::snapshot).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::actions::ActionToken;
use crate::character::{CharacterId, CharacterState};
use crate::collision::CollisionEvent;
use crate::playback::{ActionWarning, RunnerStatus};

/// Events from the playback engine to observers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StageEvent {
    // ============================================
    // Session Events
    // ============================================
    /// A Play session began
    PlayStarted {
        /// Session number
        session: u64,
        /// Characters that got a runner
        characters: Vec<CharacterId>,
    },

    /// A Play session ended (every runner idle or faulted)
    PlayFinished {
        /// Session number
        session: u64,
        /// Steps executed across all runners
        steps: usize,
        /// Collisions seen during the session
        collisions: usize,
    },

    /// A Play request was turned away because a session is running
    PlayRejected,

    // ============================================
    // Runner Events
    // ============================================
    /// A runner moved between states
    RunnerStatusChanged {
        /// Character the runner drives
        character: CharacterId,
        /// New status
        status: RunnerStatus,
    },

    /// A step changed (or, for unknown tokens, left) a character's state
    StepApplied {
        /// Character the step ran on
        character: CharacterId,
        /// The token executed
        token: ActionToken,
        /// Whether the step came from a repeat pass
        replay: bool,
        /// State after the step
        state: CharacterState,
    },

    /// A `Repeat` block started a repeat pass
    RepeatStarted {
        /// Character whose queue repeats
        character: CharacterId,
        /// Steps in the repeat pass
        steps: usize,
    },

    /// A transient message expired
    MessageCleared {
        /// Character whose message was cleared
        character: CharacterId,
    },

    /// A token could not be executed
    Warning(ActionWarning),

    // ============================================
    // Stage Events
    // ============================================
    /// Two characters met and (possibly) traded queues
    Collision(CollisionEvent),
}

/// Non-blocking event outlet
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<StageEvent>>,
}

impl EventSink {
    /// A sink that drops everything
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A sink that forwards to `tx`
    #[must_use]
    pub fn new(tx: mpsc::Sender<StageEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Push an event without waiting
    ///
    /// Returns true if the event was queued.
    pub fn emit(&self, event: StageEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Event channel full, dropping stage event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether anyone is listening
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_sink_drops() {
        let sink = EventSink::disabled();
        assert!(!sink.emit(StageEvent::PlayRejected));
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn test_sink_forwards() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EventSink::new(tx);
        assert!(sink.is_connected());
        assert!(sink.emit(StageEvent::PlayRejected));
        assert!(matches!(rx.recv().await, Some(StageEvent::PlayRejected)));
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = EventSink::new(tx);
        assert!(sink.emit(StageEvent::PlayRejected));
        assert!(!sink.emit(StageEvent::PlayRejected));
    }
}
