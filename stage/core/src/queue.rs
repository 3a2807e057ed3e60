//! Action Queues
//!
//! [`ActionQueue`] is what the authoring surface produces for a character: an
//! ordered list of tokens, unknown ones included. It survives playback and
//! `reset()`.
//!
//! [`SessionQueue`] is the working copy a runner drains during one Play
//! session. It lives in the stage table, not in the runner, so a collision
//! swap moves the not-yet-executed steps along with it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::actions::ActionToken;

/// Ordered action tokens for one character
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionQueue {
    tokens: Vec<ActionToken>,
}

impl ActionQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from authored tokens
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ActionToken>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a dropped block
    pub fn push(&mut self, token: impl Into<ActionToken>) {
        self.tokens.push(token.into());
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether there is nothing to play
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Entries in execution order
    #[must_use]
    pub fn tokens(&self) -> &[ActionToken] {
        &self.tokens
    }

    /// Entries the catalog does not recognize, with their positions
    pub fn unknown_tokens(&self) -> impl Iterator<Item = (usize, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.verb().is_none())
            .map(|(i, t)| (i, t.as_str()))
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

impl<T: Into<ActionToken>> FromIterator<T> for ActionQueue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_tokens(iter)
    }
}

/// One step handed to a runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStep {
    /// The token to execute
    pub token: ActionToken,
    /// Position in the session queue, `None` for steps of a repeat pass
    pub index: Option<usize>,
}

impl SessionStep {
    /// Whether this step comes from a repeat pass
    #[must_use]
    pub fn is_replay(&self) -> bool {
        self.index.is_none()
    }
}

/// Play-scoped working copy of a queue
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionQueue {
    tokens: Vec<ActionToken>,
    cursor: usize,
    replay: VecDeque<ActionToken>,
}

impl SessionQueue {
    /// Start a session over `queue`
    #[must_use]
    pub fn new(queue: &ActionQueue) -> Self {
        Self {
            tokens: queue.tokens().to_vec(),
            cursor: 0,
            replay: VecDeque::new(),
        }
    }

    /// Take the next step
    ///
    /// Reaching `Repeat` returns the `Repeat` step itself and loads a repeat
    /// pass: every non-`Repeat` token of the queue as it stands now. The pass
    /// drains before the entries after `Repeat`, and is never re-expanded.
    pub fn next_step(&mut self) -> Option<SessionStep> {
        if let Some(token) = self.replay.pop_front() {
            return Some(SessionStep { token, index: None });
        }

        let token = self.tokens.get(self.cursor)?.clone();
        let index = self.cursor;
        self.cursor += 1;

        if token.is_repeat() {
            self.replay = self
                .tokens
                .iter()
                .filter(|t| !t.is_repeat())
                .cloned()
                .collect();
        }

        Some(SessionStep {
            token,
            index: Some(index),
        })
    }

    /// Steps not yet handed out (repeat pass included)
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replay.len() + self.tokens.len().saturating_sub(self.cursor)
    }

    /// Whether every step has been handed out
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
