//! Stage - The Shared Character Table
//!
//! The stage is the one piece of shared mutable state in the engine. It maps
//! each [`CharacterId`] to a single entry holding the character's metadata,
//! its [`CharacterState`], its authored [`ActionQueue`] and, while a Play
//! session runs, its [`SessionQueue`]. Keeping all of these in one entry
//! means a character can never have state without a queue or the reverse.
//!
//! # Thread Safety
//!
//! The table sits behind a `parking_lot::RwLock`. Runners take the write lock
//! once per step: pop the next token, apply it to their own character, run
//! the collision scan and perform any swaps, then release. The lock is never
//! held across an `.await`. Readers ([`Stage::snapshot`]) clone under the
//! read lock, so nobody observes a half-applied step.
//!
//! # Sessions
//!
//! [`Stage::begin_session`] flips an atomic flag and hands back a
//! [`SessionGuard`]. While the guard lives, manual edits and `reset()` are
//! refused. Dropping the guard discards all session queues.
//!
//! Every session gets a new generation number. Step and clear requests carry
//! the generation they were started under, and requests from an earlier
//! session are turned away, so a runner that outlives its session can never
//! touch the next one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::{ActionToken, ActionVerb};
use crate::character::{default_cast, Axis, Character, CharacterId, CharacterState, Position};
use crate::collision::{plan_swaps, CollisionDetector, CollisionEvent};
use crate::executor::{ActionExecutor, StepOutcome};
use crate::playback::{ActionWarning, SwapScope};
use crate::queue::{ActionQueue, SessionQueue, SessionStep};

/// Errors from stage operations
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StageError {
    /// No character with this id is on stage
    #[error("no character with id {0} is on stage")]
    InvalidCharacterReference(CharacterId),

    /// A character with this id is already on stage
    #[error("a character with id {0} is already on stage")]
    DuplicateCharacter(CharacterId),

    /// The operation is not allowed while a Play session runs
    #[error("playback in progress")]
    PlaybackInProgress,

    /// Coordinate text could not be parsed
    #[error("invalid {axis} coordinate: {input:?}")]
    InvalidCoordinate {
        /// Axis being edited
        axis: Axis,
        /// Rejected input
        input: String,
    },
}

/// Result type for stage operations
pub type StageResult<T> = Result<T, StageError>;

/// One character's row in the table
#[derive(Clone, Debug)]
struct StageEntry {
    character: Character,
    state: CharacterState,
    queue: ActionQueue,
    session: Option<SessionQueue>,
}

impl StageEntry {
    fn new(character: Character) -> Self {
        Self {
            character,
            state: CharacterState::default(),
            queue: ActionQueue::new(),
            session: None,
        }
    }
}

#[derive(Debug, Default)]
struct StageInner {
    entries: BTreeMap<CharacterId, StageEntry>,
    detector: CollisionDetector,
    step_counter: u64,
    generation: u64,
}

impl StageInner {
    fn entry(&self, id: &CharacterId) -> StageResult<&StageEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| StageError::InvalidCharacterReference(id.clone()))
    }

    fn entry_mut(&mut self, id: &CharacterId) -> StageResult<&mut StageEntry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| StageError::InvalidCharacterReference(id.clone()))
    }

    /// Scan session participants and swap queues for fresh contacts
    fn check_collisions(&mut self, swap_scope: SwapScope) -> Vec<CollisionEvent> {
        let contacts = self.detector.detect(
            self.entries
                .iter()
                .filter(|(_, e)| e.session.is_some())
                .map(|(id, e)| (id, e.state.position)),
        );
        if contacts.is_empty() {
            return Vec::new();
        }

        let plan = plan_swaps(&contacts);
        let step = self.step_counter;
        let mut events = Vec::with_capacity(contacts.len());

        for (contact, swap) in contacts.into_iter().zip(plan) {
            if swap {
                self.swap_queues(&contact.first, &contact.second, swap_scope);
            }
            events.push(CollisionEvent {
                first: contact.first,
                second: contact.second,
                position: contact.position,
                swapped: swap,
                step,
            });
        }

        events
    }

    fn swap_queues(&mut self, a: &CharacterId, b: &CharacterId, swap_scope: SwapScope) {
        let (Some(mut first), Some(mut second)) = (self.entries.remove(a), self.entries.remove(b))
        else {
            return;
        };

        std::mem::swap(&mut first.session, &mut second.session);
        if swap_scope == SwapScope::Full {
            std::mem::swap(&mut first.queue, &mut second.queue);
        }

        self.entries.insert(a.clone(), first);
        self.entries.insert(b.clone(), second);
    }
}

/// What happened when a runner took one step
#[derive(Clone, Debug)]
pub struct AppliedStep {
    /// The step taken
    pub step: SessionStep,
    /// What the step did
    pub kind: AppliedKind,
    /// Collisions found after the step
    pub collisions: Vec<CollisionEvent>,
}

/// Kind of step taken
#[derive(Clone, Debug)]
pub enum AppliedKind {
    /// A catalog verb changed the state
    Applied(StepOutcome),
    /// The token was not in the catalog; state untouched
    Unknown {
        /// Pacing for the skipped step
        outcome: StepOutcome,
        /// Warning to surface
        warning: ActionWarning,
    },
    /// `Repeat` loaded a repeat pass of this many steps
    Repeat {
        /// Steps queued by the repeat pass
        steps: usize,
    },
}

/// Read-only view of one character for renderers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    /// Identifier
    pub id: CharacterId,
    /// Display name
    pub name: String,
    /// Current state
    pub state: CharacterState,
    /// Authored queue
    pub queue: ActionQueue,
    /// Steps left in the running session, if any
    pub pending_steps: Option<usize>,
}

/// Read-only view of the whole stage, taken atomically
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Characters ordered by id
    pub characters: Vec<CharacterSnapshot>,
    /// Whether a Play session was running when the snapshot was taken
    pub playing: bool,
}

impl StageSnapshot {
    /// Look up one character
    #[must_use]
    pub fn get(&self, id: &CharacterId) -> Option<&CharacterSnapshot> {
        self.characters.iter().find(|c| &c.id == id)
    }
}

/// The shared character table
#[derive(Debug, Default)]
pub struct Stage {
    inner: RwLock<StageInner>,
    playing: AtomicBool,
}

impl Stage {
    /// Create an empty stage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stage populated with `cast`
    ///
    /// Later duplicates of an id are ignored.
    #[must_use]
    pub fn with_cast(cast: impl IntoIterator<Item = Character>) -> Self {
        let stage = Self::new();
        for character in cast {
            if let Err(e) = stage.add_character(character) {
                tracing::warn!(error = %e, "Skipping character in cast");
            }
        }
        stage
    }

    /// Create a stage with the starter cast (Cat, Dog, Penguin)
    #[must_use]
    pub fn with_default_cast() -> Self {
        Self::with_cast(default_cast())
    }

    // ============================================
    // Cast Management
    // ============================================

    /// Put a character on stage with default state and an empty queue
    pub fn add_character(&self, character: Character) -> StageResult<()> {
        let mut inner = self.inner.write();
        if inner.entries.contains_key(&character.id) {
            return Err(StageError::DuplicateCharacter(character.id));
        }
        tracing::debug!(character = %character.id, name = %character.name, "Character added");
        inner
            .entries
            .insert(character.id.clone(), StageEntry::new(character));
        Ok(())
    }

    /// Take a character off stage (state and queue go with it)
    pub fn remove_character(&self, id: &CharacterId) -> StageResult<Character> {
        self.ensure_idle()?;
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .remove(id)
            .ok_or_else(|| StageError::InvalidCharacterReference(id.clone()))?;
        tracing::debug!(character = %id, "Character removed");
        Ok(entry.character)
    }

    /// Whether a character is on stage
    #[must_use]
    pub fn contains(&self, id: &CharacterId) -> bool {
        self.inner.read().entries.contains_key(id)
    }

    /// Number of characters on stage
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the stage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    // ============================================
    // Authoring
    // ============================================

    /// Replace a character's queue wholesale
    ///
    /// Tokens are not validated here; unknown ones are reported when played.
    pub fn set_action_queue<I, T>(&self, id: &CharacterId, tokens: I) -> StageResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<ActionToken>,
    {
        let queue = ActionQueue::from_tokens(tokens);
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(id)?;
        for (index, token) in queue.unknown_tokens() {
            tracing::debug!(character = %id, index, token, "Queued unrecognized action");
        }
        entry.queue = queue;
        Ok(())
    }

    /// Append one block to a character's queue
    pub fn push_action(&self, id: &CharacterId, token: impl Into<ActionToken>) -> StageResult<()> {
        let mut inner = self.inner.write();
        inner.entry_mut(id)?.queue.push(token);
        Ok(())
    }

    /// A copy of a character's authored queue
    pub fn action_queue(&self, id: &CharacterId) -> StageResult<ActionQueue> {
        Ok(self.inner.read().entry(id)?.queue.clone())
    }

    // ============================================
    // Manual Adjustment
    // ============================================

    /// Drag a character by a delta, rounding to whole units
    pub fn apply_manual_delta(&self, id: &CharacterId, dx: f64, dy: f64) -> StageResult<Position> {
        self.ensure_idle()?;
        let mut inner = self.inner.write();
        let state = &mut inner.entry_mut(id)?.state;
        let moved = state.position.offset(dx, dy);
        state.position = Position::new(moved.x.round(), moved.y.round());
        Ok(state.position)
    }

    /// Place a character at an exact position
    pub fn set_position(&self, id: &CharacterId, position: Position) -> StageResult<()> {
        self.ensure_idle()?;
        let mut inner = self.inner.write();
        inner.entry_mut(id)?.state.position = position;
        Ok(())
    }

    /// Set one coordinate from user-entered text
    pub fn set_axis_from_text(&self, id: &CharacterId, axis: Axis, input: &str) -> StageResult<f64> {
        let value = input
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| StageError::InvalidCoordinate {
                axis,
                input: input.to_string(),
            })?;

        self.ensure_idle()?;
        let mut inner = self.inner.write();
        let position = &mut inner.entry_mut(id)?.state.position;
        match axis {
            Axis::X => position.x = value,
            Axis::Y => position.y = value,
        }
        Ok(value)
    }

    /// Put every character back to its default state; queues are kept
    pub fn reset(&self) -> StageResult<()> {
        self.ensure_idle()?;
        let mut inner = self.inner.write();
        for entry in inner.entries.values_mut() {
            entry.state = CharacterState::default();
        }
        tracing::debug!(characters = inner.entries.len(), "Stage reset");
        Ok(())
    }

    // ============================================
    // Reads
    // ============================================

    /// Current state of one character
    pub fn character_state(&self, id: &CharacterId) -> StageResult<CharacterState> {
        Ok(self.inner.read().entry(id)?.state.clone())
    }

    /// Consistent copy of the whole table
    #[must_use]
    pub fn snapshot(&self) -> StageSnapshot {
        let inner = self.inner.read();
        StageSnapshot {
            characters: inner
                .entries
                .iter()
                .map(|(id, e)| CharacterSnapshot {
                    id: id.clone(),
                    name: e.character.name.clone(),
                    state: e.state.clone(),
                    queue: e.queue.clone(),
                    pending_steps: e.session.as_ref().map(SessionQueue::remaining),
                })
                .collect(),
            playing: self.is_playing(),
        }
    }

    /// Whether a Play session is running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn ensure_idle(&self) -> StageResult<()> {
        if self.is_playing() {
            Err(StageError::PlaybackInProgress)
        } else {
            Ok(())
        }
    }

    // ============================================
    // Session Plumbing (used by the scheduler)
    // ============================================

    /// Claim the stage for a Play session
    ///
    /// Returns `None` if a session is already running. On success every
    /// character with a non-empty queue gets a fresh session queue.
    pub fn begin_session(self: &Arc<Self>) -> Option<SessionGuard> {
        if self
            .playing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let mut inner = self.inner.write();
        inner.detector.reset();
        inner.step_counter = 0;
        inner.generation += 1;
        let generation = inner.generation;
        let mut participants = Vec::new();
        for (id, entry) in &mut inner.entries {
            if entry.queue.is_empty() {
                entry.session = None;
            } else {
                entry.session = Some(SessionQueue::new(&entry.queue));
                participants.push(id.clone());
            }
        }

        Some(SessionGuard {
            stage: Arc::clone(self),
            generation,
            participants,
        })
    }

    /// Take and apply the next step of `id`'s session queue
    ///
    /// Returns `Ok(None)` once the queue is drained, or when `generation`
    /// is not the running session.
    pub fn run_step<R: RngCore>(
        &self,
        generation: u64,
        id: &CharacterId,
        executor: &ActionExecutor,
        swap_scope: SwapScope,
        rng: &mut R,
    ) -> StageResult<Option<AppliedStep>> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return Ok(None);
        }
        let entry = inner.entry_mut(id)?;
        let Some(session) = entry.session.as_mut() else {
            return Ok(None);
        };
        let Some(step) = session.next_step() else {
            return Ok(None);
        };

        let kind = match step.token.verb() {
            Some(ActionVerb::Repeat) if !step.is_replay() => {
                return Ok(Some(AppliedStep {
                    step,
                    kind: AppliedKind::Repeat {
                        steps: session.remaining(),
                    },
                    collisions: Vec::new(),
                }));
            }
            Some(verb) => {
                let outcome = executor.apply(verb, &entry.state, rng);
                entry.state = outcome.state.clone();
                AppliedKind::Applied(outcome)
            }
            None => AppliedKind::Unknown {
                outcome: executor.skip(&entry.state),
                warning: ActionWarning::UnknownAction {
                    character: id.clone(),
                    token: step.token.as_str().to_string(),
                    index: step.index,
                },
            },
        };

        inner.step_counter += 1;
        let collisions = inner.check_collisions(swap_scope);

        Ok(Some(AppliedStep {
            step,
            kind,
            collisions,
        }))
    }

    /// Clear a transient message set during session `generation`
    ///
    /// Returns `Ok(false)` and leaves the message alone if that session is
    /// over.
    pub fn clear_message(&self, generation: u64, id: &CharacterId) -> StageResult<bool> {
        let mut inner = self.inner.write();
        if inner.generation != generation || !self.is_playing() {
            return Ok(false);
        }
        inner.entry_mut(id)?.state.clear_message();
        Ok(true)
    }

    fn end_session(&self) {
        let mut inner = self.inner.write();
        for entry in inner.entries.values_mut() {
            entry.session = None;
        }
        inner.detector.reset();
        drop(inner);
        self.playing.store(false, Ordering::Release);
    }
}

/// Exclusive claim on the stage for one Play session
///
/// Dropping the guard ends the session.
#[derive(Debug)]
pub struct SessionGuard {
    stage: Arc<Stage>,
    generation: u64,
    participants: Vec<CharacterId>,
}

impl SessionGuard {
    /// Generation number of this session
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Characters that got a session queue, in id order
    #[must_use]
    pub fn participants(&self) -> &[CharacterId] {
        &self.participants
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.stage.end_session();
    }
}
