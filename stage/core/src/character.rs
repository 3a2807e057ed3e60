//! Character State
//!
//! The runtime record of one sprite on the stage: how big it is, where it
//! is, which way it faces and what it is currently saying.
//!
//! The stage owns these records; the playback runner and manual adjustment
//! are the only writers. Surfaces render whatever snapshot they are handed.

use serde::{Deserialize, Serialize};

/// Smallest size a character can shrink to
pub const MIN_SIZE: u32 = 10;

/// Size a character starts with
pub const DEFAULT_SIZE: u32 = 50;

/// Amount a single size action grows or shrinks by
pub const SIZE_STEP: u32 = 10;

/// Character identifier
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub String);

impl CharacterId {
    /// Create a new character ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Position on the stage in stage units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

impl Position {
    /// The stage origin, where every character starts
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a position
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether this is exactly the origin
    #[must_use]
    pub fn is_origin(&self) -> bool {
        *self == Self::ORIGIN
    }

    /// Offset by a delta
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis selector for single-coordinate edits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Horizontal
    X,
    /// Vertical
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
        }
    }
}

/// Mutable runtime state of one character
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Rendered size, never below [`MIN_SIZE`]
    pub size: u32,
    /// Current position
    pub position: Position,
    /// Facing in degrees, kept in `[0, 360)`
    pub rotation: f64,
    /// Speech bubble text (empty when silent)
    pub message: String,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            position: Position::ORIGIN,
            rotation: 0.0,
            message: String::new(),
        }
    }
}

impl CharacterState {
    /// Grow by one size step
    pub fn grow(&mut self) {
        self.size = self.size.saturating_add(SIZE_STEP);
    }

    /// Shrink by one size step, clamped at [`MIN_SIZE`]
    pub fn shrink(&mut self) {
        self.size = self.size.saturating_sub(SIZE_STEP).max(MIN_SIZE);
    }

    /// Turn by the given number of degrees
    pub fn rotate(&mut self, degrees: f64) {
        self.rotation = (self.rotation + degrees).rem_euclid(360.0);
    }

    /// Show a message
    pub fn say(&mut self, text: impl Into<String>) {
        self.message = text.into();
    }

    /// Remove the current message
    pub fn clear_message(&mut self) {
        self.message.clear();
    }
}

/// A character placed on the stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    /// Unique identifier
    pub id: CharacterId,
    /// Display name (e.g., "Cat")
    pub name: String,
}

impl Character {
    /// Create a new character
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(id),
            name: name.into(),
        }
    }
}

/// The starter cast every new stage offers
#[must_use]
pub fn default_cast() -> Vec<Character> {
    vec![
        Character::new("1", "Cat"),
        Character::new("2", "Dog"),
        Character::new("3", "Penguin"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = CharacterState::default();
        assert_eq!(state.size, 50);
        assert_eq!(state.position, Position::ORIGIN);
        assert_eq!(state.rotation, 0.0);
        assert!(state.message.is_empty());
    }

    #[test]
    fn test_shrink_clamps_at_min_size() {
        let mut state = CharacterState::default();
        for _ in 0..10 {
            state.shrink();
        }
        assert_eq!(state.size, MIN_SIZE);

        state.size = 15;
        state.shrink();
        assert_eq!(state.size, MIN_SIZE);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut state = CharacterState::default();
        state.rotate(180.0);
        assert_eq!(state.rotation, 180.0);
        state.rotate(180.0);
        assert_eq!(state.rotation, 0.0);
        state.rotate(360.0);
        assert_eq!(state.rotation, 0.0);
    }

    #[test]
    fn test_origin() {
        assert!(Position::new(0.0, 0.0).is_origin());
        assert!(!Position::new(0.0, 1.0).is_origin());
        assert_eq!(Position::ORIGIN.offset(50.0, 0.0), Position::new(50.0, 0.0));
    }

    #[test]
    fn test_default_cast() {
        let cast = default_cast();
        let names: Vec<_> = cast.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Cat", "Dog", "Penguin"]);
        assert_eq!(cast[0].id, CharacterId::new("1"));
    }
}
