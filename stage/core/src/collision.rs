//! Collision Detection
//!
//! Two characters collide when they stand on exactly the same spot and that
//! spot is not the origin. Everyone starts at the origin, so counting it
//! would make every untouched pair collide.
//!
//! The detector works on a position snapshot and holds no reference to the
//! stage. The stage calls it while holding its write lock, right after a
//! step is applied, and performs the queue swaps it asks for.
//!
//! # Edge Triggering
//!
//! A pair fires once when it comes into contact. While the two characters
//! stay together the pair stays quiet; once they separate it re-arms. Without
//! this, two characters parked on the same spot would trade queues again on
//! every step any other runner takes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::character::{CharacterId, Position};

/// Whether two positions count as a collision
#[must_use]
pub fn collides(a: Position, b: Position) -> bool {
    a == b && !a.is_origin()
}

/// A pair found touching in one scan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Lower character id of the pair
    pub first: CharacterId,
    /// Higher character id of the pair
    pub second: CharacterId,
    /// Where they met
    pub position: Position,
}

/// Observable record of a collision during playback
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Lower character id of the pair
    pub first: CharacterId,
    /// Higher character id of the pair
    pub second: CharacterId,
    /// Where they met
    pub position: Position,
    /// Whether the two queues were exchanged
    pub swapped: bool,
    /// Session-wide step counter when the collision was seen
    pub step: u64,
}

impl std::fmt::Display for CollisionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} and {} collided at {}{}",
            self.first,
            self.second,
            self.position,
            if self.swapped { " (queues swapped)" } else { "" }
        )
    }
}

/// Every colliding unordered pair in `positions`
///
/// Pairs come out ordered by the iteration order of `positions`; callers
/// pass an ordered map so the result is deterministic.
pub fn scan<'a, I>(positions: I) -> Vec<Contact>
where
    I: IntoIterator<Item = (&'a CharacterId, Position)>,
{
    let positions: Vec<(&CharacterId, Position)> = positions.into_iter().collect();
    let mut contacts = Vec::new();

    for (i, (a_id, a_pos)) in positions.iter().enumerate() {
        for (b_id, b_pos) in &positions[i + 1..] {
            if collides(*a_pos, *b_pos) {
                let (first, second) = if a_id <= b_id {
                    (*a_id, *b_id)
                } else {
                    (*b_id, *a_id)
                };
                contacts.push(Contact {
                    first: first.clone(),
                    second: second.clone(),
                    position: *a_pos,
                });
            }
        }
    }

    contacts
}

/// Pick which contacts get a queue swap
///
/// Each character swaps at most once per scan, first come first served.
#[must_use]
pub fn plan_swaps(contacts: &[Contact]) -> Vec<bool> {
    let mut busy: HashSet<&CharacterId> = HashSet::new();
    contacts
        .iter()
        .map(|c| {
            if busy.contains(&c.first) || busy.contains(&c.second) {
                false
            } else {
                busy.insert(&c.first);
                busy.insert(&c.second);
                true
            }
        })
        .collect()
}

/// Edge-triggered collision tracker for one Play session
#[derive(Debug, Default)]
pub struct CollisionDetector {
    touching: HashSet<(CharacterId, CharacterId)>,
}

impl CollisionDetector {
    /// Create a detector with no known contacts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan and return only pairs that were not touching at the last scan
    pub fn detect<'a, I>(&mut self, positions: I) -> Vec<Contact>
    where
        I: IntoIterator<Item = (&'a CharacterId, Position)>,
    {
        let contacts = scan(positions);
        let now: HashSet<(CharacterId, CharacterId)> = contacts
            .iter()
            .map(|c| (c.first.clone(), c.second.clone()))
            .collect();

        let fresh = contacts
            .into_iter()
            .filter(|c| !self.touching.contains(&(c.first.clone(), c.second.clone())))
            .collect();

        self.touching = now;
        fresh
    }

    /// Forget every contact (start of a new session)
    pub fn reset(&mut self) {
        self.touching.clear();
    }

    /// Number of pairs currently touching
    #[must_use]
    pub fn touching_count(&self) -> usize {
        self.touching.len()
    }
}
