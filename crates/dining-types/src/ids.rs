//! Seat identifiers for actors around the table.
//!
//! Actors are identified by their seat index in `[0, N)`. The table is a
//! fixed ring, so every seat has exactly one left and one right neighbour.

use serde::{Deserialize, Serialize};

/// Seat index of an actor at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub usize);

impl ActorId {
    /// Return the raw seat index.
    pub const fn index(self) -> usize {
        self.0
    }

    /// The neighbour at `(i - 1) mod seats`.
    ///
    /// `seats` must be non-zero; a zero-sized table yields seat 0.
    pub const fn left(self, seats: usize) -> Self {
        if self.0 == 0 {
            Self(seats.saturating_sub(1))
        } else {
            Self(self.0.saturating_sub(1))
        }
    }

    /// The neighbour at `(i + 1) mod seats`.
    pub const fn right(self, seats: usize) -> Self {
        let next = self.0.saturating_add(1);
        if next >= seats { Self(0) } else { Self(next) }
    }

    /// Whether `other` sits directly next to this seat on a ring of `seats`.
    pub fn is_adjacent(self, other: Self, seats: usize) -> bool {
        self != other && (self.left(seats) == other || self.right(seats) == other)
    }

    /// Iterate every seat of a table with `seats` places, in order.
    pub fn all(seats: usize) -> impl Iterator<Item = Self> {
        (0..seats).map(Self)
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
