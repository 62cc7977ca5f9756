//! Enumeration types for the dining table simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Actor state
// ---------------------------------------------------------------------------

/// The phase an actor is currently in.
///
/// Every actor cycles `Thinking -> Hungry -> Eating -> Thinking` forever.
/// `Eating` means the actor holds both of its forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    /// Not holding and not waiting for forks.
    #[default]
    Thinking,
    /// Has asked for both forks and is waiting for a grant.
    Hungry,
    /// Holds both forks.
    Eating,
}

impl ActorState {
    /// Whether this state holds the forks shared with the neighbours.
    pub const fn is_eating(self) -> bool {
        matches!(self, Self::Eating)
    }

    /// Whether this actor is waiting for a grant.
    pub const fn is_hungry(self) -> bool {
        matches!(self, Self::Hungry)
    }
}

impl core::fmt::Display for ActorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Thinking => "thinking",
            Self::Hungry => "hungry",
            Self::Eating => "eating",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Grant policy
// ---------------------------------------------------------------------------

/// Rule used to decide whether a hungry actor may start eating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// Grant whenever neither neighbour is eating.
    ///
    /// Deadlock-free, but an actor can be passed over repeatedly when both
    /// neighbours keep alternating their meals.
    #[default]
    NeighbourCheck,
    /// Grant only when neither neighbour is eating and no hungry neighbour
    /// asked earlier.
    ///
    /// Hunger is served in request order between neighbours, which bounds
    /// how long any actor can wait.
    Ordered,
}

impl core::fmt::Display for GrantPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::NeighbourCheck => "neighbour_check",
            Self::Ordered => "ordered",
        };
        f.write_str(name)
    }
}

impl core::str::FromStr for GrantPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neighbour_check" | "neighbor_check" | "naive" => Ok(Self::NeighbourCheck),
            "ordered" | "fair" => Ok(Self::Ordered),
            other => Err(format!("unknown grant policy: {other}")),
        }
    }
}
