//! Observable events: narration lines and protocol transitions.

use serde::{Deserialize, Serialize};

use crate::enums::ActorState;
use crate::ids::ActorId;

/// One narration line emitted by an actor at a phase change.
///
/// The [`Display`](core::fmt::Display) output is the body of a trace line;
/// the actor index is prepended by the narrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The actor starts thinking for the given time.
    Thinking {
        /// Planned thinking time in milliseconds.
        duration_ms: u64,
    },
    /// The actor has asked for its forks.
    Hungry,
    /// The actor was granted its forks and eats for the given time.
    Eating {
        /// Planned eating time in milliseconds.
        duration_ms: u64,
    },
}

impl core::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Thinking { duration_ms } => write!(f, "thinking for {duration_ms}ms"),
            Self::Hungry => f.write_str("hungry"),
            Self::Eating { duration_ms } => write!(f, "eating for {duration_ms}ms"),
        }
    }
}

/// A single state change recorded by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The actor whose state changed.
    pub actor: ActorId,
    /// State before the change.
    pub from: ActorState,
    /// State after the change.
    pub to: ActorState,
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {} -> {}", self.actor, self.from, self.to)
    }
}
