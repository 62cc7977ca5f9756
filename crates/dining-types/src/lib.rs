//! Shared type definitions for the dining table simulation.
//!
//! # Modules
//!
//! - [`ids`] -- Seat identifiers and ring neighbour arithmetic
//! - [`enums`] -- Actor states and grant policies
//! - [`events`] -- Narration events and protocol transitions

pub mod enums;
pub mod events;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{ActorState, GrantPolicy};
pub use events::{TraceEvent, Transition};
pub use ids::ActorId;
