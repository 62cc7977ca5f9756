//! State registry, fork acquisition protocol, and actor lifecycle for the
//! dining table simulation.
//!
//! N actors sit around a ring. Each needs both of the forks it shares with
//! its neighbours to eat. This crate decides, under concurrent contention,
//! which hungry actor may eat, without deadlock and without two neighbours
//! ever eating at once.
//!
//! # Modules
//!
//! - [`audit`] -- [`TransitionLog`], a recording transition observer.
//! - [`config`] -- Configuration loading from `dining-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- [`RunControl`] stop flag and run bound.
//! - [`duration`] -- Random think/eat durations ([`DurationSource`]).
//! - [`lifecycle`] -- The per-actor think/request/eat/release loop.
//! - [`narrator`] -- Trace line sinks ([`Narrator`]).
//! - [`registry`] -- [`StateRegistry`] and the grant decision procedure.
//! - [`runner`] -- [`DiningTable`], one task per actor.
//! - [`signal`] -- [`GrantSignal`], the per-actor binary signal.
//!
//! [`TransitionLog`]: audit::TransitionLog
//! [`RunControl`]: control::RunControl
//! [`DurationSource`]: duration::DurationSource
//! [`Narrator`]: narrator::Narrator
//! [`StateRegistry`]: registry::StateRegistry
//! [`DiningTable`]: runner::DiningTable
//! [`GrantSignal`]: signal::GrantSignal

pub mod audit;
pub mod config;
pub mod control;
pub mod duration;
pub mod lifecycle;
pub mod narrator;
pub mod registry;
pub mod runner;
pub mod signal;

// Re-export primary types at crate root for convenience.
pub use audit::TransitionLog;
pub use config::{ConfigError, TableConfig};
pub use control::RunControl;
pub use duration::{DurationRange, DurationSource, random_duration};
pub use lifecycle::{Actor, ActorReport};
pub use narrator::{Narrator, RecordingNarrator, SilentNarrator, StdoutNarrator};
pub use registry::{ProtocolError, StateRegistry, TransitionObserver, mutual_exclusion_holds};
pub use runner::{DiningTable, RunnerError, TableResult};
pub use signal::GrantSignal;
