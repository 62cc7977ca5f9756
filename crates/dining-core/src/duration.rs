//! Random think and eat durations.
//!
//! Every actor task draws its own durations concurrently, so each source
//! here is safe to share: [`UniformDurations`] uses the thread-local
//! generator and [`SeededDurations`] guards one seeded generator with a
//! mutex.

use std::sync::{Arc, Mutex, PoisonError};

use dining_types::ActorId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DurationConfig;

/// Uniformly distributed duration in `[min_ms, max_ms]`, in milliseconds.
///
/// An inverted range collapses to `min_ms`.
pub fn random_duration(min_ms: u64, max_ms: u64) -> u64 {
    draw(&mut rand::rng(), DurationRange::new(min_ms, max_ms))
}

fn draw<R: Rng + ?Sized>(rng: &mut R, range: DurationRange) -> u64 {
    if range.min_ms >= range.max_ms {
        return range.min_ms;
    }
    rng.random_range(range.min_ms..=range.max_ms)
}

/// Inclusive millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    /// Lower bound.
    pub min_ms: u64,
    /// Upper bound.
    pub max_ms: u64,
}

impl DurationRange {
    /// Build a range from its bounds.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Whether `ms` falls inside the range.
    pub const fn contains(self, ms: u64) -> bool {
        ms >= self.min_ms && ms <= self.max_ms
    }
}

/// Supplies phase durations to actor tasks.
///
/// Implementations are called concurrently from every actor.
pub trait DurationSource: Send + Sync {
    /// How long `actor` thinks before getting hungry, in milliseconds.
    fn think_ms(&self, actor: ActorId) -> u64;

    /// How long `actor` eats once granted, in milliseconds.
    fn eat_ms(&self, actor: ActorId) -> u64;
}

/// Same ranges for every actor, drawn from the thread-local generator.
#[derive(Debug, Clone, Copy)]
pub struct UniformDurations {
    think: DurationRange,
    eat: DurationRange,
}

impl UniformDurations {
    /// Build a source with the given think and eat ranges.
    pub const fn new(think: DurationRange, eat: DurationRange) -> Self {
        Self { think, eat }
    }
}

impl DurationSource for UniformDurations {
    fn think_ms(&self, _actor: ActorId) -> u64 {
        draw(&mut rand::rng(), self.think)
    }

    fn eat_ms(&self, _actor: ActorId) -> u64 {
        draw(&mut rand::rng(), self.eat)
    }
}

/// Same ranges for every actor, drawn from one seeded generator.
///
/// The sequence of values is reproducible; which actor receives which value
/// still depends on scheduling.
#[derive(Debug)]
pub struct SeededDurations {
    think: DurationRange,
    eat: DurationRange,
    rng: Mutex<StdRng>,
}

impl SeededDurations {
    /// Build a source seeded with `seed`.
    pub fn new(think: DurationRange, eat: DurationRange, seed: u64) -> Self {
        Self {
            think,
            eat,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next(&self, range: DurationRange) -> u64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        draw(&mut *rng, range)
    }
}

impl DurationSource for SeededDurations {
    fn think_ms(&self, _actor: ActorId) -> u64 {
        self.next(self.think)
    }

    fn eat_ms(&self, _actor: ActorId) -> u64 {
        self.next(self.eat)
    }
}

/// Build the duration source described by `config`.
pub fn from_config(config: &DurationConfig) -> Arc<dyn DurationSource> {
    let think = DurationRange::new(config.think_min_ms, config.think_max_ms);
    let eat = DurationRange::new(config.eat_min_ms, config.eat_max_ms);
    match config.seed {
        Some(seed) => Arc::new(SeededDurations::new(think, eat, seed)),
        None => Arc::new(UniformDurations::new(think, eat)),
    }
}
