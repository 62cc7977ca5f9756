//! Human-readable narration of actor phase changes.
//!
//! Narration is observational only. A line looks like `<index> <event>`,
//! e.g. `2 hungry` or `2 eating for 613ms`, and is written whole under the
//! narrator's own lock so lines never interleave. It carries no ordering
//! guarantee relative to protocol transitions.

use std::io::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dining_types::{ActorId, TraceEvent};

/// Render one trace line, without the trailing newline.
pub fn format_line(actor: ActorId, event: &TraceEvent) -> String {
    format!("{actor} {event}")
}

/// Sink for narration lines.
pub trait Narrator: Send + Sync {
    /// Record that `actor` entered the phase described by `event`.
    fn narrate(&self, actor: ActorId, event: TraceEvent);
}

/// Writes each line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNarrator;

impl Narrator for StdoutNarrator {
    fn narrate(&self, actor: ActorId, event: TraceEvent) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the table down.
        let _ = writeln!(out, "{}", format_line(actor, &event));
    }
}

/// Discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn narrate(&self, _actor: ActorId, _event: TraceEvent) {}
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingNarrator {
    events: Mutex<Vec<(ActorId, TraceEvent)>>,
}

impl RecordingNarrator {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event recorded so far, in arrival order.
    pub fn events(&self) -> Vec<(ActorId, TraceEvent)> {
        self.lock().clone()
    }

    /// Events recorded for one actor.
    pub fn events_for(&self, actor: ActorId) -> Vec<TraceEvent> {
        self.lock()
            .iter()
            .filter(|(a, _)| *a == actor)
            .map(|(_, e)| *e)
            .collect()
    }

    /// Every recorded line, formatted as it would be printed.
    pub fn lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(actor, event)| format_line(*actor, event))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ActorId, TraceEvent)>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Narrator for RecordingNarrator {
    fn narrate(&self, actor: ActorId, event: TraceEvent) {
        self.lock().push((actor, event));
    }
}
