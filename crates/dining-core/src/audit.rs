//! Transition history recorded from inside the coordination lock.
//!
//! [`TransitionLog`] is a [`TransitionObserver`] that keeps every transition
//! in order and counts states that break mutual exclusion. It is cheap to
//! clone; all clones share one history, so a test can hand one clone to the
//! registry and inspect another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dining_types::{ActorId, ActorState, Transition};

use crate::registry::{TransitionObserver, mutual_exclusion_holds};

#[derive(Debug, Default)]
struct History {
    transitions: Vec<Transition>,
    violations: usize,
}

/// Shared, append-only record of registry transitions.
#[derive(Debug, Clone, Default)]
pub struct TransitionLog {
    inner: Arc<Mutex<History>>,
}

impl TransitionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transition seen so far, in lock order.
    pub fn transitions(&self) -> Vec<Transition> {
        self.lock().transitions.clone()
    }

    /// Number of transitions that left two neighbours eating.
    pub fn violations(&self) -> usize {
        self.lock().violations
    }

    /// Number of grants (`Hungry -> Eating`) made to `actor`.
    pub fn grants_for(&self, actor: ActorId) -> usize {
        self.lock()
            .transitions
            .iter()
            .filter(|t| t.actor == actor && t.to == ActorState::Eating)
            .count()
    }

    /// Number of requests (`Thinking -> Hungry`) made by `actor`.
    pub fn requests_for(&self, actor: ActorId) -> usize {
        self.lock()
            .transitions
            .iter()
            .filter(|t| t.actor == actor && t.to == ActorState::Hungry)
            .count()
    }

    /// Whether every actor's transitions follow
    /// `Thinking -> Hungry -> Eating -> Thinking`, where a withdrawn request
    /// may also go straight from `Hungry` back to `Thinking`.
    pub fn cycles_are_well_formed(&self) -> bool {
        self.lock().transitions.iter().all(|t| {
            matches!(
                (t.from, t.to),
                (ActorState::Thinking, ActorState::Hungry)
                    | (ActorState::Hungry, ActorState::Eating | ActorState::Thinking)
                    | (ActorState::Eating, ActorState::Thinking)
            )
        })
    }

    /// Number of requests `actor` withdrew before they were granted.
    pub fn withdrawals_for(&self, actor: ActorId) -> usize {
        self.lock()
            .transitions
            .iter()
            .filter(|t| {
                t.actor == actor && t.from == ActorState::Hungry && t.to == ActorState::Thinking
            })
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransitionObserver for TransitionLog {
    fn on_transition(&mut self, transition: &Transition, states: &[ActorState]) {
        let mut history = self.lock();
        history.transitions.push(*transition);
        if !mutual_exclusion_holds(states) {
            history.violations = history.violations.saturating_add(1);
        }
    }
}
