//! Shared state registry and the fork acquisition protocol.
//!
//! [`StateRegistry`] owns every actor's [`ActorState`] behind a single
//! coordination lock. All state reads, writes, and grant decisions happen
//! inside that one critical section, which serializes every
//! [`request`](StateRegistry::request) and [`release`](StateRegistry::release)
//! across the table into a single total order.
//!
//! # Protocol
//!
//! - `request(i)` marks `i` hungry and evaluates `i`.
//! - `release(i)` marks `i` thinking and evaluates both neighbours.
//! - `withdraw(i)` takes a hungry `i` back to thinking (surrendering a grant
//!   it never consumed) and evaluates both neighbours.
//! - Evaluating a hungry actor whose neighbours are not eating (plus the
//!   [`GrantPolicy`] extra condition) moves it to eating and raises its
//!   [`GrantSignal`]. Evaluating any other actor is a no-op.
//! - `await_grant(i)` waits on the signal *outside* the lock. Only another
//!   evaluation can raise it, and evaluations need the lock.
//!
//! Grants are withheld only while a neighbour eats (or, under
//! [`GrantPolicy::Ordered`], while an older hungry neighbour waits), and every
//! release re-evaluates both neighbours, so no hungry actor is forgotten.
//!
//! After every transition the registry asserts that no two adjacent actors
//! are eating. A failure means the protocol itself is broken.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dining_types::{ActorId, ActorState, GrantPolicy, Transition};
use tracing::{debug, trace};

use crate::signal::GrantSignal;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The actor id is outside the table.
    #[error("unknown actor {actor} at a table of {seats}")]
    UnknownActor {
        /// The offending id.
        actor: ActorId,
        /// Number of seats at the table.
        seats: usize,
    },

    /// A ring needs at least two seats.
    #[error("a table needs at least 2 seats, got {seats}")]
    TableTooSmall {
        /// Requested number of seats.
        seats: usize,
    },

    /// The caller asked for a transition its current state does not allow.
    #[error("actor {actor} cannot go from {from} to {to}")]
    InvalidTransition {
        /// The actor that asked.
        actor: ActorId,
        /// Its current state.
        from: ActorState,
        /// The state it asked for.
        to: ActorState,
    },
}

/// Hook invoked for every transition while the coordination lock is held.
///
/// `states` is the whole table after the transition was applied.
pub trait TransitionObserver: Send {
    /// Called once per state change.
    fn on_transition(&mut self, transition: &Transition, states: &[ActorState]);
}

/// Whether no two ring-adjacent actors are eating.
pub fn mutual_exclusion_holds(states: &[ActorState]) -> bool {
    let seats = states.len();
    states.iter().enumerate().all(|(i, state)| {
        let seat = ActorId(i);
        let right = seat.right(seats);
        !(state.is_eating()
            && seat.is_adjacent(right, seats)
            && states.get(right.index()).is_some_and(|s| s.is_eating()))
    })
}

/// Everything guarded by the coordination lock.
struct Table {
    states: Vec<ActorState>,
    /// Hunger ticket per actor, used by [`GrantPolicy::Ordered`].
    tickets: Vec<u64>,
    next_ticket: u64,
    meals: Vec<u64>,
    observer: Option<Box<dyn TransitionObserver>>,
}

impl Table {
    fn new(seats: usize, observer: Option<Box<dyn TransitionObserver>>) -> Self {
        Self {
            states: vec![ActorState::Thinking; seats],
            tickets: vec![0; seats],
            next_ticket: 0,
            meals: vec![0; seats],
            observer,
        }
    }

    fn state(&self, actor: ActorId) -> ActorState {
        self.states
            .get(actor.index())
            .copied()
            .unwrap_or_default()
    }

    fn ticket(&self, actor: ActorId) -> u64 {
        self.tickets.get(actor.index()).copied().unwrap_or(u64::MAX)
    }

    /// Apply one transition, notify the observer, and check exclusion.
    fn set(&mut self, actor: ActorId, to: ActorState) {
        let Some(slot) = self.states.get_mut(actor.index()) else {
            return;
        };
        let transition = Transition {
            actor,
            from: *slot,
            to,
        };
        *slot = to;
        trace!(actor = %actor, from = %transition.from, to = %to, "state transition");

        if let Some(observer) = self.observer.as_mut() {
            observer.on_transition(&transition, &self.states);
        }
        assert!(
            mutual_exclusion_holds(&self.states),
            "adjacent actors eating at once after {transition}: {:?}",
            self.states
        );
    }

    fn stamp_ticket(&mut self, actor: ActorId) {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.saturating_add(1);
        if let Some(slot) = self.tickets.get_mut(actor.index()) {
            *slot = ticket;
        }
    }

    fn record_meal(&mut self, actor: ActorId) {
        if let Some(count) = self.meals.get_mut(actor.index()) {
            *count = count.saturating_add(1);
        }
    }

    fn unrecord_meal(&mut self, actor: ActorId) {
        if let Some(count) = self.meals.get_mut(actor.index()) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Every actor's state plus the grant signals, guarded by one lock.
pub struct StateRegistry {
    seats: usize,
    policy: GrantPolicy,
    table: Mutex<Table>,
    signals: Vec<GrantSignal>,
}

impl core::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateRegistry")
            .field("seats", &self.seats)
            .field("policy", &self.policy)
            .field("states", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl StateRegistry {
    /// Seat `seats` thinking actors around a ring.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TableTooSmall`] for fewer than two seats.
    pub fn new(seats: usize, policy: GrantPolicy) -> Result<Self, ProtocolError> {
        Self::build(seats, policy, None)
    }

    /// Like [`new`](Self::new), reporting every transition to `observer`.
    pub fn with_observer(
        seats: usize,
        policy: GrantPolicy,
        observer: Box<dyn TransitionObserver>,
    ) -> Result<Self, ProtocolError> {
        Self::build(seats, policy, Some(observer))
    }

    fn build(
        seats: usize,
        policy: GrantPolicy,
        observer: Option<Box<dyn TransitionObserver>>,
    ) -> Result<Self, ProtocolError> {
        if seats < 2 {
            return Err(ProtocolError::TableTooSmall { seats });
        }
        Ok(Self {
            seats,
            policy,
            table: Mutex::new(Table::new(seats, observer)),
            signals: (0..seats).map(|_| GrantSignal::new()).collect(),
        })
    }

    /// Number of seats at the table.
    pub const fn seats(&self) -> usize {
        self.seats
    }

    /// The policy adjudicating grants.
    pub const fn policy(&self) -> GrantPolicy {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    /// Mark `actor` hungry and evaluate it.
    ///
    /// Never waits for the grant. Returns whether the forks were granted
    /// immediately; either way the caller must follow up with
    /// [`await_grant`](Self::await_grant).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransition`] unless `actor` is
    /// thinking.
    pub fn request(&self, actor: ActorId) -> Result<bool, ProtocolError> {
        self.check(actor)?;
        let mut table = self.lock();
        let from = table.state(actor);
        if from != ActorState::Thinking {
            return Err(ProtocolError::InvalidTransition {
                actor,
                from,
                to: ActorState::Hungry,
            });
        }
        table.stamp_ticket(actor);
        table.set(actor, ActorState::Hungry);
        Ok(self.evaluate(&mut table, actor))
    }

    /// Put down both forks and evaluate both neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransition`] unless `actor` is
    /// eating.
    pub fn release(&self, actor: ActorId) -> Result<(), ProtocolError> {
        self.check(actor)?;
        let mut table = self.lock();
        let from = table.state(actor);
        if from != ActorState::Eating {
            return Err(ProtocolError::InvalidTransition {
                actor,
                from,
                to: ActorState::Thinking,
            });
        }
        table.set(actor, ActorState::Thinking);
        self.evaluate(&mut table, actor.left(self.seats));
        self.evaluate(&mut table, actor.right(self.seats));
        Ok(())
    }

    /// Leave the table while hungry, giving up the pending request.
    ///
    /// A hungry actor goes back to thinking. If the grant already landed
    /// but was never consumed, the signal is consumed here, the meal is
    /// struck from the count, and the forks are put down as in
    /// [`release`](Self::release). Either way both neighbours are
    /// re-evaluated, since one of them may have been deferred to `actor`.
    ///
    /// Returns whether a granted meal was given up.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransition`] if `actor` is thinking,
    /// or is eating on a grant it already consumed.
    pub fn withdraw(&self, actor: ActorId) -> Result<bool, ProtocolError> {
        self.check(actor)?;
        let mut table = self.lock();
        let from = table.state(actor);
        let invalid = || ProtocolError::InvalidTransition {
            actor,
            from,
            to: ActorState::Thinking,
        };
        let surrendered = match from {
            ActorState::Hungry => false,
            ActorState::Eating => {
                if !self.signal(actor)?.try_consume() {
                    return Err(invalid());
                }
                table.unrecord_meal(actor);
                true
            }
            ActorState::Thinking => return Err(invalid()),
        };
        table.set(actor, ActorState::Thinking);
        self.evaluate(&mut table, actor.left(self.seats));
        self.evaluate(&mut table, actor.right(self.seats));
        debug!(actor = %actor, surrendered, "request withdrawn");
        Ok(surrendered)
    }

    /// Evaluate `actor` on its own.
    ///
    /// A no-op unless the actor is hungry and eligible. Returns whether a
    /// grant was made.
    pub fn try_grant(&self, actor: ActorId) -> Result<bool, ProtocolError> {
        self.check(actor)?;
        let mut table = self.lock();
        Ok(self.evaluate(&mut table, actor))
    }

    /// Wait for `actor`'s grant and consume it.
    ///
    /// Must not be called while holding the coordination lock; no registry
    /// method does.
    pub async fn await_grant(&self, actor: ActorId) -> Result<(), ProtocolError> {
        self.signal(actor)?.wait().await;
        Ok(())
    }

    /// Consume `actor`'s grant if one is outstanding, without waiting.
    pub fn try_consume_grant(&self, actor: ActorId) -> Result<bool, ProtocolError> {
        Ok(self.signal(actor)?.try_consume())
    }

    /// The single grant decision point. Caller holds the lock.
    fn evaluate(&self, table: &mut Table, actor: ActorId) -> bool {
        if !table.state(actor).is_hungry() {
            return false;
        }
        let left = actor.left(self.seats);
        let right = actor.right(self.seats);
        if table.state(left).is_eating() || table.state(right).is_eating() {
            return false;
        }
        if self.policy == GrantPolicy::Ordered {
            let mine = table.ticket(actor);
            let older_neighbour_waiting = [left, right]
                .into_iter()
                .any(|n| table.state(n).is_hungry() && table.ticket(n) < mine);
            if older_neighbour_waiting {
                trace!(actor = %actor, "grant deferred to older hungry neighbour");
                return false;
            }
        }

        table.set(actor, ActorState::Eating);
        table.record_meal(actor);
        let raised = self.signals.get(actor.index()).is_some_and(GrantSignal::raise);
        assert!(raised, "actor {actor} granted twice without consuming");
        debug!(actor = %actor, "forks granted");
        true
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Current state of `actor`.
    pub fn state(&self, actor: ActorId) -> Result<ActorState, ProtocolError> {
        self.check(actor)?;
        Ok(self.lock().state(actor))
    }

    /// Copy of every actor's state, taken under the lock.
    pub fn snapshot(&self) -> Vec<ActorState> {
        self.lock().states.clone()
    }

    /// Number of grants `actor` has received, less any it gave up.
    pub fn meals(&self, actor: ActorId) -> Result<u64, ProtocolError> {
        self.check(actor)?;
        Ok(self.lock().meals.get(actor.index()).copied().unwrap_or(0))
    }

    fn check(&self, actor: ActorId) -> Result<(), ProtocolError> {
        if actor.index() < self.seats {
            Ok(())
        } else {
            Err(ProtocolError::UnknownActor {
                actor,
                seats: self.seats,
            })
        }
    }

    fn signal(&self, actor: ActorId) -> Result<&GrantSignal, ProtocolError> {
        self.signals
            .get(actor.index())
            .ok_or(ProtocolError::UnknownActor {
                actor,
                seats: self.seats,
            })
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
