//! The per-actor lifecycle loop.
//!
//! Each actor repeats, until its [`RunControl`] says stop:
//!
//! 1. Think for a random duration.
//! 2. Ask for both forks, then wait for the grant.
//! 3. Eat for a random duration.
//! 4. Put the forks down.
//!
//! Narration happens at each phase change and never touches the
//! coordination lock.

use std::sync::Arc;

use dining_types::{ActorId, TraceEvent};
use tracing::{debug, info};

use crate::control::RunControl;
use crate::duration::DurationSource;
use crate::narrator::Narrator;
use crate::registry::{ProtocolError, StateRegistry};

/// What one actor achieved before it was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorReport {
    /// The actor.
    pub actor: ActorId,
    /// Grants consumed (meals started).
    pub meals: u64,
    /// Full think/hungry/eat/release cycles completed.
    pub cycles: u64,
}

/// One seat at the table, with handles to everything it shares.
pub struct Actor {
    id: ActorId,
    registry: Arc<StateRegistry>,
    durations: Arc<dyn DurationSource>,
    narrator: Arc<dyn Narrator>,
    control: Arc<RunControl>,
}

impl core::fmt::Debug for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Actor").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Actor {
    /// Seat actor `id`.
    pub fn new(
        id: ActorId,
        registry: Arc<StateRegistry>,
        durations: Arc<dyn DurationSource>,
        narrator: Arc<dyn Narrator>,
        control: Arc<RunControl>,
    ) -> Self {
        Self {
            id,
            registry,
            durations,
            narrator,
            control,
        }
    }

    /// This actor's seat.
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Run the lifecycle until a stop is requested.
    ///
    /// Without a stop this never returns.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the registry rejects a request or
    /// release, which means the actor id is wrong or the loop is broken.
    pub async fn run(self) -> Result<ActorReport, ProtocolError> {
        let mut meals: u64 = 0;
        let mut cycles: u64 = 0;
        debug!(actor = %self.id, "actor seated");

        while !self.control.is_stop_requested() {
            if !self.think().await {
                break;
            }
            if !self.pick_up_forks().await? {
                break;
            }
            meals = meals.saturating_add(1);
            let finished = self.eat().await;
            self.registry.release(self.id)?;
            cycles = cycles.saturating_add(1);
            if !finished {
                break;
            }
        }

        let report = ActorReport {
            actor: self.id,
            meals,
            cycles,
        };
        info!(
            actor = %report.actor,
            meals = report.meals,
            cycles = report.cycles,
            "actor left the table"
        );
        Ok(report)
    }

    /// Returns `false` if stopped while thinking.
    async fn think(&self) -> bool {
        let duration_ms = self.durations.think_ms(self.id);
        self.narrator
            .narrate(self.id, TraceEvent::Thinking { duration_ms });
        self.control.sleep_unless_stopped(duration_ms).await
    }

    /// Request both forks and wait for the grant.
    ///
    /// Returns `false` if stopped while hungry, after withdrawing the
    /// request so a later release cannot grant an actor that has left.
    async fn pick_up_forks(&self) -> Result<bool, ProtocolError> {
        self.narrator.narrate(self.id, TraceEvent::Hungry);
        let immediate = self.registry.request(self.id)?;
        debug!(actor = %self.id, immediate, "forks requested");

        tokio::select! {
            biased;
            granted = self.registry.await_grant(self.id) => {
                granted?;
                Ok(true)
            }
            () = self.control.stopped() => {
                let surrendered = self.registry.withdraw(self.id)?;
                debug!(actor = %self.id, surrendered, "left while hungry");
                Ok(false)
            }
        }
    }

    /// Returns `false` if stopped while eating.
    async fn eat(&self) -> bool {
        let duration_ms = self.durations.eat_ms(self.id);
        self.narrator
            .narrate(self.id, TraceEvent::Eating { duration_ms });
        self.control.sleep_unless_stopped(duration_ms).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dining_types::{ActorState, GrantPolicy};

    use super::*;
    use crate::audit::TransitionLog;
    use crate::duration::{DurationRange, UniformDurations};
    use crate::narrator::RecordingNarrator;

    fn fixed(think_ms: u64, eat_ms: u64) -> Arc<dyn DurationSource> {
        Arc::new(UniformDurations::new(
            DurationRange::fixed(think_ms),
            DurationRange::fixed(eat_ms),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn lone_actor_narrates_each_phase_in_order() {
        let registry = Arc::new(StateRegistry::new(3, GrantPolicy::NeighbourCheck).unwrap());
        let narrator = Arc::new(RecordingNarrator::new());
        let control = Arc::new(RunControl::unbounded());
        let actor = Actor::new(
            ActorId(1),
            Arc::clone(&registry),
            fixed(100, 200),
            narrator.clone(),
            Arc::clone(&control),
        );

        let handle = tokio::spawn(actor.run());
        // Two full cycles take 600ms; stop during the third think.
        tokio::time::sleep(std::time::Duration::from_millis(650)).await;
        control.request_stop();
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.cycles, 2);
        assert_eq!(report.meals, 2);
        assert_eq!(
            narrator.lines().get(..4).map(<[String]>::to_vec),
            Some(vec![
                "1 thinking for 100ms".to_owned(),
                "1 hungry".to_owned(),
                "1 eating for 200ms".to_owned(),
                "1 thinking for 100ms".to_owned(),
            ])
        );
        assert_eq!(registry.state(ActorId(1)).unwrap(), ActorState::Thinking);
    }

    #[tokio::test(start_paused = true)]
    async fn hungry_actor_leaves_when_stopped() {
        let registry = Arc::new(StateRegistry::new(3, GrantPolicy::NeighbourCheck).unwrap());
        // A neighbour holds the forks and never gives them back.
        assert!(registry.request(ActorId(0)).unwrap());

        let control = Arc::new(RunControl::unbounded());
        let actor = Actor::new(
            ActorId(1),
            Arc::clone(&registry),
            fixed(10, 10),
            Arc::new(RecordingNarrator::new()),
            Arc::clone(&control),
        );
        let handle = tokio::spawn(actor.run());
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert_eq!(registry.state(ActorId(1)).unwrap(), ActorState::Hungry);

        control.request_stop();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.meals, 0);
        assert_eq!(report.cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn neighbour_release_after_stop_grants_nobody() {
        let log = TransitionLog::new();
        let registry = Arc::new(
            StateRegistry::with_observer(5, GrantPolicy::NeighbourCheck, Box::new(log.clone()))
                .unwrap(),
        );
        assert!(registry.request(ActorId(0)).unwrap());

        let control = Arc::new(RunControl::unbounded());
        let actor = Actor::new(
            ActorId(1),
            Arc::clone(&registry),
            fixed(10, 10),
            Arc::new(RecordingNarrator::new()),
            Arc::clone(&control),
        );
        let handle = tokio::spawn(actor.run());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(registry.state(ActorId(1)).unwrap(), ActorState::Hungry);

        control.request_stop();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(registry.state(ActorId(1)).unwrap(), ActorState::Thinking);

        // Seat 0 finishes its meal after seat 1 has gone.
        assert!(registry.try_consume_grant(ActorId(0)).unwrap());
        registry.release(ActorId(0)).unwrap();

        assert_eq!(registry.snapshot(), vec![ActorState::Thinking; 5]);
        assert!(!registry.try_consume_grant(ActorId(1)).unwrap());
        assert_eq!(log.grants_for(ActorId(1)), 0);
        assert_eq!(log.withdrawals_for(ActorId(1)), 1);
        assert_eq!(report.meals, registry.meals(ActorId(1)).unwrap());
        assert!(log.cycles_are_well_formed());
    }
}
