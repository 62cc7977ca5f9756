//! Table runner: one task per actor.
//!
//! [`DiningTable::run`] spawns every actor on the tokio runtime and waits for
//! all of them. Actors loop forever, so with an unbounded [`RunControl`] and
//! no external stop the run never returns. A configured time bound is
//! enforced by a watchdog task that requests a stop when it expires.
//!
//! If any actor fails (a protocol error, or a panic from the exclusion
//! assertion) the runner stops the remaining actors and reports the first
//! failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dining_types::ActorId;
use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use tracing::{error, info, warn};

use crate::config::TableConfig;
use crate::control::RunControl;
use crate::duration::{self, DurationSource};
use crate::lifecycle::{Actor, ActorReport};
use crate::narrator::Narrator;
use crate::registry::{ProtocolError, StateRegistry};

/// Errors that can end a table run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The registry rejected a call.
    #[error("protocol error: {source}")]
    Protocol {
        /// The underlying protocol error.
        #[from]
        source: ProtocolError,
    },

    /// An actor task panicked or was cancelled.
    #[error("actor task failed: {source}")]
    ActorTask {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct TableResult {
    /// One report per actor, ordered by seat.
    pub reports: Vec<ActorReport>,
    /// When the table was set.
    pub started_at: DateTime<Utc>,
    /// Whole seconds the run lasted.
    pub elapsed_seconds: u64,
}

impl TableResult {
    /// Report for one seat.
    pub fn report(&self, actor: ActorId) -> Option<&ActorReport> {
        self.reports.iter().find(|r| r.actor == actor)
    }

    /// Total grants across the table.
    pub fn total_meals(&self) -> u64 {
        self.reports
            .iter()
            .fold(0_u64, |acc, r| acc.saturating_add(r.meals))
    }

    /// Seats that never ate.
    pub fn starved(&self) -> Vec<ActorId> {
        self.reports
            .iter()
            .filter(|r| r.meals == 0)
            .map(|r| r.actor)
            .collect()
    }
}

/// The registry plus everything the actors share.
#[derive(Clone)]
pub struct DiningTable {
    registry: Arc<StateRegistry>,
    durations: Arc<dyn DurationSource>,
    narrator: Arc<dyn Narrator>,
    control: Arc<RunControl>,
}

impl core::fmt::Debug for DiningTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiningTable")
            .field("registry", &self.registry)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

impl DiningTable {
    /// Assemble a table from its parts.
    pub fn new(
        registry: Arc<StateRegistry>,
        durations: Arc<dyn DurationSource>,
        narrator: Arc<dyn Narrator>,
        control: Arc<RunControl>,
    ) -> Self {
        Self {
            registry,
            durations,
            narrator,
            control,
        }
    }

    /// Build the table described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Protocol`] if the ring is too small.
    pub fn from_config(
        config: &TableConfig,
        narrator: Arc<dyn Narrator>,
    ) -> Result<Self, RunnerError> {
        let registry = StateRegistry::new(config.table.actors, config.table.policy)?;
        Ok(Self::new(
            Arc::new(registry),
            duration::from_config(&config.durations),
            narrator,
            Arc::new(RunControl::new(config.simulation.max_real_time_seconds)),
        ))
    }

    /// The shared registry.
    pub const fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// The shared run control.
    pub const fn control(&self) -> &Arc<RunControl> {
        &self.control
    }

    /// Spawn one task per seat and wait for all of them.
    ///
    /// # Errors
    ///
    /// Returns the first actor failure after stopping the rest of the table.
    pub async fn run(self) -> Result<TableResult, RunnerError> {
        let seats = self.registry.seats();
        info!(
            seats,
            policy = %self.registry.policy(),
            max_real_time_seconds = self.control.max_real_time_seconds(),
            "table set"
        );

        let watchdog = match self.control.max_real_time_seconds() {
            0 => None,
            secs => {
                let control = Arc::clone(&self.control);
                Some(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    info!(secs, "run time limit reached");
                    control.request_stop();
                }))
            }
        };

        let mut tasks: FuturesUnordered<_> = ActorId::all(seats)
            .map(|id| {
                let actor = Actor::new(
                    id,
                    Arc::clone(&self.registry),
                    Arc::clone(&self.durations),
                    Arc::clone(&self.narrator),
                    Arc::clone(&self.control),
                );
                tokio::spawn(actor.run())
            })
            .collect();

        let mut reports = Vec::with_capacity(seats);
        let mut first_error: Option<RunnerError> = None;
        while let Some(joined) = tasks.next().await {
            let outcome = joined
                .map_err(RunnerError::from)
                .and_then(|r| r.map_err(RunnerError::from));
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(error = %e, "actor failed, stopping the table");
                    self.control.request_stop();
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(handle) = watchdog {
            handle.abort();
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        reports.sort_by_key(|r| r.actor);
        Ok(TableResult {
            reports,
            started_at: self.control.started_at(),
            elapsed_seconds: self.control.elapsed_seconds(),
        })
    }
}

/// Log the end-of-run summary.
pub fn log_table_end(result: &TableResult) {
    info!(
        total_meals = result.total_meals(),
        elapsed_seconds = result.elapsed_seconds,
        started_at = %result.started_at,
        "table cleared"
    );
    for report in &result.reports {
        info!(
            actor = %report.actor,
            meals = report.meals,
            cycles = report.cycles,
            "actor summary"
        );
    }
    let starved = result.starved();
    if !starved.is_empty() {
        warn!(?starved, "some actors never ate");
    }
}
