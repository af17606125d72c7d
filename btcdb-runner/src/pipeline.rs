//! Pipeline runner: load → fetch → merge → reconcile → persist, with bounded retry.
//!
//! Each attempt walks an explicit state machine:
//!
//! ```text
//! Idle → Loading → Fetching → Merging → Reconciling → Persisting → Done
//!            └──────────┴─────────┴───────────┴─────────────┴──→ Failed
//! ```
//!
//! A failed attempt is logged at critical severity, followed by a fixed
//! backoff sleep, then a fresh attempt from `Idle`. Persistence is atomic and
//! only reached on a fully successful path, so an exhausted run leaves the
//! table file exactly as it was.

use btcdb_core::data::{StoreReadError, StoreWriteError, TableStore};
use btcdb_core::domain::{ObservationRow, Table};
use btcdb_core::reconcile::{self, MergeError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::pacing::Sleeper;
use crate::row_builder::{RowBuilder, SourceFetchError};
use crate::sink::{LogSink, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Loading,
    Fetching,
    Merging,
    Reconciling,
    Persisting,
    Done,
    Failed,
}

/// Stage-level failure. Every variant is fatal for the current attempt.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),
    #[error(transparent)]
    StoreRead(#[from] StoreReadError),
    #[error(transparent)]
    StoreWrite(#[from] StoreWriteError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Failure together with the state it happened in.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: PipelineState,
    pub error: PipelineError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptReport {
    pub attempt: u32,
    /// States visited, ending in `Done` or `Failed`.
    pub trace: Vec<PipelineState>,
    /// State the attempt failed in.
    pub failed_in: Option<PipelineState>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunOutcome {
    Completed { attempt: u32, rows: usize },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub attempts: Vec<AttemptReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }

    pub fn final_state(&self) -> PipelineState {
        if self.succeeded() {
            PipelineState::Done
        } else {
            PipelineState::Failed
        }
    }
}

/// Work carried between states of one attempt.
enum Step {
    Idle,
    Loading,
    Fetching(Table),
    Merging(Table, ObservationRow),
    Reconciling(Table),
    Persisting(Table),
    Done(usize),
}

impl Step {
    fn state(&self) -> PipelineState {
        match self {
            Step::Idle => PipelineState::Idle,
            Step::Loading => PipelineState::Loading,
            Step::Fetching(_) => PipelineState::Fetching,
            Step::Merging(..) => PipelineState::Merging,
            Step::Reconciling(_) => PipelineState::Reconciling,
            Step::Persisting(_) => PipelineState::Persisting,
            Step::Done(_) => PipelineState::Done,
        }
    }
}

pub struct PipelineRunner<'a> {
    store: &'a TableStore,
    builder: RowBuilder<'a>,
    sleeper: &'a dyn Sleeper,
    sink: &'a dyn LogSink,
    policy: RetryPolicy,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        store: &'a TableStore,
        builder: RowBuilder<'a>,
        sleeper: &'a dyn Sleeper,
        sink: &'a dyn LogSink,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            builder,
            sleeper,
            sink,
            policy,
        }
    }

    /// Run up to `max_attempts` attempts. Never panics on stage failure;
    /// the outcome is reported in the returned `RunReport`.
    pub fn run(&self) -> RunReport {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt in 1..=max_attempts {
            self.sink.log(
                Severity::Info,
                &format!("update pipeline started, attempt {attempt}/{max_attempts}"),
            );

            let mut trace = Vec::new();
            match self.run_attempt(&mut trace) {
                Ok(rows) => {
                    self.sink.log(
                        Severity::Info,
                        &format!(
                            "pipeline completed on attempt {attempt}: {rows} rows persisted to {}",
                            self.store.path().display()
                        ),
                    );
                    attempts.push(AttemptReport {
                        attempt,
                        trace,
                        failed_in: None,
                        error: None,
                    });
                    return RunReport {
                        outcome: RunOutcome::Completed { attempt, rows },
                        attempts,
                    };
                }
                Err(failure) => {
                    self.sink.log(
                        Severity::Critical,
                        &format!(
                            "pipeline failed on attempt {attempt} while {:?}: {}",
                            failure.stage, failure.error
                        ),
                    );
                    attempts.push(AttemptReport {
                        attempt,
                        trace,
                        failed_in: Some(failure.stage),
                        error: Some(failure.error.to_string()),
                    });
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.backoff);
                    }
                }
            }
        }

        self.sink.log(
            Severity::Warning,
            &format!("pipeline failed after {max_attempts} consecutive attempts"),
        );
        RunReport {
            outcome: RunOutcome::Exhausted {
                attempts: max_attempts,
            },
            attempts,
        }
    }

    /// One attempt from `Idle` to `Done`; returns the persisted row count.
    fn run_attempt(&self, trace: &mut Vec<PipelineState>) -> Result<usize, StageFailure> {
        let mut step = Step::Idle;
        loop {
            let state = step.state();
            trace.push(state);
            tracing::debug!(?state, "pipeline transition");

            step = match self.advance(step) {
                Ok(Step::Done(rows)) => {
                    trace.push(PipelineState::Done);
                    return Ok(rows);
                }
                Ok(next) => next,
                Err(error) => {
                    trace.push(PipelineState::Failed);
                    return Err(StageFailure {
                        stage: state,
                        error,
                    });
                }
            };
        }
    }

    fn advance(&self, step: Step) -> Result<Step, PipelineError> {
        Ok(match step {
            Step::Idle => Step::Loading,
            Step::Loading => {
                let table = self.store.load()?;
                tracing::info!(rows = table.len(), path = %self.store.path().display(), "existing data loaded");
                Step::Fetching(table)
            }
            Step::Fetching(table) => {
                let row = self.builder.build_today_row()?;
                tracing::info!(date = %row.date, observed = row.instruments.observed(), "today's row built");
                Step::Merging(table, row)
            }
            Step::Merging(table, row) => Step::Reconciling(reconcile::merge(table, row)?),
            Step::Reconciling(table) => {
                let table = reconcile::canonicalize(table);
                reconcile::check_invariants(&table)?;
                Step::Persisting(table)
            }
            Step::Persisting(table) => {
                self.store.save(&table)?;
                Step::Done(table.len())
            }
            Step::Done(rows) => Step::Done(rows),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_final_state_follows_outcome() {
        let done = RunReport {
            outcome: RunOutcome::Completed { attempt: 2, rows: 10 },
            attempts: Vec::new(),
        };
        let failed = RunReport {
            outcome: RunOutcome::Exhausted { attempts: 3 },
            attempts: Vec::new(),
        };
        assert!(done.succeeded());
        assert_eq!(done.final_state(), PipelineState::Done);
        assert!(!failed.succeeded());
        assert_eq!(failed.final_state(), PipelineState::Failed);
    }

    #[test]
    fn default_policy_is_three_attempts_one_minute_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(60));
    }
}
