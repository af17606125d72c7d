//! btcdb runner: the daily update pipeline.
//!
//! This crate builds on `btcdb-core` to provide:
//! - TOML configuration with stock defaults
//! - Reference-timezone clock, pacing sleeper and leveled log sink
//! - Row building (crypto atomic, instruments tolerant, weekend short-circuit)
//! - The retrying load → fetch → merge → reconcile → persist state machine

pub mod clock;
pub mod config;
pub mod pacing;
pub mod pipeline;
pub mod row_builder;
pub mod sink;

pub use clock::{Clock, FixedClock, ZonedClock};
pub use config::{ConfigError, PipelineConfig};
pub use pacing::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use pipeline::{
    AttemptReport, PipelineError, PipelineRunner, PipelineState, RetryPolicy, RunOutcome,
    RunReport, StageFailure,
};
pub use row_builder::{is_weekend, RowBuilder, SourceFetchError};
pub use sink::{LogSink, MemorySink, Severity, TracingSink};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<AttemptReport>();
        assert_sync::<AttemptReport>();
    }

    #[test]
    fn test_doubles_are_send_sync() {
        assert_send::<MemorySink>();
        assert_sync::<MemorySink>();
        assert_send::<RecordingSleeper>();
        assert_sync::<RecordingSleeper>();
    }
}
