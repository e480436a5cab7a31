//! Terminal consumers of a run's outcome.

use crate::error::QueryError;
use crate::model::PipelineResult;

/// Receives the terminal outcome of each run.
///
/// Exactly one of the two methods is called per run.
pub trait ResultSink: Send + Sync {
    /// Render a successful result.
    fn on_success(&self, result: PipelineResult);

    /// Report a failed run.
    fn on_failure(&self, error: QueryError);
}

/// Writes results to stdout and failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn on_success(&self, result: PipelineResult) {
        println!("{result}");
    }

    fn on_failure(&self, error: QueryError) {
        eprintln!("{error}");
    }
}
