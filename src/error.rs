//! Error taxonomy for the analysis engine.

use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur during voice analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Sample rate, channel layout, or sample content outside the supported
    /// range. Not retryable: the caller must fix the input.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// The clip carries no measurable signal. Raised internally by the
    /// preprocessor; [`analyze`](crate::analyze) converts it into a baseline
    /// report, so callers of the top-level entry point never observe it.
    #[error("Input waveform is effectively silent")]
    SilentInput,

    /// The per-invocation processing budget ran out. Retryable: the caller
    /// may resubmit a shorter clip or raise the budget.
    #[error("Processing budget of {budget:?} exceeded")]
    ProcessingTimeout { budget: Duration },

    /// Unexpected numeric failure (NaN propagation or similar). Treated as a
    /// programming defect: logged where it happens and never folded into a
    /// fabricated numeric result.
    #[error("Internal computation error: {0}")]
    InternalComputationError(String),

    /// A configuration value that cannot produce meaningful analysis.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    /// Whether the caller may retry the same request (possibly with a
    /// shorter clip).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::ProcessingTimeout { .. })
    }
}

/// Wall-clock budget for one analysis invocation.
///
/// Stage loops call [`check`](Deadline::check) periodically and bail out
/// with [`AnalysisError::ProcessingTimeout`] once the budget is spent, so
/// pathological inputs cannot run unbounded.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start the clock on a new invocation.
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Fails once elapsed time exceeds the budget.
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.started.elapsed() > self.budget {
            Err(AnalysisError::ProcessingTimeout {
                budget: self.budget,
            })
        } else {
            Ok(())
        }
    }
}
