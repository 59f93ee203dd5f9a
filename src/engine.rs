//! Orchestration: one invocation from waveform to report.
//!
//! ```text
//! preprocess ─┬─ pitch ───┐
//!             ├─ cadence ─┼─ join ─ quality ─ report
//!             └─ events ──┘
//! ```
//!
//! The three analysis branches read the same immutable preprocessed frames
//! and run as a rayon fan-out joined before the scorer. A failure inside one
//! branch degrades that branch's fields to unavailable while the others
//! proceed; only preprocessing failures and the processing deadline abort
//! the invocation.

use tracing::{info, warn};

use crate::cadence::{estimate_cadence, CadenceStats};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Deadline};
use crate::events::{detect_events, tally};
use crate::pitch::{track_pitch, PitchStats};
use crate::preprocess::preprocess;
use crate::quality::score;
use crate::report::AnalysisReport;

/// Analyze one decoded mono clip and produce the biomarker report.
///
/// The invocation owns no state beyond its own buffers; everything is
/// dropped on return, success or not.
///
/// # Errors
///
/// - [`AnalysisError::InvalidConfig`] for a configuration that cannot
///   produce meaningful analysis
/// - [`AnalysisError::UnsupportedFormat`] for inputs the engine cannot
///   accept (sample rate below the minimum, empty or non-finite samples)
/// - [`AnalysisError::ProcessingTimeout`] when the configured budget runs
///   out; retryable with a shorter clip or a larger budget
///
/// Silent input is not an error at this level: it yields the baseline
/// report with `null` measurements and zero counts.
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;
    let deadline = Deadline::new(config.max_processing);

    let pre = match preprocess(samples, sample_rate, &config.frame, &deadline) {
        Ok(pre) => pre,
        Err(AnalysisError::SilentInput) => {
            info!("no measurable signal, returning baseline report");
            return Ok(AnalysisReport::silent(&config.insights));
        }
        Err(e) => return Err(e),
    };

    // Fan-out: the three branches share the read-only frames and merge only
    // at this join point
    let ((pitch_result, cadence_result), events_result) = rayon::join(
        || {
            rayon::join(
                || track_pitch(&pre, &config.pitch, &deadline),
                || estimate_cadence(&pre, &config.cadence, &deadline),
            )
        },
        || detect_events(&pre, &config.events, &deadline),
    );

    let pitch = unwrap_branch("pitch", pitch_result, || {
        PitchStats {
            f0_per_frame: vec![None; pre.frames.len()],
            ..Default::default()
        }
    })?;
    let cadence = unwrap_branch("cadence", cadence_result, CadenceStats::default)?;
    let events = unwrap_branch("events", events_result, Vec::new)?;
    let (cough_count, sneeze_count) = tally(&events);

    let labels = score(&pitch, cadence.wpm, &config.quality);
    let report = AnalysisReport::assemble(
        &pitch,
        &cadence,
        cough_count,
        sneeze_count,
        &labels,
        &config.insights,
    );

    info!(
        "analyzed {:.1}s clip: cadence {:?}, pitch {:?} Hz, {} coughs, {} sneezes",
        pre.duration_secs, report.cadence, report.pitch_mean, cough_count, sneeze_count
    );

    Ok(report)
}

/// Branch isolation: timeout aborts the invocation, any other branch error
/// degrades to the branch's empty result with a warning.
fn unwrap_branch<T>(
    name: &str,
    result: Result<T, AnalysisError>,
    fallback: impl FnOnce() -> T,
) -> Result<T, AnalysisError> {
    match result {
        Ok(value) => Ok(value),
        Err(e @ AnalysisError::ProcessingTimeout { .. }) => Err(e),
        Err(e) => {
            warn!("{} branch failed, degrading to unavailable: {}", name, e);
            Ok(fallback())
        }
    }
}
