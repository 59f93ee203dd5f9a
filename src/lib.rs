//! Voice Biomarker Analysis Engine
//!
//! Extracts descriptive vocal biomarkers from a complete, decoded mono PCM
//! clip: speech cadence (words per minute, without transcription),
//! fundamental frequency statistics, respiratory event counts (coughs and
//! sneezes), and threshold-based tone/speech-rate labels, combined into a
//! single serializable report with a templated narrative summary.
//!
//! ## Pipeline
//!
//! ```text
//!  mono PCM + sample rate
//!          |
//!          v
//!    Preprocessor (DC removal, peak normalization, framing, voicing)
//!          |
//!    FrameFeatures (read-only)
//!          |
//!     ┌────┼─────────┐
//!     v    v         v
//!   Pitch  Cadence  Events      (independent parallel branches)
//!     |    |         |
//!     └────┼─────────┘
//!          v
//!    Quality Scorer (jitter + label bucketing)
//!          |
//!          v
//!    Report Assembler ──> AnalysisReport (JSON)
//! ```
//!
//! The engine is synchronous and stateless: one invocation owns its
//! waveform, performs no I/O, and drops all frame buffers on exit. Container
//! decoding is the caller's job; the `analyze-wav` binary shows a hound-based
//! WAV front end standing in for the transport layer.

pub mod cadence;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod pitch;
pub mod preprocess;
pub mod quality;
pub mod report;

pub use config::AnalysisConfig;
pub use engine::analyze;
pub use error::AnalysisError;
pub use report::AnalysisReport;

/// Percentile of a sample set with linear interpolation between ranks.
///
/// Used for the adaptive voicing and burst thresholds, which must follow the
/// clip's own energy distribution rather than a fixed global constant.
pub(crate) fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f32;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}
