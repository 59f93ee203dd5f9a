//! Pitch tracker: per-voiced-frame F0 estimation and aggregation.
//!
//! ## Algorithm
//! 1. Center a pitch analysis window (larger than the feature frames, so the
//!    detector sees several glottal periods) on each voiced frame
//! 2. Run the McLeod pitch method on the window
//! 3. Reject estimates outside the human-voice band or with poor clarity
//! 4. Aggregate mean / sample standard deviation / range over what remains
//!
//! Unvoiced frames are excluded from the statistics, never assigned f0 = 0;
//! zero would bias the mean downward.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;
use tracing::debug;

use crate::config::PitchConfig;
use crate::error::{AnalysisError, Deadline};
use crate::preprocess::Preprocessed;

/// How often the frame loop consults the processing deadline
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Aggregated fundamental-frequency statistics over the voiced frames
#[derive(Debug, Clone, Default)]
pub struct PitchStats {
    /// Accepted f0 estimate per frame, index-aligned with the feature
    /// frames; `None` for unvoiced or rejected frames
    pub f0_per_frame: Vec<Option<f32>>,
    /// Arithmetic mean of accepted estimates (Hz)
    pub mean_hz: Option<f32>,
    /// Sample standard deviation of accepted estimates (Hz)
    pub std_hz: Option<f32>,
    /// Max minus min accepted estimate (Hz)
    pub range_hz: Option<f32>,
}

impl PitchStats {
    fn unavailable(n_frames: usize) -> Self {
        Self {
            f0_per_frame: vec![None; n_frames],
            ..Default::default()
        }
    }
}

/// Estimate f0 for each voiced frame and aggregate.
///
/// Returns unavailable statistics (all `None`) when fewer than
/// `min_estimates` frames yield an accepted pitch; the sample standard
/// deviation needs at least two points.
pub fn track_pitch(
    pre: &Preprocessed,
    config: &PitchConfig,
    deadline: &Deadline,
) -> Result<PitchStats, AnalysisError> {
    let window_len = ((config.window_secs * pre.sample_rate as f32).round() as usize).max(2);
    if pre.samples.len() < window_len {
        debug!(
            "clip shorter than the {}-sample pitch window, pitch unavailable",
            window_len
        );
        return Ok(PitchStats::unavailable(pre.frames.len()));
    }

    let mut detector = McLeodDetector::new(window_len, window_len / 2);
    let mut f0_per_frame = vec![None; pre.frames.len()];
    let mut estimates = Vec::new();

    for (idx, frame) in pre.frames.iter().enumerate() {
        if idx % DEADLINE_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }
        if !frame.is_voiced {
            continue;
        }

        // Pitch window centered on the feature frame, clamped to the clip
        let center = idx * pre.hop_len + pre.window_len / 2;
        let start = center
            .saturating_sub(window_len / 2)
            .min(pre.samples.len() - window_len);
        let window = &pre.samples[start..start + window_len];

        if let Some(pitch) = detector.get_pitch(
            window,
            pre.sample_rate as usize,
            config.power_threshold,
            config.clarity_threshold,
        ) {
            if pitch.frequency >= config.min_frequency && pitch.frequency <= config.max_frequency {
                f0_per_frame[idx] = Some(pitch.frequency);
                estimates.push(pitch.frequency);
            }
        }
    }

    if estimates.len() < config.min_estimates {
        debug!(
            "only {} accepted pitch estimates (need {}), pitch unavailable",
            estimates.len(),
            config.min_estimates
        );
        return Ok(PitchStats {
            f0_per_frame,
            ..Default::default()
        });
    }

    let mean = estimates.iter().sum::<f32>() / estimates.len() as f32;
    // Sample standard deviation: n-1 denominator
    let variance = estimates.iter().map(|f| (f - mean).powi(2)).sum::<f32>()
        / (estimates.len() - 1) as f32;
    let std = variance.sqrt();

    let min = estimates.iter().fold(f32::INFINITY, |acc, &f| acc.min(f));
    let max = estimates.iter().fold(f32::NEG_INFINITY, |acc, &f| acc.max(f));
    let range = max - min;

    // A NaN here is a computation defect, not a measurement; surface it as
    // a typed error so the branch degrades instead of serializing it
    if !mean.is_finite() || !std.is_finite() || !range.is_finite() {
        return Err(AnalysisError::InternalComputationError(format!(
            "non-finite pitch aggregate: mean {}, std {}, range {}",
            mean, std, range
        )));
    }

    debug!(
        "pitch: {} estimates, mean {:.1} Hz, std {:.1} Hz, range {:.1} Hz",
        estimates.len(),
        mean,
        std,
        range
    );

    Ok(PitchStats {
        f0_per_frame,
        mean_hz: Some(mean),
        std_hz: Some(std),
        range_hz: Some(range),
    })
}
