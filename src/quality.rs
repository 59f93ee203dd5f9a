//! Voice quality scorer: jitter-based tone label and WPM-based rate label.
//!
//! Purely threshold-based and deterministic. Jitter here is the relative
//! frame-to-frame F0 change (mean absolute delta over consecutive accepted
//! estimates, divided by the mean pitch), a rough stability proxy rather
//! than a clinical jitter measure.

use tracing::debug;

use crate::config::QualityConfig;
use crate::pitch::PitchStats;

/// Ordinal tone stability label
pub const TONE_STABLE: &str = "Stable";
pub const TONE_NORMAL: &str = "Normal";
pub const TONE_VARIABLE: &str = "Variable";

/// Speech-rate band label
pub const RATE_SLOW: &str = "Slow";
pub const RATE_NORMAL: &str = "Normal";
pub const RATE_FAST: &str = "Fast";
pub const RATE_UNAVAILABLE: &str = "Unavailable";

/// Labels produced by the scorer
#[derive(Debug, Clone, PartialEq)]
pub struct QualityLabels {
    pub tone_quality: &'static str,
    pub speech_rate: &'static str,
    /// The relative jitter behind the tone label, when measurable
    pub jitter: Option<f32>,
}

/// Bucket pitch stability and speaking rate into ordinal labels.
///
/// Falls back to the baseline labels ("Normal" tone, "Unavailable" rate)
/// when the underlying measurements are missing; never fails.
pub fn score(pitch: &PitchStats, wpm: Option<f32>, config: &QualityConfig) -> QualityLabels {
    let jitter = relative_jitter(pitch);
    let tone_quality = match jitter {
        Some(j) if j < config.stable_jitter => TONE_STABLE,
        Some(j) if j < config.normal_jitter => TONE_NORMAL,
        Some(_) => TONE_VARIABLE,
        None => TONE_NORMAL,
    };

    let speech_rate = match wpm {
        Some(w) if w < config.slow_wpm => RATE_SLOW,
        Some(w) if w > config.fast_wpm => RATE_FAST,
        Some(_) => RATE_NORMAL,
        None => RATE_UNAVAILABLE,
    };

    debug!(
        "quality: jitter {:?}, tone {}, rate {}",
        jitter, tone_quality, speech_rate
    );

    QualityLabels {
        tone_quality,
        speech_rate,
        jitter,
    }
}

/// Mean absolute f0 delta over consecutive accepted estimates, relative to
/// the mean pitch.
///
/// Only deltas between temporally adjacent estimates count; a pitch reset
/// across an unvoiced stretch is not jitter.
fn relative_jitter(pitch: &PitchStats) -> Option<f32> {
    let mean = pitch.mean_hz?;
    if mean <= 0.0 {
        return None;
    }

    let mut delta_sum = 0.0f32;
    let mut delta_count = 0usize;
    for pair in pitch.f0_per_frame.windows(2) {
        if let (Some(a), Some(b)) = (pair[0], pair[1]) {
            delta_sum += (b - a).abs();
            delta_count += 1;
        }
    }

    if delta_count == 0 {
        return None;
    }
    let jitter = delta_sum / delta_count as f32 / mean;
    jitter.is_finite().then_some(jitter)
}
