//! Report assembly: the final record plus the templated insight string.
//!
//! Field names are fixed for compatibility with the existing UI. `null`
//! means a measurement was unavailable; `0` is a legitimate count and never
//! stands in for missing data.

use serde::{Deserialize, Serialize};

use crate::cadence::CadenceStats;
use crate::config::InsightConfig;
use crate::pitch::PitchStats;
use crate::quality::{QualityLabels, RATE_UNAVAILABLE, TONE_NORMAL, TONE_VARIABLE};

/// Insight emitted when no threshold fires
const BASELINE_INSIGHT: &str =
    "Voice analysis indicates normal speech patterns and vocal health.";

/// The final analysis report, serialized as-is for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Estimated speaking rate in words per minute
    pub cadence: Option<f32>,
    /// Mean fundamental frequency over voiced frames (Hz)
    pub pitch_mean: Option<f32>,
    /// Sample standard deviation of f0 (Hz)
    pub pitch_std: Option<f32>,
    /// Max minus min accepted f0 (Hz)
    pub pitch_range: Option<f32>,
    /// Fraction of the clip spent speaking, in [0, 1]
    pub speaking_time_ratio: f32,
    pub cough_count: u32,
    pub sneeze_count: u32,
    /// Pitch-stability label: "Stable" / "Normal" / "Variable"
    pub tone_quality: String,
    /// Speaking-rate label: "Slow" / "Normal" / "Fast" / "Unavailable"
    pub speech_rate: String,
    /// Templated narrative summary
    pub health_insights: String,
}

impl AnalysisReport {
    /// Combine branch outputs into the final record. Never fails: every
    /// unavailable upstream field stays `None` and its insight clause is
    /// omitted.
    pub fn assemble(
        pitch: &PitchStats,
        cadence: &CadenceStats,
        cough_count: u32,
        sneeze_count: u32,
        labels: &QualityLabels,
        config: &InsightConfig,
    ) -> Self {
        let mut report = Self {
            cadence: cadence.wpm,
            pitch_mean: pitch.mean_hz,
            pitch_std: pitch.std_hz,
            pitch_range: pitch.range_hz,
            speaking_time_ratio: cadence.speaking_time_ratio,
            cough_count,
            sneeze_count,
            tone_quality: labels.tone_quality.to_string(),
            speech_rate: labels.speech_rate.to_string(),
            health_insights: String::new(),
        };
        report.health_insights = build_insights(&report, config);
        report
    }

    /// Baseline report for a clip with no measurable signal.
    pub fn silent(config: &InsightConfig) -> Self {
        let mut report = Self {
            cadence: None,
            pitch_mean: None,
            pitch_std: None,
            pitch_range: None,
            speaking_time_ratio: 0.0,
            cough_count: 0,
            sneeze_count: 0,
            tone_quality: TONE_NORMAL.to_string(),
            speech_rate: RATE_UNAVAILABLE.to_string(),
            health_insights: String::new(),
        };
        report.health_insights = build_insights(&report, config);
        report
    }
}

/// Select insight sentences from the numeric fields.
///
/// A pure function of the report: each clause fires on its threshold,
/// clauses for unavailable fields are skipped, and the fixed order below is
/// the join order. No clause fired means the baseline sentence.
fn build_insights(report: &AnalysisReport, config: &InsightConfig) -> String {
    let mut clauses: Vec<&str> = Vec::new();

    if let Some(wpm) = report.cadence {
        if wpm < config.slow_cadence_wpm {
            clauses.push("Slow speech rate may indicate fatigue or respiratory issues.");
        } else if wpm > config.fast_cadence_wpm {
            clauses.push("Rapid speech rate detected, possibly indicating anxiety or excitement.");
        }
    }

    if report.cough_count > config.cough_alert_count {
        clauses.push("Frequent coughing detected, consider monitoring respiratory health.");
    }
    if report.sneeze_count > config.sneeze_alert_count {
        clauses.push("Multiple sneezes detected, may indicate allergic response.");
    }

    if report.tone_quality == TONE_VARIABLE {
        clauses.push("Voice quality indicates possible vocal cord irritation or fatigue.");
    }

    if let Some(std) = report.pitch_std {
        if std < config.low_pitch_std_hz {
            clauses.push("Limited pitch variation may indicate monotone speech or vocal fatigue.");
        } else if std > config.high_pitch_std_hz {
            clauses.push("High pitch variation detected, indicating expressive speech patterns.");
        }
    }

    if clauses.is_empty() {
        BASELINE_INSIGHT.to_string()
    } else {
        clauses.join(" ")
    }
}
