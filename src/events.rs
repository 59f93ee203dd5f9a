//! Respiratory event detector: coughs and sneezes as short broadband bursts.
//!
//! ## Algorithm
//! 1. Flag frames whose energy exceeds an adaptive burst threshold (a high
//!    percentile of the clip's own energy distribution) AND whose spectral
//!    flatness exceeds a broadness gate. The flatness gate is what separates
//!    impulsive broadband noise from equally loud tonal speech.
//! 2. Group consecutive flagged frames into candidates.
//! 3. Enforce duration bounds: sub-minimum blips are detector noise, and
//!    anything past the respiratory ceiling is sustained speech or
//!    background, not a single cough or sneeze.
//! 4. Classify by duration and spectral centroid: sneezes are shorter with a
//!    higher centroid, coughs longer with a lower or broader one. This is a
//!    documented heuristic, not a trained classifier.
//!
//! The detector scans the full clip, voiced and unvoiced regions alike;
//! coughs happen outside speech.

use serde::Serialize;
use tracing::debug;

use crate::config::EventConfig;
use crate::error::{AnalysisError, Deadline};
use crate::percentile;
use crate::preprocess::Preprocessed;

/// Event classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Cough,
    Sneeze,
}

/// One detected respiratory occurrence
#[derive(Debug, Clone, Serialize)]
pub struct RespiratoryEvent {
    /// Start of the event in seconds
    pub start_secs: f32,
    /// Event duration in seconds
    pub duration_secs: f32,
    /// Highest frame RMS inside the event
    pub peak_energy: f32,
    /// Mean spectral centroid over the event's frames (Hz)
    pub spectral_centroid: f32,
    pub kind: EventKind,
}

impl RespiratoryEvent {
    pub fn end_secs(&self) -> f32 {
        self.start_secs + self.duration_secs
    }
}

/// Scan all frames for impulsive broadband bursts and classify them.
///
/// Returns events in temporal order.
pub fn detect_events(
    pre: &Preprocessed,
    config: &EventConfig,
    deadline: &Deadline,
) -> Result<Vec<RespiratoryEvent>, AnalysisError> {
    deadline.check()?;

    let energies: Vec<f32> = pre.frames.iter().map(|f| f.energy).collect();
    let burst_threshold =
        percentile(&energies, config.energy_percentile).max(config.energy_floor);

    // Consecutive flagged frames become candidate runs
    let mut events = Vec::new();
    let mut run_start: Option<usize> = None;

    for idx in 0..=pre.frames.len() {
        let flagged = pre.frames.get(idx).is_some_and(|f| {
            f.energy > burst_threshold && f.spectral_flatness > config.min_flatness
        });

        match (run_start, flagged) {
            (None, true) => run_start = Some(idx),
            (Some(start), false) => {
                deadline.check()?;
                if let Some(event) = build_event(pre, config, start, idx) {
                    events.push(event);
                }
                run_start = None;
            }
            _ => {}
        }
    }

    debug!(
        "event scan: burst threshold {:.3}, {} events ({} coughs, {} sneezes)",
        burst_threshold,
        events.len(),
        events.iter().filter(|e| e.kind == EventKind::Cough).count(),
        events.iter().filter(|e| e.kind == EventKind::Sneeze).count(),
    );

    Ok(events)
}

/// Tally events by classification: (cough_count, sneeze_count)
pub fn tally(events: &[RespiratoryEvent]) -> (u32, u32) {
    let coughs = events.iter().filter(|e| e.kind == EventKind::Cough).count() as u32;
    let sneezes = events.iter().filter(|e| e.kind == EventKind::Sneeze).count() as u32;
    (coughs, sneezes)
}

/// Apply duration bounds and classify one candidate run of frames
/// `[start, end)`.
fn build_event(
    pre: &Preprocessed,
    config: &EventConfig,
    start: usize,
    end: usize,
) -> Option<RespiratoryEvent> {
    let hop_secs = pre.hop_secs();
    let window_secs = pre.window_len as f32 / pre.sample_rate as f32;

    let start_secs = start as f32 * hop_secs;
    let end_secs = ((end - 1) as f32 * hop_secs + window_secs).min(pre.duration_secs);
    let duration_secs = end_secs - start_secs;

    if duration_secs < config.min_duration_secs || duration_secs > config.max_duration_secs {
        return None;
    }

    let frames = &pre.frames[start..end];
    let peak_energy = frames.iter().fold(0.0f32, |acc, f| acc.max(f.energy));
    let spectral_centroid =
        frames.iter().map(|f| f.spectral_centroid).sum::<f32>() / frames.len() as f32;

    // Sneezes: shorter and higher-pitched spectrally; everything else coughs
    let kind = if duration_secs < config.sneeze_max_duration_secs
        && spectral_centroid > config.sneeze_min_centroid_hz
    {
        EventKind::Sneeze
    } else {
        EventKind::Cough
    };

    Some(RespiratoryEvent {
        start_secs,
        duration_secs,
        peak_energy,
        spectral_centroid,
        kind,
    })
}
