//! Cadence estimator: speaking rate without transcription.
//!
//! ## Algorithm
//! 1. Merge contiguous voiced frames into speech segments, closing silence
//!    gaps shorter than the configured maximum so micro-pauses inside one
//!    utterance do not split it
//! 2. Count syllable-like events per segment by peak picking on the smoothed
//!    energy envelope: local maxima above a dynamic threshold (local mean
//!    times a configured ratio), with a minimum peak separation
//! 3. Convert syllables to words with a fixed syllables-per-word average
//! 4. WPM = words / speaking time in minutes, where speaking time is the sum
//!    of segment durations
//!
//! Total clip duration is used only for the speaking-time ratio, never for
//! WPM; a mostly-silent clip with ten seconds of fluent speech still reads
//! as fluent.

use tracing::debug;

use crate::config::CadenceConfig;
use crate::error::{AnalysisError, Deadline};
use crate::preprocess::Preprocessed;

/// Contiguous run of voiced frames after gap-closing
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    /// Start of the segment in seconds
    pub start_secs: f32,
    /// End of the segment in seconds (exclusive)
    pub end_secs: f32,
    /// Frame index range [start, end) into the feature sequence
    pub frame_range: (usize, usize),
}

impl SpeechSegment {
    pub fn duration_secs(&self) -> f32 {
        self.end_secs - self.start_secs
    }
}

/// Aggregated speaking-rate statistics
#[derive(Debug, Clone, Default)]
pub struct CadenceStats {
    /// Speech segments in temporal order
    pub segments: Vec<SpeechSegment>,
    /// Syllable-like peaks counted across all segments
    pub syllable_count: usize,
    /// Estimated words per minute; `None` when there is no speaking time
    pub wpm: Option<f32>,
    /// Sum of segment durations in seconds
    pub speaking_time_secs: f32,
    /// speaking_time / clip_duration, in [0, 1]; 0.0 for silent clips
    pub speaking_time_ratio: f32,
}

/// Estimate speaking rate from the voiced-frame sequence.
pub fn estimate_cadence(
    pre: &Preprocessed,
    config: &CadenceConfig,
    deadline: &Deadline,
) -> Result<CadenceStats, AnalysisError> {
    deadline.check()?;

    let segments = merge_segments(pre, config);
    let speaking_time_secs: f32 = segments.iter().map(|s| s.duration_secs()).sum();

    if segments.is_empty() || speaking_time_secs <= 0.0 {
        debug!("no speech segments found, cadence unavailable");
        return Ok(CadenceStats::default());
    }

    let envelope = smooth_energy(pre, config.smoothing_frames);
    let min_peak_gap_frames =
        ((config.min_peak_gap_secs / pre.hop_secs()).round() as usize).max(1);

    let mut syllable_count = 0;
    for segment in &segments {
        deadline.check()?;
        syllable_count += count_peaks(
            &envelope[segment.frame_range.0..segment.frame_range.1],
            config.peak_threshold_ratio,
            config.peak_context_frames,
            min_peak_gap_frames,
        );
    }

    let words = syllable_count as f32 / config.syllables_per_word;
    let wpm = words / (speaking_time_secs / 60.0);
    let speaking_time_ratio = (speaking_time_secs / pre.duration_secs).clamp(0.0, 1.0);

    debug!(
        "cadence: {} segments, {} syllable peaks, {:.1}s speaking time, {:.0} WPM",
        segments.len(),
        syllable_count,
        speaking_time_secs,
        wpm
    );

    Ok(CadenceStats {
        segments,
        syllable_count,
        wpm: Some(wpm),
        speaking_time_secs,
        speaking_time_ratio,
    })
}

/// Merge voiced runs into segments, closing gaps shorter than the configured
/// maximum.
fn merge_segments(pre: &Preprocessed, config: &CadenceConfig) -> Vec<SpeechSegment> {
    let max_gap_frames = (config.max_gap_secs / pre.hop_secs()).round() as usize;
    let hop_secs = pre.hop_secs();
    let window_secs = pre.window_len as f32 / pre.sample_rate as f32;

    let mut segments: Vec<SpeechSegment> = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut last_voiced = 0usize;

    for (idx, frame) in pre.frames.iter().enumerate() {
        if frame.is_voiced {
            match run_start {
                None => run_start = Some(idx),
                Some(_) if idx - last_voiced > max_gap_frames + 1 => {
                    // Gap too wide: close out the previous segment
                    segments.push(make_segment(
                        run_start.take().unwrap_or(idx),
                        last_voiced,
                        hop_secs,
                        window_secs,
                        pre.duration_secs,
                    ));
                    run_start = Some(idx);
                }
                Some(_) => {}
            }
            last_voiced = idx;
        }
    }
    if let Some(start) = run_start {
        segments.push(make_segment(
            start,
            last_voiced,
            hop_secs,
            window_secs,
            pre.duration_secs,
        ));
    }
    segments
}

fn make_segment(
    start_frame: usize,
    last_frame: usize,
    hop_secs: f32,
    window_secs: f32,
    clip_duration: f32,
) -> SpeechSegment {
    let start_secs = start_frame as f32 * hop_secs;
    let end_secs = (last_frame as f32 * hop_secs + window_secs).min(clip_duration);
    SpeechSegment {
        start_secs,
        end_secs,
        frame_range: (start_frame, last_frame + 1),
    }
}

/// Moving-average smoothing of the frame-energy envelope
fn smooth_energy(pre: &Preprocessed, width: usize) -> Vec<f32> {
    let width = width.max(1);
    let half = width / 2;
    let n = pre.frames.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            pre.frames[lo..hi].iter().map(|f| f.energy).sum::<f32>() / (hi - lo) as f32
        })
        .collect()
}

/// Count local maxima above the dynamic threshold with a minimum separation.
///
/// The threshold at each candidate is the mean of a local context window
/// scaled by the configured ratio, so loud and quiet passages are judged
/// against their own surroundings.
fn count_peaks(
    envelope: &[f32],
    threshold_ratio: f32,
    context_frames: usize,
    min_gap_frames: usize,
) -> usize {
    if envelope.len() < 3 {
        // A run this short is at most one syllable
        return usize::from(!envelope.is_empty());
    }

    let mut count = 0;
    let mut last_peak: Option<usize> = None;

    for i in 1..envelope.len() - 1 {
        // Local maximum
        if envelope[i] <= envelope[i - 1] || envelope[i] < envelope[i + 1] {
            continue;
        }

        let lo = i.saturating_sub(context_frames);
        let hi = (i + context_frames + 1).min(envelope.len());
        let local_mean = envelope[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;
        if envelope[i] < local_mean * threshold_ratio {
            continue;
        }

        if let Some(prev) = last_peak {
            if i - prev < min_gap_frames {
                continue;
            }
        }
        last_peak = Some(i);
        count += 1;
    }

    // A voiced run with no qualifying peak (e.g. flat sustained energy)
    // still represents at least one syllable-like event
    count.max(1)
}
