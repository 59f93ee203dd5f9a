//! Waveform preprocessing: validation, DC removal, peak normalization,
//! framing, and per-frame energy/spectral features.
//!
//! Everything downstream reads the [`Preprocessed`] output; no later stage
//! touches the raw input again.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use tracing::debug;

use crate::config::FrameConfig;
use crate::error::{AnalysisError, Deadline};
use crate::percentile;

/// How often the frame loop consults the processing deadline
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Epsilon guarding logs and divisions over the power spectrum
const SPECTRUM_EPSILON: f32 = 1e-12;

/// Per-frame features derived from the normalized waveform
#[derive(Debug, Clone)]
pub struct FrameFeatures {
    /// Start of the frame in seconds
    pub start_secs: f32,
    /// RMS energy of the frame
    pub energy: f32,
    /// Whether the frame clears the adaptive voicing threshold
    pub is_voiced: bool,
    /// Geometric over arithmetic mean of the power spectrum (0.0-1.0);
    /// near 1 for broadband noise, near 0 for tonal content
    pub spectral_flatness: f32,
    /// Magnitude-weighted mean frequency (Hz)
    pub spectral_centroid: f32,
}

/// Output of the preprocessor: the normalized signal plus ordered frame
/// features. Owned by a single invocation and dropped when it ends.
#[derive(Debug)]
pub struct Preprocessed {
    /// DC-free, peak-normalized samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Clip duration in seconds
    pub duration_secs: f32,
    /// Frame features in temporal order
    pub frames: Vec<FrameFeatures>,
    /// Window length in samples
    pub window_len: usize,
    /// Hop length in samples
    pub hop_len: usize,
    /// The adaptive voicing threshold that was applied (RMS)
    pub voicing_threshold: f32,
}

impl Preprocessed {
    /// Hop duration in seconds
    pub fn hop_secs(&self) -> f32 {
        self.hop_len as f32 / self.sample_rate as f32
    }

    /// Time of a frame's center in seconds, clamped to the clip
    pub fn frame_center_secs(&self, index: usize) -> f32 {
        let center = (index * self.hop_len + self.window_len / 2) as f32 / self.sample_rate as f32;
        center.min(self.duration_secs)
    }
}

/// Validate, condition, and frame one decoded mono waveform.
///
/// Returns [`AnalysisError::UnsupportedFormat`] for inputs the engine cannot
/// analyze and [`AnalysisError::SilentInput`] when the clip carries no
/// measurable signal.
pub fn preprocess(
    samples: &[f32],
    sample_rate: u32,
    config: &FrameConfig,
    deadline: &Deadline,
) -> Result<Preprocessed, AnalysisError> {
    if sample_rate < config.min_sample_rate {
        return Err(AnalysisError::UnsupportedFormat(format!(
            "sample rate {} Hz below supported minimum {} Hz",
            sample_rate, config.min_sample_rate
        )));
    }
    if samples.is_empty() {
        return Err(AnalysisError::UnsupportedFormat(
            "empty waveform".to_string(),
        ));
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(AnalysisError::UnsupportedFormat(
            "waveform contains non-finite samples".to_string(),
        ));
    }
    deadline.check()?;

    // Remove DC bias
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    let mut conditioned: Vec<f32> = samples.iter().map(|s| s - mean).collect();

    // Peak check doubles as the silence gate: normalizing a clip with no
    // signal would just amplify noise into nonsense
    let peak = conditioned.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak < config.silence_peak {
        return Err(AnalysisError::SilentInput);
    }
    let scale = config.normalization_peak / peak;
    for s in &mut conditioned {
        *s *= scale;
    }

    let window_len = ((config.window_secs * sample_rate as f32).round() as usize).max(1);
    let hop_len = ((config.hop_secs * sample_rate as f32).round() as usize).max(1);

    let n_frames = if conditioned.len() >= window_len {
        1 + (conditioned.len() - window_len) / hop_len
    } else {
        // Clips shorter than one window still produce a single frame
        // covering the whole clip
        1
    };

    let fft_size = window_len.next_power_of_two();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = hann_window(window_len);
    let mut fft_buffer = vec![Complex::new(0.0f32, 0.0); fft_size];

    let freq_resolution = sample_rate as f32 / fft_size as f32;
    let mut frames = Vec::with_capacity(n_frames);

    for frame_idx in 0..n_frames {
        if frame_idx % DEADLINE_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }

        let start = frame_idx * hop_len;
        let end = (start + window_len).min(conditioned.len());
        let slice = &conditioned[start..end];

        let energy = rms(slice);

        // Windowed, zero-padded FFT input
        fft_buffer.fill(Complex::new(0.0, 0.0));
        for (i, &sample) in slice.iter().enumerate() {
            fft_buffer[i] = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut fft_buffer);

        let (spectral_flatness, spectral_centroid) =
            spectral_features(&fft_buffer[..fft_size / 2], freq_resolution);

        frames.push(FrameFeatures {
            start_secs: start as f32 / sample_rate as f32,
            energy,
            is_voiced: false,
            spectral_flatness,
            spectral_centroid,
        });
    }

    // Voicing threshold adapts to the clip's own energy distribution; the
    // absolute floor keeps digital silence out even when the percentile
    // lands at zero
    let energies: Vec<f32> = frames.iter().map(|f| f.energy).collect();
    let voicing_threshold =
        percentile(&energies, config.voicing_percentile).max(config.voicing_energy_floor);
    for frame in &mut frames {
        frame.is_voiced = frame.energy > voicing_threshold;
    }

    let voiced_count = frames.iter().filter(|f| f.is_voiced).count();
    debug!(
        "preprocessed {} samples at {} Hz into {} frames ({} voiced, threshold {:.4})",
        samples.len(),
        sample_rate,
        frames.len(),
        voiced_count,
        voicing_threshold
    );

    Ok(Preprocessed {
        duration_secs: conditioned.len() as f32 / sample_rate as f32,
        samples: conditioned,
        sample_rate,
        frames,
        window_len,
        hop_len,
        voicing_threshold,
    })
}

/// RMS of a slice; 0.0 for an empty slice
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Hann window of the given length
fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (len - 1) as f32).cos()))
        .collect()
}

/// Spectral flatness and centroid over the positive-frequency bins.
///
/// The DC bin is skipped so a residual offset cannot masquerade as
/// low-frequency content.
fn spectral_features(spectrum: &[Complex<f32>], freq_resolution: f32) -> (f32, f32) {
    let bins = &spectrum[1..];
    if bins.is_empty() {
        return (0.0, 0.0);
    }

    let mut log_power_sum = 0.0f32;
    let mut power_sum = 0.0f32;
    let mut magnitude_sum = 0.0f32;
    let mut weighted_freq_sum = 0.0f32;

    for (i, c) in bins.iter().enumerate() {
        let power = c.re * c.re + c.im * c.im;
        let magnitude = power.sqrt();
        let freq = (i + 1) as f32 * freq_resolution;

        log_power_sum += (power + SPECTRUM_EPSILON).ln();
        power_sum += power;
        magnitude_sum += magnitude;
        weighted_freq_sum += freq * magnitude;
    }

    let n = bins.len() as f32;
    let geometric_mean = (log_power_sum / n).exp();
    let arithmetic_mean = power_sum / n + SPECTRUM_EPSILON;
    let flatness = (geometric_mean / arithmetic_mean).clamp(0.0, 1.0);

    let centroid = if magnitude_sum > 1e-10 {
        weighted_freq_sum / magnitude_sum
    } else {
        0.0
    };

    (flatness, centroid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn far_deadline() -> Deadline {
        Deadline::new(Duration::from_secs(60))
    }

    /// Generate a sine wave at a given frequency
    fn generate_sine(freq: f32, sample_rate: u32, duration_ms: u32, amplitude: f32) -> Vec<f32> {
        let num_samples = (sample_rate * duration_ms / 1000) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * freq * t).sin() * amplitude
            })
            .collect()
    }

    /// Generate noise via a linear congruential generator
    fn generate_noise(sample_rate: u32, duration_ms: u32, amplitude: f32) -> Vec<f32> {
        let num_samples = (sample_rate * duration_ms / 1000) as usize;
        let mut seed = 12345u32;
        (0..num_samples)
            .map(|_| {
                seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                ((seed >> 16) as f32 / 32768.0 - 1.0) * amplitude
            })
            .collect()
    }

    #[test]
    fn test_rejects_low_sample_rate() {
        let samples = generate_sine(150.0, 2000, 500, 0.5);
        let result = preprocess(&samples, 2000, &FrameConfig::default(), &far_deadline());
        assert!(matches!(
            result,
            Err(AnalysisError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_empty_waveform() {
        let result = preprocess(&[], 16000, &FrameConfig::default(), &far_deadline());
        assert!(matches!(
            result,
            Err(AnalysisError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite_samples() {
        let mut samples = generate_sine(150.0, 16000, 100, 0.5);
        samples[42] = f32::NAN;
        let result = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline());
        assert!(matches!(
            result,
            Err(AnalysisError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_silence_is_terminal() {
        let samples = vec![0.0; 16000];
        let result = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline());
        assert!(matches!(result, Err(AnalysisError::SilentInput)));
    }

    #[test]
    fn test_frame_count_and_layout() {
        let samples = generate_sine(150.0, 16000, 1000, 0.5);
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();

        assert_eq!(pre.window_len, 400); // 25ms at 16kHz
        assert_eq!(pre.hop_len, 160); // 10ms at 16kHz
        assert_eq!(pre.frames.len(), 1 + (16000 - 400) / 160);
        assert!((pre.duration_secs - 1.0).abs() < 1e-3);

        // Frames are temporally ordered
        for pair in pre.frames.windows(2) {
            assert!(pair[0].start_secs < pair[1].start_secs);
        }
    }

    #[test]
    fn test_short_clip_yields_single_frame() {
        // 200 samples is shorter than the 400-sample window
        let samples = generate_sine(150.0, 16000, 12, 0.5);
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();
        assert_eq!(pre.frames.len(), 1);
        assert_eq!(pre.frames[0].start_secs, 0.0);
        assert!(pre.frames[0].energy > 0.0);
    }

    #[test]
    fn test_dc_offset_removed_and_peak_normalized() {
        let samples: Vec<f32> = generate_sine(150.0, 16000, 500, 0.4)
            .iter()
            .map(|s| s + 0.2)
            .collect();
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();

        let mean = pre.samples.iter().sum::<f32>() / pre.samples.len() as f32;
        assert!(mean.abs() < 1e-3, "expected DC-free output, mean {}", mean);

        let peak = pre.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-3, "expected 0.95 peak, got {}", peak);
    }

    #[test]
    fn test_sine_frames_are_voiced_and_tonal() {
        let samples = generate_sine(150.0, 16000, 1000, 0.5);
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();

        let voiced = pre.frames.iter().filter(|f| f.is_voiced).count();
        assert!(
            voiced as f32 / pre.frames.len() as f32 > 0.6,
            "expected mostly voiced frames, got {}/{}",
            voiced,
            pre.frames.len()
        );

        // A pure tone concentrates power in a few bins
        let mean_flatness: f32 = pre.frames.iter().map(|f| f.spectral_flatness).sum::<f32>()
            / pre.frames.len() as f32;
        assert!(
            mean_flatness < 0.2,
            "expected low flatness for a tone, got {}",
            mean_flatness
        );
    }

    #[test]
    fn test_noise_frames_are_broadband() {
        let samples = generate_noise(16000, 1000, 0.3);
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();

        let mean_flatness: f32 = pre.frames.iter().map(|f| f.spectral_flatness).sum::<f32>()
            / pre.frames.len() as f32;
        assert!(
            mean_flatness > 0.4,
            "expected high flatness for noise, got {}",
            mean_flatness
        );
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let low = generate_sine(200.0, 16000, 500, 0.5);
        let high = generate_sine(3000.0, 16000, 500, 0.5);
        let config = FrameConfig::default();

        let pre_low = preprocess(&low, 16000, &config, &far_deadline()).unwrap();
        let pre_high = preprocess(&high, 16000, &config, &far_deadline()).unwrap();

        let centroid = |pre: &Preprocessed| {
            pre.frames.iter().map(|f| f.spectral_centroid).sum::<f32>() / pre.frames.len() as f32
        };
        let c_low = centroid(&pre_low);
        let c_high = centroid(&pre_high);
        assert!(
            c_high > c_low + 1000.0,
            "expected centroid to follow frequency: low {} Hz, high {} Hz",
            c_low,
            c_high
        );
    }

    #[test]
    fn test_voicing_adapts_to_clip_loudness() {
        let loud = generate_sine(150.0, 16000, 1000, 0.8);
        let quiet = generate_sine(150.0, 16000, 1000, 0.05);
        let config = FrameConfig::default();

        let voiced_ratio = |samples: &[f32]| {
            let pre = preprocess(samples, 16000, &config, &far_deadline()).unwrap();
            pre.frames.iter().filter(|f| f.is_voiced).count() as f32 / pre.frames.len() as f32
        };

        let loud_ratio = voiced_ratio(&loud);
        let quiet_ratio = voiced_ratio(&quiet);
        assert!(
            (loud_ratio - quiet_ratio).abs() < 0.1,
            "voicing should be loudness-invariant: loud {}, quiet {}",
            loud_ratio,
            quiet_ratio
        );
    }

    #[test]
    fn test_zero_budget_times_out() {
        let samples = generate_sine(150.0, 16000, 1000, 0.5);
        let deadline = Deadline::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1));
        let result = preprocess(&samples, 16000, &FrameConfig::default(), &deadline);
        assert!(matches!(
            result,
            Err(AnalysisError::ProcessingTimeout { .. })
        ));
    }

    #[test]
    fn test_frame_center_clamped_to_clip() {
        let samples = generate_sine(150.0, 16000, 30, 0.5);
        let pre = preprocess(&samples, 16000, &FrameConfig::default(), &far_deadline()).unwrap();
        for i in 0..pre.frames.len() {
            let center = pre.frame_center_secs(i);
            assert!(center >= 0.0 && center <= pre.duration_secs);
        }
    }
}
