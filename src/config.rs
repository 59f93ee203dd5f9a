//! Configuration for the analysis engine.
//!
//! Every threshold the pipeline applies lives here with a named, documented
//! default, so deployments can tune detection behavior without touching
//! algorithm code. Durations are in seconds and frequencies in Hz; values
//! that apply to the signal itself assume the peak-normalized waveform the
//! preprocessor produces.

use std::time::Duration;

use crate::error::AnalysisError;

/// Framing and voicing configuration for the waveform preprocessor
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Analysis window length in seconds
    pub window_secs: f32,

    /// Hop between successive windows in seconds
    pub hop_secs: f32,

    /// Minimum accepted input sample rate (Hz); lower rates cannot carry
    /// the spectral band the event detector relies on
    pub min_sample_rate: u32,

    /// Peak amplitude target after normalization
    pub normalization_peak: f32,

    /// Peak amplitude below which the whole clip is treated as silent
    pub silence_peak: f32,

    /// Percentile of the frame-energy distribution used as the voicing
    /// threshold, adapting to the clip's own noise floor
    pub voicing_percentile: f32,

    /// Absolute RMS floor for voiced frames, keeping digital silence and
    /// faint dither from counting as speech
    pub voicing_energy_floor: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            window_secs: 0.025, // 400 samples at 16kHz
            hop_secs: 0.010,    // 160 samples at 16kHz
            min_sample_rate: 4000,
            normalization_peak: 0.95,
            silence_peak: 1e-4,
            voicing_percentile: 30.0,
            voicing_energy_floor: 0.01, // -40 dBFS
        }
    }
}

/// Pitch tracker configuration
#[derive(Debug, Clone)]
pub struct PitchConfig {
    /// Pitch analysis window in seconds; larger than the feature frames so
    /// the detector sees several glottal periods
    pub window_secs: f32,

    /// Lower bound of the accepted F0 band (Hz)
    pub min_frequency: f32,

    /// Upper bound of the accepted F0 band (Hz)
    pub max_frequency: f32,

    /// Power threshold passed to the McLeod detector
    pub power_threshold: f32,

    /// Clarity threshold passed to the McLeod detector (0.0-1.0)
    pub clarity_threshold: f32,

    /// Minimum number of accepted estimates for valid statistics; the
    /// sample standard deviation needs at least two points
    pub min_estimates: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            window_secs: 0.064, // 1024 samples at 16kHz
            min_frequency: 75.0,
            max_frequency: 500.0,
            power_threshold: 0.8,
            clarity_threshold: 0.5,
            min_estimates: 2,
        }
    }
}

/// Cadence estimator configuration
#[derive(Debug, Clone)]
pub struct CadenceConfig {
    /// Maximum silence gap merged into a single speech segment (seconds);
    /// micro-pauses shorter than this do not split an utterance
    pub max_gap_secs: f32,

    /// Moving-average width for the energy envelope, in frames
    pub smoothing_frames: usize,

    /// Local-mean multiplier a syllable peak must exceed
    pub peak_threshold_ratio: f32,

    /// Half-width of the local-mean window around a candidate peak, in frames
    pub peak_context_frames: usize,

    /// Minimum separation between counted peaks (seconds)
    pub min_peak_gap_secs: f32,

    /// Average syllables per word for the WPM conversion; a rough English
    /// average, not claimed as linguistically exact
    pub syllables_per_word: f32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 0.2,
            smoothing_frames: 5, // ~50ms at 10ms hop
            peak_threshold_ratio: 1.5,
            peak_context_frames: 20,
            min_peak_gap_secs: 0.1,
            syllables_per_word: 2.0,
        }
    }
}

/// Respiratory event detector configuration
#[derive(Debug, Clone)]
pub struct EventConfig {
    /// Percentile of the frame-energy distribution used as the burst
    /// threshold
    pub energy_percentile: f32,

    /// Absolute RMS floor for burst frames, so near-silent clips cannot
    /// promote their own noise floor to events
    pub energy_floor: f32,

    /// Minimum spectral flatness for a burst frame (0.0-1.0); separates
    /// broadband impulsive noise from tonal speech
    pub min_flatness: f32,

    /// Minimum event duration (seconds); shorter blips are detector noise
    pub min_duration_secs: f32,

    /// Maximum event duration (seconds); longer stretches are speech or
    /// background noise, not a single cough or sneeze
    pub max_duration_secs: f32,

    /// Sneeze classification: maximum duration (seconds)
    pub sneeze_max_duration_secs: f32,

    /// Sneeze classification: minimum spectral centroid (Hz)
    pub sneeze_min_centroid_hz: f32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            energy_percentile: 85.0,
            energy_floor: 0.2,
            min_flatness: 0.25,
            min_duration_secs: 0.1,
            max_duration_secs: 1.5,
            sneeze_max_duration_secs: 0.4,
            sneeze_min_centroid_hz: 2500.0,
        }
    }
}

/// Voice quality label thresholds
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Relative pitch jitter below this is a stable voice
    pub stable_jitter: f32,

    /// Relative pitch jitter below this is normal; above it, variable
    pub normal_jitter: f32,

    /// WPM below this is slow speech
    pub slow_wpm: f32,

    /// WPM above this is fast speech
    pub fast_wpm: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            stable_jitter: 0.02,
            normal_jitter: 0.06,
            slow_wpm: 110.0,
            fast_wpm: 160.0,
        }
    }
}

/// Trigger points for the health insight templates
#[derive(Debug, Clone)]
pub struct InsightConfig {
    /// Cadence below this adds the slow-speech sentence (WPM)
    pub slow_cadence_wpm: f32,

    /// Cadence above this adds the rapid-speech sentence (WPM)
    pub fast_cadence_wpm: f32,

    /// Cough count above this adds the frequent-coughing sentence
    pub cough_alert_count: u32,

    /// Sneeze count above this adds the sneezing sentence
    pub sneeze_alert_count: u32,

    /// Pitch standard deviation below this adds the monotone sentence (Hz)
    pub low_pitch_std_hz: f32,

    /// Pitch standard deviation above this adds the expressive sentence (Hz)
    pub high_pitch_std_hz: f32,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            slow_cadence_wpm: 100.0,
            fast_cadence_wpm: 180.0,
            cough_alert_count: 3,
            sneeze_alert_count: 2,
            low_pitch_std_hz: 20.0,
            high_pitch_std_hz: 40.0,
        }
    }
}

/// Top-level configuration for one analysis invocation
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub frame: FrameConfig,
    pub pitch: PitchConfig,
    pub cadence: CadenceConfig,
    pub events: EventConfig,
    pub quality: QualityConfig,
    pub insights: InsightConfig,

    /// Maximum wall-clock processing duration per invocation
    pub max_processing: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            pitch: PitchConfig::default(),
            cadence: CadenceConfig::default(),
            events: EventConfig::default(),
            quality: QualityConfig::default(),
            insights: InsightConfig::default(),
            max_processing: Duration::from_secs(30),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with a custom processing budget
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            max_processing: budget,
            ..Default::default()
        }
    }

    /// Reject configurations that cannot produce meaningful analysis.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame.window_secs <= 0.0 || self.frame.hop_secs <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "frame window and hop must be positive".to_string(),
            ));
        }
        if self.frame.normalization_peak <= 0.0 || self.frame.normalization_peak > 1.0 {
            return Err(AnalysisError::InvalidConfig(
                "normalization peak must be in (0, 1]".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.frame.voicing_percentile)
            || !(0.0..=100.0).contains(&self.events.energy_percentile)
        {
            return Err(AnalysisError::InvalidConfig(
                "percentiles must be in [0, 100]".to_string(),
            ));
        }
        if self.pitch.min_frequency >= self.pitch.max_frequency {
            return Err(AnalysisError::InvalidConfig(format!(
                "pitch band is inverted: {} Hz >= {} Hz",
                self.pitch.min_frequency, self.pitch.max_frequency
            )));
        }
        if self.pitch.window_secs <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "pitch window must be positive".to_string(),
            ));
        }
        if self.cadence.syllables_per_word <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "syllables per word must be positive".to_string(),
            ));
        }
        if self.events.min_duration_secs >= self.events.max_duration_secs {
            return Err(AnalysisError::InvalidConfig(format!(
                "event duration bounds are inverted: {} s >= {} s",
                self.events.min_duration_secs, self.events.max_duration_secs
            )));
        }
        if self.quality.stable_jitter >= self.quality.normal_jitter {
            return Err(AnalysisError::InvalidConfig(
                "jitter buckets are inverted".to_string(),
            ));
        }
        if self.quality.slow_wpm >= self.quality.fast_wpm {
            return Err(AnalysisError::InvalidConfig(
                "WPM bands are inverted".to_string(),
            ));
        }
        if self.max_processing.is_zero() {
            return Err(AnalysisError::InvalidConfig(
                "processing budget must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_framing() {
        let config = FrameConfig::default();
        assert_eq!(config.window_secs, 0.025);
        assert_eq!(config.hop_secs, 0.010);
        assert_eq!(config.min_sample_rate, 4000);
    }

    #[test]
    fn test_default_pitch_band() {
        let config = PitchConfig::default();
        assert_eq!(config.min_frequency, 75.0);
        assert_eq!(config.max_frequency, 500.0);
    }

    #[test]
    fn test_with_budget() {
        let config = AnalysisConfig::with_budget(Duration::from_secs(5));
        assert_eq!(config.max_processing, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_pitch_band() {
        let mut config = AnalysisConfig::default();
        config.pitch.min_frequency = 600.0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = AnalysisConfig::default();
        config.frame.window_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_event_bounds() {
        let mut config = AnalysisConfig::default();
        config.events.min_duration_secs = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = AnalysisConfig::with_budget(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
