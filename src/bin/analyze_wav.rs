//! Demo CLI: decode a WAV file, run the analysis engine, print the JSON
//! report. Stands in for the excluded transport layer, which would hand the
//! engine a decoded waveform the same way.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use voice_biomarkers::{analyze, AnalysisConfig};

/// Analyze a WAV recording for voice biomarkers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input WAV file
    input: PathBuf,

    /// Processing budget in seconds
    #[arg(long, default_value = "30")]
    budget_secs: u64,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let (samples, sample_rate) = read_wav_mono(&args.input)?;
    info!(
        "loaded {} ({} samples at {} Hz)",
        args.input.display(),
        samples.len(),
        sample_rate
    );

    let config = AnalysisConfig::with_budget(Duration::from_secs(args.budget_secs));
    let report = analyze(&samples, sample_rate, &config)?;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);

    Ok(())
}

/// Decode a WAV file to mono f32, averaging channels when necessary.
fn read_wav_mono(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    debug!(
        "WAV spec: {} Hz, {} channels, {:?} {} bit",
        spec.sample_rate, spec.channels, spec.sample_format, spec.bits_per_sample
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };

    let channels = spec.channels as usize;
    let mono = if channels <= 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}
