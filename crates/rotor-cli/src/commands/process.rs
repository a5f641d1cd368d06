//! Offline rendering of a WAV file through the phase rotator.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rotor_engine::{PhaseRotator, RotorConfig, SpreadStyle};

use crate::wav::{WavSpec, read_wav_channels, write_wav_channels};

/// How long to wait for the rebuild worker to deliver a scheduled stage count.
const STAGE_CHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Configuration file (TOML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of all-pass stages
    #[arg(short, long)]
    stages: Option<u32>,

    /// Center frequency in Hz
    #[arg(short, long)]
    frequency: Option<f32>,

    /// Resonance (Q)
    #[arg(short = 'q', long)]
    resonance: Option<f32>,

    /// Spread in Hz (may be negative)
    #[arg(long, allow_hyphen_values = true)]
    spread: Option<f32>,

    /// Distribute stages linearly instead of logarithmically
    #[arg(long)]
    linear: bool,

    /// Change the stage count at a point in time (e.g., "1.5:32")
    #[arg(long = "stages-at", value_name = "SECONDS:N", value_parser = parse_stage_change)]
    stages_at: Vec<StageChange>,

    /// Processing block size
    #[arg(long, default_value = "512")]
    block_size: u32,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

/// A stage count to switch to at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageChange {
    /// Time in seconds from the start of the file
    pub seconds: f64,
    /// Stage count to request
    pub stages: u32,
}

fn parse_stage_change(s: &str) -> Result<StageChange, String> {
    let (time, stages) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid stage change: '{s}' (expected SECONDS:N)"))?;
    let seconds: f64 = time
        .trim()
        .parse()
        .map_err(|_| format!("Invalid time in '{s}'"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("Time must be a non-negative number of seconds in '{s}'"));
    }
    let stages = stages
        .trim()
        .parse()
        .map_err(|_| format!("Invalid stage count in '{s}'"))?;
    Ok(StageChange { seconds, stages })
}

/// Apply command-line overrides on top of a loaded (or default) config.
fn build_config(args: &ProcessArgs) -> anyhow::Result<RotorConfig> {
    let mut config = match &args.config {
        Some(path) => RotorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RotorConfig::default(),
    };

    if let Some(stages) = args.stages {
        config.stages = stages;
    }
    if let Some(frequency) = args.frequency {
        config.frequency_hz = frequency;
    }
    if let Some(resonance) = args.resonance {
        config.resonance = resonance;
    }
    if let Some(spread) = args.spread {
        config.spread_hz = spread;
    }
    if args.linear {
        config.spread_mode = SpreadStyle::Linear;
    }
    Ok(config)
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        matches!(args.bit_depth, 16 | 24 | 32),
        "Unsupported bit depth {} (expected 16, 24, or 32)",
        args.bit_depth
    );
    anyhow::ensure!(args.block_size > 0, "Block size must be at least 1");

    let config = build_config(&args)?;

    println!("Reading {}...", args.input.display());
    let (mut channels, spec) = read_wav_channels(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let frames = channels.first().map_or(0, Vec::len);
    let sample_rate = f64::from(spec.sample_rate);

    println!(
        "  {} frames x {} channel(s), {} Hz, {:.2}s",
        frames,
        channels.len(),
        spec.sample_rate,
        frames as f64 / sample_rate
    );

    let mut rotator = PhaseRotator::new(config)?;
    rotator.configure(sample_rate, args.block_size, u32::from(spec.channels))?;

    println!(
        "Rotating: {} stages, {:.1} Hz, Q {:.3}, spread {:.1} Hz ({:?})",
        rotator.stage_count(),
        rotator.control().frequency(),
        rotator.control().resonance(),
        rotator.control().spread(),
        rotator.control().spread_mode(),
    );

    let mut schedule = args.stages_at.clone();
    schedule.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
    let mut schedule = schedule.into_iter().peekable();

    let input_rms = rms(&channels);
    let input_peak = peak(&channels);

    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let block_size = args.block_size as usize;
    let mut start = 0;
    while start < frames {
        let mut end = (start + block_size).min(frames);

        // Apply every change that is due, and end the block at the next one.
        while let Some(change) = schedule.peek().copied() {
            let at = (change.seconds * sample_rate).round() as usize;
            if at <= start {
                schedule.next();
                apply_stage_change(&mut rotator, change)?;
            } else {
                end = end.min(at);
                break;
            }
        }

        let mut block: Vec<&mut [f32]> = channels
            .iter_mut()
            .map(|channel| &mut channel[start..end])
            .collect();
        rotator.process_block(&mut block, (end - start) as u32);

        start = end;
        pb.set_position(start as u64);
    }
    pb.finish_with_message("done");

    for change in schedule {
        tracing::warn!(
            "stage change to {} at {:.3}s is past the end of the file",
            change.stages,
            change.seconds
        );
    }

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(input_rms),
        linear_to_db(input_peak)
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&channels)),
        linear_to_db(peak(&channels))
    );

    let out_spec = WavSpec {
        bits_per_sample: args.bit_depth,
        ..spec
    };

    println!("\nWriting {}...", args.output.display());
    write_wav_channels(&args.output, &channels, out_spec)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Done!");

    Ok(())
}

/// Request a stage count and block until the engine has adopted it.
///
/// Offline rendering has no deadline, so the change is made to land on an
/// exact frame instead of whenever the worker happens to finish.
fn apply_stage_change(rotator: &mut PhaseRotator, change: StageChange) -> anyhow::Result<()> {
    tracing::info!("stage count -> {} at {:.3}s", change.stages, change.seconds);
    rotator.request_stage_count(change.stages);

    let deadline = Instant::now() + STAGE_CHANGE_TIMEOUT;
    let target = change.stages as usize;
    loop {
        // A zero-frame block adopts published topologies without consuming audio.
        rotator.process_block(&mut [], 0);
        if rotator.stage_count() == target {
            return Ok(());
        }
        if let Some(e) = rotator.take_rebuild_error() {
            return Err(e).context(format!("switching to {} stages", change.stages));
        }
        anyhow::ensure!(
            Instant::now() < deadline,
            "timed out waiting for {} stages",
            change.stages
        );
        thread::sleep(Duration::from_millis(1));
    }
}

fn rms(channels: &[Vec<f32>]) -> f32 {
    let count: usize = channels.iter().map(Vec::len).sum();
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = channels.iter().flatten().map(|s| s * s).sum();
    (sum / count as f32).sqrt()
}

fn peak(channels: &[Vec<f32>]) -> f32 {
    channels.iter().flatten().map(|s| s.abs()).fold(0.0, f32::max)
}

fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stage_changes() {
        assert_eq!(
            parse_stage_change("1.5:32"),
            Ok(StageChange {
                seconds: 1.5,
                stages: 32
            })
        );
        assert_eq!(
            parse_stage_change(" 0 : 0 "),
            Ok(StageChange {
                seconds: 0.0,
                stages: 0
            })
        );
        assert!(parse_stage_change("32").is_err());
        assert!(parse_stage_change("-1:4").is_err());
        assert!(parse_stage_change("1:many").is_err());
    }

    #[test]
    fn level_helpers() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(peak(&[vec![0.5, -0.75], vec![0.25]]), 0.75);
        assert_eq!(linear_to_db(0.0), -120.0);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
    }
}
