//! Print the stage layout and phase response of a cascade.

use clap::Args;
use rotor_core::{
    AllpassCoefficients, SpreadMode, allpass_coefficients, max_stage_frequency, stage_frequency,
};
use rotor_engine::{FREQUENCY_RANGE, RESONANCE_RANGE, SPREAD_RANGE};

/// Lowest probe frequency; further probes are spaced an octave apart.
const FIRST_PROBE_HZ: f32 = 31.25;

#[derive(Args)]
pub struct InspectArgs {
    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Number of all-pass stages
    #[arg(short, long, default_value = "8")]
    stages: usize,

    /// Center frequency in Hz
    #[arg(short, long, default_value = "1000")]
    frequency: f32,

    /// Resonance (Q)
    #[arg(short = 'q', long, default_value = "0.5")]
    resonance: f32,

    /// Spread in Hz (may be negative)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    spread: f32,

    /// Distribute stages linearly instead of logarithmically
    #[arg(long)]
    linear: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.sample_rate > 0, "Sample rate must be positive");
    anyhow::ensure!(
        !(args.frequency.is_nan() || args.resonance.is_nan() || args.spread.is_nan()),
        "Parameters must be numbers"
    );

    let sample_rate = args.sample_rate as f32;
    let frequency = args.frequency.clamp(*FREQUENCY_RANGE.start(), *FREQUENCY_RANGE.end());
    let resonance = args.resonance.clamp(*RESONANCE_RANGE.start(), *RESONANCE_RANGE.end());
    let spread = args.spread.clamp(*SPREAD_RANGE.start(), *SPREAD_RANGE.end());
    let mode = SpreadMode::from_linear(args.linear);

    let stages = cascade(frequency, resonance, spread, sample_rate, args.stages, mode);

    println!(
        "{} stage(s) @ {} Hz: center {:.1} Hz, Q {:.3}, spread {:.1} Hz ({:?})",
        args.stages, args.sample_rate, frequency, resonance, spread, mode
    );
    if spread == 0.0 && args.stages > 0 {
        println!("  zero spread: every stage shares stage 0's coefficients");
    }

    println!("\nStages:");
    println!(
        "  {:>5}  {:>10}  {:>11}  {:>11}  {:>11}",
        "#", "Hz", "b0/a2", "b1/a1", "b2"
    );
    for (i, (freq, c)) in stages.iter().enumerate() {
        println!(
            "  {:>5}  {:>10.2}  {:>11.7}  {:>11.7}  {:>11.7}",
            i, freq, c.b0, c.b1, c.b2
        );
    }

    println!("\nPhase response:");
    println!("  {:>10}  {:>12}  {:>10}", "Hz", "phase (deg)", "magnitude");
    for probe in probe_frequencies(sample_rate) {
        let (phase, magnitude) = cascade_response(&stages, probe, sample_rate);
        println!(
            "  {:>10.2}  {:>12.1}  {:>10.6}",
            probe,
            phase.to_degrees(),
            magnitude
        );
    }

    Ok(())
}

/// Frequency and coefficients of every stage.
fn cascade(
    frequency: f32,
    resonance: f32,
    spread: f32,
    sample_rate: f32,
    count: usize,
    mode: SpreadMode,
) -> Vec<(f32, AllpassCoefficients)> {
    (0..count)
        .map(|i| {
            let freq = stage_frequency(frequency, spread, sample_rate, i, count, mode);
            (freq, allpass_coefficients(freq, resonance, sample_rate))
        })
        .collect()
}

/// Octave-spaced probes from [`FIRST_PROBE_HZ`] up to the stage ceiling.
fn probe_frequencies(sample_rate: f32) -> Vec<f32> {
    let ceiling = max_stage_frequency(sample_rate);
    std::iter::successors(Some(FIRST_PROBE_HZ), |f| Some(f * 2.0))
        .take_while(|&f| f <= ceiling)
        .collect()
}

/// Total phase in radians and magnitude of the cascade at `freq`.
///
/// A second-order all-pass lags between 0 and a full turn, so each stage's
/// wrapped phase is mapped into `-2pi..=0` before summing.
fn cascade_response(
    stages: &[(f32, AllpassCoefficients)],
    freq: f32,
    sample_rate: f32,
) -> (f64, f64) {
    stages.iter().fold((0.0, 1.0), |(phase, magnitude), (_, c)| {
        let r = c.response_at(freq, sample_rate);
        let mut lag = f64::from(r.phase);
        if lag > 0.0 {
            lag -= std::f64::consts::TAU;
        }
        (phase + lag, magnitude * f64::from(r.magnitude))
    })
}
