//! Integration tests for rotor-core DSP primitives.
//!
//! Verifies the all-pass property from measured impulse responses, the phase
//! behavior of cascaded stages, and the exact impulse response of a reference
//! configuration.

use rotor_core::{
    AllpassBiquad, AllpassCoefficients, SpreadMode, allpass_coefficients, stage_frequency,
};

const SAMPLE_RATE: f32 = 48000.0;

/// Render `len` samples of the impulse response of a cascade.
fn impulse_response(coefficients: &[AllpassCoefficients], len: usize) -> Vec<f32> {
    let mut filters = vec![AllpassBiquad::new(); coefficients.len()];
    (0..len)
        .map(|n| {
            let mut x = if n == 0 { 1.0 } else { 0.0 };
            for (filter, c) in filters.iter_mut().zip(coefficients) {
                x = filter.process(x, c);
            }
            x
        })
        .collect()
}

/// Magnitude of the DFT of `signal` at `freq_hz`.
fn dft_magnitude(signal: &[f32], freq_hz: f32, sample_rate: f32) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * f64::from(freq_hz) / f64::from(sample_rate);
    let (mut re, mut im) = (0.0_f64, 0.0_f64);
    for (n, &x) in signal.iter().enumerate() {
        let phase = omega * n as f64;
        re += f64::from(x) * phase.cos();
        im -= f64::from(x) * phase.sin();
    }
    (re * re + im * im).sqrt()
}

// ============================================================================
// 1. All-pass property from the impulse response
// ============================================================================

#[test]
fn single_stage_impulse_response_has_flat_spectrum() {
    let c = allpass_coefficients(1000.0, 0.707, SAMPLE_RATE);
    let ir = impulse_response(&[c], 16384);

    for freq in [30.0, 250.0, 999.0, 1000.0, 1001.0, 4000.0, 12000.0, 21000.0] {
        let mag = dft_magnitude(&ir, freq, SAMPLE_RATE);
        assert!(
            (mag - 1.0).abs() < 1e-3,
            "magnitude at {freq} Hz was {mag}"
        );
    }
}

#[test]
fn spread_cascade_impulse_response_has_flat_spectrum() {
    let count = 8;
    let coefficients: Vec<_> = (0..count)
        .map(|i| {
            let f = stage_frequency(2000.0, 3000.0, SAMPLE_RATE, i, count, SpreadMode::Logarithmic);
            allpass_coefficients(f, 0.5, SAMPLE_RATE)
        })
        .collect();
    let ir = impulse_response(&coefficients, 32768);

    for freq in [50.0, 500.0, 1500.0, 3500.0, 10000.0] {
        let mag = dft_magnitude(&ir, freq, SAMPLE_RATE);
        assert!(
            (mag - 1.0).abs() < 5e-3,
            "magnitude at {freq} Hz was {mag}"
        );
    }
}

#[test]
fn impulse_energy_is_preserved() {
    // Parseval: a unity-magnitude response keeps the total energy of an impulse.
    let c = allpass_coefficients(300.0, 2.0, SAMPLE_RATE);
    let ir = impulse_response(&[c], 48000);
    let energy: f64 = ir.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    assert!((energy - 1.0).abs() < 1e-3, "energy was {energy}");
}

// ============================================================================
// 2. Phase behavior
// ============================================================================

#[test]
fn identical_stages_rotate_phase_together() {
    let c = allpass_coefficients(1000.0, 0.707, SAMPLE_RATE);
    let single = c.response_at(500.0, SAMPLE_RATE).phase;

    // Two identical stages double the phase shift (mod 2*pi)
    let ir = impulse_response(&[c, c], 16384);
    let omega = 2.0 * std::f64::consts::PI * 500.0 / f64::from(SAMPLE_RATE);
    let (mut re, mut im) = (0.0_f64, 0.0_f64);
    for (n, &x) in ir.iter().enumerate() {
        re += f64::from(x) * (omega * n as f64).cos();
        im -= f64::from(x) * (omega * n as f64).sin();
    }
    let measured = im.atan2(re);
    let expected = f64::from(2.0 * single);
    let diff = (measured - expected).rem_euclid(2.0 * std::f64::consts::PI);
    let diff = diff.min(2.0 * std::f64::consts::PI - diff);
    assert!(diff < 1e-2, "phase {measured} vs expected {expected}");
}

// ============================================================================
// 3. Reference configuration
// ============================================================================

#[test]
fn quarter_rate_reference_impulse() {
    // fs = 4 Hz, f0 = 1 Hz, Q = 1: b0 = a2 = 1/3, b1 = a1 = 0, b2 = 1
    let c = allpass_coefficients(1.0, 1.0, 4.0);
    let ir = impulse_response(&[c], 7);
    let expected = [
        1.0 / 3.0,
        0.0,
        8.0 / 9.0,
        0.0,
        -8.0 / 27.0,
        0.0,
        8.0 / 81.0,
    ];

    for (n, (&got, &want)) in ir.iter().zip(&expected).enumerate() {
        assert!((got - want).abs() < 1e-5, "y[{n}]: expected {want}, got {got}");
    }
}
