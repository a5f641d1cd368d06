//! Property-based tests for rotor-core DSP primitives.
//!
//! Tests all-pass magnitude, filter stability, stage distribution ordering and
//! ramp settling using proptest for randomized input generation.

use proptest::prelude::*;
use rotor_core::{
    AllpassBiquad, RampedParam, SpreadMode, allpass_coefficients, max_stage_frequency,
    spread_window, stage_frequency,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// For any cutoff below the stage ceiling and any Q in the supported
    /// range, the magnitude response is unity everywhere.
    #[test]
    fn allpass_unity_magnitude(
        freq in 5.0f32..22000.0f32,
        q in 0.01f32..30.0f32,
        probe in 1.0f32..23999.0f32,
    ) {
        let c = allpass_coefficients(freq, q, 48000.0);
        let r = c.response_at(probe, 48000.0);
        prop_assert!(
            (r.magnitude - 1.0).abs() < 1e-3,
            "freq={}, q={}, probe={}: magnitude {}", freq, q, probe, r.magnitude
        );
    }

    /// All-pass filters produce finite output for random finite input.
    #[test]
    fn allpass_stability(
        freq in 5.0f32..22000.0f32,
        q in 0.01f32..30.0f32,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let c = allpass_coefficients(freq, q, 48000.0);
        let mut filter = AllpassBiquad::new();

        for _ in 0..32 {
            for &sample in &input {
                let out = filter.process(sample, &c);
                prop_assert!(
                    out.is_finite(),
                    "freq={}, q={} produced non-finite output {} for input {}",
                    freq, q, out, sample
                );
            }
        }
    }

    /// With a positive spread, stage frequencies ascend with the stage index
    /// and the first and last stage land on the window edges.
    #[test]
    fn spread_monotonic_and_exact_endpoints(
        center in 5.0f32..20000.0f32,
        spread in 1.0f32..8000.0f32,
        count in 2usize..64,
        linear in any::<bool>(),
    ) {
        let sr = 48000.0;
        let mode = SpreadMode::from_linear(linear);
        let window = spread_window(center, spread, sr);

        let freqs: Vec<f32> = (0..count)
            .map(|i| stage_frequency(center, spread, sr, i, count, mode))
            .collect();

        prop_assert_eq!(freqs[0], window.low);
        prop_assert_eq!(freqs[count - 1], window.high);
        for pair in freqs.windows(2) {
            prop_assert!(pair[0] <= pair[1], "not ascending: {:?}", freqs);
        }
        for &f in &freqs {
            prop_assert!(f >= 5.0 && f <= max_stage_frequency(sr));
        }
    }

    /// A ramp lands exactly on its target after `ramp_length` steps.
    #[test]
    fn ramp_settles_exactly(
        initial in -20000.0f32..20000.0f32,
        target in -20000.0f32..20000.0f32,
        precision in 1u32..16,
    ) {
        let mut param = RampedParam::with_config(initial, 48000.0, 100.0, precision);
        param.set_target(target);

        for _ in 0..param.ramp_length() {
            param.advance();
        }

        prop_assert_eq!(param.get(), target);
        prop_assert!(!param.is_ramping());
    }
}
