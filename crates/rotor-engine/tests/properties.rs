//! Property-based tests for the rotor engine.
//!
//! Stage-count changes issued from another thread while blocks are processed
//! must never expose a half-built topology, and random control sweeps must
//! keep the output finite.

use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use rotor_engine::{PhaseRotator, RotorConfig};

const BLOCK: u32 = 64;

fn input_block(seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..BLOCK)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Random stage counts requested concurrently with processing only ever
    /// surface complete, initialized topologies of a requested size.
    #[test]
    fn concurrent_resize_is_safe(
        requests in prop::collection::vec(0u32..48, 1..12),
        channels in 1u32..4,
        spread in -3000.0f32..3000.0f32,
    ) {
        let config = RotorConfig {
            stages: 2,
            spread_hz: spread,
            ..RotorConfig::default()
        };
        let mut rotator = PhaseRotator::new(config).unwrap();
        rotator.configure(48000.0, BLOCK, channels).unwrap();

        let control = rotator.control().clone();
        let issued = requests.clone();
        let requester = thread::spawn(move || {
            for stages in issued {
                control.request_stage_count(stages);
                thread::sleep(Duration::from_micros(200));
            }
        });

        let mut allowed = requests.clone();
        allowed.push(2);

        let mut buffers: Vec<Vec<f32>> = vec![Vec::new(); channels as usize];
        for block in 0..400u32 {
            for (c, buffer) in buffers.iter_mut().enumerate() {
                *buffer = input_block(block * 8 + c as u32);
            }
            let mut slices: Vec<&mut [f32]> =
                buffers.iter_mut().map(Vec::as_mut_slice).collect();
            rotator.process_block(&mut slices, BLOCK);

            let engine = rotator.engine().unwrap();
            let topology = engine.topology();
            prop_assert!(topology.is_consistent());
            prop_assert!(topology.is_initialized());
            prop_assert_eq!(topology.spec().channels, channels as usize);
            prop_assert!(allowed.contains(&(topology.stage_count() as u32)));
            for buffer in &buffers {
                prop_assert!(buffer.iter().all(|x| x.is_finite()));
            }
        }

        requester.join().unwrap();
        prop_assert!(rotator.take_rebuild_error().is_none());
    }

    /// Sweeping every control to random values keeps the output finite.
    #[test]
    fn random_control_sweeps_stay_finite(
        targets in prop::collection::vec(
            (0.0f32..30000.0, -1.0f32..40.0, -25000.0f32..25000.0, any::<bool>()),
            1..16,
        ),
        stages in 1u32..24,
    ) {
        let config = RotorConfig {
            stages,
            ramp_duration_ms: 5.0,
            ..RotorConfig::default()
        };
        let mut rotator = PhaseRotator::new(config).unwrap();
        rotator.configure(44100.0, BLOCK, 1).unwrap();

        for (i, (frequency, resonance, spread, linear)) in targets.into_iter().enumerate() {
            rotator.set_target_frequency(frequency);
            rotator.set_target_resonance(resonance);
            rotator.set_target_spread(spread, linear);

            for block in 0..8u32 {
                let mut buffer = input_block(i as u32 * 64 + block);
                rotator.process_block(&mut [buffer.as_mut_slice()], BLOCK);
                prop_assert!(
                    buffer.iter().all(|x| x.is_finite()),
                    "non-finite output at f={}, q={}, spread={}", frequency, resonance, spread
                );
            }
        }
    }
}
