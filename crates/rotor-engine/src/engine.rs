//! The per-block processing loop run on the audio thread.

use rotor_core::{RampedParam, SpreadMode};

use crate::config::RotorConfig;
use crate::control::ControlHandle;
use crate::exchange::TopologyReader;
use crate::topology::{CascadeValues, ProcessSpec, Topology};

/// Realtime half of the rotator.
///
/// Once per block it reads the control targets and adopts any topology the
/// rebuild worker has published. Then it processes every frame in turn:
/// advance the smoothers, recompute coefficients when needed, and run each
/// channel's sample through the cascade.
///
/// Coefficient recomputation runs when
/// - the topology has not been initialized since it was built,
/// - a target or the spread mode changed since the last block,
/// - a smoother is ramping and the recompute countdown has run out, or
/// - the last ramp has just settled, so the final values are never skipped
///   by the throttle.
///
/// `process_block` never allocates, locks or frees.
pub struct CascadeEngine {
    spec: ProcessSpec,
    reader: TopologyReader,
    control: ControlHandle,

    frequency: RampedParam,
    resonance: RampedParam,
    spread: RampedParam,
    spread_mode: SpreadMode,
    /// Targets or spread mode changed since the last recomputation
    dirty: bool,

    /// Samples between throttled recomputations while ramping
    recompute_interval: u32,
    /// Samples left before the next throttled recomputation
    countdown: u32,
}

impl CascadeEngine {
    /// Create an engine around `reader`, starting settled on the current
    /// targets of `control`.
    pub fn new(
        spec: ProcessSpec,
        reader: TopologyReader,
        control: ControlHandle,
        config: &RotorConfig,
    ) -> Self {
        let ramp = |initial: f32| {
            RampedParam::with_config(
                initial,
                spec.sample_rate,
                config.ramp_duration_ms,
                config.automation_precision,
            )
        };

        Self {
            spec,
            frequency: ramp(control.frequency()),
            resonance: ramp(control.resonance()),
            spread: ramp(control.spread()),
            spread_mode: control.spread_mode(),
            dirty: false,
            recompute_interval: config.recompute_interval.max(1),
            countdown: 0,
            reader,
            control,
        }
    }

    /// Process `frame_count` frames of channel-major audio in place.
    ///
    /// Channels beyond the configured channel count are silenced. Frames
    /// beyond the shortest channel slice are left untouched. `frame_count`
    /// must not exceed the spec's `max_block_size`; debug builds assert it.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]], frame_count: usize) {
        debug_assert!(
            frame_count <= self.spec.max_block_size,
            "block of {frame_count} frames exceeds max_block_size {}",
            self.spec.max_block_size
        );
        self.sync_targets();

        let frames = channels
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0)
            .min(frame_count);
        let processed = channels.len().min(self.spec.channels);
        let (active, surplus) = channels.split_at_mut(processed);

        let topology = self.reader.acquire();
        for frame in 0..frames {
            let ramping = self.frequency.is_ramping()
                || self.resonance.is_ramping()
                || self.spread.is_ramping();
            let force = !topology.is_initialized() || self.dirty;
            let throttled = ramping && self.countdown == 0;

            let (frequency, frequency_ramping) = self.frequency.advance();
            let (resonance, resonance_ramping) = self.resonance.advance();
            let (spread, spread_ramping) = self.spread.advance();
            let settled = ramping && !(frequency_ramping || resonance_ramping || spread_ramping);

            if force || throttled || settled {
                let values = CascadeValues {
                    frequency,
                    resonance,
                    spread,
                };
                topology.update_coefficients(values, self.spread_mode);
                self.countdown = self.recompute_interval - 1;
                self.dirty = false;
            } else {
                self.countdown = self.countdown.saturating_sub(1);
            }

            for (index, channel) in active.iter_mut().enumerate() {
                channel[frame] = topology.process(index, channel[frame]);
            }
        }

        for channel in surplus {
            channel[..frames].fill(0.0);
        }
    }

    /// Pull the latest control targets into the smoothers.
    fn sync_targets(&mut self) {
        let frequency = self.control.frequency();
        let resonance = self.control.resonance();
        let spread = self.control.spread();
        let mode = self.control.spread_mode();

        // Instant ramps settle inside set_target and would otherwise never
        // trigger a recomputation.
        if frequency != self.frequency.target()
            || resonance != self.resonance.target()
            || spread != self.spread.target()
            || mode != self.spread_mode
        {
            self.dirty = true;
        }

        self.frequency.set_target(frequency);
        self.resonance.set_target(resonance);
        self.spread.set_target(spread);
        self.spread_mode = mode;
    }

    /// The topology currently in use.
    pub fn topology(&self) -> &Topology {
        self.reader.active()
    }

    /// Stage count of the topology currently in use.
    pub fn stage_count(&self) -> usize {
        self.reader.active().stage_count()
    }

    /// Smoothed values as of the last processed frame.
    pub fn current_values(&self) -> CascadeValues {
        CascadeValues {
            frequency: self.frequency.get(),
            resonance: self.resonance.get(),
            spread: self.spread.get(),
        }
    }

    /// Spread interpolation in effect.
    pub fn spread_mode(&self) -> SpreadMode {
        self.spread_mode
    }

    /// Whether any smoother is still moving toward its target.
    pub fn is_ramping(&self) -> bool {
        self.frequency.is_ramping() || self.resonance.is_ramping() || self.spread.is_ramping()
    }

    /// Number of smoothing steps in a full ramp.
    pub fn ramp_length(&self) -> u32 {
        self.frequency.ramp_length()
    }

    /// Processing spec the engine was created with.
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }
}

impl std::fmt::Debug for CascadeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeEngine")
            .field("spec", &self.spec)
            .field("stages", &self.stage_count())
            .field("values", &self.current_values())
            .field("spread_mode", &self.spread_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TopologyBuilder;
    use crate::exchange::{TopologyWriter, topology_exchange};
    use crate::topology::CoefficientSource;
    use rotor_core::{AllpassBiquad, allpass_coefficients};

    fn spec(channels: usize) -> ProcessSpec {
        ProcessSpec {
            sample_rate: 48000.0,
            max_block_size: 256,
            channels,
        }
    }

    fn engine_with(
        stages: usize,
        channels: usize,
        config: RotorConfig,
    ) -> (CascadeEngine, TopologyWriter, ControlHandle) {
        let builder = TopologyBuilder::new(spec(channels));
        let (writer, reader) =
            topology_exchange(builder.build(stages).unwrap(), builder.build(stages).unwrap());
        let control = ControlHandle::new(&config);
        let engine = CascadeEngine::new(spec(channels), reader, control.clone(), &config);
        (engine, writer, control)
    }

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed.wrapping_mul(2_654_435_761).max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn zero_stages_is_bit_identical() {
        let (mut engine, _writer, control) = engine_with(0, 2, RotorConfig::default());
        control.set_target_frequency(3000.0);

        let left = noise(256, 1);
        let right = noise(256, 2);
        let mut l = left.clone();
        let mut r = right.clone();
        engine.process_block(&mut [l.as_mut_slice(), r.as_mut_slice()], 256);

        assert!(left.iter().zip(&l).all(|(a, b)| a.to_bits() == b.to_bits()));
        assert!(right.iter().zip(&r).all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn first_block_initializes_topology() {
        let (mut engine, _writer, _control) = engine_with(4, 1, RotorConfig::default());
        assert!(!engine.topology().is_initialized());

        let mut buffer = vec![0.0; 16];
        engine.process_block(&mut [buffer.as_mut_slice()], 16);
        assert!(engine.topology().is_initialized());
        assert_eq!(
            engine.topology().coefficient_source(),
            CoefficientSource::Shared
        );
    }

    #[test]
    fn single_stage_matches_reference_filter() {
        let config = RotorConfig {
            frequency_hz: 800.0,
            resonance: 0.707,
            ..RotorConfig::default()
        };
        let (mut engine, _writer, _control) = engine_with(1, 1, config);

        let input = noise(128, 7);
        let mut output = input.clone();
        engine.process_block(&mut [output.as_mut_slice()], 128);

        let coefficients = allpass_coefficients(800.0, 0.707, 48000.0);
        let mut reference = AllpassBiquad::new();
        for (x, y) in input.iter().zip(&output) {
            assert_eq!(reference.process(*x, &coefficients), *y);
        }
    }

    #[test]
    fn surplus_channels_are_silenced() {
        let (mut engine, _writer, _control) = engine_with(2, 1, RotorConfig::default());
        let mut a = vec![0.5; 32];
        let mut b = vec![0.5; 32];
        let mut c = vec![0.5; 32];
        engine.process_block(&mut [a.as_mut_slice(), b.as_mut_slice(), c.as_mut_slice()], 32);

        assert!(a.iter().any(|&x| x != 0.0));
        assert!(b.iter().all(|&x| x == 0.0));
        assert!(c.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn frame_count_bounds_processing() {
        let (mut engine, _writer, _control) = engine_with(2, 1, RotorConfig::default());
        let mut buffer = vec![1.0; 8];
        engine.process_block(&mut [buffer.as_mut_slice()], 4);
        assert!(buffer[..4].iter().any(|&x| x != 1.0));
        assert_eq!(buffer[4..], [1.0f32; 4]);

        // A frame count past the end of the buffer stops at the buffer.
        let mut short = vec![1.0; 3];
        engine.process_block(&mut [short.as_mut_slice()], 100);
    }

    #[test]
    fn ramp_settles_on_target_and_applies_it() {
        let config = RotorConfig {
            ramp_duration_ms: 1.0,
            recompute_interval: 7,
            ..RotorConfig::default()
        };
        let (mut engine, _writer, control) = engine_with(3, 1, config);
        let ramp_length = engine.ramp_length() as usize;
        assert_eq!(ramp_length, 48);

        control.set_target_frequency(2500.0);
        let mut buffer = vec![0.0; ramp_length];
        engine.process_block(&mut [buffer.as_mut_slice()], ramp_length);

        assert!(!engine.is_ramping());
        assert_eq!(engine.current_values().frequency, 2500.0);
        assert_eq!(
            engine.topology().effective_coefficients(2),
            Some(&allpass_coefficients(2500.0, 0.5, 48000.0))
        );
    }

    /// Step a ramp one frame per block and return the ramp frames at which
    /// stage 0's coefficients changed.
    fn recompute_frames(ramp_ms: f32, interval: u32) -> (Vec<usize>, usize) {
        let config = RotorConfig {
            ramp_duration_ms: ramp_ms,
            recompute_interval: interval,
            ..RotorConfig::default()
        };
        let (mut engine, _writer, control) = engine_with(2, 1, config);
        let mut frame = [0.0f32; 1];
        engine.process_block(&mut [frame.as_mut_slice()], 1);

        let ramp_length = engine.ramp_length() as usize;
        control.set_target_frequency(2500.0);

        let mut changes = Vec::new();
        let mut previous = *engine.topology().effective_coefficients(0).unwrap();
        for i in 0..ramp_length + 64 {
            engine.process_block(&mut [frame.as_mut_slice()], 1);
            let current = *engine.topology().effective_coefficients(0).unwrap();
            if current != previous {
                changes.push(i);
                previous = current;
            }
        }
        (changes, ramp_length)
    }

    #[test]
    fn ramp_recomputes_once_per_interval() {
        let (changes, ramp_length) = recompute_frames(100.0, 32);
        assert_eq!(ramp_length, 4800);

        // Every 32nd frame from the first, then once more on the settling frame.
        let mut expected: Vec<usize> = (0..ramp_length).step_by(32).collect();
        expected.push(ramp_length - 1);
        assert_eq!(changes.len(), 151);
        assert_eq!(changes, expected);
    }

    #[test]
    fn recompute_interval_is_configurable() {
        let (changes, ramp_length) = recompute_frames(1.0, 7);
        assert_eq!(ramp_length, 48);
        assert_eq!(changes, vec![0, 7, 14, 21, 28, 35, 42, 47]);

        let (every_frame, ramp_length) = recompute_frames(1.0, 1);
        assert_eq!(every_frame, (0..ramp_length).collect::<Vec<_>>());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "exceeds max_block_size")]
    fn oversized_block_is_rejected_in_debug() {
        let (mut engine, _writer, _control) = engine_with(1, 1, RotorConfig::default());
        let mut buffer = vec![0.0; 512];
        engine.process_block(&mut [buffer.as_mut_slice()], 512);
    }

    #[test]
    fn spread_mode_change_recomputes() {
        let config = RotorConfig {
            spread_hz: 2000.0,
            ramp_duration_ms: 0.0,
            ..RotorConfig::default()
        };
        let (mut engine, _writer, control) = engine_with(4, 1, config);
        let mut buffer = vec![0.0; 4];
        engine.process_block(&mut [buffer.as_mut_slice()], 4);
        let logarithmic = *engine.topology().effective_coefficients(1).unwrap();

        control.set_target_spread(2000.0, true);
        engine.process_block(&mut [buffer.as_mut_slice()], 4);
        assert_eq!(engine.spread_mode(), SpreadMode::Linear);
        assert_ne!(*engine.topology().effective_coefficients(1).unwrap(), logarithmic);
    }

    #[test]
    fn adopts_published_topology_at_block_start() {
        let (mut engine, mut writer, _control) = engine_with(2, 2, RotorConfig::default());
        let builder = TopologyBuilder::new(spec(2));
        writer.publish(builder.build(9).unwrap()).unwrap();

        assert_eq!(engine.stage_count(), 2);
        let mut l = vec![0.1; 8];
        let mut r = vec![0.1; 8];
        engine.process_block(&mut [l.as_mut_slice(), r.as_mut_slice()], 8);
        assert_eq!(engine.stage_count(), 9);
        assert!(engine.topology().is_initialized());
    }
}
