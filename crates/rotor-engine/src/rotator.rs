//! Host-facing facade tying the engine, the rebuild worker and the control
//! handle together.

use crate::builder::TopologyBuilder;
use crate::config::RotorConfig;
use crate::control::ControlHandle;
use crate::engine::CascadeEngine;
use crate::error::EngineError;
use crate::exchange::topology_exchange;
use crate::topology::ProcessSpec;
use crate::worker::RebuildWorker;

/// A phase rotator: a cascade of all-pass biquads with smoothed controls and
/// a stage count that can change while audio is running.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new) with a [`RotorConfig`]
/// 2. [`configure`](Self::configure) with the host's sample rate, block size
///    and channel count; this builds the topologies and starts the worker
/// 3. [`process_block`](Self::process_block) on the audio thread, setters and
///    [`request_stage_count`](Self::request_stage_count) from anywhere
///    (through [`control`](Self::control) for other threads)
/// 4. [`release`](Self::release) or drop
///
/// # Example
///
/// ```rust
/// use rotor_engine::{PhaseRotator, RotorConfig};
///
/// let mut rotator = PhaseRotator::new(RotorConfig::default())?;
/// rotator.configure(48000.0, 256, 2)?;
/// rotator.set_target_frequency(800.0);
///
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// rotator.process_block(&mut [left.as_mut_slice(), right.as_mut_slice()], 256);
/// # Ok::<(), rotor_engine::EngineError>(())
/// ```
pub struct PhaseRotator {
    config: RotorConfig,
    control: ControlHandle,
    engine: Option<CascadeEngine>,
    worker: Option<RebuildWorker>,
}

impl PhaseRotator {
    /// Create an unconfigured rotator. Targets start at the config's values.
    pub fn new(config: RotorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let control = ControlHandle::new(&config);
        Ok(Self {
            config,
            control,
            engine: None,
            worker: None,
        })
    }

    /// Build both topologies from scratch and start the rebuild worker.
    ///
    /// Any previous configuration is released first. Both topologies start
    /// at the most recently requested stage count.
    pub fn configure(
        &mut self,
        sample_rate: f64,
        max_block_size: u32,
        channel_count: u32,
    ) -> Result<(), EngineError> {
        self.release();

        let spec = ProcessSpec::new(sample_rate, max_block_size, channel_count)?;
        let builder = TopologyBuilder::new(spec);
        let stages = self.control.requested_stage_count();

        let active = builder.build(stages as usize)?;
        let spare = builder.build(stages as usize)?;
        let (writer, reader) = topology_exchange(active, spare);

        let engine = CascadeEngine::new(spec, reader, self.control.clone(), &self.config);
        let worker = RebuildWorker::spawn(builder, writer, self.control.clone(), stages)?;

        self.engine = Some(engine);
        self.worker = Some(worker);

        tracing::info!(
            "PhaseRotator: configured at {sample_rate} Hz, {channel_count} channels, \
             {stages} stages, max block {max_block_size}"
        );
        Ok(())
    }

    /// Filter `frame_count` frames of channel-major audio in place.
    ///
    /// Does nothing before [`configure`](Self::configure). Channels beyond the
    /// configured count are silenced.
    #[inline]
    pub fn process_block(&mut self, channels: &mut [&mut [f32]], frame_count: u32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.process_block(channels, frame_count as usize);
        }
    }

    /// Set the center frequency target in Hz.
    pub fn set_target_frequency(&self, hz: f32) {
        self.control.set_target_frequency(hz);
    }

    /// Set the resonance (Q) target.
    pub fn set_target_resonance(&self, q: f32) {
        self.control.set_target_resonance(q);
    }

    /// Set the spread target in Hz, linear or logarithmic.
    pub fn set_target_spread(&self, hz: f32, linear: bool) {
        self.control.set_target_spread(hz, linear);
    }

    /// Request a stage count; the worker builds it in the background.
    pub fn request_stage_count(&self, stages: u32) {
        self.control.request_stage_count(stages);
    }

    /// Stop the worker and free all stage and channel state on the calling
    /// thread. The rotator can be configured again afterwards.
    pub fn release(&mut self) {
        let was_configured = self.engine.is_some();
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.engine = None;
        if was_configured {
            tracing::info!("PhaseRotator: released");
        }
    }

    /// Handle for setting targets from other threads.
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// The realtime engine, once configured.
    pub fn engine(&self) -> Option<&CascadeEngine> {
        self.engine.as_ref()
    }

    /// Whether [`configure`](Self::configure) has succeeded since the last
    /// release.
    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    /// Stage count currently being processed (0 when unconfigured).
    pub fn stage_count(&self) -> usize {
        self.engine.as_ref().map_or(0, CascadeEngine::stage_count)
    }

    /// Take the most recent background rebuild failure, if any.
    pub fn take_rebuild_error(&self) -> Option<EngineError> {
        self.control.take_rebuild_error()
    }

    /// The configuration this rotator was created with.
    pub fn config(&self) -> &RotorConfig {
        &self.config
    }

    /// Processing latency. All-pass filtering adds none.
    pub fn latency_samples(&self) -> u32 {
        0
    }

    /// Samples of output after the input stops that a host must not cut.
    pub fn tail_samples(&self) -> u32 {
        0
    }
}

impl Drop for PhaseRotator {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PhaseRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseRotator")
            .field("config", &self.config)
            .field("control", &self.control)
            .field("engine", &self.engine)
            .field("worker", &self.worker)
            .finish()
    }
}
