//! Thread-safe control surface shared by the host, the audio thread and the
//! rebuild worker.
//!
//! Targets are stored as `f32` bit patterns in `AtomicU32`s so any thread can
//! write them and the audio thread can read them once per block without
//! locking. Setters never lock, log or allocate, so a host may call them from
//! its audio callback. Only the last rebuild error sits behind a `Mutex`, and
//! the audio thread never touches it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use rotor_core::SpreadMode;

use crate::config::{FREQUENCY_RANGE, RESONANCE_RANGE, RotorConfig, SPREAD_RANGE, clamp_to};
use crate::error::EngineError;

struct ControlState {
    frequency: AtomicU32,
    resonance: AtomicU32,
    spread: AtomicU32,
    linear_spread: AtomicBool,
    stages: AtomicU32,
    /// Most recent rebuild failure, until taken by the host.
    rebuild_error: Mutex<Option<EngineError>>,
}

/// Cloneable handle to the engine's control targets.
///
/// Setters are callable from any thread. Out-of-range values are clamped and
/// NaN is ignored; automation may sweep past nominal bounds.
///
/// # Thread Safety
///
/// - **Targets**: `AtomicU32`/`AtomicBool`, lock-free on both sides.
/// - **Stage count**: `AtomicU32`, polled by the rebuild worker.
/// - **Rebuild error**: `Mutex`, control side only.
#[derive(Clone)]
pub struct ControlHandle {
    inner: Arc<ControlState>,
}

impl ControlHandle {
    /// Create a handle whose targets start at the values in `config`.
    pub fn new(config: &RotorConfig) -> Self {
        let handle = Self {
            inner: Arc::new(ControlState {
                frequency: AtomicU32::new(1000f32.to_bits()),
                resonance: AtomicU32::new(0.5f32.to_bits()),
                spread: AtomicU32::new(0f32.to_bits()),
                linear_spread: AtomicBool::new(false),
                stages: AtomicU32::new(config.stages),
                rebuild_error: Mutex::new(None),
            }),
        };
        handle.set_target_frequency(config.frequency_hz);
        handle.set_target_resonance(config.resonance);
        handle.set_target_spread(
            config.spread_hz,
            SpreadMode::from(config.spread_mode).is_linear(),
        );
        handle
    }

    // ── Targets ─────────────────────────────────────────────────────────────

    /// Set the center frequency target in Hz.
    pub fn set_target_frequency(&self, hz: f32) {
        store_clamped(&self.inner.frequency, hz, &FREQUENCY_RANGE);
    }

    /// Set the resonance (Q) target.
    pub fn set_target_resonance(&self, q: f32) {
        store_clamped(&self.inner.resonance, q, &RESONANCE_RANGE);
    }

    /// Set the spread target in Hz and its interpolation.
    ///
    /// The mode applies even when `hz` is NaN and ignored.
    pub fn set_target_spread(&self, hz: f32, linear: bool) {
        self.inner.linear_spread.store(linear, Ordering::Release);
        store_clamped(&self.inner.spread, hz, &SPREAD_RANGE);
    }

    /// Request a new stage count.
    ///
    /// A single atomic store. The rebuild worker picks it up within
    /// [`POLL_INTERVAL`](crate::worker::POLL_INTERVAL). Requests coalesce: if
    /// several arrive before the worker runs, only the last one is built.
    #[inline]
    pub fn request_stage_count(&self, stages: u32) {
        self.inner.stages.store(stages, Ordering::Release);
    }

    /// Current center frequency target.
    #[inline]
    pub fn frequency(&self) -> f32 {
        f32::from_bits(self.inner.frequency.load(Ordering::Acquire))
    }

    /// Current resonance target.
    #[inline]
    pub fn resonance(&self) -> f32 {
        f32::from_bits(self.inner.resonance.load(Ordering::Acquire))
    }

    /// Current spread target.
    #[inline]
    pub fn spread(&self) -> f32 {
        f32::from_bits(self.inner.spread.load(Ordering::Acquire))
    }

    /// Current spread interpolation.
    #[inline]
    pub fn spread_mode(&self) -> SpreadMode {
        SpreadMode::from_linear(self.inner.linear_spread.load(Ordering::Acquire))
    }

    /// Most recently requested stage count.
    #[inline]
    pub fn requested_stage_count(&self) -> u32 {
        self.inner.stages.load(Ordering::Acquire)
    }

    // ── Rebuild errors ──────────────────────────────────────────────────────

    /// Take the most recent rebuild failure, if any.
    ///
    /// A failed rebuild leaves the audio thread on its current topology.
    pub fn take_rebuild_error(&self) -> Option<EngineError> {
        self.inner.rebuild_error.lock().take()
    }

    pub(crate) fn report_rebuild_error(&self, error: EngineError) {
        *self.inner.rebuild_error.lock() = Some(error);
    }
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("frequency", &self.frequency())
            .field("resonance", &self.resonance())
            .field("spread", &self.spread())
            .field("spread_mode", &self.spread_mode())
            .field("stages", &self.requested_stage_count())
            .finish()
    }
}

fn store_clamped(target: &AtomicU32, value: f32, range: &core::ops::RangeInclusive<f32>) {
    if let Some(clamped) = clamp_to(value, range) {
        target.store(clamped.to_bits(), Ordering::Release);
    }
}
