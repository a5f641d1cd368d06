//! Linear parameter ramps for click-free control changes.
//!
//! Cutoff, resonance and spread all drive trigonometric coefficient math, and
//! jumping them between blocks is audible as a click. [`RampedParam`] moves a
//! value toward its target in equal steps over a fixed number of samples.
//!
//! ## Ramp length
//!
//! The ramp length in steps is the ramp duration (100 ms by default) converted
//! to samples and divided by an *automation precision* divisor. A divisor of 1
//! ramps over the full duration; larger divisors give shorter, coarser ramps,
//! which settle sooner and therefore trigger fewer coefficient recomputations.
//!
//! ## Usage
//!
//! ```rust
//! use rotor_core::RampedParam;
//!
//! let mut frequency = RampedParam::with_config(1000.0, 48000.0, 100.0, 1);
//! frequency.set_target(2000.0);
//!
//! // Once per sample in the audio callback
//! for _ in 0..4800 {
//!     let (value, ramping) = frequency.advance();
//!     let _ = (value, ramping);
//! }
//! assert_eq!(frequency.get(), 2000.0);
//! ```

use crate::math::ms_to_samples;

/// A parameter with linear smoothing over a fixed number of steps.
///
/// Invariant: `steps_remaining <= ramp_length`, and `steps_remaining == 0`
/// implies `current == target`.
#[derive(Debug, Clone)]
pub struct RampedParam {
    /// Current value
    current: f32,
    /// Target value
    target: f32,
    /// Increment per step (can be positive or negative)
    increment: f32,
    /// Steps remaining until the target is reached
    steps_remaining: u32,
    /// Number of steps a full ramp takes; 0 means changes are instant
    ramp_length: u32,
}

impl RampedParam {
    /// Default ramp duration in milliseconds.
    pub const DEFAULT_RAMP_MS: f32 = 100.0;

    /// Create a parameter that jumps to new targets instantly.
    ///
    /// Call [`configure`](Self::configure) to enable ramping.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            steps_remaining: 0,
            ramp_length: 0,
        }
    }

    /// Create with full configuration.
    ///
    /// # Arguments
    /// * `initial` - Initial value (already settled)
    /// * `sample_rate` - Sample rate in Hz
    /// * `ramp_ms` - Ramp duration in milliseconds
    /// * `precision` - Automation precision divisor (treated as 1 when 0)
    pub fn with_config(initial: f32, sample_rate: f32, ramp_ms: f32, precision: u32) -> Self {
        let mut param = Self::new(initial);
        param.configure(sample_rate, ramp_ms, precision);
        param
    }

    /// Recompute the ramp length and settle on the current target.
    ///
    /// Any ramp in progress is completed immediately.
    pub fn configure(&mut self, sample_rate: f32, ramp_ms: f32, precision: u32) {
        self.ramp_length = ms_to_samples(ramp_ms, sample_rate) / precision.max(1);
        self.snap_to_target();
    }

    /// Set the target value and restart the ramp from the current value.
    ///
    /// Setting the target that is already active is a no-op, so an
    /// unchanged control value never re-triggers a ramp.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;

        if self.ramp_length == 0 {
            self.current = target;
            self.increment = 0.0;
            self.steps_remaining = 0;
        } else {
            self.increment = (target - self.current) / self.ramp_length as f32;
            self.steps_remaining = self.ramp_length;
        }
    }

    /// Set value immediately.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.steps_remaining = 0;
    }

    /// Advance one step.
    ///
    /// Returns the new value and whether the ramp is still in progress. The
    /// final step lands exactly on the target; after that the settled target
    /// is returned on every call.
    #[inline]
    pub fn advance(&mut self) -> (f32, bool) {
        if self.steps_remaining > 0 {
            self.current += self.increment;
            self.steps_remaining -= 1;
            if self.steps_remaining == 0 {
                self.current = self.target; // Snap to exact target
            }
        }
        (self.current, self.steps_remaining > 0)
    }

    /// Get current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Get target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Check if a ramp is in progress.
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.steps_remaining > 0
    }

    /// Steps left in the current ramp.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.steps_remaining
    }

    /// Number of steps a full ramp takes.
    #[inline]
    pub fn ramp_length(&self) -> u32 {
        self.ramp_length
    }

    /// Snap to target immediately.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.steps_remaining = 0;
    }
}

impl Default for RampedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
