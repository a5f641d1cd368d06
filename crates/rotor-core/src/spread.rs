//! Distribution of stage cutoff frequencies across a spread window.
//!
//! Every stage of the cascade is centered on the same frequency unless a
//! spread is applied. With a spread of `s` Hz the stages are fanned out over
//! the window `[center - s/2, center + s/2]`, either in equal Hz steps
//! ([`SpreadMode::Linear`]) or in equal pitch steps
//! ([`SpreadMode::Logarithmic`]).
//!
//! Window edges are clamped to `[MIN_STAGE_FREQUENCY, sample_rate / 2.1]`,
//! which keeps every stage strictly below Nyquist where the all-pass
//! coefficients start to lose precision.

use libm::{expf, logf};

/// Lowest cutoff any stage is allowed to reach, in Hz.
pub const MIN_STAGE_FREQUENCY: f32 = 5.0;

/// Divisor applied to the sample rate to get the highest stage cutoff.
pub const NYQUIST_MARGIN: f32 = 2.1;

/// How stage frequencies are interpolated across the spread window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpreadMode {
    /// Equal steps in Hz.
    Linear,
    /// Equal steps in pitch; matches how the ear perceives frequency.
    #[default]
    Logarithmic,
}

impl SpreadMode {
    /// Returns the mode for a `linear` flag.
    #[inline]
    pub fn from_linear(linear: bool) -> Self {
        if linear { Self::Linear } else { Self::Logarithmic }
    }

    /// Returns `true` for [`SpreadMode::Linear`].
    #[inline]
    pub fn is_linear(self) -> bool {
        self == Self::Linear
    }
}

/// Highest cutoff a stage may use at the given sample rate.
#[inline]
pub fn max_stage_frequency(sample_rate: f32) -> f32 {
    sample_rate / NYQUIST_MARGIN
}

/// Clamps a frequency into the range every stage must stay within.
///
/// Never panics: when the sample rate is so low that the upper bound falls
/// below [`MIN_STAGE_FREQUENCY`], the upper bound wins.
#[inline]
pub fn clamp_stage_frequency(frequency: f32, sample_rate: f32) -> f32 {
    frequency
        .max(MIN_STAGE_FREQUENCY)
        .min(max_stage_frequency(sample_rate))
}

/// The clamped frequency window the stages are distributed across.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadWindow {
    /// Frequency of the first stage, Hz
    pub low: f32,
    /// Frequency of the last stage, Hz
    pub high: f32,
}

impl SpreadWindow {
    /// Interpolates a frequency inside the window.
    ///
    /// `t = 0` lands exactly on `low` and `t = 1` exactly on `high`.
    #[inline]
    pub fn frequency_at(&self, t: f32, mode: SpreadMode) -> f32 {
        if t <= 0.0 || self.low == self.high {
            return self.low;
        }
        if t >= 1.0 {
            return self.high;
        }

        match mode {
            SpreadMode::Linear => self.low + t * (self.high - self.low),
            SpreadMode::Logarithmic => {
                let log_low = logf(self.low);
                expf(log_low + t * (logf(self.high) - log_low))
            }
        }
    }
}

/// Computes the clamped spread window around `center`.
///
/// `spread` is signed; a negative spread mirrors the window so that stage
/// frequencies descend with the stage index.
#[inline]
pub fn spread_window(center: f32, spread: f32, sample_rate: f32) -> SpreadWindow {
    let half = spread / 2.0;
    SpreadWindow {
        low: clamp_stage_frequency(center - half, sample_rate),
        high: clamp_stage_frequency(center + half, sample_rate),
    }
}

/// Position of a stage within the window, in `0.0..=1.0`.
///
/// A single stage sits at the midpoint; two or more stages span the window
/// endpoints inclusively.
#[inline]
pub fn stage_offset(index: usize, count: usize) -> f32 {
    if count <= 1 {
        0.5
    } else {
        index as f32 / (count - 1) as f32
    }
}

/// Computes the cutoff frequency of stage `index` out of `count`.
///
/// # Example
///
/// ```rust
/// use rotor_core::{SpreadMode, stage_frequency};
///
/// // Four stages spread over 500..1500 Hz
/// let first = stage_frequency(1000.0, 1000.0, 48000.0, 0, 4, SpreadMode::Linear);
/// let last = stage_frequency(1000.0, 1000.0, 48000.0, 3, 4, SpreadMode::Linear);
/// assert_eq!(first, 500.0);
/// assert_eq!(last, 1500.0);
/// ```
#[inline]
pub fn stage_frequency(
    center: f32,
    spread: f32,
    sample_rate: f32,
    index: usize,
    count: usize,
    mode: SpreadMode,
) -> f32 {
    spread_window(center, spread, sample_rate).frequency_at(stage_offset(index, count), mode)
}
