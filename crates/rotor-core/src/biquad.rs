//! Second-order all-pass (biquad) filter structure.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook all-pass formula, normalized
//! so that `a0 == 1`. A single [`AllpassCoefficients`] value can drive any
//! number of [`AllpassBiquad`] instances: the filter only holds its history and
//! borrows the coefficients for each sample, so stages and channels are free
//! to share one coefficient set.

use core::f32::consts::PI;
use core::f64::consts::{PI as PI_F64, TAU as TAU_F64};
use libm::{atan2, cos, cosf, sin, sinf, sqrt};

use crate::math::flush_denormal;

/// Normalized all-pass biquad coefficients.
///
/// Implements the transfer function:
/// ```text
///        b0 + b1*z^-1 + b2*z^-2
/// H(z) = ----------------------
///         1 + a1*z^-1 + a2*z^-2
/// ```
///
/// For an all-pass section `b0 == a2`, `b1 == a1` and `b2 == 1`, which keeps
/// the magnitude response at unity for every frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllpassCoefficients {
    /// Feedforward coefficient for x[n]
    pub b0: f32,
    /// Feedforward coefficient for x[n-1]
    pub b1: f32,
    /// Feedforward coefficient for x[n-2]
    pub b2: f32,
    /// Feedback coefficient for y[n-1]
    pub a1: f32,
    /// Feedback coefficient for y[n-2]
    pub a2: f32,
}

impl AllpassCoefficients {
    /// Passthrough coefficients (`y[n] = x[n]`).
    ///
    /// Used as a placeholder for freshly allocated stages before the first
    /// coefficient computation.
    pub const PASSTHROUGH: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Computes all-pass coefficients for the given cutoff and Q.
    ///
    /// See [`allpass_coefficients`].
    #[inline]
    pub fn new(frequency: f32, q: f32, sample_rate: f32) -> Self {
        allpass_coefficients(frequency, q, sample_rate)
    }

    /// Evaluates the frequency response at `frequency` Hz.
    ///
    /// Substitutes `z = e^(jw)` with `w = 2*pi*frequency/sample_rate` into the
    /// transfer function and returns the magnitude and phase (radians,
    /// wrapped to `-pi..=pi`).
    pub fn response_at(&self, frequency: f32, sample_rate: f32) -> Response {
        // Evaluated in f64: near a high-Q pole numerator and denominator are
        // both tiny and f32 rounding would dominate their ratio.
        let (b0, b1, b2) = (f64::from(self.b0), f64::from(self.b1), f64::from(self.b2));
        let (a1, a2) = (f64::from(self.a1), f64::from(self.a2));
        let omega = 2.0 * PI_F64 * f64::from(frequency) / f64::from(sample_rate);
        let (cos1, sin1) = (cos(omega), sin(omega));
        let (cos2, sin2) = (cos(2.0 * omega), sin(2.0 * omega));

        // e^(-jw) = cos(w) - j*sin(w)
        let num_re = b0 + b1 * cos1 + b2 * cos2;
        let num_im = -(b1 * sin1 + b2 * sin2);
        let den_re = 1.0 + a1 * cos1 + a2 * cos2;
        let den_im = -(a1 * sin1 + a2 * sin2);

        let num_mag = sqrt(num_re * num_re + num_im * num_im);
        let den_mag = sqrt(den_re * den_re + den_im * den_im);

        let mut phase = atan2(num_im, num_re) - atan2(den_im, den_re);
        if phase > PI_F64 {
            phase -= TAU_F64;
        } else if phase < -PI_F64 {
            phase += TAU_F64;
        }

        Response {
            magnitude: (num_mag / den_mag) as f32,
            phase: phase as f32,
        }
    }
}

impl Default for AllpassCoefficients {
    fn default() -> Self {
        Self::PASSTHROUGH
    }
}

/// Magnitude and phase of a frequency response at a single frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    /// Linear magnitude
    pub magnitude: f32,
    /// Phase in radians, `-pi..=pi`
    pub phase: f32,
}

/// Calculates all-pass filter coefficients using the RBJ cookbook formula.
///
/// # Arguments
///
/// * `frequency` - Cutoff frequency in Hz, `0 < frequency < sample_rate / 2`
/// * `q` - Q factor (resonance), `> 0`
/// * `sample_rate` - Sample rate in Hz
///
/// The frequency is not clamped here; callers are expected to keep it inside
/// the open interval `(0, nyquist)`.
///
/// # Returns
///
/// Coefficients normalized by `a0 = 1 + alpha`.
pub fn allpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> AllpassCoefficients {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);

    // Unnormalized: b0 = 1 - alpha, b1 = -2cos, b2 = 1 + alpha = a0
    let a0_inv = 1.0 / (1.0 + alpha);
    let b0 = (1.0 - alpha) * a0_inv;
    let b1 = -2.0 * cos_omega * a0_inv;

    AllpassCoefficients {
        b0,
        b1,
        b2: 1.0,
        a1: b1,
        a2: b0,
    }
}

/// Direct Form I all-pass biquad state for a single channel.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
///
/// Only the history lives here; coefficients are passed in per sample so many
/// filters can read one shared [`AllpassCoefficients`].
///
/// # Example
///
/// ```rust
/// use rotor_core::{AllpassBiquad, allpass_coefficients};
///
/// let coefficients = allpass_coefficients(1000.0, 0.707, 48000.0);
/// let mut filter = AllpassBiquad::new();
///
/// let output = filter.process(1.0, &coefficients);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AllpassBiquad {
    /// Input delay line: x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    /// Output delay line: y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl AllpassBiquad {
    /// Creates a filter with cleared history.
    pub const fn new() -> Self {
        Self {
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Processes a single sample using the given coefficients.
    #[inline]
    pub fn process(&mut self, input: f32, coefficients: &AllpassCoefficients) -> f32 {
        let c = coefficients;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);

        output
    }

    /// Zeroes the input and output history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns `true` when all four history values are zero.
    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.x1 == 0.0 && self.x2 == 0.0 && self.y1 == 0.0 && self.y2 == 0.0
    }
}
