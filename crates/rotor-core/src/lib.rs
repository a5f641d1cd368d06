//! Rotor Core - DSP primitives for a phase-rotation all-pass cascade
//!
//! This crate provides the allocation-free building blocks the realtime engine
//! is assembled from. Nothing here owns a buffer or knows about threads.
//!
//! # Core Abstractions
//!
//! ## Filters
//!
//! - [`AllpassCoefficients`] - Normalized second-order all-pass coefficients
//! - [`allpass_coefficients`] - RBJ cookbook all-pass design from cutoff and Q
//! - [`AllpassBiquad`] - Direct Form I filter history; coefficients are borrowed
//!   per sample so many filters can share one set
//!
//! ## Stage Distribution
//!
//! - [`stage_frequency`] - Cutoff of one stage within a spread window
//! - [`SpreadMode`] - Linear or logarithmic interpolation across the window
//!
//! ## Parameter Smoothing
//!
//! - [`RampedParam`] - Linear ramps over a fixed number of steps
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! rotor-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use rotor_core::{AllpassBiquad, SpreadMode, allpass_coefficients, stage_frequency};
//!
//! let sample_rate = 48000.0;
//! let stages = 4;
//! let mut filters = [AllpassBiquad::new(); 4];
//!
//! let mut sample = 1.0;
//! for (i, filter) in filters.iter_mut().enumerate() {
//!     let freq = stage_frequency(1000.0, 800.0, sample_rate, i, stages, SpreadMode::Logarithmic);
//!     let coefficients = allpass_coefficients(freq, 0.707, sample_rate);
//!     sample = filter.process(sample, &coefficients);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod math;
pub mod param;
pub mod spread;

// Re-export main types at crate root
pub use biquad::{AllpassBiquad, AllpassCoefficients, Response, allpass_coefficients};
pub use math::{flush_denormal, ms_to_samples};
pub use param::RampedParam;
pub use spread::{
    MIN_STAGE_FREQUENCY, NYQUIST_MARGIN, SpreadMode, SpreadWindow, clamp_stage_frequency,
    max_stage_frequency, spread_window, stage_frequency, stage_offset,
};
