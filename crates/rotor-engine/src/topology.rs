//! Realized filter stages and per-channel filter state.
//!
//! A [`Topology`] is the cascade for one stage count: an ordered list of
//! [`Stage`]s, each owning a coefficient set and one [`AllpassBiquad`] per
//! channel. The realtime thread updates coefficients in place and runs samples
//! through it; it never resizes one. Resizing happens on a separate instance
//! built by [`TopologyBuilder`](crate::TopologyBuilder).

use std::collections::TryReserveError;

use rotor_core::{
    AllpassBiquad, AllpassCoefficients, SpreadMode, allpass_coefficients, clamp_stage_frequency,
    stage_frequency,
};

use crate::error::EngineError;

/// Processing parameters negotiated with the host.
///
/// Fixed for the lifetime of a [`Topology`]; a change means rebuilding every
/// stage from scratch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Largest block the host will pass to `process_block`. No buffer is
    /// sized from it; the engine asserts it in debug builds.
    pub max_block_size: usize,
    /// Number of processed channels
    pub channels: usize,
}

impl ProcessSpec {
    /// Validate host-provided values.
    pub fn new(sample_rate: f64, max_block_size: u32, channels: u32) -> Result<Self, EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(EngineError::InvalidBlockSize(max_block_size));
        }
        if channels == 0 {
            return Err(EngineError::InvalidChannelCount(channels));
        }
        Ok(Self {
            sample_rate: sample_rate as f32,
            max_block_size: max_block_size as usize,
            channels: channels as usize,
        })
    }
}

/// Smoothed parameter values a coefficient update is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeValues {
    /// Center frequency in Hz
    pub frequency: f32,
    /// Resonance (Q)
    pub resonance: f32,
    /// Signed spread in Hz
    pub spread: f32,
}

/// Where the filters of a stage read their coefficients from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientSource {
    /// Each stage uses its own coefficient set.
    #[default]
    PerStage,
    /// Every stage uses stage 0's coefficient set. Active while the spread is
    /// zero, when all stages would compute identical coefficients anyway.
    Shared,
}

/// One all-pass stage: a coefficient set and a filter per channel.
#[derive(Debug, Clone)]
pub struct Stage {
    coefficients: AllpassCoefficients,
    channels: Vec<AllpassBiquad>,
}

impl Stage {
    /// Allocate a stage with cleared filters and placeholder coefficients.
    pub(crate) fn with_channels(channels: usize) -> Result<Self, TryReserveError> {
        let mut filters = Vec::new();
        filters.try_reserve_exact(channels)?;
        filters.resize(channels, AllpassBiquad::new());
        Ok(Self {
            coefficients: AllpassCoefficients::PASSTHROUGH,
            channels: filters,
        })
    }

    /// This stage's own coefficient set.
    #[inline]
    pub fn coefficients(&self) -> &AllpassCoefficients {
        &self.coefficients
    }

    /// Per-channel filter state.
    #[inline]
    pub fn channels(&self) -> &[AllpassBiquad] {
        &self.channels
    }

    /// Number of channels this stage filters.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Clear the history of every channel and drop back to placeholder
    /// coefficients.
    pub(crate) fn reset(&mut self) {
        self.coefficients = AllpassCoefficients::PASSTHROUGH;
        self.channels.iter_mut().for_each(AllpassBiquad::reset);
    }
}

/// An ordered cascade of stages for a fixed [`ProcessSpec`].
///
/// Right after being built or resized, `is_initialized()` is `false`; the
/// engine then recomputes every coefficient before the first sample goes
/// through the placeholder ones.
#[derive(Debug, Clone)]
pub struct Topology {
    spec: ProcessSpec,
    stages: Vec<Stage>,
    source: CoefficientSource,
    is_initialized: bool,
}

impl Topology {
    /// An empty topology (no stages) for `spec`.
    pub fn empty(spec: ProcessSpec) -> Self {
        Self {
            spec,
            stages: Vec::new(),
            source: CoefficientSource::PerStage,
            is_initialized: false,
        }
    }

    /// Processing spec this topology was built for.
    #[inline]
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// Number of stages.
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// The stages, in processing order.
    #[inline]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether coefficients have been computed since the last resize.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    /// Where stages currently read their coefficients from.
    #[inline]
    pub fn coefficient_source(&self) -> CoefficientSource {
        self.source
    }

    /// Coefficients the filters of stage `index` actually use.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn effective_coefficients(&self, index: usize) -> Option<&AllpassCoefficients> {
        let stage = match self.source {
            CoefficientSource::PerStage => self.stages.get(index)?,
            CoefficientSource::Shared if index < self.stages.len() => self.stages.first()?,
            CoefficientSource::Shared => return None,
        };
        Some(&stage.coefficients)
    }

    /// Returns `true` when every stage has exactly `spec.channels` filters.
    pub fn is_consistent(&self) -> bool {
        self.stages
            .iter()
            .all(|stage| stage.channel_count() == self.spec.channels)
    }

    /// Resize to `stage_count` stages.
    ///
    /// New stages get cleared filters; existing ones are reset too, since the
    /// history they hold belongs to audio this topology stopped processing.
    /// Leaves the topology uninitialized.
    pub(crate) fn resize(&mut self, stage_count: usize) -> Result<(), EngineError> {
        self.source = CoefficientSource::PerStage;
        self.is_initialized = false;

        if stage_count > self.stages.len() {
            self.stages
                .try_reserve_exact(stage_count - self.stages.len())
                .map_err(|e| EngineError::allocation(stage_count, e))?;
        }
        self.stages.truncate(stage_count);
        self.stages.iter_mut().for_each(Stage::reset);
        while self.stages.len() < stage_count {
            let stage = Stage::with_channels(self.spec.channels)
                .map_err(|e| EngineError::allocation(stage_count, e))?;
            self.stages.push(stage);
        }
        Ok(())
    }

    /// Recompute coefficients from smoothed parameter values.
    ///
    /// With zero spread only stage 0 is computed and every stage shares it.
    /// Otherwise each stage gets its own frequency from the spread window.
    /// Frequencies are clamped below Nyquist before reaching the coefficient
    /// math. Always marks the topology initialized.
    pub fn update_coefficients(&mut self, values: CascadeValues, mode: SpreadMode) {
        let sample_rate = self.spec.sample_rate;
        let count = self.stages.len();

        if values.spread == 0.0 {
            if let Some(first) = self.stages.first_mut() {
                let frequency = clamp_stage_frequency(values.frequency, sample_rate);
                first.coefficients = allpass_coefficients(frequency, values.resonance, sample_rate);
            }
            self.source = CoefficientSource::Shared;
        } else {
            for (i, stage) in self.stages.iter_mut().enumerate() {
                let frequency =
                    stage_frequency(values.frequency, values.spread, sample_rate, i, count, mode);
                stage.coefficients = allpass_coefficients(frequency, values.resonance, sample_rate);
            }
            self.source = CoefficientSource::PerStage;
        }

        self.is_initialized = true;
    }

    /// Run one sample of `channel` through every stage in order.
    ///
    /// Channels beyond the spec's channel count pass through untouched; the
    /// engine never sends them here.
    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        let shared = match self.source {
            CoefficientSource::Shared => self.stages.first().map(|s| s.coefficients),
            CoefficientSource::PerStage => None,
        };

        let mut sample = input;
        for stage in &mut self.stages {
            let coefficients = shared.unwrap_or(stage.coefficients);
            if let Some(filter) = stage.channels.get_mut(channel) {
                sample = filter.process(sample, &coefficients);
            }
        }
        sample
    }
}
