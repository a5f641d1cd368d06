//! Rotor Engine - realtime phase rotation with live stage-count changes
//!
//! Runs a cascade of all-pass biquads from [`rotor_core`] on an audio thread
//! while the number of stages can be changed from any other thread, without
//! the audio thread ever allocating, freeing or locking.
//!
//! # Architecture
//!
//! ```text
//!  host / UI threads                 rebuild worker              audio thread
//!  ─────────────────                 ──────────────              ────────────
//!  ControlHandle ──targets (atomics)──────────────────────────▶ CascadeEngine
//!       │                                                          │   ▲
//!       └── request_stage_count ──polled──▶ TopologyBuilder        │   │
//!                                               │                  │   │
//!                                   TopologyWriter ──ready ring────┘   │
//!                                               ▲                      │
//!                                               └──retired ring── TopologyReader
//! ```
//!
//! - [`ControlHandle`] - frequency, resonance, spread and stage-count targets
//! - [`RebuildWorker`] - background thread that resizes topologies
//! - [`topology_exchange`] - wait-free handoff of built and retired topologies
//! - [`CascadeEngine`] - per-block smoothing, coefficient updates and filtering
//! - [`PhaseRotator`] - the facade a host drives
//!
//! # Example
//!
//! ```rust
//! use rotor_engine::{PhaseRotator, RotorConfig};
//!
//! let mut rotator = PhaseRotator::new(RotorConfig::default())?;
//! rotator.configure(48000.0, 512, 1)?;
//! rotator.request_stage_count(32);
//! rotator.set_target_spread(1200.0, false);
//!
//! let mut mono = vec![0.0f32; 512];
//! rotator.process_block(&mut [mono.as_mut_slice()], 512);
//! # Ok::<(), rotor_engine::EngineError>(())
//! ```

pub mod builder;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod rotator;
pub mod topology;
pub mod worker;

pub use builder::TopologyBuilder;
pub use config::{FREQUENCY_RANGE, RESONANCE_RANGE, RotorConfig, SPREAD_RANGE, SpreadStyle};
pub use control::ControlHandle;
pub use engine::CascadeEngine;
pub use error::{ConfigError, EngineError};
pub use exchange::{TopologyReader, TopologyWriter, topology_exchange};
pub use rotator::PhaseRotator;
pub use topology::{CascadeValues, CoefficientSource, ProcessSpec, Stage, Topology};
pub use worker::RebuildWorker;

pub use rotor_core::SpreadMode;
