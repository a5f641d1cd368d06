//! Off-thread construction of resized topologies.

use crate::error::EngineError;
use crate::topology::{ProcessSpec, Topology};

/// Builds [`Topology`] instances for a fixed [`ProcessSpec`].
///
/// Runs on the rebuild worker, never on the realtime thread: building
/// allocates. When handed a topology the realtime side has retired, the
/// builder resizes it in place and reuses its allocation.
#[derive(Debug, Clone, Copy)]
pub struct TopologyBuilder {
    spec: ProcessSpec,
}

impl TopologyBuilder {
    /// Create a builder for `spec`.
    pub fn new(spec: ProcessSpec) -> Self {
        Self { spec }
    }

    /// The spec every built topology carries.
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// Build a fresh topology with `stage_count` stages.
    pub fn build(&self, stage_count: usize) -> Result<Box<Topology>, EngineError> {
        self.rebuild(None, stage_count)
    }

    /// Build a topology with `stage_count` stages, reusing `recycled` when it
    /// was built for the same spec.
    ///
    /// The result always has cleared filter history and is uninitialized, so
    /// the engine computes coefficients before its first sample.
    pub fn rebuild(
        &self,
        recycled: Option<Box<Topology>>,
        stage_count: usize,
    ) -> Result<Box<Topology>, EngineError> {
        let mut topology = match recycled {
            Some(topology) if *topology.spec() == self.spec => topology,
            _ => Box::new(Topology::empty(self.spec)),
        };

        if let Err(e) = topology.resize(stage_count) {
            tracing::warn!(stages = stage_count, error = %e, "topology build failed");
            return Err(e);
        }

        tracing::debug!(
            stages = stage_count,
            channels = self.spec.channels,
            "topology built"
        );
        Ok(topology)
    }
}
