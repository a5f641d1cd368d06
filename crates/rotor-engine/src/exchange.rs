//! Lock-free topology handoff between the rebuild worker and the audio thread.
//!
//! Two `rtrb` rings move boxed topologies in opposite directions:
//!
//! - **ready** (worker → audio): freshly built topologies waiting to go live
//! - **retired** (audio → worker): topologies the audio thread stopped using
//!
//! The audio thread owns exactly one active topology and swaps it for the
//! newest ready one at block boundaries. The displaced instance is never
//! dropped there: it travels back on the retired ring so deallocation (or
//! reuse) happens on the worker. A swap only happens while the retired ring
//! has a free slot, so the audio thread never has to hold on to or free an
//! old topology.
//!
//! Pushing and popping are wait-free; neither side blocks on the other.

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::topology::Topology;

/// Capacity of the ready ring.
pub const READY_CAPACITY: usize = 2;

/// Capacity of the retired ring.
pub const RETIRED_CAPACITY: usize = 4;

/// Create a connected writer/reader pair.
///
/// `active` goes live immediately; `spare` is kept by the writer as the first
/// instance to rebuild into.
pub fn topology_exchange(
    active: Box<Topology>,
    spare: Box<Topology>,
) -> (TopologyWriter, TopologyReader) {
    let (ready_tx, ready_rx) = RingBuffer::new(READY_CAPACITY);
    let (retired_tx, retired_rx) = RingBuffer::new(RETIRED_CAPACITY);

    let writer = TopologyWriter {
        ready: ready_tx,
        retired: retired_rx,
        spare: Some(spare),
    };
    let reader = TopologyReader {
        active,
        ready: ready_rx,
        retired: retired_tx,
        swaps: 0,
    };
    (writer, reader)
}

/// Audio-thread side of the exchange.
pub struct TopologyReader {
    active: Box<Topology>,
    ready: Consumer<Box<Topology>>,
    retired: Producer<Box<Topology>>,
    swaps: u64,
}

impl TopologyReader {
    /// Adopt the newest published topology, if any, and return the active one.
    ///
    /// When several are queued, each older one is retired immediately so the
    /// last published wins. Never allocates or frees.
    #[inline]
    pub fn acquire(&mut self) -> &mut Topology {
        while self.retired.slots() > 0 {
            let Ok(next) = self.ready.pop() else {
                break;
            };
            let previous = std::mem::replace(&mut self.active, next);
            let pushed = self.retired.push(previous);
            debug_assert!(pushed.is_ok(), "retired ring had a free slot");
            self.swaps += 1;
        }
        &mut self.active
    }

    /// The active topology, without checking for a newer one.
    #[inline]
    pub fn active(&self) -> &Topology {
        &self.active
    }

    /// Number of topology swaps performed so far.
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    /// Whether the writer half has been dropped.
    pub fn is_writer_gone(&self) -> bool {
        self.ready.is_abandoned()
    }
}

impl std::fmt::Debug for TopologyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyReader")
            .field("stages", &self.active.stage_count())
            .field("pending", &self.ready.slots())
            .field("swaps", &self.swaps)
            .finish()
    }
}

/// Worker side of the exchange.
pub struct TopologyWriter {
    ready: Producer<Box<Topology>>,
    retired: Consumer<Box<Topology>>,
    spare: Option<Box<Topology>>,
}

impl TopologyWriter {
    /// Queue `topology` for the audio thread.
    ///
    /// Returns the topology back if the ready ring is full.
    pub fn publish(&mut self, topology: Box<Topology>) -> Result<(), Box<Topology>> {
        self.ready.push(topology).map_err(|e| match e {
            PushError::Full(value) => value,
        })
    }

    /// Whether [`publish`](Self::publish) would succeed.
    pub fn has_space(&self) -> bool {
        self.ready.slots() > 0
    }

    /// Collect topologies the audio thread has retired.
    ///
    /// One is kept as the spare for the next rebuild; any others are dropped
    /// here, off the audio thread. Returns how many were collected.
    pub fn reclaim(&mut self) -> usize {
        let mut collected = 0;
        while let Ok(topology) = self.retired.pop() {
            collected += 1;
            if self.spare.is_none() {
                self.spare = Some(topology);
            }
        }
        collected
    }

    /// Take the spare topology for rebuilding, if one is available.
    pub fn take_spare(&mut self) -> Option<Box<Topology>> {
        self.spare.take()
    }

    /// Whether a spare topology is held.
    pub fn has_spare(&self) -> bool {
        self.spare.is_some()
    }

    /// Whether the reader half has been dropped.
    pub fn is_reader_gone(&self) -> bool {
        self.ready.is_abandoned()
    }
}

impl std::fmt::Debug for TopologyWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyWriter")
            .field("ready_slots", &self.ready.slots())
            .field("retired", &self.retired.slots())
            .field("has_spare", &self.spare.is_some())
            .finish()
    }
}
