//! Background thread that rebuilds topologies on stage-count changes.
//!
//! The worker polls the requested stage count every [`POLL_INTERVAL`]; the
//! setter is a bare atomic store so it never has to wake anything. Each pass:
//!
//! 1. collects topologies the audio thread has retired, keeping one spare
//! 2. if the requested stage count differs from the last published one,
//!    resizes the spare (or a fresh instance) and publishes it
//!
//! Requests that arrive while a rebuild is running simply overwrite the
//! target; the next pass builds only the latest value.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::builder::TopologyBuilder;
use crate::control::ControlHandle;
use crate::error::EngineError;
use crate::exchange::TopologyWriter;

/// How long the worker parks between passes.
///
/// Bounds how long a stage-count request waits to be noticed, how long
/// retired topologies wait to be collected and how soon a full ready ring is
/// retried.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Owner of the rebuild thread. Dropping it stops and joins the thread.
pub struct RebuildWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RebuildWorker {
    /// Spawn the worker.
    ///
    /// `published` is the stage count of the topology the audio thread starts
    /// with, so the worker only rebuilds when a different count is requested.
    pub fn spawn(
        builder: TopologyBuilder,
        writer: TopologyWriter,
        control: ControlHandle,
        published: u32,
    ) -> Result<Self, EngineError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let state = WorkerState {
            builder,
            writer,
            control,
            shutdown: Arc::clone(&shutdown),
            published,
            failed: None,
        };

        let handle = thread::Builder::new()
            .name("rotor-rebuild".to_string())
            .spawn(move || state.run())
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Whether the thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit. Idempotent.
    ///
    /// Topologies the worker still holds are dropped on its own thread before
    /// it exits.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::Release);
        handle.thread().unpark();
        if handle.join().is_err() {
            tracing::warn!("rebuild worker panicked");
        }
    }
}

impl Drop for RebuildWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RebuildWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildWorker")
            .field("running", &self.is_running())
            .finish()
    }
}

struct WorkerState {
    builder: TopologyBuilder,
    writer: TopologyWriter,
    control: ControlHandle,
    shutdown: Arc<AtomicBool>,
    /// Stage count of the newest topology handed to the audio thread.
    published: u32,
    /// Stage count whose last build failed; not retried until it changes.
    failed: Option<u32>,
}

impl WorkerState {
    fn run(mut self) {
        tracing::info!(stages = self.published, "rebuild worker started");

        while !self.shutdown.load(Ordering::Acquire) {
            let collected = self.writer.reclaim();
            if collected > 0 {
                tracing::trace!(collected, "reclaimed retired topologies");
            }

            if self.step() {
                continue;
            }
            if self.writer.is_reader_gone() {
                break;
            }
            thread::park_timeout(POLL_INTERVAL);
        }

        tracing::info!(stages = self.published, "rebuild worker stopped");
    }

    /// Rebuild and publish if a new stage count is pending. Returns `true`
    /// when a build was attempted.
    fn step(&mut self) -> bool {
        let requested = self.control.requested_stage_count();
        if requested == self.published || self.failed == Some(requested) {
            return false;
        }
        if !self.writer.has_space() {
            tracing::trace!(requested, "ready ring full, deferring rebuild");
            return false;
        }

        let spare = self.writer.take_spare();
        let recycled = spare.is_some();
        match self.builder.rebuild(spare, requested as usize) {
            Ok(topology) => {
                if self.writer.publish(topology).is_err() {
                    // has_space() was checked and only this thread pushes.
                    tracing::warn!(requested, "ready ring rejected topology");
                    return false;
                }
                tracing::debug!(
                    from = self.published,
                    to = requested,
                    recycled,
                    "topology published"
                );
                self.published = requested;
                self.failed = None;
            }
            Err(e) => {
                self.failed = Some(requested);
                self.control.report_rebuild_error(e);
            }
        }
        true
    }
}
