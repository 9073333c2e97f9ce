//! Worker runtime
//!
//! The job owns one rayon pool, built at the entry point before any worker
//! coordination happens. Calibration forward passes run inside it and the
//! final barrier waits on every one of its threads.

use crate::config::TrainerSpec;
use crate::device::{ensure_accelerator, ComputeDevice};
use crate::error::{Error, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Explicitly initialized worker pool for one pruning job
pub struct Runtime {
    pool: ThreadPool,
    device: ComputeDevice,
    world_size: usize,
}

impl Runtime {
    /// Build the pool from `trainer.num_threads` (available cores when unset)
    pub fn init(trainer: &TrainerSpec, device: ComputeDevice) -> Result<Self> {
        let threads = trainer.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("podar-worker-{i}"))
            .build()
            .map_err(|e| Error::Runtime(format!("Failed to build worker pool: {e}")))?;

        Ok(Self { pool, device, world_size: trainer.world_size() })
    }

    /// Check the requested accelerator, then build the pool
    ///
    /// Called once at the entry point, before the checkpoint is restored or
    /// any calibration data is fetched.
    pub fn for_job(trainer: &TrainerSpec) -> Result<Self> {
        let device = ensure_accelerator(trainer.accelerator)?;
        Self::init(trainer, device)
    }

    /// Run `op` inside the pool so nested rayon calls use its threads
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Block until every worker thread has reached this point
    ///
    /// Returns the number of workers that checked in.
    pub fn barrier(&self) -> usize {
        let arrived = AtomicUsize::new(0);
        self.pool.broadcast(|_| {
            arrived.fetch_add(1, Ordering::SeqCst);
        });
        arrived.into_inner()
    }

    /// Number of worker threads
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Participants declared by the trainer config (devices x nodes)
    #[must_use]
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Device resolved by the accelerator check
    #[must_use]
    pub fn device(&self) -> ComputeDevice {
        self.device
    }
}
