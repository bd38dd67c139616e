// rdl-core/src/context.rs
use std::future::Future;

use rdl_common::config::Config;
use rdl_common::error::{RdlError, Result};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use crate::load::InFlightLoads;

/// Process-wide state of one load run: the worker pool for resolution and
/// load tasks, the single-thread scheduler for progress sampling, and the
/// in-flight load map.
///
/// Created once per top-level run and consumed by [`LoaderContext::shutdown`],
/// so the pools cannot be used after they are released.
pub struct LoaderContext {
    config: Config,
    workers: Runtime,
    scheduler: Runtime,
    in_flight: InFlightLoads,
}

impl LoaderContext {
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let workers = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.worker_threads)
            .thread_name("rdl-worker")
            .enable_all()
            .build()
            .map_err(|e| RdlError::Runtime(format!("failed to start worker pool: {e}")))?;

        let scheduler = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rdl-progress")
            .enable_time()
            .build()
            .map_err(|e| RdlError::Runtime(format!("failed to start scheduler: {e}")))?;

        debug!(
            "Loader context started with {} worker threads",
            config.worker_threads
        );
        Ok(Self {
            config,
            workers,
            scheduler,
            in_flight: InFlightLoads::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workers(&self) -> &Handle {
        self.workers.handle()
    }

    pub fn scheduler(&self) -> &Handle {
        self.scheduler.handle()
    }

    pub fn in_flight(&self) -> InFlightLoads {
        InFlightLoads::clone(&self.in_flight)
    }

    /// Drives `future` to completion on the worker pool, blocking the caller.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.workers.block_on(future)
    }

    /// Releases both pools. Tasks still running are detached.
    pub fn shutdown(self) {
        debug!("Shutting down loader context");
        self.scheduler.shutdown_background();
        self.workers.shutdown_background();
    }
}
