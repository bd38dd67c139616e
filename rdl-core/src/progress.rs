// rdl-core/src/progress.rs
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub completed: usize,
    pub total: usize,
}

impl ProgressSample {
    /// Floor of `completed / total * 100`. An empty set counts as done.
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.completed * 100 / self.total
        }
    }
}

impl fmt::Display for ProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {}% ({}/{} dependencies resolved)",
            self.percent(),
            self.completed,
            self.total
        )
    }
}

/// Completion counter shared by the resolution tasks.
#[derive(Debug)]
pub struct ResolutionProgress {
    completed: AtomicUsize,
    total: usize,
}

impl ResolutionProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn mark_done(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn sample(&self) -> ProgressSample {
        ProgressSample {
            completed: self.completed.load(Ordering::Acquire).min(self.total),
            total: self.total,
        }
    }
}

/// Periodically logs the state of the resolution phase.
pub struct ProgressReporter {
    progress: Arc<ResolutionProgress>,
    history: Arc<Mutex<Vec<ProgressSample>>>,
    task: JoinHandle<()>,
}

impl ProgressReporter {
    /// Starts sampling on `scheduler`: first after `initial_delay`, then
    /// every `interval`.
    pub fn spawn(
        scheduler: &Handle,
        progress: Arc<ResolutionProgress>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Self {
        let history = Arc::new(Mutex::new(Vec::new()));

        let task_progress = Arc::clone(&progress);
        let task_history = Arc::clone(&history);
        let task = scheduler.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                record(&task_history, task_progress.sample());
            }
        });

        Self {
            progress,
            history,
            task,
        }
    }

    /// Stops sampling, emits the final sample and returns every sample
    /// taken.
    pub async fn finish(self) -> Vec<ProgressSample> {
        self.task.abort();
        let _ = self.task.await;

        record(&self.history, self.progress.sample());
        match self.history.lock() {
            Ok(mut history) => std::mem::take(&mut *history),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

fn record(history: &Mutex<Vec<ProgressSample>>, sample: ProgressSample) {
    info!("{}", sample);
    if let Ok(mut history) = history.lock() {
        history.push(sample);
    }
}
