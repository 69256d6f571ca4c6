//! Tracks the long-running server tasks so shutdown can wait for them.
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type NamedHandle = (&'static str, JoinHandle<()>);

/// A shared registry of spawned tasks and the shutdown signal they obey.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<NamedHandle>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns `future` on the runtime and records its handle under `name`.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock_handles().push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks spawned and not yet awaited.
    pub fn task_count(&self) -> usize {
        self.lock_handles().len()
    }

    /// Waits for every recorded task to finish, logging any that panicked.
    pub async fn shutdown(self) {
        let handles: Vec<NamedHandle> = self.lock_handles().drain(..).collect();
        info!("Waiting for {} tasks to complete...", handles.len());

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = 0;
        for (task_name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, "Task panicked during shutdown: {}", e);
                    panicked += 1;
                }
            }
        }

        if panicked == 0 {
            info!("All tasks shut down gracefully.");
        } else {
            error!("{} tasks panicked during shutdown.", panicked);
        }
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<NamedHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
