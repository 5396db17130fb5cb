//! Task lifecycle management for call sessions
//!
//! A [`TaskScope`] owns every background task of one call session together
//! with the [`CancellationToken`] that stops them. Ending the session cancels
//! the token and joins the tasks, so nothing outlives the call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::types::{Error, Result};

/// Handle to a tracked task
#[derive(Debug)]
struct TaskHandle {
    id: usize,
    name: String,
    handle: JoinHandle<()>,
    started_at: Instant,
}

/// A set of named tasks sharing one cancellation token
#[derive(Debug)]
pub struct TaskScope {
    name: String,
    next_task_id: AtomicUsize,
    tasks: Mutex<Vec<TaskHandle>>,
    cancel_token: CancellationToken,
    active_count: Arc<AtomicUsize>,
    shutdown_timeout: Duration,
}

impl TaskScope {
    /// Create a scope with a 5 second shutdown timeout
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_shutdown_timeout(name, Duration::from_secs(5))
    }

    /// Create a scope with a custom shutdown timeout
    pub fn with_shutdown_timeout(name: impl Into<String>, shutdown_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            next_task_id: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
            cancel_token: CancellationToken::new(),
            active_count: Arc::new(AtomicUsize::new(0)),
            shutdown_timeout,
        }
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope-wide token; cancelled by [`TaskScope::cancel`]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// A token cancelled together with the scope, but cancellable on its own
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Whether the scope has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Spawn a task that stops when the scope is cancelled.
    ///
    /// Returns the task id. Spawning into a cancelled scope fails.
    pub async fn spawn<F>(&self, name: impl Into<String>, future: F) -> Result<usize>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel_token.is_cancelled() {
            return Err(Error::Task(format!("scope '{}' is cancelled", self.name)));
        }

        let task_name = name.into();
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);

        let cancel_token = self.cancel_token.clone();
        let active_count = self.active_count.clone();
        let scope_name = self.name.clone();
        let log_name = task_name.clone();

        active_count.fetch_add(1, Ordering::SeqCst);
        let wrapped = async move {
            debug!("Task started: {} [{}] in scope {}", log_name, task_id, scope_name);

            tokio::select! {
                _ = future => {
                    debug!("Task completed: {} [{}] in scope {}", log_name, task_id, scope_name);
                }
                _ = cancel_token.cancelled() => {
                    debug!("Task cancelled: {} [{}] in scope {}", log_name, task_id, scope_name);
                }
            }

            active_count.fetch_sub(1, Ordering::SeqCst);
        };

        let handle = tokio::spawn(wrapped);
        self.tasks.lock().await.push(TaskHandle {
            id: task_id,
            name: task_name,
            handle,
            started_at: Instant::now(),
        });

        Ok(task_id)
    }

    /// Number of tasks still running
    pub fn active_task_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Cancel every task in the scope without waiting
    pub fn cancel(&self) {
        debug!("Cancelling all tasks in scope {}", self.name);
        self.cancel_token.cancel();
    }

    /// Cancel every task and wait for them, aborting stragglers after the
    /// shutdown timeout.
    pub async fn shutdown(&self) {
        let start = Instant::now();
        self.cancel();

        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        let joined = tokio::time::timeout(self.shutdown_timeout, async {
            for task in tasks.iter_mut() {
                let _ = (&mut task.handle).await;
            }
        })
        .await;

        match joined {
            Ok(()) => debug!(
                "Scope {} shut down gracefully in {:?}",
                self.name,
                start.elapsed()
            ),
            Err(_) => {
                warn!(
                    "Scope {} shutdown timed out after {:?}, forcing abort",
                    self.name, self.shutdown_timeout
                );
                for task in tasks.iter().filter(|t| !t.handle.is_finished()) {
                    warn!(
                        "Force aborting task: {} [{}] after {:?}",
                        task.name,
                        task.id,
                        task.started_at.elapsed()
                    );
                    task.handle.abort();
                }
            }
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
