//! Deferred task queue
//!
//! Every timed transition is a tokio task registered under a key (the paper
//! id). Handles returned at schedule time cancel a single task; `cancel`
//! drops every pending task for a key. Completed tasks deregister
//! themselves.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Default)]
struct SchedulerInner {
    tasks: HashMap<String, HashMap<u64, AbortHandle>>,
    next_id: u64,
}

impl SchedulerInner {
    fn remove(&mut self, key: &str, id: u64) -> Option<AbortHandle> {
        let set = self.tasks.get_mut(key)?;
        let handle = set.remove(&id);
        if set.is_empty() {
            self.tasks.remove(key);
        }
        handle
    }
}

fn lock(inner: &Mutex<SchedulerInner>) -> MutexGuard<'_, SchedulerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of all pending deferred tasks
#[derive(Clone, Default)]
pub struct TaskScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

/// Cancellation handle for one scheduled task
#[derive(Debug)]
pub struct TaskHandle {
    key: String,
    id: u64,
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `delay` has elapsed from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: &str, delay: Duration, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let inner = Arc::clone(&self.inner);

        // Hold the lock across spawn so the task cannot deregister before it
        // has been registered.
        let mut guard = lock(&self.inner);
        let id = guard.next_id;
        guard.next_id += 1;

        let task_key = key.to_string();
        let join = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task.await;
            lock(&inner).remove(&task_key, id);
        });

        let abort = join.abort_handle();
        guard
            .tasks
            .entry(key.to_string())
            .or_default()
            .insert(id, abort.clone());

        debug!(key, task_id = id, delay_ms = delay.as_millis() as u64, "Task scheduled");

        TaskHandle {
            key: key.to_string(),
            id,
            abort,
        }
    }

    /// Cancel a single task; returns false if it already ran or was cancelled
    pub fn cancel_task(&self, handle: &TaskHandle) -> bool {
        match lock(&self.inner).remove(&handle.key, handle.id) {
            Some(abort) => {
                abort.abort();
                debug!(key = %handle.key, task_id = handle.id, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task for a key; returns how many were dropped
    pub fn cancel(&self, key: &str) -> usize {
        let removed = lock(&self.inner).tasks.remove(key).unwrap_or_default();
        for abort in removed.values() {
            abort.abort();
        }
        if !removed.is_empty() {
            debug!(key, count = removed.len(), "Pending tasks cancelled");
        }
        removed.len()
    }

    /// Cancel everything still pending
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<AbortHandle> = lock(&self.inner)
            .tasks
            .drain()
            .flat_map(|(_, set)| set.into_values())
            .collect();
        for abort in &drained {
            abort.abort();
        }
        drained.len()
    }

    /// Number of tasks still pending for a key
    pub fn pending(&self, key: &str) -> usize {
        lock(&self.inner).tasks.get(key).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        let scheduler = TaskScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        scheduler.schedule("paper-1", Duration::from_millis(600), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending("paper-1"), 1);

        tokio::time::sleep(Duration::from_millis(599)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending("paper-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_key_drops_pending_tasks() {
        let scheduler = TaskScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for delay in [100, 200] {
            let counter = Arc::clone(&hits);
            scheduler.schedule("paper-1", Duration::from_millis(delay), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let counter = Arc::clone(&hits);
        scheduler.schedule("paper-2", Duration::from_millis(100), async move {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(scheduler.cancel("paper-1"), 2);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 10);
        assert_eq!(scheduler.cancel("paper-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_single_handle() {
        let scheduler = TaskScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let first = scheduler.schedule("k", Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&hits);
        scheduler.schedule("k", Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(scheduler.cancel_task(&first));
        assert!(!scheduler.cancel_task(&first));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let scheduler = TaskScheduler::new();
        scheduler.schedule("a", Duration::from_secs(1), async {});
        scheduler.schedule("b", Duration::from_secs(1), async {});
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.pending("a"), 0);
    }
}
