//! Task supervisor — at most one running orchestration task per session.
//!
//! Cancellation is cooperative: each task gets a `CancellationToken` it
//! checks at every suspension point, so joining the task after cancelling
//! observes the task's full unwind, cleanup included. Replacing a task
//! therefore cannot leave two orchestrators mutating the same session.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A registered orchestration task.
struct ActiveTask {
    /// Distinguishes this registration from later ones with the same id.
    run_id: u64,
    token: CancellationToken,
    /// Set just after spawning; taken by `cancel_and_wait` for joining.
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the running orchestration tasks, keyed by session id.
#[derive(Default)]
pub struct TaskSupervisor {
    tasks: DashMap<String, ActiveTask>,
    next_run_id: AtomicU64,
}

impl TaskSupervisor {
    /// Create an empty supervisor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and join any task registered for `id`, then spawn and register
    /// a replacement via `spawn`.
    ///
    /// `spawn` receives the new task's cancellation token and run id (the
    /// task passes the run id back to [`unregister`](Self::unregister) from
    /// its finalizer). Returns only after the previous task — if any — has
    /// observably terminated.
    pub async fn replace<F>(&self, id: &str, spawn: F)
    where
        F: FnOnce(CancellationToken, u64) -> JoinHandle<()>,
    {
        self.cancel_and_wait(id).await;

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let _ = self.tasks.insert(
            id.to_owned(),
            ActiveTask {
                run_id,
                token: token.clone(),
                handle: Mutex::new(None),
            },
        );

        let handle = spawn(token, run_id);

        // The task may already have finished and unregistered itself; only
        // store the handle if our registration is still current.
        if let Some(entry) = self.tasks.get(id) {
            if entry.run_id == run_id {
                *entry.handle.lock() = Some(handle);
            }
        }
        debug!(session_id = id, run_id, "orchestration task registered");
    }

    /// Cancel the registered task (if any) and wait for it to terminate,
    /// including its cleanup. No-op when nothing is registered.
    pub async fn cancel_and_wait(&self, id: &str) {
        let Some((_, entry)) = self.tasks.remove(id) else {
            return;
        };
        entry.token.cancel();
        let handle = entry.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(session_id = id, error = %e, "orchestration task join failed");
                }
            }
        }
        debug!(session_id = id, "orchestration task terminated");
    }

    /// Remove the bookkeeping for a finished task.
    ///
    /// Called by the task itself from its guaranteed-run finalizer — never
    /// by external callers — so "task says it's done" and "supervisor thinks
    /// it's done" cannot race. A stale `run_id` (the task was already
    /// replaced) removes nothing.
    pub fn unregister(&self, id: &str, run_id: u64) {
        let _ = self.tasks.remove_if(id, |_, task| task.run_id == run_id);
    }

    /// Whether a task is registered for this id.
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// Spawn a task that runs until cancelled, then flips `finished`.
    fn spawn_cancellable(finished: Arc<AtomicBool>) -> impl FnOnce(CancellationToken, u64) -> JoinHandle<()> {
        move |token, _run_id| {
            tokio::spawn(async move {
                token.cancelled().await;
                // Simulate cleanup work inside the finalizer
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn replace_registers_task() {
        let sup = TaskSupervisor::new();
        let finished = Arc::new(AtomicBool::new(false));
        sup.replace("s1", spawn_cancellable(finished)).await;
        assert!(sup.is_registered("s1"));
        assert_eq!(sup.count(), 1);
        sup.cancel_and_wait("s1").await;
    }

    #[tokio::test]
    async fn cancel_and_wait_joins_full_unwind() {
        let sup = TaskSupervisor::new();
        let finished = Arc::new(AtomicBool::new(false));
        sup.replace("s1", spawn_cancellable(finished.clone())).await;

        sup.cancel_and_wait("s1").await;
        // The cleanup sleep inside the task must have completed
        assert!(finished.load(Ordering::SeqCst));
        assert!(!sup.is_registered("s1"));
    }

    #[tokio::test]
    async fn cancel_and_wait_without_task_is_noop() {
        let sup = TaskSupervisor::new();
        sup.cancel_and_wait("nothing").await;
        assert_eq!(sup.count(), 0);
    }

    #[tokio::test]
    async fn replace_cancels_previous_before_spawning_new() {
        let sup = TaskSupervisor::new();
        let first_finished = Arc::new(AtomicBool::new(false));
        sup.replace("s1", spawn_cancellable(first_finished.clone()))
            .await;

        // The factory for the second task observes the first one's unwind
        let observed = Arc::new(AtomicBool::new(false));
        {
            let first_finished = first_finished.clone();
            let observed = observed.clone();
            sup.replace("s1", move |token, _run_id| {
                observed.store(first_finished.load(Ordering::SeqCst), Ordering::SeqCst);
                tokio::spawn(async move { token.cancelled().await })
            })
            .await;
        }
        assert!(observed.load(Ordering::SeqCst), "prior task not unwound");
        assert_eq!(sup.count(), 1);
        sup.cancel_and_wait("s1").await;
    }

    #[tokio::test]
    async fn task_unregisters_itself() {
        let sup = Arc::new(TaskSupervisor::new());
        {
            let sup2 = Arc::clone(&sup);
            sup.replace("s1", move |_token, run_id| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    sup2.unregister("s1", run_id);
                })
            })
            .await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sup.is_registered("s1"));
    }

    #[tokio::test]
    async fn stale_unregister_does_not_remove_replacement() {
        let sup = TaskSupervisor::new();
        let finished = Arc::new(AtomicBool::new(false));
        sup.replace("s1", spawn_cancellable(finished.clone())).await;
        sup.replace("s1", spawn_cancellable(finished)).await;

        // run_id 0 belonged to the first (already replaced) task
        sup.unregister("s1", 0);
        assert!(sup.is_registered("s1"), "stale run_id removed a live task");
        sup.cancel_and_wait("s1").await;
    }

    #[tokio::test]
    async fn at_most_one_task_per_id_under_rapid_replaces() {
        let sup = TaskSupervisor::new();
        for _ in 0..5 {
            let finished = Arc::new(AtomicBool::new(false));
            sup.replace("s1", spawn_cancellable(finished)).await;
            assert_eq!(sup.count(), 1);
        }
        sup.cancel_and_wait("s1").await;
        assert_eq!(sup.count(), 0);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let sup = TaskSupervisor::new();
        sup.replace("s1", spawn_cancellable(Arc::new(AtomicBool::new(false))))
            .await;
        sup.replace("s2", spawn_cancellable(Arc::new(AtomicBool::new(false))))
            .await;
        assert_eq!(sup.count(), 2);
        sup.cancel_and_wait("s1").await;
        assert!(sup.is_registered("s2"));
        sup.cancel_and_wait("s2").await;
    }
}
