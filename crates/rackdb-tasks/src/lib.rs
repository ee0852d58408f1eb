//! rackdb-tasks: fan-out/fan-in execution of independent units of work
//!
//! Launches every task concurrently, waits until all of them have
//! reported back, and aggregates failures with first-error-wins
//! semantics. Execution is never short-circuited: a failing task does not
//! stop its siblings, so no side effect is left dangling when control
//! returns to the caller. There is no cancellation primitive and no
//! retry.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors produced by task execution and result export
#[derive(Error, Debug)]
pub enum TaskError {
    /// A task's unit of work failed
    #[error("{0}")]
    Failed(String),

    /// Combining individual results into the composite result failed
    #[error("result export failed: {0}")]
    Export(String),

    /// A task finished without delivering its result
    #[error("task set finished with missing results")]
    Incomplete,
}

/// An independent unit of work with a typed result.
#[async_trait]
pub trait Task: Send + 'static {
    /// Result delivered on success.
    type Output: Send + 'static;

    /// Run the unit of work to completion.
    async fn execute(self) -> Result<Self::Output, TaskError>;
}

/// A set of independent tasks executed in parallel.
pub struct TaskSet<T: Task> {
    tasks: Vec<T>,
}

impl<T: Task> TaskSet<T> {
    #[must_use]
    pub fn new(tasks: Vec<T>) -> Self {
        Self { tasks }
    }

    /// Execute every task concurrently, then combine their results.
    ///
    /// All tasks run to completion before this returns, even when some of
    /// them fail. If any task failed, the first error observed (in
    /// completion order) is returned and `export` is never invoked.
    /// Otherwise `export` receives the task outputs in launch order.
    pub async fn run<R, F>(self, export: F) -> Result<R, TaskError>
    where
        F: FnOnce(Vec<T::Output>) -> Result<R, TaskError>,
    {
        let total = self.tasks.len();
        let (tx, mut rx) = mpsc::channel(total.max(1));
        for (index, task) in self.tasks.into_iter().enumerate() {
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = task.execute().await;
                // The receiver lives until all senders report, so this
                // only fails if the caller's future was dropped.
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        let mut outputs: Vec<Option<T::Output>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<TaskError> = None;
        let mut finished = 0;
        while let Some((index, outcome)) = rx.recv().await {
            finished += 1;
            match outcome {
                Ok(output) => outputs[index] = Some(output),
                Err(err) => {
                    warn!(task = index, error = %err, "task failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        debug!(total, finished, "task set drained");

        if let Some(err) = first_error {
            return Err(err);
        }
        let outputs: Vec<T::Output> = outputs.into_iter().flatten().collect();
        if outputs.len() != total {
            return Err(TaskError::Incomplete);
        }
        export(outputs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct TimedTask {
        id: usize,
        delay: Duration,
        fail: bool,
        completions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Task for TimedTask {
        type Output = usize;

        async fn execute(self) -> Result<usize, TaskError> {
            tokio::time::sleep(self.delay).await;
            self.completions.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TaskError::Failed(format!("task {} blew up", self.id)));
            }
            Ok(self.id)
        }
    }

    fn tasks(
        specs: &[(Duration, bool)],
        completions: &Arc<AtomicUsize>,
    ) -> Vec<TimedTask> {
        specs
            .iter()
            .enumerate()
            .map(|(id, (delay, fail))| TimedTask {
                id,
                delay: *delay,
                fail: *fail,
                completions: Arc::clone(completions),
            })
            .collect()
    }

    #[tokio::test]
    async fn outputs_are_delivered_in_launch_order() {
        let completions = Arc::new(AtomicUsize::new(0));
        let set = TaskSet::new(tasks(
            &[
                (Duration::from_millis(30), false),
                (Duration::from_millis(1), false),
                (Duration::from_millis(15), false),
            ],
            &completions,
        ));
        let combined = set.run(|outputs| Ok(outputs)).await.unwrap();
        assert_eq!(combined, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn every_task_runs_even_when_some_fail() {
        let completions = Arc::new(AtomicUsize::new(0));
        let mut specs = vec![(Duration::from_millis(1), false); 6];
        specs[2] = (Duration::from_millis(5), true);
        specs[5] = (Duration::from_millis(40), true);
        let set = TaskSet::new(tasks(&specs, &completions));

        let err = set.run(|_: Vec<usize>| Ok(())).await.unwrap_err();
        // All six ran to completion, and the faster of the two failures
        // (task 2) is the one reported.
        assert_eq!(completions.load(Ordering::SeqCst), 6);
        assert!(matches!(err, TaskError::Failed(msg) if msg.contains("task 2")));
    }

    #[tokio::test]
    async fn export_failure_is_a_normal_error_value() {
        let completions = Arc::new(AtomicUsize::new(0));
        let set = TaskSet::new(tasks(&[(Duration::from_millis(1), false)], &completions));
        let err = set
            .run(|_: Vec<usize>| -> Result<(), TaskError> {
                Err(TaskError::Export("results did not line up".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Export(_)));
    }

    #[tokio::test]
    async fn export_is_skipped_after_task_failure() {
        let completions = Arc::new(AtomicUsize::new(0));
        let set = TaskSet::new(tasks(&[(Duration::from_millis(1), true)], &completions));
        let exported = Arc::new(AtomicUsize::new(0));
        let exported_probe = Arc::clone(&exported);
        let _ = set
            .run(move |_: Vec<usize>| {
                exported_probe.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(exported.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_task_set_exports_immediately() {
        let set: TaskSet<TimedTask> = TaskSet::new(Vec::new());
        let combined = set.run(|outputs| Ok(outputs.len())).await.unwrap();
        assert_eq!(combined, 0);
    }
}
