//! Concurrency-capped parallel task executor with per-task retry and
//! backoff, modeled on the mapreduce agent-pool fan-out pattern.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::model::{TaskConfig, TaskResult, TaskStatus};

type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send + Sync>;

struct Task {
    name: String,
    run: TaskFn,
    config: TaskConfig,
}

/// Collects named async tasks and runs them concurrently, each with its own
/// retry/backoff/timeout policy.
pub struct ParallelTaskExecutor {
    tasks: Vec<Task>,
    concurrency_limit: Option<usize>,
}

impl Default for ParallelTaskExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ParallelTaskExecutor {
    /// `concurrency_limit` of `Some(0)` or `None` means unbounded.
    pub fn new(concurrency_limit: Option<usize>) -> Self {
        Self {
            tasks: Vec::new(),
            concurrency_limit: concurrency_limit.filter(|&n| n > 0),
        }
    }

    pub fn add_task<F>(&mut self, name: impl Into<String>, config: TaskConfig, run: F)
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send + Sync + 'static,
    {
        self.tasks.push(Task {
            name: name.into(),
            run: Arc::new(run),
            config,
        });
    }

    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Run every added task. If `stop_on_first_failure` is set, sibling
    /// tasks that have not yet started are skipped once the first
    /// unrecoverable failure is observed (already-running tasks still run
    /// to completion, since they hold no shared state to roll back).
    pub async fn execute_all(&self, stop_on_first_failure: bool) -> HashMap<String, TaskResult> {
        let semaphore = self
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let mut futures = FuturesUnordered::new();
        for task in &self.tasks {
            let name = task.name.clone();
            let run = task.run.clone();
            let config = task.config.clone_for_retry();
            let semaphore = semaphore.clone();
            let cancelled = cancelled.clone();
            futures.push(tokio::spawn(async move {
                let _permit = match &semaphore {
                    Some(sem) => Some(sem.clone().acquire_owned().await.expect("semaphore not closed")),
                    None => None,
                };
                if stop_on_first_failure && cancelled.load(std::sync::atomic::Ordering::SeqCst) {
                    return (
                        name.clone(),
                        TaskResult {
                            name,
                            status: TaskStatus::Failed,
                            value: None,
                            error: Some("cancelled after a sibling task failed".to_string()),
                            attempts: 0,
                            elapsed: Duration::ZERO,
                        },
                    );
                }
                let result = run_with_retry(&name, run, &config).await;
                if stop_on_first_failure && !result.succeeded() {
                    cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
                }
                (name, result)
            }));
        }

        let mut results = HashMap::new();
        while let Some(joined) = futures.next().await {
            match joined {
                Ok((name, result)) => {
                    results.insert(name, result);
                }
                Err(join_err) => {
                    warn!("task panicked: {join_err}");
                }
            }
        }
        results
    }

    pub fn successful(results: &HashMap<String, TaskResult>) -> HashMap<String, TaskResult> {
        results
            .iter()
            .filter(|(_, r)| r.succeeded())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn failed(results: &HashMap<String, TaskResult>) -> HashMap<String, TaskResult> {
        results
            .iter()
            .filter(|(_, r)| !r.succeeded())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl TaskConfig {
    fn clone_for_retry(&self) -> TaskConfig {
        TaskConfig {
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
            timeout: self.timeout,
        }
    }
}

async fn run_with_retry(name: &str, run: TaskFn, config: &TaskConfig) -> TaskResult {
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        attempts += 1;
        let attempt_future = run();
        let attempt_result = match config.timeout {
            Some(budget) => match timeout(budget, attempt_future).await {
                Ok(inner) => inner,
                Err(_) => Err(anyhow::anyhow!("task '{name}' timed out after {budget:?}")),
            },
            None => attempt_future.await,
        };

        match attempt_result {
            Ok(value) => {
                return TaskResult {
                    name: name.to_string(),
                    status: TaskStatus::Success,
                    value: Some(value),
                    error: None,
                    attempts,
                    elapsed: start.elapsed(),
                };
            }
            Err(err) => {
                debug!("task '{name}' attempt {attempts} failed: {err}");
                last_error = Some(err.to_string());
                if attempts > config.max_retries {
                    break;
                }
                let delay = config.retry_base_delay * 2u32.pow(attempts - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }

    TaskResult {
        name: name.to_string(),
        status: TaskStatus::Failed,
        value: None,
        error: last_error,
        attempts,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn all_tasks_run_and_partition_by_outcome() {
        let mut executor = ParallelTaskExecutor::new(None);
        executor.add_task("t1", TaskConfig::default(), || {
            Box::pin(async { Ok(serde_json::json!("ok")) })
        });
        executor.add_task(
            "t2",
            TaskConfig {
                max_retries: 0,
                retry_base_delay: Duration::from_millis(1),
                timeout: None,
            },
            || Box::pin(async { Err(anyhow::anyhow!("always fails")) }),
        );

        let results = executor.execute_all(false).await;
        assert_eq!(results.len(), 2);
        assert_eq!(ParallelTaskExecutor::successful(&results).len(), 1);
        assert_eq!(ParallelTaskExecutor::failed(&results).len(), 1);
    }

    #[tokio::test]
    async fn task_succeeds_after_retries_within_budget() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut executor = ParallelTaskExecutor::new(None);
        let counter = attempts.clone();
        executor.add_task(
            "flaky",
            TaskConfig {
                max_retries: 2,
                retry_base_delay: Duration::from_millis(1),
                timeout: None,
            },
            move || {
                let counter = counter.clone();
                Box::pin(async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(anyhow::anyhow!("not yet"))
                    } else {
                        Ok(serde_json::json!(n))
                    }
                })
            },
        );

        let results = executor.execute_all(false).await;
        let result = &results["flaky"];
        assert!(result.succeeded());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn zero_max_retries_gives_at_most_one_attempt() {
        let mut executor = ParallelTaskExecutor::new(None);
        executor.add_task(
            "one-shot",
            TaskConfig {
                max_retries: 0,
                retry_base_delay: Duration::from_millis(1),
                timeout: None,
            },
            || Box::pin(async { Err(anyhow::anyhow!("nope")) }),
        );
        let results = executor.execute_all(false).await;
        assert_eq!(results["one-shot"].attempts, 1);
    }

    #[tokio::test]
    async fn concurrency_cap_of_one_still_completes_all_tasks() {
        let mut executor = ParallelTaskExecutor::new(Some(1));
        for i in 0..3 {
            executor.add_task(format!("t{i}"), TaskConfig::default(), || {
                Box::pin(async { Ok(serde_json::json!(true)) })
            });
        }
        let results = executor.execute_all(false).await;
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|r| r.succeeded()));
    }
}
