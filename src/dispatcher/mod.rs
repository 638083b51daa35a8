//! Long-running queue poller. Leases messages, runs the process state
//! machine per job on a bounded worker pool, and routes completion to
//! delete/return/dead-letter based on retry bookkeeping.

pub mod queue;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::model::QueueMessage;
use queue::QueueClient;

/// Runs one queue message through the process pipeline. The dispatcher
/// treats the outcome opaquely: success deletes the message, failure is
/// routed by dequeue count.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, message: QueueMessage, cancellation: CancellationToken) -> Result<(), String>;
}

pub struct Dispatcher {
    queue: Arc<dyn QueueClient>,
    runner: Arc<dyn ProcessRunner>,
    settings: Settings,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn QueueClient>, runner: Arc<dyn ProcessRunner>, settings: Settings) -> Self {
        Self { queue, runner, settings }
    }

    /// Run the poll loop until `shutdown` is cancelled, then wait (up to a
    /// bounded grace period) for in-flight workers before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_workers.max(1)));
        let mut in_flight = Vec::new();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let free_slots = semaphore.available_permits();
            if free_slots == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    _ = shutdown.cancelled() => break,
                }
                continue;
            }

            let leased = match self.queue.receive(free_slots, self.settings.visibility_timeout).await {
                Ok(messages) => messages,
                Err(err) => {
                    error!("queue receive failed: {err}");
                    tokio::time::sleep(self.settings.poll_interval).await;
                    continue;
                }
            };

            if leased.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    _ = shutdown.cancelled() => break,
                }
                continue;
            }

            for leased_message in leased {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let queue = self.queue.clone();
                let runner = self.runner.clone();
                let max_retry_count = self.settings.max_retry_count;
                let message_timeout = self.settings.message_timeout;
                let dead_letter_summary_prefix = self.settings.dead_letter_queue_name();
                let worker_shutdown = shutdown.child_token();

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    let process_id = leased_message.message.process_id.clone();
                    let outcome = tokio::time::timeout(
                        message_timeout,
                        runner.run(leased_message.message, worker_shutdown),
                    )
                    .await;

                    match outcome {
                        Ok(Ok(())) => {
                            if let Err(err) = queue.delete(&leased_message.delivery.lease_token).await {
                                warn!("failed to delete message for process {process_id}: {err}");
                            }
                        }
                        Ok(Err(failure)) => {
                            route_failure(
                                queue.as_ref(),
                                &leased_message.delivery,
                                &process_id,
                                &failure,
                                max_retry_count,
                                &dead_letter_summary_prefix,
                            )
                            .await;
                        }
                        Err(_) => {
                            route_failure(
                                queue.as_ref(),
                                &leased_message.delivery,
                                &process_id,
                                "message timeout exceeded",
                                max_retry_count,
                                &dead_letter_summary_prefix,
                            )
                            .await;
                        }
                    }
                });
                in_flight.push(handle);
            }

            in_flight.retain(|h| !h.is_finished());
        }

        info!("shutdown requested, waiting for {} in-flight workers", in_flight.len());
        let grace_period = Duration::from_secs(30);
        let wait = async {
            for handle in in_flight {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(grace_period, wait).await.is_err() {
            warn!("graceful shutdown exceeded {grace_period:?}, forcing stop");
        }
    }
}

async fn route_failure(
    queue: &dyn QueueClient,
    delivery: &crate::model::DeliveryMetadata,
    process_id: &str,
    failure_summary: &str,
    max_retry_count: u32,
    dead_letter_queue_name: &str,
) {
    if delivery.dequeue_count <= max_retry_count {
        warn!("process {process_id} failed (dequeue_count={}), returning to queue", delivery.dequeue_count);
        if let Err(err) = queue.release(&delivery.lease_token).await {
            error!("failed to release message for process {process_id}: {err}");
        }
    } else {
        error!("process {process_id} exceeded retry budget, moving to {dead_letter_queue_name}: {failure_summary}");
        if let Err(err) = queue.dead_letter(&delivery.lease_token, failure_summary).await {
            error!("failed to dead-letter message for process {process_id}: {err}");
        }
    }
}
