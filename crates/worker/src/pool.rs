use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use alertproxy_core::job::JobOutcome;
use alertproxy_core::notification::RenderPayload;
use alertproxy_core::types::JobId;
use alertproxy_db::JobStore;
use alertproxy_events::NotificationRegistry;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::queue::{JobQueue, QueuedJob};
use crate::retry::with_store_retry;

/// State shared by every worker task.
struct WorkerContext {
    registry: Arc<NotificationRegistry>,
    store: Arc<dyn JobStore>,
    receiver: Mutex<mpsc::Receiver<QueuedJob>>,
    config: WorkerConfig,
}

/// Running worker tasks. Dropping this does not stop them; call
/// [`WorkerPool::shutdown`].
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `config.concurrency` workers over a queue of
    /// `config.queue_capacity` jobs. The registry and store are fully built
    /// before any job can be accepted.
    pub fn start(
        config: WorkerConfig,
        registry: Arc<NotificationRegistry>,
        store: Arc<dyn JobStore>,
    ) -> (JobQueue, WorkerPool) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let concurrency = config.concurrency.max(1);
        let cancel = CancellationToken::new();

        tracing::info!(
            concurrency,
            queue_capacity = config.queue_capacity,
            channels = ?registry.channels(),
            "Worker pool starting"
        );

        let ctx = Arc::new(WorkerContext {
            registry,
            store: Arc::clone(&store),
            receiver: Mutex::new(receiver),
            config,
        });

        let handles = (0..concurrency)
            .map(|worker| tokio::spawn(worker_loop(worker, Arc::clone(&ctx), cancel.clone())))
            .collect();

        (JobQueue::new(sender, store), WorkerPool { handles, cancel })
    }

    /// Stop accepting jobs, let workers finish what is already queued and
    /// wait up to `timeout` for them.
    pub async fn shutdown(self, timeout: Duration) {
        tracing::info!("Worker pool draining");
        self.cancel.cancel();

        match tokio::time::timeout(timeout, futures::future::join_all(self.handles)).await {
            Ok(_) => tracing::info!("Worker pool stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Worker pool did not drain in time, abandoning remaining jobs"
            ),
        }
    }
}

async fn worker_loop(worker: usize, ctx: Arc<WorkerContext>, cancel: CancellationToken) {
    tracing::debug!(worker, "Worker started");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            job = async { ctx.receiver.lock().await.recv().await } => job,
        };
        match next {
            Some(job) => run_job(&ctx, job).await,
            None => {
                tracing::debug!(worker, "Worker stopped");
                return;
            }
        }
    }

    // Shutdown: refuse new jobs, then drain the buffer.
    loop {
        let next = {
            let mut receiver = ctx.receiver.lock().await;
            receiver.close();
            receiver.recv().await
        };
        match next {
            Some(job) => run_job(&ctx, job).await,
            None => break,
        }
    }
    tracing::debug!(worker, "Worker drained");
}

async fn run_job(ctx: &WorkerContext, job: QueuedJob) {
    let QueuedJob { id, payload } = job;
    let attempts = ctx.config.store_retry_attempts;
    let delay = ctx.config.store_retry_delay;

    if !with_store_retry(id, "start", attempts, delay, || ctx.store.mark_started(id)).await {
        return;
    }
    tracing::info!(job_id = %id, alertname = %payload.alertname, "Job started");

    let outcome = deliver(&ctx.registry, id, &payload).await;
    let succeeded = matches!(outcome, JobOutcome::Success(_));

    if with_store_retry(id, "complete", attempts, delay, || ctx.store.complete(id, &outcome)).await {
        tracing::info!(job_id = %id, succeeded, "Job finished");
    }
}

/// Fan the payload out. Channel failures are part of a successful report;
/// only render errors and panics fail the job.
async fn deliver(registry: &NotificationRegistry, id: JobId, payload: &RenderPayload) -> JobOutcome {
    match AssertUnwindSafe(registry.send_all(payload)).catch_unwind().await {
        Ok(Ok(report)) => match serde_json::to_value(&report) {
            Ok(value) => JobOutcome::Success(value),
            Err(e) => JobOutcome::Failure(format!("Failed to encode delivery report: {e}")),
        },
        Ok(Err(e)) => {
            tracing::error!(job_id = %id, error = %e, "Job failed");
            JobOutcome::Failure(e.to_string())
        }
        Err(_) => {
            tracing::error!(job_id = %id, "Job panicked");
            JobOutcome::Failure("Notification delivery panicked".to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alertproxy_core::channels::ChannelKind;
    use alertproxy_core::job::{JobState, JobStatus};
    use alertproxy_core::notification::Notification;
    use alertproxy_db::InMemoryJobStore;
    use alertproxy_events::{DeliveryError, HandlebarsRenderer, NotificationSender};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::queue::QueueError;

    struct CountingSender {
        channel: ChannelKind,
        fail: bool,
        delay: Duration,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSender for CountingSender {
        fn channel(&self) -> ChannelKind {
            self.channel
        }

        async fn send(&self, _notification: &Notification) -> Result<bool, DeliveryError> {
            tokio::time::sleep(self.delay).await;
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeliveryError::Other("smtp down".into()))
            } else {
                Ok(true)
            }
        }
    }

    fn sender(channel: ChannelKind, fail: bool, delay: Duration) -> Arc<CountingSender> {
        Arc::new(CountingSender {
            channel,
            fail,
            delay,
            sent: AtomicUsize::new(0),
        })
    }

    fn registry(senders: &[(Arc<CountingSender>, &str)]) -> Arc<NotificationRegistry> {
        let mut registry = NotificationRegistry::new(Arc::new(HandlebarsRenderer::new().unwrap()));
        for (s, template) in senders {
            registry.register(s.clone(), *template);
        }
        Arc::new(registry)
    }

    fn config(concurrency: usize, capacity: usize) -> WorkerConfig {
        WorkerConfig {
            concurrency,
            queue_capacity: capacity,
            store_retry_attempts: 3,
            store_retry_delay: Duration::from_millis(1),
        }
    }

    fn payload() -> RenderPayload {
        RenderPayload {
            title: "[FIRING] QueueDepth".into(),
            status: "firing".into(),
            alertname: "QueueDepth".into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            query: "{app=\"queue\"}".into(),
            selector: "{app=\"queue\"}".into(),
            search_window: "5m".into(),
            context_time_range: "30m".into(),
            context_before: 2,
            context_after: 2,
            max_matches: 3,
            contexts: vec![],
        }
    }

    async fn wait_terminal(store: &dyn JobStore, id: JobId) -> JobStatus {
        for _ in 0..200 {
            let status = store.status(id).await.unwrap();
            if status.state.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test]
    async fn job_succeeds_with_delivery_report() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let email = sender(ChannelKind::Email, false, Duration::ZERO);
        let webhook = sender(ChannelKind::Webhook, true, Duration::ZERO);
        let (queue, pool) = WorkerPool::start(
            config(2, 8),
            registry(&[(email.clone(), "email"), (webhook.clone(), "webhook")]),
            Arc::clone(&store),
        );

        let id = queue.enqueue(payload()).await.unwrap();
        let status = wait_terminal(store.as_ref(), id).await;

        assert_eq!(status.state, JobState::Success);
        let result = status.result.unwrap();
        assert_eq!(result["channels"]["email"], true);
        assert_eq!(result["channels"]["webhook"], false);
        assert_eq!(result["errors"][0], "webhook: smtp down");
        assert_eq!(email.sent.load(Ordering::SeqCst), 1);

        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn render_failure_fails_the_job() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let email = sender(ChannelKind::Email, false, Duration::ZERO);
        let (queue, pool) = WorkerPool::start(
            config(1, 8),
            registry(&[(email.clone(), "no-such-template")]),
            Arc::clone(&store),
        );

        let id = queue.enqueue(payload()).await.unwrap();
        let status = wait_terminal(store.as_ref(), id).await;

        assert_eq!(status.state, JobState::Failure);
        assert!(status.error.unwrap().contains("no-such-template"));
        assert_eq!(email.sent.load(Ordering::SeqCst), 0);

        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn full_queue_is_rejected_without_recording() {
        let store = Arc::new(InMemoryJobStore::new());
        let slow = sender(ChannelKind::Email, false, Duration::from_millis(500));
        let (queue, pool) = WorkerPool::start(
            config(1, 1),
            registry(&[(slow, "email")]),
            Arc::clone(&store) as Arc<dyn JobStore>,
        );

        // One job is picked up by the worker, one fills the only slot.
        queue.enqueue(payload()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.enqueue(payload()).await.unwrap();

        assert_matches!(queue.enqueue(payload()).await, Err(QueueError::Full));
        assert_eq!(store.len().await, 2);

        pool.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let email = sender(ChannelKind::Email, false, Duration::from_millis(20));
        let (queue, pool) = WorkerPool::start(
            config(2, 16),
            registry(&[(email.clone(), "email")]),
            Arc::clone(&store),
        );

        let mut ids = Vec::new();
        for _ in 0..6 {
            ids.push(queue.enqueue(payload()).await.unwrap());
        }
        pool.shutdown(Duration::from_secs(5)).await;

        for id in ids {
            assert_eq!(store.status(id).await.unwrap().state, JobState::Success);
        }
        assert_eq!(email.sent.load(Ordering::SeqCst), 6);
        assert_matches!(queue.enqueue(payload()).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn empty_registry_still_completes_jobs() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let (queue, pool) = WorkerPool::start(config(1, 4), registry(&[]), Arc::clone(&store));

        let id = queue.enqueue(payload()).await.unwrap();
        let status = wait_terminal(store.as_ref(), id).await;
        assert_eq!(status.state, JobState::Success);
        assert_eq!(status.result.unwrap()["channels"], serde_json::json!({}));

        pool.shutdown(Duration::from_secs(1)).await;
    }
}
