use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::request::GenerationRequest;
use crate::render::Renderer;
use crate::services::registry::JobRegistry;

/// A submitted job waiting for a worker.
#[derive(Debug)]
pub struct QueuedRender {
    pub job_id: Uuid,
    pub request: GenerationRequest,
}

/// Fixed pool of render workers fed by an unbounded queue.
///
/// At most `worker_count` renders run at once; further submissions wait in
/// the queue and are never rejected while the scheduler is running.
pub struct JobScheduler {
    registry: Arc<JobRegistry>,
    sender: Sender<QueuedRender>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Spawn `worker_count` workers on the current tokio runtime.
    pub fn start(
        registry: Arc<JobRegistry>,
        renderer: Arc<dyn Renderer>,
        worker_count: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = async_channel::unbounded::<QueuedRender>();

        let workers = (0..worker_count)
            .map(|worker_id| {
                let registry = Arc::clone(&registry);
                let renderer = Arc::clone(&renderer);
                let receiver = receiver.clone();
                tokio::spawn(
                    run_worker(registry, renderer, receiver)
                        .instrument(tracing::info_span!("worker", worker_id)),
                )
            })
            .collect();

        tracing::info!(workers = worker_count, "Render scheduler started");

        Self {
            registry,
            sender,
            workers: Mutex::new(workers),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Record a `queued` job and hand it to the pool. Returns immediately.
    ///
    /// A submission rejected because the scheduler is shut down leaves no
    /// record behind.
    pub fn submit(&self, request: GenerationRequest) -> Result<Uuid, SchedulerError> {
        let job = self.registry.create(&request.upload_id);
        let job_id = job.id;

        if self.sender.try_send(QueuedRender { job_id, request }).is_err() {
            self.registry.discard(job_id);
            return Err(SchedulerError::Closed);
        }

        metrics::counter!("video_jobs_submitted").increment(1);
        tracing::info!(
            job_id = %job_id,
            upload_id = %job.upload_id,
            backlog = self.sender.len(),
            "Job queued"
        );
        Ok(job_id)
    }

    /// Stop accepting jobs and wait for the workers to drain the queue.
    pub async fn shutdown(&self) {
        self.sender.close();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Render worker exited abnormally");
            }
        }
        tracing::info!("Render scheduler stopped");
    }
}

async fn run_worker(
    registry: Arc<JobRegistry>,
    renderer: Arc<dyn Renderer>,
    queue: Receiver<QueuedRender>,
) {
    tracing::debug!("Worker ready");
    while let Ok(job) = queue.recv().await {
        process_job(&registry, &renderer, job).await;
    }
    tracing::debug!("Worker stopped");
}

/// Drive one job through `processing` to `completed` or `failed`.
///
/// Never returns an error: every outcome ends up on the job record.
async fn process_job(registry: &Arc<JobRegistry>, renderer: &Arc<dyn Renderer>, job: QueuedRender) {
    let QueuedRender { job_id, request } = job;

    if let Err(e) = registry.start(job_id) {
        tracing::error!(job_id = %job_id, error = %e, "Failed to start job");
        return;
    }
    tracing::info!(job_id = %job_id, upload_id = %request.upload_id, "Processing video job");

    metrics::gauge!("video_renders_active").increment(1.0);
    let started = Instant::now();

    let outcome = {
        let registry = Arc::clone(registry);
        let renderer = Arc::clone(renderer);
        tokio::task::spawn_blocking(move || {
            let sink = |percent: u8| {
                if let Err(e) = registry.update_progress(job_id, percent) {
                    tracing::warn!(job_id = %job_id, error = %e, "Dropped progress update");
                }
            };
            renderer.render(&request, &sink)
        })
        .await
    };

    metrics::gauge!("video_renders_active").decrement(1.0);
    metrics::histogram!("video_render_seconds").record(started.elapsed().as_secs_f64());

    let recorded = match outcome {
        Ok(Ok(output_path)) => {
            tracing::info!(
                job_id = %job_id,
                output = %output_path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job completed successfully"
            );
            metrics::counter!("video_jobs_completed").increment(1);
            registry.complete(job_id, output_path)
        }
        Ok(Err(e)) => {
            tracing::error!(job_id = %job_id, error = %e, "Job processing failed");
            metrics::counter!("video_jobs_failed").increment(1);
            registry.fail(job_id, e.to_string())
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Render task panicked");
            metrics::counter!("video_jobs_failed").increment(1);
            registry.fail(job_id, format!("Render task aborted: {e}"))
        }
    };

    if let Err(e) = recorded {
        tracing::error!(job_id = %job_id, error = %e, "Failed to record job outcome");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Render scheduler is shut down")]
    Closed,
}
