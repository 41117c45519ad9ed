//! Background worker consuming the recommendation job queue.
//!
//! One tokio task, spawned from `main`. Per-job failures are logged and
//! stored as failed results; queue errors back off and retry. Nothing a
//! single job does can take the worker down.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::jobs::queue::{JobEnvelope, JobQueue, JobRecord};
use crate::recommend::orchestrator::recommend;
use crate::state::AppState;

/// How long one BRPOP waits before the loop comes back around.
const DEQUEUE_TIMEOUT_SECS: f64 = 5.0;

/// Pause after a queue-level error before reconnecting.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub fn spawn_worker(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(state))
}

async fn run(state: AppState) {
    let queue = JobQueue::new(state.redis.clone());
    info!("recommendation worker started");

    loop {
        match queue.dequeue(DEQUEUE_TIMEOUT_SECS).await {
            Ok(Some(envelope)) => process_job(&state, &queue, envelope).await,
            Ok(None) => {} // timeout, idle queue
            Err(e) => {
                error!(error = %e, "job dequeue failed; backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
}

async fn process_job(state: &AppState, queue: &JobQueue, envelope: JobEnvelope) {
    let job_id = envelope.job_id;
    info!(%job_id, "scoring queued recommendation request");

    let index = state.snapshot_for(&envelope.request);
    let record = match recommend(&envelope.request, &index, &state.recommend_options()) {
        Ok(response) => {
            info!(
                %job_id,
                recommendations = response.recommendations.len(),
                degraded = response.degraded,
                "job scored"
            );
            JobRecord::completed(job_id, response)
        }
        Err(e) => {
            warn!(%job_id, error = %e, "job rejected");
            JobRecord::failed(job_id, e.to_string())
        }
    };

    if let Err(e) = queue.store_result(&record).await {
        error!(%job_id, error = %e, "failed to store job result");
    }
}
