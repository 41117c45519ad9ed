//! Redis-backed job queue for async recommendation requests.
//!
//! LPUSH onto a list to enqueue, BRPOP to consume; results land under a
//! per-job key with a TTL. The payload is the full `RecommendationRequest`,
//! so a worker needs nothing but the envelope to score a job.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::recommend::orchestrator::{RecommendationRequest, RecommendationResponse};

/// List key holding pending job envelopes.
pub const QUEUE_KEY: &str = "recommendations:jobs";

/// Stored results expire after a day; callers are expected to poll well
/// before that.
const RESULT_TTL_SECS: u64 = 24 * 60 * 60;

fn result_key(job_id: Uuid) -> String {
    format!("recommendations:result:{job_id}")
}

/// What goes over the wire per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    pub request: RecommendationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// Poll-side view of a job: its status plus the response once scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<RecommendationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            response: None,
            error: None,
        }
    }

    pub fn completed(job_id: Uuid, response: RecommendationResponse) -> Self {
        Self {
            job_id,
            status: JobStatus::Completed,
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(job_id: Uuid, error: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            response: None,
            error: Some(error),
        }
    }
}

#[derive(Clone)]
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Pushes a request onto the queue and marks the job pending so polls
    /// before the worker picks it up see "pending" rather than 404.
    pub async fn enqueue(&self, request: &RecommendationRequest) -> Result<Uuid, AppError> {
        let envelope = JobEnvelope {
            job_id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            request: request.clone(),
        };
        let payload = serde_json::to_string(&envelope).map_err(anyhow::Error::from)?;
        let pending = serde_json::to_string(&JobRecord::pending(envelope.job_id))
            .map_err(anyhow::Error::from)?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(result_key(envelope.job_id), pending, RESULT_TTL_SECS)
            .await?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, payload).await?;
        Ok(envelope.job_id)
    }

    /// Blocks up to `timeout_secs` for the next job. `None` on timeout so
    /// the worker loop can check for shutdown between waits.
    pub async fn dequeue(&self, timeout_secs: f64) -> Result<Option<JobEnvelope>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> = conn.brpop(QUEUE_KEY, timeout_secs).await?;
        match popped {
            Some((_key, payload)) => {
                let envelope = serde_json::from_str(&payload).map_err(anyhow::Error::from)?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }

    pub async fn store_result(&self, record: &JobRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(record).map_err(anyhow::Error::from)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(result_key(record.job_id), payload, RESULT_TTL_SECS)
            .await?;
        Ok(())
    }

    pub async fn fetch_result(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(result_key(job_id)).await?;
        match payload {
            Some(p) => {
                let record = serde_json::from_str(&p).map_err(anyhow::Error::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::SkillTarget;

    fn make_request() -> RecommendationRequest {
        RecommendationRequest {
            user_skills: Vec::new(),
            skills_to_improve: vec![SkillTarget {
                skill_id: "s1".to_string(),
                current_level: 2,
                target_level: 7,
            }],
            skills: Vec::new(),
            resources: Vec::new(),
            performance_reports: Vec::new(),
            weights: None,
            collaborative_signals: Default::default(),
            type_preferences: None,
            limit: None,
        }
    }

    #[test]
    fn test_envelope_round_trips_through_json() {
        let envelope = JobEnvelope {
            job_id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            request: make_request(),
        };
        let payload = serde_json::to_string(&envelope).unwrap();
        let back: JobEnvelope = serde_json::from_str(&payload).unwrap();
        assert_eq!(back.job_id, envelope.job_id);
        assert_eq!(back.request.skills_to_improve[0].skill_id, "s1");
    }

    #[test]
    fn test_pending_record_omits_response_and_error() {
        let record = JobRecord::pending(Uuid::new_v4());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"pending\""));
        assert!(!json.contains("response"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_failed_record_carries_the_error() {
        let record = JobRecord::failed(Uuid::new_v4(), "boom".to_string());
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, JobStatus::Failed);
        assert_eq!(back.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_result_keys_are_per_job() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(result_key(a), result_key(b));
        assert!(result_key(a).starts_with("recommendations:result:"));
    }
}
