//! Axum route handlers for the Recommendation API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::queue::{JobQueue, JobRecord};
use crate::models::catalog::Skill;
use crate::recommend::orchestrator::{recommend, RecommendationRequest, RecommendationResponse};
use crate::recommend::similarity::{SimilarSkill, SkillIndex};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RebuildIndexRequest {
    pub skills: Vec<Skill>,
}

#[derive(Debug, Serialize)]
pub struct IndexInfoResponse {
    pub version: u64,
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct EnqueueJobResponse {
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SimilarSkillsQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarSkillsResponse {
    pub skill_id: String,
    pub similar: Vec<SimilarSkill>,
    pub index_version: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/recommendations
///
/// Synchronous scoring pass: one request in, one ranked list out. Partial
/// scoring failures surface as `degraded: true`, never as an error status.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let index = state.snapshot_for(&request);
    let response = recommend(&request, &index, &state.recommend_options())?;
    Ok(Json(response))
}

/// POST /api/v1/index/rebuild
///
/// Rebuilds the skill similarity snapshot from a catalog load and swaps it
/// in atomically. In-flight requests keep the snapshot they started with.
pub async fn handle_rebuild_index(
    State(state): State<AppState>,
    Json(request): Json<RebuildIndexRequest>,
) -> Result<Json<IndexInfoResponse>, AppError> {
    let index = SkillIndex::build(&request.skills, state.embedder.as_ref());
    let indexed = index.len();
    let skipped = index.skipped();
    let version = state.install_index(index);
    info!(version, indexed, skipped, "skill index rebuilt");
    Ok(Json(IndexInfoResponse {
        version,
        indexed,
        skipped,
    }))
}

/// GET /api/v1/index
pub async fn handle_index_info(State(state): State<AppState>) -> Json<IndexInfoResponse> {
    let index = state.current_index();
    Json(IndexInfoResponse {
        version: index.version(),
        indexed: index.len(),
        skipped: index.skipped(),
    })
}

/// GET /api/v1/skills/:skill_id/similar?k=5
///
/// Nearest neighbors of one catalog skill in the current snapshot. An
/// unknown skill or an unloaded index yields an empty list, not an error.
pub async fn handle_similar_skills(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
    Query(query): Query<SimilarSkillsQuery>,
) -> Json<SimilarSkillsResponse> {
    let index = state.current_index();
    let k = query.k.unwrap_or(state.config.similarity_top_k);
    Json(SimilarSkillsResponse {
        similar: index.neighbors(&skill_id, k),
        skill_id,
        index_version: index.version(),
    })
}

/// POST /api/v1/jobs/recommendations
///
/// Async hand-off for development-plan creation: the request payload goes
/// onto the durable queue and a worker scores it out of band.
pub async fn handle_enqueue_job(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<(StatusCode, Json<EnqueueJobResponse>), AppError> {
    let queue = JobQueue::new(state.redis.clone());
    let job_id = queue.enqueue(&request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueJobResponse {
            job_id,
            status: "queued".to_string(),
        }),
    ))
}

/// GET /api/v1/jobs/recommendations/:job_id
///
/// Polls a job. Returns the stored result once the worker has scored it,
/// a pending record while it waits, 404 for an unknown id.
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, AppError> {
    let queue = JobQueue::new(state.redis.clone());
    match queue.fetch_result(job_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound(format!("job {job_id}"))),
    }
}
