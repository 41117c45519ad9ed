//! Resource scoring — weighted five-factor score per (user, resource) pair.
//!
//! Pure functions of their inputs: no hidden state, no randomness. The same
//! request scored twice produces identical breakdowns, which the idempotence
//! guarantee of the orchestrator relies on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::catalog::{clamp_level, Difficulty, Resource};

/// Importance of each factor in the final score. The defaults come from the
/// platform's tuned ranking profile; callers may override per request as
/// long as the weights stay non-negative and sum to at most 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorWeights {
    pub skill_gap: f64,
    pub skill_relevance: f64,
    pub difficulty_match: f64,
    pub collaborative: f64,
    pub resource_type: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            skill_gap: 0.35,
            skill_relevance: 0.25,
            difficulty_match: 0.20,
            collaborative: 0.10,
            resource_type: 0.10,
        }
    }
}

impl FactorWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.skill_gap,
            self.skill_relevance,
            self.difficulty_match,
            self.collaborative,
            self.resource_type,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("weights must be finite and non-negative".to_string());
        }
        let sum: f64 = all.iter().sum();
        if sum > 1.0 + Self::SUM_TOLERANCE {
            return Err(format!("weights sum to {sum:.4}, must not exceed 1"));
        }
        Ok(())
    }
}

/// Per-factor sub-scores, each in [0,1]. Returned alongside the final score
/// so callers can explain why a resource ranked where it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub skill_gap: f64,
    pub skill_relevance: f64,
    pub difficulty_match: f64,
    pub collaborative: f64,
    pub resource_type: f64,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("non-finite score for resource {resource_id}")]
    NonFiniteScore { resource_id: String },
}

/// How well a resource's difficulty tier fits a learner operating at
/// `level`. Same tier → 1.0, adjacent tier → 0.5, opposite end → 0.0. An
/// unknown level (0) implies the beginner tier.
pub fn difficulty_match(level: u8, resource_difficulty: Difficulty) -> f64 {
    let implied = Difficulty::for_level(level);
    match implied.distance(resource_difficulty) {
        0 => 1.0,
        1 => 0.5,
        _ => 0.0,
    }
}

/// Scores one resource for one user.
///
/// - `need_level`: the proficiency level the resource should serve — the
///   plan's target level for a targeted skill, the user's current level for
///   a skill reached by expansion, `None` when neither is known.
/// - `gap`: normalized gap weight for the resource's skill (0 if untargeted).
/// - `relevance`: 1.0 for a directly-targeted skill, the expansion cosine
///   for a neighbor skill, 0 otherwise.
/// - `collaborative`: opaque pre-normalized engagement signal; clamped here
///   rather than trusted.
/// - `type_preference`: per-type preference in [0,1].
pub fn score_resource(
    resource: &Resource,
    need_level: Option<u8>,
    gap: f64,
    relevance: f64,
    collaborative: f64,
    type_preference: f64,
    weights: &FactorWeights,
) -> Result<(f64, FactorBreakdown), ScoreError> {
    let level = need_level.map(clamp_level).unwrap_or(0);

    let breakdown = FactorBreakdown {
        skill_gap: gap.clamp(0.0, 1.0),
        skill_relevance: relevance.clamp(0.0, 1.0),
        difficulty_match: difficulty_match(level, resource.difficulty),
        collaborative: collaborative.clamp(0.0, 1.0),
        resource_type: type_preference.clamp(0.0, 1.0),
    };

    let score = weights.skill_gap * breakdown.skill_gap
        + weights.skill_relevance * breakdown.skill_relevance
        + weights.difficulty_match * breakdown.difficulty_match
        + weights.collaborative * breakdown.collaborative
        + weights.resource_type * breakdown.resource_type;

    if !score.is_finite() {
        return Err(ScoreError::NonFiniteScore {
            resource_id: resource.id.clone(),
        });
    }

    Ok((score.clamp(0.0, 1.0), breakdown))
}
