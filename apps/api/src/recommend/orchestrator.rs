//! Recommendation orchestrator — the end-to-end ranking pass for one request.
//!
//! Single pass, no suspension: validate → gap analysis → similarity
//! expansion → candidate collection → scoring → sort → truncate. Per-resource
//! scoring failures drop the resource and flag the response as degraded
//! instead of failing the whole request.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::catalog::{
    clamp_level, Resource, ResourceType, Skill, SkillTarget, UserSkillRecord,
};
use crate::recommend::gaps::analyze_gaps;
use crate::recommend::scoring::{score_resource, FactorBreakdown, FactorWeights};
use crate::recommend::similarity::SkillIndex;

/// Fallback result-count limit when the request does not name one.
pub const DEFAULT_LIMIT: usize = 10;

/// Knobs the orchestrator takes from service configuration.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Neighbors pulled per target skill during similarity expansion.
    pub similarity_top_k: usize,
    /// Result limit applied when the request omits `limit`.
    pub default_limit: usize,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            similarity_top_k: 5,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// One scoring request. Ephemeral: carries immutable snapshots passed by
/// value from the calling system, holds no identity beyond the single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub user_skills: Vec<UserSkillRecord>,
    pub skills_to_improve: Vec<SkillTarget>,
    /// Skill catalog snapshot, in catalog order.
    pub skills: Vec<Skill>,
    /// Resource catalog snapshot, in catalog order.
    pub resources: Vec<Resource>,
    /// Free-text manager reviews; only the weaknesses sections matter.
    #[serde(default)]
    pub performance_reports: Vec<String>,
    /// Per-factor weight overrides; defaults to the tuned profile.
    #[serde(default)]
    pub weights: Option<FactorWeights>,
    /// Pre-normalized engagement signal per resource id, in [0,1].
    #[serde(default)]
    pub collaborative_signals: HashMap<String, f64>,
    /// Per-type preference overrides; types absent from a supplied map
    /// score neutral (0.5).
    #[serde(default)]
    pub type_preferences: Option<HashMap<ResourceType, f64>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One ranked resource with its score and factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedResource {
    pub resource_id: String,
    pub title: String,
    pub score: f64,
    pub factors: FactorBreakdown,
}

/// A target skill echoed back with its computed priority weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedTarget {
    pub skill_id: String,
    pub current_level: u8,
    pub target_level: u8,
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendedResource>,
    pub skills_to_improve: Vec<AnnotatedTarget>,
    /// True when at least one resource was dropped from scoring.
    pub degraded: bool,
    /// Version of the similarity snapshot that served this request.
    pub index_version: u64,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Runs the full ranking pass against one read-only index snapshot.
///
/// Deterministic: identical inputs and an identical snapshot yield an
/// identical response, factor breakdowns included.
pub fn recommend(
    request: &RecommendationRequest,
    index: &SkillIndex,
    options: &RecommendOptions,
) -> Result<RecommendationResponse, RecommendError> {
    // 1. Fail fast on a request we cannot score at all.
    if request.skills_to_improve.is_empty() {
        return Err(RecommendError::InvalidRequest(
            "skills_to_improve must not be empty".to_string(),
        ));
    }
    let weights = request.weights.clone().unwrap_or_default();
    weights
        .validate()
        .map_err(RecommendError::InvalidRequest)?;

    // 2. Gap analysis over all targets.
    let skill_names: HashMap<String, String> = request
        .skills
        .iter()
        .map(|s| (s.id.clone(), s.name.clone()))
        .collect();
    let gap_weights = analyze_gaps(
        &request.skills_to_improve,
        &request.performance_reports,
        &skill_names,
    );

    let annotated: Vec<AnnotatedTarget> = request
        .skills_to_improve
        .iter()
        .map(|t| AnnotatedTarget {
            skill_id: t.skill_id.clone(),
            current_level: t.current_level,
            target_level: t.target_level,
            gap: gap_weights.get(&t.skill_id).copied().unwrap_or(0.0),
        })
        .collect();

    // An empty catalog is a valid request with nothing to rank.
    if request.resources.is_empty() {
        return Ok(RecommendationResponse {
            recommendations: Vec::new(),
            skills_to_improve: annotated,
            degraded: false,
            index_version: index.version(),
        });
    }

    // 3. Expand each target into related skills. A missing or empty index
    //    degrades expansion to direct targets only; it never aborts.
    let relevance = expand_targets(&request.skills_to_improve, index, options.similarity_top_k);

    // 4–5. Collect candidates in catalog order, dedup by id, score each.
    let user_levels: HashMap<&str, u8> = request
        .user_skills
        .iter()
        .map(|r| (r.skill_id.as_str(), clamp_level(r.level)))
        .collect();

    // Level each resource should serve: the plan's target level for a
    // targeted skill (duplicates keep the highest), so difficulty tracks
    // where the learner is heading rather than where they stand.
    let mut target_levels: HashMap<&str, u8> = HashMap::new();
    for target in &request.skills_to_improve {
        let level = clamp_level(target.target_level);
        let entry = target_levels.entry(target.skill_id.as_str()).or_insert(0);
        if level > *entry {
            *entry = level;
        }
    }

    let mut degraded = false;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates: Vec<Candidate<'_>> = Vec::new();

    for resource in &request.resources {
        let Some(&skill_relevance) = relevance.get(resource.skill_id.as_str()) else {
            continue;
        };
        if !seen.insert(resource.id.as_str()) {
            continue;
        }

        let gap = gap_weights
            .get(resource.skill_id.as_str())
            .copied()
            .unwrap_or(0.0);
        let collaborative = request
            .collaborative_signals
            .get(resource.id.as_str())
            .copied()
            .unwrap_or(0.0);
        let type_preference = type_preference(request, resource.resource_type);
        let need_level = target_levels
            .get(resource.skill_id.as_str())
            .or_else(|| user_levels.get(resource.skill_id.as_str()))
            .copied();

        match score_resource(
            resource,
            need_level,
            gap,
            skill_relevance,
            collaborative,
            type_preference,
            &weights,
        ) {
            Ok((score, factors)) => candidates.push(Candidate {
                resource,
                score,
                factors,
            }),
            Err(e) => {
                warn!(resource_id = %resource.id, error = %e, "dropping unscorable resource");
                degraded = true;
            }
        }
    }

    // 6. Sort: score desc, popularity desc, catalog order (stable sort).
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.resource.views.cmp(&a.resource.views))
    });

    // 7. Truncate to the requested limit.
    let limit = request.limit.unwrap_or(options.default_limit);
    let recommendations = candidates
        .into_iter()
        .take(limit)
        .map(|c| RecommendedResource {
            resource_id: c.resource.id.clone(),
            title: c.resource.title.clone(),
            score: c.score,
            factors: c.factors,
        })
        .collect();

    Ok(RecommendationResponse {
        recommendations,
        skills_to_improve: annotated,
        degraded,
        index_version: index.version(),
    })
}

struct Candidate<'a> {
    resource: &'a Resource,
    score: f64,
    factors: FactorBreakdown,
}

/// Relevance per reachable skill: direct targets at 1.0, index neighbors at
/// their cosine score. A skill reachable via several paths keeps the
/// maximum relevance it earns.
fn expand_targets(
    targets: &[SkillTarget],
    index: &SkillIndex,
    top_k: usize,
) -> HashMap<String, f64> {
    let mut relevance: HashMap<String, f64> = HashMap::new();
    for target in targets {
        relevance.insert(target.skill_id.clone(), 1.0);
        for neighbor in index.neighbors(&target.skill_id, top_k) {
            let score = f64::from(neighbor.score).clamp(0.0, 1.0);
            let entry = relevance.entry(neighbor.skill_id).or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }
    }
    relevance
}

fn type_preference(request: &RecommendationRequest, ty: ResourceType) -> f64 {
    match &request.type_preferences {
        Some(map) => map.get(&ty).copied().unwrap_or(0.5),
        None => ty.default_preference(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Difficulty;
    use crate::recommend::embedding::HashEmbedder;

    fn make_skill(id: &str, name: &str, description: &str) -> Skill {
        Skill {
            id: id.to_string(),
            name: name.to_string(),
            category: "technical".to_string(),
            description: description.to_string(),
        }
    }

    fn make_resource(id: &str, skill_id: &str, difficulty: Difficulty, views: u64) -> Resource {
        Resource {
            id: id.to_string(),
            title: format!("Resource {id}"),
            resource_type: ResourceType::Course,
            skill_id: skill_id.to_string(),
            provider: "Acme Learning".to_string(),
            difficulty,
            description: String::new(),
            views,
        }
    }

    fn make_request(skills: Vec<Skill>, resources: Vec<Resource>) -> RecommendationRequest {
        RecommendationRequest {
            user_skills: Vec::new(),
            skills_to_improve: vec![SkillTarget {
                skill_id: "s1".to_string(),
                current_level: 3,
                target_level: 8,
            }],
            skills,
            resources,
            performance_reports: Vec::new(),
            weights: None,
            collaborative_signals: HashMap::new(),
            type_preferences: None,
            limit: None,
        }
    }

    fn build_index(skills: &[Skill]) -> SkillIndex {
        SkillIndex::build(skills, &HashEmbedder::default()).with_version(1)
    }

    #[test]
    fn test_empty_targets_is_invalid_request() {
        let mut request = make_request(vec![], vec![]);
        request.skills_to_improve.clear();
        let err = recommend(&request, &SkillIndex::empty(), &RecommendOptions::default());
        assert!(matches!(err, Err(RecommendError::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_catalog_is_empty_result_not_error() {
        let request = make_request(vec![make_skill("s1", "JavaScript", "web")], vec![]);
        let response =
            recommend(&request, &SkillIndex::empty(), &RecommendOptions::default()).unwrap();
        assert!(response.recommendations.is_empty());
        assert!(!response.degraded);
        assert_eq!(response.skills_to_improve.len(), 1);
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut request = make_request(
            vec![make_skill("s1", "JavaScript", "web")],
            vec![make_resource("r1", "s1", Difficulty::Beginner, 0)],
        );
        request.weights = Some(FactorWeights {
            skill_gap: 0.9,
            skill_relevance: 0.9,
            difficulty_match: 0.0,
            collaborative: 0.0,
            resource_type: 0.0,
        });
        let err = recommend(&request, &SkillIndex::empty(), &RecommendOptions::default());
        assert!(matches!(err, Err(RecommendError::InvalidRequest(_))));
    }

    #[test]
    fn test_scores_are_in_unit_range_and_sorted() {
        let skills = vec![
            make_skill("s1", "JavaScript", "web scripting language"),
            make_skill("s2", "TypeScript", "typed web scripting language"),
        ];
        let resources = vec![
            make_resource("r1", "s1", Difficulty::Beginner, 10),
            make_resource("r2", "s1", Difficulty::Advanced, 20),
            make_resource("r3", "s2", Difficulty::Intermediate, 5),
        ];
        let index = build_index(&skills);
        let request = make_request(skills, resources);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();

        assert!(!response.recommendations.is_empty());
        for r in &response.recommendations {
            assert!((0.0..=1.0).contains(&r.score), "score {}", r.score);
        }
        for pair in response.recommendations.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_difficulty_tracks_the_target_level() {
        // User at JavaScript level 3 targeting 8: the plan is heading into
        // the advanced tier, so with everything else equal the advanced
        // resource outranks the beginner one.
        let skills = vec![make_skill("s1", "JavaScript", "web scripting")];
        let resources = vec![
            make_resource("beginner", "s1", Difficulty::Beginner, 0),
            make_resource("advanced", "s1", Difficulty::Advanced, 0),
        ];
        let index = build_index(&skills);
        let mut request = make_request(skills, resources);
        request.user_skills = vec![UserSkillRecord {
            skill_id: "s1".to_string(),
            level: 3,
        }];
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations[0].resource_id, "advanced");
        assert!(
            response.recommendations[0].score > response.recommendations[1].score
        );
        // Repeated runs agree exactly.
        let again = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations, again.recommendations);
    }

    #[test]
    fn test_duplicate_resource_scored_once_at_max_relevance() {
        let skills = vec![
            make_skill("s1", "JavaScript", "web scripting language"),
            make_skill("s2", "TypeScript", "typed web scripting language"),
        ];
        // r1 targets s2, reachable both as a direct target and as a
        // neighbor of s1; it must appear once with relevance 1.0.
        let resources = vec![make_resource("r1", "s2", Difficulty::Beginner, 0)];
        let index = build_index(&skills);
        let mut request = make_request(skills, resources);
        request.skills_to_improve.push(SkillTarget {
            skill_id: "s2".to_string(),
            current_level: 2,
            target_level: 6,
        });
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations.len(), 1);
        assert_eq!(response.recommendations[0].factors.skill_relevance, 1.0);
    }

    #[test]
    fn test_expansion_reaches_neighbor_skills() {
        let skills = vec![
            make_skill("s1", "JavaScript", "web scripting language"),
            make_skill("s2", "TypeScript", "typed web scripting language"),
        ];
        // Only target s1; the s2 resource is reachable via expansion alone.
        let resources = vec![make_resource("r2", "s2", Difficulty::Beginner, 0)];
        let index = build_index(&skills);
        let request = make_request(skills, resources);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations.len(), 1);
        let relevance = response.recommendations[0].factors.skill_relevance;
        assert!(relevance > 0.0 && relevance < 1.0, "relevance {relevance}");
    }

    #[test]
    fn test_missing_index_degrades_to_direct_targets_only() {
        let skills = vec![
            make_skill("s1", "JavaScript", "web scripting language"),
            make_skill("s2", "TypeScript", "typed web scripting language"),
        ];
        let resources = vec![
            make_resource("r1", "s1", Difficulty::Beginner, 0),
            make_resource("r2", "s2", Difficulty::Beginner, 0),
        ];
        let request = make_request(skills, resources);
        let response =
            recommend(&request, &SkillIndex::empty(), &RecommendOptions::default()).unwrap();
        // Neighbor resource unreachable without an index; not an error.
        assert_eq!(response.recommendations.len(), 1);
        assert_eq!(response.recommendations[0].resource_id, "r1");
        assert!(!response.degraded);
    }

    #[test]
    fn test_tie_break_by_views_then_catalog_order() {
        let skills = vec![make_skill("s1", "JavaScript", "web scripting")];
        // Identical scores; r2 is more viewed. r1 and r3 tie fully, so
        // catalog order keeps r1 ahead of r3.
        let resources = vec![
            make_resource("r1", "s1", Difficulty::Beginner, 5),
            make_resource("r2", "s1", Difficulty::Beginner, 50),
            make_resource("r3", "s1", Difficulty::Beginner, 5),
        ];
        let index = build_index(&skills);
        let request = make_request(skills, resources);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        let ids: Vec<&str> = response
            .recommendations
            .iter()
            .map(|r| r.resource_id.as_str())
            .collect();
        assert_eq!(ids, vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn test_limit_truncates() {
        let skills = vec![make_skill("s1", "JavaScript", "web scripting")];
        let resources: Vec<Resource> = (0..15)
            .map(|i| make_resource(&format!("r{i}"), "s1", Difficulty::Beginner, i))
            .collect();
        let index = build_index(&skills);
        let mut request = make_request(skills, resources);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations.len(), DEFAULT_LIMIT);

        request.limit = Some(3);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations.len(), 3);
    }

    #[test]
    fn test_idempotent_including_breakdowns() {
        let skills = vec![
            make_skill("s1", "JavaScript", "web scripting language"),
            make_skill("s2", "TypeScript", "typed web scripting language"),
            make_skill("s3", "Rust", "systems programming language"),
        ];
        let resources = vec![
            make_resource("r1", "s1", Difficulty::Beginner, 3),
            make_resource("r2", "s2", Difficulty::Intermediate, 9),
            make_resource("r3", "s3", Difficulty::Advanced, 1),
        ];
        let index = build_index(&skills);
        let mut request = make_request(skills, resources);
        request.performance_reports =
            vec!["Weaknesses:\n- JavaScript depth\n".to_string()];
        let a = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        let b = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(a.recommendations, b.recommendations);
        assert_eq!(a.degraded, b.degraded);
    }

    #[test]
    fn test_duplicate_catalog_ids_deduped() {
        let skills = vec![make_skill("s1", "JavaScript", "web scripting")];
        let resources = vec![
            make_resource("r1", "s1", Difficulty::Beginner, 0),
            make_resource("r1", "s1", Difficulty::Beginner, 0),
        ];
        let index = build_index(&skills);
        let request = make_request(skills, resources);
        let response = recommend(&request, &index, &RecommendOptions::default()).unwrap();
        assert_eq!(response.recommendations.len(), 1);
    }

    #[test]
    fn test_weakness_boost_flows_into_scores() {
        let skills = vec![make_skill("s1", "JavaScript", "web scripting")];
        let resources = vec![make_resource("r1", "s1", Difficulty::Beginner, 0)];
        let index = build_index(&skills);

        let plain = make_request(skills.clone(), resources.clone());
        let mut boosted = make_request(skills, resources);
        boosted.performance_reports =
            vec!["Weaknesses:\n- JavaScript fundamentals\n".to_string()];

        let plain = recommend(&plain, &index, &RecommendOptions::default()).unwrap();
        let boosted = recommend(&boosted, &index, &RecommendOptions::default()).unwrap();
        assert!(
            boosted.recommendations[0].score > plain.recommendations[0].score,
            "boost did not raise score"
        );
        assert!(boosted.skills_to_improve[0].gap > plain.skills_to_improve[0].gap);
    }
}
