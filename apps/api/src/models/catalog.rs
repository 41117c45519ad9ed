//! Catalog domain types — skills, learning resources, and per-user skill records.
//!
//! These mirror the shapes the upstream L&D platform sends us: ids are the
//! upstream system's opaque string ids, levels are on its 1–10 scale. The
//! recommendation core receives immutable snapshots of these and never
//! persists anything itself.

use serde::{Deserialize, Serialize};

/// Lowest and highest proficiency levels on the upstream 1–10 scale.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

/// A skill in the catalog. `name` is unique upstream; `description` feeds
/// the similarity index together with the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Coarse resource difficulty classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Tier implied by a user's current proficiency level.
    /// 1–3 → beginner, 4–7 → intermediate, 8–10 → advanced.
    pub fn for_level(level: u8) -> Self {
        match level {
            0..=3 => Difficulty::Beginner,
            4..=7 => Difficulty::Intermediate,
            _ => Difficulty::Advanced,
        }
    }

    /// Tier distance: 0 = same tier, 1 = adjacent, 2 = opposite ends.
    pub fn distance(self, other: Difficulty) -> u8 {
        (self.rank() as i8 - other.rank() as i8).unsigned_abs()
    }

    fn rank(self) -> u8 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }
}

/// Kind of learning resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Course,
    Video,
    Article,
    Certification,
    Book,
    Document,
    Other,
}

impl ResourceType {
    /// Built-in preference score in [0,1], used when the caller supplies no
    /// per-type preference map. Certifications rank highest, loose documents
    /// lowest; values come from the platform's historical engagement data.
    pub fn default_preference(self) -> f64 {
        match self {
            ResourceType::Certification => 1.0,
            ResourceType::Course => 0.83,
            ResourceType::Book => 0.75,
            ResourceType::Video => 0.67,
            ResourceType::Other => 0.58,
            ResourceType::Article => 0.5,
            ResourceType::Document => 0.42,
        }
    }
}

/// A learning resource in the catalog. References its target skill by id;
/// `views` is the popularity counter used as a ranking tie-break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub skill_id: String,
    #[serde(default)]
    pub provider: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub views: u64,
}

/// A user's current proficiency in one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSkillRecord {
    pub skill_id: String,
    pub level: u8,
}

/// One skill the user wants to improve, from their development plan.
/// `target_level < current_level` is tolerated; the gap clamps to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTarget {
    pub skill_id: String,
    pub current_level: u8,
    pub target_level: u8,
}

/// Clamps an upstream level into the valid [1,10] range. Malformed levels
/// in a single record must not fail the whole request.
pub fn clamp_level(level: u8) -> u8 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}
