//! Skill similarity index — versioned, read-only nearest-neighbor snapshot.
//!
//! Built once per catalog load and shared immutably across concurrent
//! requests; a catalog change produces a new snapshot that is swapped in
//! whole (see `AppState::install_index`). Readers never see a half-built
//! index.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::models::catalog::Skill;
use crate::recommend::embedding::{cosine_similarity, TextEmbedder};

/// Nearest-neighbor lookup over embedded vectors. The index does not
/// interpret keys; callers decide what they identify.
pub trait VectorIndex: Send + Sync {
    fn insert(&mut self, key: String, vector: Vec<f32>);

    /// K nearest keys by cosine similarity, descending. Ties keep insertion
    /// order (stable sort).
    fn query(&self, vector: &[f32], k: usize) -> Vec<(String, f32)>;
}

/// Brute-force cosine scan. Exact, stable, and fast enough for catalog-sized
/// corpora (hundreds of skills); an ANN backend can replace it behind the
/// trait if catalogs ever outgrow it.
#[derive(Default)]
pub struct LinearIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl VectorIndex for LinearIndex {
    fn insert(&mut self, key: String, vector: Vec<f32>) {
        self.entries.push((key, vector));
    }

    fn query(&self, vector: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .entries
            .iter()
            .map(|(key, v)| (key.clone(), cosine_similarity(vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// A skill similar to a query skill, with its cosine score.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarSkill {
    pub skill_id: String,
    pub score: f32,
}

/// Immutable similarity snapshot over one catalog load.
pub struct SkillIndex {
    version: u64,
    index: Box<dyn VectorIndex>,
    embeddings: HashMap<String, Vec<f32>>,
    skipped: usize,
}

impl SkillIndex {
    /// An empty snapshot (version 0) — the state before any catalog load.
    /// Neighbor queries degrade to empty results rather than erroring.
    pub fn empty() -> Self {
        Self {
            version: 0,
            index: Box::new(LinearIndex::default()),
            embeddings: HashMap::new(),
            skipped: 0,
        }
    }

    /// Embeds every catalog skill and builds the neighbor index.
    ///
    /// A skill whose text cannot be embedded (empty name and description) is
    /// skipped with a warning; one bad row never aborts the build. The built
    /// snapshot carries version 0 until `with_version` stamps it — for the
    /// shared slot that happens inside `AppState::install_index`.
    pub fn build(skills: &[Skill], embedder: &dyn TextEmbedder) -> Self {
        let mut index: Box<dyn VectorIndex> = Box::new(LinearIndex::default());
        let mut embeddings = HashMap::new();
        let mut skipped = 0_usize;

        for skill in skills {
            let text = skill_text(skill);
            match embedder.embed(&text) {
                Some(vector) => {
                    index.insert(skill.id.clone(), vector.clone());
                    embeddings.insert(skill.id.clone(), vector);
                }
                None => {
                    skipped += 1;
                    warn!(skill_id = %skill.id, "skipping unembeddable skill");
                }
            }
        }

        Self {
            version: 0,
            index,
            embeddings,
            skipped,
        }
    }

    /// Stamps the snapshot with its slot version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Top-k skills most similar to `skill_id`, excluding the skill itself.
    ///
    /// Empty for an unknown skill or a catalog with nothing to compare
    /// against — never an error.
    pub fn neighbors(&self, skill_id: &str, k: usize) -> Vec<SimilarSkill> {
        let Some(vector) = self.embeddings.get(skill_id) else {
            return Vec::new();
        };
        self.index
            .query(vector, k + 1)
            .into_iter()
            .filter(|(key, _)| key != skill_id)
            .take(k)
            .map(|(key, score)| SimilarSkill {
                skill_id: key,
                score,
            })
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Skills the last build dropped because their text would not embed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Textual representation fed to the embedder: name, category, description.
fn skill_text(skill: &Skill) -> String {
    format!("{} {} {}", skill.name, skill.category, skill.description)
}
