use std::sync::{Arc, RwLock};

use redis::Client as RedisClient;
use tracing::info;

use crate::config::Config;
use crate::recommend::embedding::TextEmbedder;
use crate::recommend::orchestrator::{RecommendOptions, RecommendationRequest};
use crate::recommend::similarity::SkillIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Redis client backing the async recommendation job queue.
    pub redis: RedisClient,
    /// Pluggable embedder. Default: HashEmbedder. A model-backed embedder
    /// swaps in here without touching the index or the handlers.
    pub embedder: Arc<dyn TextEmbedder>,
    /// Current skill similarity snapshot. Single writer swaps the Arc under
    /// the lock; readers clone it out and never block each other.
    index: Arc<RwLock<Arc<SkillIndex>>>,
}

impl AppState {
    pub fn new(config: Config, redis: RedisClient, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            config,
            redis,
            embedder,
            index: Arc::new(RwLock::new(Arc::new(SkillIndex::empty()))),
        }
    }

    /// The snapshot serving reads right now. Holding the returned Arc keeps
    /// that snapshot alive across a whole request even if a rebuild lands
    /// mid-flight.
    pub fn current_index(&self) -> Arc<SkillIndex> {
        self.index
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swaps in a freshly built snapshot and returns the version it was
    /// assigned. Build off-lock, install here: the version is allocated and
    /// the slot swapped under one write lock, so concurrent rebuilds can
    /// never install the same version twice.
    pub fn install_index(&self, index: SkillIndex) -> u64 {
        let mut slot = self
            .index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let version = slot.version() + 1;
        *slot = Arc::new(index.with_version(version));
        version
    }

    /// Picks the snapshot for one scoring pass. When no catalog has been
    /// loaded yet but the request carries one, a transient index is built
    /// for this request alone — the shared snapshot only changes through
    /// `install_index`.
    pub fn snapshot_for(&self, request: &RecommendationRequest) -> Arc<SkillIndex> {
        let current = self.current_index();
        if current.is_empty() && !request.skills.is_empty() {
            info!(
                skills = request.skills.len(),
                "no index loaded; building transient index from request catalog"
            );
            return Arc::new(
                SkillIndex::build(&request.skills, self.embedder.as_ref())
                    .with_version(current.version()),
            );
        }
        current
    }

    pub fn recommend_options(&self) -> RecommendOptions {
        RecommendOptions {
            similarity_top_k: self.config.similarity_top_k,
            default_limit: self.config.default_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::embedding::HashEmbedder;

    fn make_state() -> AppState {
        let config = Config {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            similarity_top_k: 5,
            default_limit: 10,
        };
        let redis = RedisClient::open(config.redis_url.clone()).unwrap();
        AppState::new(config, redis, Arc::new(HashEmbedder::default()))
    }

    fn make_index() -> SkillIndex {
        SkillIndex::build(&[], &HashEmbedder::default())
    }

    #[test]
    fn test_install_assigns_increasing_versions() {
        let state = make_state();
        assert_eq!(state.current_index().version(), 0);
        assert_eq!(state.install_index(make_index()), 1);
        assert_eq!(state.install_index(make_index()), 2);
        assert_eq!(state.current_index().version(), 2);
    }

    #[test]
    fn test_concurrent_rebuilds_never_share_a_version() {
        // Two rebuilds race: both build off-lock from the same installed
        // snapshot, then install. Version assignment happens inside
        // install_index, so they must still get distinct versions.
        let state = make_state();
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.install_index(make_index()))
            })
            .collect();
        let versions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_ne!(
            versions[0], versions[1],
            "two rebuilds installed the same version"
        );
        assert_eq!(state.current_index().version(), 2);
    }
}
