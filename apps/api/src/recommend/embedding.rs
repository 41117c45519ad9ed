//! Text embedding — pluggable, trait-based embedder behind the similarity index.
//!
//! Default: `HashEmbedder` (pure-Rust feature hashing, fast, deterministic,
//! fully testable). A model-backed embedder can be swapped in via `AppState`
//! without touching the index or any caller code.

/// Maps a piece of text to a fixed-dimension dense vector.
///
/// Carried in `AppState` as `Arc<dyn TextEmbedder>`. Implementations must be
/// deterministic: the same text always yields the same vector, so a rebuilt
/// index over an unchanged catalog is byte-identical.
pub trait TextEmbedder: Send + Sync {
    /// Returns `None` when no vector can be produced for the text
    /// (e.g. empty or whitespace-only input).
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// Feature-hashing bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimension` buckets with a hash-derived sign, and the vector is
/// L2-normalized. No vocabulary, no model file, stable across runs and
/// platforms.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimension];
        let mut tokens = 0_usize;

        for token in tokenize(text) {
            let hash = fnv1a_64(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            // One hash bit decides the sign so unrelated tokens sharing a
            // bucket tend to cancel rather than pile up.
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return None;
        }

        l2_normalize(&mut vector);
        Some(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two vectors. Defined as 0.0 when either vector
/// has zero norm or the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    // std hashers are not guaranteed stable across releases; FNV-1a is.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
