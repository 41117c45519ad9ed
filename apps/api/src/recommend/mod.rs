// Recommendation engine core.
// Pure, deterministic CPU work: embedding, similarity lookup, gap analysis,
// multi-factor scoring, ranking. No I/O below this comment — the HTTP
// handlers and the job worker are the only callers that touch the outside.

pub mod embedding;
pub mod gaps;
pub mod handlers;
pub mod orchestrator;
pub mod scoring;
pub mod similarity;
