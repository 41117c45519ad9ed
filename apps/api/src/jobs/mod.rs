// Background recommendation jobs: a Redis list as the durable queue, one
// worker task consuming it. Retries and at-least-once delivery are the
// queue's concern; the worker stays idempotent because the scoring core is
// deterministic.

pub mod queue;
pub mod worker;
