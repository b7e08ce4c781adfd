//! Feedback loop — live user actions reinforce the co-purchase graph.

use tracing::{debug, warn};

use shopgraph_store::SqliteStore;

/// Record that a user viewing `anchor` acted on `target`.
///
/// One atomic increment on the edge store. Repeated calls keep adding
/// score — this models accumulating evidence, not a toggle. Failures are
/// logged and swallowed: a missed feedback write must never break the
/// user-facing flow that triggered it. Returns whether the write landed.
pub fn record_feedback(store: &SqliteStore, anchor: &str, target: &str, weight: f64) -> bool {
    if anchor == target {
        debug!("Ignoring self-feedback for {}", anchor);
        return false;
    }
    if weight <= 0.0 {
        debug!("Ignoring non-positive feedback weight {} for {}", weight, anchor);
        return false;
    }

    match store.increment_edge(anchor, target, weight) {
        Ok(()) => {
            debug!("Feedback recorded: {} -> {} (+{})", anchor, target, weight);
            true
        }
        Err(e) => {
            warn!("Feedback write failed for {} -> {}: {}", anchor, target, e);
            false
        }
    }
}
