//! Token estimation.
//!
//! The store never counts tokens itself; it asks an injected estimator so
//! embedders can swap in a real tokenizer. The default heuristic is one
//! token per four bytes of content, rounded up.

/// Estimates the token count of a piece of content.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, content: &str) -> u32;
}

/// Four-bytes-per-token heuristic estimator.
#[derive(Default)]
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, content: &str) -> u32 {
        (content.len().div_ceil(4)) as u32
    }
}

// ============================================================================
// Tests
// ============================================================================
