//! Boundary errors for the conversion and persistence layer.
//!
//! Inside the engine, failure is data: a drop hop, a deny hop, a
//! `reason` on the result. This type only covers the document boundary,
//! where JSON from storage or the worker may simply be malformed.

use thiserror::Error;

/// Errors crossing the document/worker boundary.
#[derive(Debug, Error)]
pub enum SimError {
    /// A persisted or posted topology document failed to parse.
    #[error("malformed topology document: {0}")]
    Document(serde_json::Error),

    /// A packet spec posted to the worker failed to parse.
    #[error("malformed packet spec: {0}")]
    Spec(serde_json::Error),

    /// Simulation options failed to parse.
    #[error("malformed options: {0}")]
    Options(serde_json::Error),

    /// Serializing an outgoing document or result failed.
    #[error("serialization failed: {0}")]
    Serialize(serde_json::Error),
}

/// Convenience alias for boundary results.
pub type SimResult<T> = Result<T, SimError>;
