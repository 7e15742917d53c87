//! Error types for the ramp engine.
//!
//! None of these escape the public entry points: backend failures fall back
//! to cached data, malformed records decode to empty collections, and
//! dangling references are dropped from result sets.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RampError {
    #[error("Content backend unavailable: {0}")]
    Backend(String),

    #[error("Malformed content record field: {0}")]
    MalformedRecord(String),

    #[error("Reference to unknown item id: {0}")]
    MissingReference(String),

    #[error("Cyclic prerequisites involving: {0:?}")]
    CyclicPrerequisites(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
