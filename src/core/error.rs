//! Error types for the Veld renderer

use thiserror::Error;

/// Main error type for the renderer.
///
/// Only configuration problems surface to the caller. Resource invalidation
/// and transient unavailability are absorbed by the recovery loop and never
/// appear here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
