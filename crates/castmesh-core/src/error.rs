//! Error types for the castmesh peer mesh

use thiserror::Error;

/// Broad error category, used to decide how a failure is handled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad startup configuration; the instance must not start
    Config,
    /// Rejected or unusable token; affects one call
    Auth,
    /// Peer unreachable or too slow; affects one propagation
    Transport,
    /// Token could not be minted; affects the call that needed it
    Issuance,
    /// Event shape violates the wire contract
    Event,
}

/// Core castmesh errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    // Configuration errors
    #[error("Invalid peer address '{addr}': {reason}")]
    InvalidPeer { addr: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Auth errors
    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Token expired at {0}")]
    TokenExpired(i64),

    #[error("Token issuance failed: {0}")]
    Issuance(String),

    // Event errors
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Deadline exceeded after {0} ms")]
    DeadlineExceeded(u64),
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::InvalidPeer { .. } | MeshError::Config(_) => ErrorKind::Config,
            MeshError::Auth(_) | MeshError::TokenExpired(_) => ErrorKind::Auth,
            MeshError::Issuance(_) => ErrorKind::Issuance,
            MeshError::InvalidEvent(_) => ErrorKind::Event,
            MeshError::Transport(_) | MeshError::DeadlineExceeded(_) => ErrorKind::Transport,
        }
    }

    /// Only configuration errors stop the instance
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

/// Result type for castmesh operations
pub type MeshResult<T> = Result<T, MeshError>;
