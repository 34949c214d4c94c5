//! Mapping between mesh errors and gRPC status codes

use std::time::Duration;

use tonic::{Code, Status};

use castmesh_core::MeshError;

/// Status returned to a peer for a failed call
pub fn to_status(err: &MeshError) -> Status {
    match err {
        MeshError::Auth(_) | MeshError::TokenExpired(_) => Status::unauthenticated(err.to_string()),
        MeshError::InvalidEvent(_) => Status::invalid_argument(err.to_string()),
        MeshError::DeadlineExceeded(_) => Status::deadline_exceeded(err.to_string()),
        MeshError::Transport(_) => Status::unavailable(err.to_string()),
        MeshError::InvalidPeer { .. } | MeshError::Config(_) | MeshError::Issuance(_) => {
            Status::internal(err.to_string())
        }
    }
}

/// Error for a call that failed with `status` while bounded by `deadline`
pub fn from_status(status: &Status, deadline: Duration) -> MeshError {
    match status.code() {
        Code::Unauthenticated | Code::PermissionDenied => {
            MeshError::Auth(format!("peer rejected credentials: {}", status.message()))
        }
        Code::InvalidArgument => {
            MeshError::InvalidEvent(format!("peer rejected event: {}", status.message()))
        }
        Code::DeadlineExceeded => MeshError::DeadlineExceeded(deadline.as_millis() as u64),
        code => MeshError::Transport(format!("{code:?}: {}", status.message())),
    }
}
