//! castmesh Wire - Propagation protocol contract
//!
//! One gRPC service, `castmesh.v1.Propagate`, with one unary method:
//!
//! ```text
//! Propagate(PropagateRequest { cast_kind, target, event_name, payload, binary }) -> PropagateAck
//! ```
//!
//! Secure links carry `authorization: Bearer <token>` metadata.

pub mod convert;
pub mod pb;
pub mod status;

pub use pb::propagate_client::PropagateClient;
pub use pb::propagate_server::{Propagate, PropagateServer};
pub use pb::{PropagateAck, PropagateRequest, WireCastKind};
pub use status::*;

/// Metadata key carrying the bearer token
pub const AUTHORIZATION_KEY: &str = "authorization";
