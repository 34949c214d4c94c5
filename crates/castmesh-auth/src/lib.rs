//! castmesh Auth - Peer link authorization
//!
//! Provides:
//! - Token authority (HS256 JWTs signed with the mesh's shared secret)
//! - Credential provider (per-connection token, refreshed ahead of expiry)

pub mod credential;
pub mod token;

pub use credential::*;
pub use token::*;
