//! castmesh Transport - Peer links over gRPC
//!
//! This crate provides:
//! - TLS material loading and per-peer client/server TLS settings
//! - Per-call authorization on outgoing calls and token checks on incoming ones
//! - The peer connection pool (one channel per configured peer)
//! - The propagation listener

pub mod auth;
pub mod pool;
pub mod server;
pub mod tls;

pub use auth::*;
pub use pool::*;
pub use server::*;
pub use tls::*;

use std::time::Duration;

use castmesh_auth::TokenAuthority;

/// How peer links are protected
#[derive(Clone, Debug)]
pub enum Security {
    /// Plaintext, unauthenticated. Local testing only.
    Insecure,
    /// TLS plus shared-secret bearer tokens
    Secure(SecureLink),
}

impl Security {
    pub fn is_secure(&self) -> bool {
        matches!(self, Security::Secure(_))
    }
}

/// Settings for secure peer links
#[derive(Clone, Debug)]
pub struct SecureLink {
    pub tls: TlsMaterial,
    pub authority: TokenAuthority,
    pub token_ttl: Duration,
    pub refresh_margin: Duration,
}
