//! castmesh Runtime - Multihome backend for a socket server
//!
//! Turns one socket server instance into a member of a cluster:
//! 1. Local cast (broadcast / roomcast / socketcast) is delivered locally
//! 2. The same event is offered once to every peer, concurrently
//! 3. Events arriving from peers are delivered locally and go no further

pub mod backend;
pub mod config;
pub mod ingress;
pub mod logging;
pub mod stats;

pub use backend::*;
pub use config::*;
pub use ingress::*;
pub use stats::*;
