//! castmesh Core - Fundamental types shared by every mesh crate
//!
//! This crate defines:
//! - Peer identities parsed from `[commonName@]host:port` strings
//! - Propagated events and the local/peer origin split
//! - The local delivery contract implemented by the socket server
//! - The error taxonomy

pub mod delivery;
pub mod error;
pub mod event;
pub mod peer;
pub mod time;

pub use delivery::*;
pub use error::*;
pub use event::*;
pub use peer::*;
pub use time::*;
