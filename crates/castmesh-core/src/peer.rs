//! Peer identities
//!
//! A peer is configured as `commonName@host:port` or bare `host:port`.
//! The common name is the server name checked against the peer's TLS
//! certificate; it defaults to the host.

use std::fmt;
use std::str::FromStr;

use crate::{MeshError, MeshResult};

/// Identity of one peer connection target. Immutable once parsed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity {
    common_name: String,
    host_port: String,
}

impl PeerIdentity {
    /// Parse a `[commonName@]host:port` string
    pub fn parse(raw: &str) -> MeshResult<Self> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| MeshError::InvalidPeer {
            addr: raw.to_string(),
            reason: reason.to_string(),
        };

        let (name, host_port) = match trimmed.split_once('@') {
            Some((name, rest)) => {
                if name.is_empty() {
                    return Err(invalid("empty common name before '@'"));
                }
                (Some(name), rest)
            }
            None => (None, trimmed),
        };

        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if host.contains(|c: char| matches!(c, '@' | '/' | '?' | '#') || c.is_whitespace()) {
            return Err(invalid("host contains '@', '/', '?', '#' or whitespace"));
        }
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid("IPv6 host must be bracketed"));
        }
        port.parse::<u16>()
            .map_err(|_| invalid("port is not a number in 0..=65535"))?;

        let common_name = match name {
            Some(name) => name.to_string(),
            None => host.trim_start_matches('[').trim_end_matches(']').to_string(),
        };

        Ok(PeerIdentity {
            common_name,
            host_port: host_port.to_string(),
        })
    }

    /// Name verified against the peer's certificate
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Dial address, `host:port`
    pub fn host_port(&self) -> &str {
        &self.host_port
    }
}

impl FromStr for PeerIdentity {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeerIdentity::parse(s)
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({}@{})", self.common_name, self.host_port)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.common_name, self.host_port)
    }
}

/// Split a comma-separated peer list into its entries.
///
/// Entries are not validated here; see [`PeerIdentity::parse`].
pub fn parse_peer_list(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(|p| p.trim().to_string()).collect()
}
