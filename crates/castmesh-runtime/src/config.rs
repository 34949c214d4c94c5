//! Backend configuration

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use castmesh_auth::{TokenAuthority, DEFAULT_REFRESH_MARGIN, DEFAULT_TOKEN_TTL};
use castmesh_core::{parse_peer_list, MeshError, MeshResult, PeerIdentity};
use castmesh_transport::{PoolOptions, SecureLink, Security, TlsMaterial};

/// Default gRPC listen port for peer links
pub const DEFAULT_LISTEN_PORT: u16 = 30001;

/// How peer links are protected
#[derive(Clone)]
pub enum SecurityConfig {
    /// No TLS, no tokens. Never use in production.
    Insecure,
    Secure {
        cert_path: PathBuf,
        key_path: PathBuf,
        /// Must be identical on every instance
        shared_secret: Vec<u8>,
    },
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityConfig::Insecure => f.write_str("Insecure"),
            SecurityConfig::Secure {
                cert_path, key_path, ..
            } => f
                .debug_struct("Secure")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish_non_exhaustive(),
        }
    }
}

/// Multihome backend configuration
#[derive(Clone, Debug)]
pub struct MeshConfig {
    /// Where this instance accepts peer calls
    pub listen_addr: SocketAddr,
    /// `[commonName@]host:port` entries, one per peer
    pub peers: Vec<String>,
    pub security: SecurityConfig,
    /// Deadline for one propagation call
    pub call_timeout: Duration,
    pub connect_timeout: Duration,
    pub token_ttl: Duration,
    pub refresh_margin: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT)),
            peers: Vec::new(),
            security: SecurityConfig::Insecure,
            call_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            token_ttl: DEFAULT_TOKEN_TTL,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }
}

impl MeshConfig {
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Set peers from a comma-separated list
    pub fn with_peer_list(mut self, list: &str) -> Self {
        self.peers = parse_peer_list(list);
        self
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration, refresh_margin: Duration) -> Self {
        self.token_ttl = ttl;
        self.refresh_margin = refresh_margin;
        self
    }

    /// Reject configurations the backend cannot start with
    pub fn validate(&self) -> MeshResult<()> {
        if self.peers.is_empty() {
            return Err(MeshError::Config("at least one peer is required".into()));
        }
        for peer in &self.peers {
            PeerIdentity::parse(peer)?;
        }
        if self.call_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(MeshError::Config("timeouts must be non-zero".into()));
        }
        if let SecurityConfig::Secure { shared_secret, .. } = &self.security {
            if shared_secret.is_empty() {
                return Err(MeshError::Config("shared secret must not be empty".into()));
            }
            if self.token_ttl.as_secs() == 0 {
                return Err(MeshError::Config("token ttl must be at least one second".into()));
            }
            if self.refresh_margin >= self.token_ttl {
                return Err(MeshError::Config(
                    "refresh margin must be shorter than the token ttl".into(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve link security, loading TLS material from disk
    pub fn link_security(&self) -> MeshResult<Security> {
        match &self.security {
            SecurityConfig::Insecure => Ok(Security::Insecure),
            SecurityConfig::Secure {
                cert_path,
                key_path,
                shared_secret,
            } => Ok(Security::Secure(SecureLink {
                tls: TlsMaterial::load(cert_path, key_path)?,
                authority: TokenAuthority::new(shared_secret.clone()),
                token_ttl: self.token_ttl,
                refresh_margin: self.refresh_margin,
            })),
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            call_timeout: self.call_timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secure(secret: &[u8]) -> SecurityConfig {
        SecurityConfig::Secure {
            cert_path: "/etc/castmesh/peer.crt".into(),
            key_path: "/etc/castmesh/peer.key".into(),
            shared_secret: secret.to_vec(),
        }
    }

    #[test]
    fn test_defaults() {
        let config = MeshConfig::default();
        assert_eq!(config.listen_addr.port(), 30001);
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.refresh_margin, Duration::from_secs(300));
    }

    #[test]
    fn test_peer_list() {
        let config = MeshConfig::default().with_peer_list("b@10.0.0.2:30001,10.0.0.3:30001");
        assert_eq!(config.peers.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(MeshConfig::default().validate().unwrap_err().is_fatal());

        let bad_peer = MeshConfig::default().with_peer_list("localhost:1,:2");
        assert!(bad_peer.validate().unwrap_err().is_fatal());

        let no_secret = MeshConfig::default()
            .with_peers(["localhost:1"])
            .with_security(secure(b""));
        assert!(no_secret.validate().is_err());

        let margin_too_big = MeshConfig::default()
            .with_peers(["localhost:1"])
            .with_security(secure(b"k"))
            .with_token_ttl(Duration::from_secs(300), Duration::from_secs(300));
        assert!(margin_too_big.validate().is_err());
    }

    #[test]
    fn test_missing_tls_material_is_fatal() {
        let config = MeshConfig::default()
            .with_peers(["localhost:1"])
            .with_security(secure(b"k"));
        assert!(config.validate().is_ok());
        assert!(config.link_security().unwrap_err().is_fatal());
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", secure(b"hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("104"));
    }
}
