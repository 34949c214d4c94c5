//! Peer connection pool
//!
//! One gRPC channel per configured peer, keyed by peer identity, created
//! once at startup. Channels connect lazily and reconnect on their own; the
//! pool adds no retry loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::{debug, info, warn};

use castmesh_auth::{CredentialProvider, DEFAULT_SUBJECT};
use castmesh_core::{MeshError, MeshResult, PeerIdentity, PropagatedEvent};
use castmesh_wire::{from_status, PropagateClient, PropagateRequest};

use crate::{PeerAuth, Security};

/// Timeouts applied to every peer channel
#[derive(Clone, Debug)]
pub struct PoolOptions {
    /// Deadline for one propagation call
    pub call_timeout: Duration,
    /// Deadline for establishing the underlying connection
    pub connect_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            call_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

/// Channel, stub and credentials for one peer
#[derive(Debug)]
pub struct PeerConnection {
    identity: PeerIdentity,
    client: PropagateClient<Channel>,
    auth: PeerAuth,
    call_timeout: Duration,
}

impl PeerConnection {
    /// Open a lazily-connecting channel. Must be called inside a tokio runtime.
    pub fn open(identity: PeerIdentity, security: &Security, options: &PoolOptions) -> MeshResult<Self> {
        let (scheme, provider) = match security {
            Security::Insecure => ("http", None),
            Security::Secure(link) => {
                let provider = CredentialProvider::new(
                    link.authority.clone(),
                    DEFAULT_SUBJECT,
                    link.token_ttl,
                    link.refresh_margin,
                );
                ("https", Some(provider))
            }
        };
        let auth = match provider {
            Some(provider) => PeerAuth::bearer(provider, scheme == "https")?,
            None => PeerAuth::Insecure,
        };

        let mut endpoint = Endpoint::from_shared(format!("{scheme}://{}", identity.host_port()))
            .map_err(|e| MeshError::InvalidPeer {
                addr: identity.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(options.connect_timeout)
            .timeout(options.call_timeout);

        if let Security::Secure(link) = security {
            endpoint = endpoint
                .tls_config(link.tls.client_config(&identity))
                .map_err(|e| MeshError::Config(format!("TLS settings for {identity}: {e}")))?;
        }

        Ok(PeerConnection {
            identity,
            client: PropagateClient::new(endpoint.connect_lazy()),
            auth,
            call_timeout: options.call_timeout,
        })
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    pub fn auth(&self) -> &PeerAuth {
        &self.auth
    }

    /// Send one event to this peer. At most once; no retry.
    pub async fn propagate(&self, event: &PropagatedEvent) -> MeshResult<()> {
        let mut request = Request::new(PropagateRequest::from(event));
        request.set_timeout(self.call_timeout);
        self.auth.authorize(&mut request)?;

        let mut client = self.client.clone();
        match tokio::time::timeout(self.call_timeout, client.propagate(request)).await {
            Ok(Ok(_ack)) => {
                debug!(peer = %self.identity, event = event.name(), "propagated");
                Ok(())
            }
            Ok(Err(status)) => Err(from_status(&status, self.call_timeout)),
            Err(_) => Err(MeshError::DeadlineExceeded(self.call_timeout.as_millis() as u64)),
        }
    }
}

/// All peer connections of one instance
#[derive(Debug, Default)]
pub struct PeerPool {
    connections: BTreeMap<PeerIdentity, Arc<PeerConnection>>,
}

impl PeerPool {
    /// Connect to every peer in `peers`.
    ///
    /// Every entry is parsed before any channel is opened; one malformed
    /// entry fails the whole pool with a configuration error.
    pub fn connect(peers: &[String], security: &Security, options: &PoolOptions) -> MeshResult<Self> {
        let identities = peers
            .iter()
            .map(|raw| PeerIdentity::parse(raw))
            .collect::<MeshResult<Vec<_>>>()?;

        if !security.is_secure() {
            warn!("peer links use no TLS and no token authentication; do not run this in production");
        }

        let mut connections = BTreeMap::new();
        for identity in identities {
            if connections.contains_key(&identity) {
                warn!(peer = %identity, "duplicate peer ignored");
                continue;
            }
            let connection = PeerConnection::open(identity.clone(), security, options)?;
            info!(peer = %identity, secure = security.is_secure(), "peer connection ready");
            connections.insert(identity, Arc::new(connection));
        }

        Ok(PeerPool { connections })
    }

    pub fn get(&self, peer: &PeerIdentity) -> Option<&Arc<PeerConnection>> {
        self.connections.get(peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PeerConnection>> {
        self.connections.values()
    }

    pub fn identities(&self) -> Vec<PeerIdentity> {
        self.connections.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
