//! Per-call authorization for peer links
//!
//! Outgoing: [`PeerAuth`] attaches `authorization: Bearer <token>` from the
//! connection's own credential provider. Incoming: [`TokenGuard`] checks it
//! against the shared secret before the call reaches the service.

use std::sync::Arc;

use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::warn;

use castmesh_auth::{parse_bearer, CredentialProvider, TokenAuthority, TokenClaims};
use castmesh_core::{MeshError, MeshResult};
use castmesh_wire::{to_status, AUTHORIZATION_KEY};

/// Outgoing call credentials of one peer connection
#[derive(Clone, Debug)]
pub enum PeerAuth {
    /// No metadata at all
    Insecure,
    Bearer(Arc<CredentialProvider>),
}

impl PeerAuth {
    /// Bearer credentials for a link. Refused on a plaintext link when the
    /// authority demands transport security.
    pub fn bearer(provider: CredentialProvider, encrypted: bool) -> MeshResult<Self> {
        if provider.authority().requires_transport_security() && !encrypted {
            return Err(MeshError::Config(
                "bearer tokens must not be sent over an unencrypted link".into(),
            ));
        }
        Ok(PeerAuth::Bearer(Arc::new(provider)))
    }

    /// Attach credentials to an outgoing request. Issuance failures fail the call.
    pub fn authorize<T>(&self, request: &mut Request<T>) -> MeshResult<()> {
        let PeerAuth::Bearer(provider) = self else {
            return Ok(());
        };
        let header = provider.authorization()?;
        let value: MetadataValue<Ascii> = header
            .parse()
            .map_err(|_| MeshError::Issuance("token is not valid header text".into()))?;
        request.metadata_mut().insert(AUTHORIZATION_KEY, value);
        Ok(())
    }

    pub fn credentials(&self) -> Option<&Arc<CredentialProvider>> {
        match self {
            PeerAuth::Insecure => None,
            PeerAuth::Bearer(provider) => Some(provider),
        }
    }
}

/// Server-side token check
#[derive(Clone, Debug)]
pub struct TokenGuard {
    authority: Option<TokenAuthority>,
}

impl TokenGuard {
    pub fn new(authority: TokenAuthority) -> Self {
        TokenGuard {
            authority: Some(authority),
        }
    }

    /// Guard for insecure mode: every call passes
    pub fn disabled() -> Self {
        TokenGuard { authority: None }
    }

    /// Validate the request's bearer token. `Ok(None)` when disabled.
    pub fn check<T>(&self, request: &Request<T>) -> MeshResult<Option<TokenClaims>> {
        let Some(authority) = &self.authority else {
            return Ok(None);
        };
        let header = request
            .metadata()
            .get(AUTHORIZATION_KEY)
            .ok_or_else(|| MeshError::Auth("missing authorization metadata".into()))?
            .to_str()
            .map_err(|_| MeshError::Auth("authorization metadata is not text".into()))?;
        authority.validate(parse_bearer(header)?).map(Some)
    }
}

impl Interceptor for TokenGuard {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        match self.check(&request) {
            Ok(Some(claims)) => {
                request.extensions_mut().insert(claims);
                Ok(request)
            }
            Ok(None) => Ok(request),
            Err(err) => {
                warn!(remote = ?request.remote_addr(), error = %err, "rejected peer call");
                Err(to_status(&err))
            }
        }
    }
}
