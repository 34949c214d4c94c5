//! Token authority
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 over the mesh's shared
//! secret. Any instance holding the secret can both issue and verify them:
//! peers trust each other symmetrically. Tokens and the secret are bearer
//! credentials and must only travel over an encrypted transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use castmesh_core::{unix_now, MeshError, MeshResult};

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm issued or accepted
pub const TOKEN_ALGORITHM: &str = "HS256";

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a peer token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject the token was issued for
    pub sub: String,
    /// Issue time, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
}

/// A freshly minted token and its expiry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and validates tokens for one shared secret
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Arc<[u8]>,
}

impl TokenAuthority {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        TokenAuthority {
            secret: Arc::from(secret.into()),
        }
    }

    /// Bearer tokens are only safe over an encrypted transport
    pub fn requires_transport_security(&self) -> bool {
        true
    }

    /// Issue a token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, ttl: Duration) -> MeshResult<IssuedToken> {
        self.issue_at(subject, ttl, unix_now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, subject: &str, ttl: Duration, now: i64) -> MeshResult<IssuedToken> {
        if self.secret.is_empty() {
            return Err(MeshError::Issuance("shared secret is empty".into()));
        }
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| MeshError::Issuance("token ttl out of range".into()))?;
        if ttl_secs == 0 {
            return Err(MeshError::Issuance("token ttl must be at least one second".into()));
        }

        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.into(),
            typ: "JWT".into(),
        };
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| MeshError::Issuance(format!("header encoding: {e}")))?;
        let claims_json = serde_json::to_vec(&claims)
            .map_err(|e| MeshError::Issuance(format!("claims encoding: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mut mac = self
            .mac()
            .map_err(|e| MeshError::Issuance(format!("signing key: {e}")))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            expires_at: claims.exp,
        })
    }

    /// Validate a token against the shared secret and the current time
    pub fn validate(&self, token: &str) -> MeshResult<TokenClaims> {
        self.validate_at(token, unix_now())
    }

    /// Validate a token as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: i64) -> MeshResult<TokenClaims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MeshError::Auth("malformed token".into()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| MeshError::Auth("malformed token signature".into()))?;

        let mut mac = self
            .mac()
            .map_err(|e| MeshError::Auth(format!("signing key: {e}")))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| MeshError::Auth("token signature mismatch".into()))?;

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(MeshError::Auth(format!(
                "unsupported token algorithm '{}'",
                header.alg
            )));
        }

        let claims: TokenClaims = decode_segment(claims_b64)?;
        if claims.exp <= now {
            return Err(MeshError::TokenExpired(claims.exp));
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(&self.secret)
    }
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority").finish_non_exhaustive()
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> MeshResult<T> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| MeshError::Auth("malformed token segment".into()))?;
    serde_json::from_slice(&raw).map_err(|e| MeshError::Auth(format!("undecodable token segment: {e}")))
}

/// Extract the token from an `authorization` header value.
///
/// The scheme is matched case-insensitively.
pub fn parse_bearer(header: &str) -> MeshResult<&str> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| MeshError::Auth("authorization is not a bearer token".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(MeshError::Auth(format!("unsupported authorization scheme '{scheme}'")));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(MeshError::Auth("empty bearer token".into()));
    }
    Ok(token)
}

/// Format a token as an `authorization` header value
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
