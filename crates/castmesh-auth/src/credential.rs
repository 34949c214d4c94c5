//! Per-connection credential provider
//!
//! Each peer connection owns one provider. Every outgoing call asks it for
//! an `authorization` value; the token is reissued once it is within the
//! refresh margin of its expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use castmesh_core::{unix_now, MeshResult};

use crate::{bearer, TokenAuthority};

/// Subject used in peer tokens
pub const DEFAULT_SUBJECT: &str = "castmesh-peer";

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Reissue this long before expiry
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Current token of one peer link.
///
/// Token and expiry are always replaced together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: i64,
}

impl Credential {
    fn needs_refresh(&self, now: i64, margin: i64) -> bool {
        self.token.is_empty() || self.expires_at.saturating_sub(margin) < now
    }
}

/// Supplies a fresh bearer token for every outgoing call
pub struct CredentialProvider {
    authority: TokenAuthority,
    subject: String,
    ttl: Duration,
    refresh_margin: i64,
    current: RwLock<Credential>,
    refreshes: AtomicU64,
}

impl CredentialProvider {
    pub fn new(authority: TokenAuthority, subject: impl Into<String>, ttl: Duration, refresh_margin: Duration) -> Self {
        CredentialProvider {
            authority,
            subject: subject.into(),
            ttl,
            refresh_margin: refresh_margin.as_secs().min(i64::MAX as u64) as i64,
            current: RwLock::new(Credential::default()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Provider with the default subject, one-hour tokens and a five-minute margin
    pub fn with_defaults(authority: TokenAuthority) -> Self {
        Self::new(authority, DEFAULT_SUBJECT, DEFAULT_TOKEN_TTL, DEFAULT_REFRESH_MARGIN)
    }

    /// `authorization` header value for the next call
    pub fn authorization(&self) -> MeshResult<String> {
        self.authorization_at(unix_now())
    }

    /// `authorization` header value as if the current time were `now`.
    ///
    /// Issuance errors are returned as-is; there is no fallback token.
    pub fn authorization_at(&self, now: i64) -> MeshResult<String> {
        {
            let current = self.current.read();
            if !current.needs_refresh(now, self.refresh_margin) {
                return Ok(bearer(&current.token));
            }
        }

        let mut current = self.current.write();
        // Another caller may have refreshed while we waited for the write lock
        if current.needs_refresh(now, self.refresh_margin) {
            let issued = self.authority.issue_at(&self.subject, self.ttl, now)?;
            *current = Credential {
                token: issued.token,
                expires_at: issued.expires_at,
            };
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            info!(subject = %self.subject, expires_at = current.expires_at, "token refreshed");
        }
        Ok(bearer(&current.token))
    }

    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    /// Snapshot of the current credential
    pub fn credential(&self) -> Credential {
        self.current.read().clone()
    }

    /// Number of tokens issued so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("subject", &self.subject)
            .field("expires_at", &self.current.read().expires_at)
            .finish_non_exhaustive()
    }
}
