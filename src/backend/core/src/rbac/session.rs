//! Session snapshot of a user's merged permissions.
//!
//! The snapshot is signed into the session token at login and restored into
//! the user record on each request, so decisions stay stable for the life of
//! the session even if roles change underneath it. It is a separate copy from
//! the per-read cache and expires with the token.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use super::cache::{CachedPermissions, PermissionCache};
use super::models::MergedPermissions;
use super::project::ProjectSlug;
use super::user::{ProjectScoped, User, UserKind};
use crate::config::SessionConfig;
use crate::error::{ErrorCode, LecternError, Result};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub kind: UserKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_project: Option<ProjectSlug>,
    pub permissions: MergedPermissions,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Signs and verifies session tokens (HS256).
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
    issuer: String,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("issuer", &self.issuer)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8], ttl_secs: u64, issuer: impl Into<String>, leeway_secs: u64) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_issuer(&[issuer.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            issuer,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let secret = config.secret.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| {
            LecternError::new(
                ErrorCode::MissingConfiguration,
                "session.secret is required to sign session tokens",
            )
        })?;
        Ok(Self::new(
            secret.as_bytes(),
            config.ttl_secs,
            config.issuer.clone(),
            config.leeway_secs,
        ))
    }

    /// Build claims for a user from the given permission snapshot.
    pub fn issue(&self, user: &User, permissions: MergedPermissions) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: user.id().to_string(),
            kind: user.kind(),
            current_project: user.current_project(),
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
            iss: self.issuer.clone(),
        }
    }

    /// Snapshot the user's current permissions through the cache.
    ///
    /// A malformed cache cannot be snapshotted.
    pub fn issue_from_cache(&self, cache: &PermissionCache, user: &User) -> Result<SessionClaims> {
        let permissions = cache.permissions_for(user).map_err(|e| {
            LecternError::with_internal(
                ErrorCode::MalformedPermissionCache,
                "Permissions could not be resolved for this session",
                e.to_string(),
            )
        })?;
        Ok(self.issue(user, permissions.into_owned()))
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Verify signature, issuer and expiry.
    pub fn decode(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Install the snapshot as the user's permission cache.
    ///
    /// The token must belong to the user.
    pub fn apply(&self, claims: &SessionClaims, mut user: User) -> Result<User> {
        if claims.sub != user.id().as_str() {
            return Err(LecternError::with_internal(
                ErrorCode::InvalidToken,
                "The session token does not belong to this user",
                format!("token subject {} != user {}", claims.sub, user.id()),
            ));
        }
        debug!(
            user_id = %user.id(),
            jti = %claims.jti,
            "Restored permission snapshot from session"
        );
        user.replace_permissions(CachedPermissions::Resolved(claims.permissions.clone()));
        Ok(user)
    }

    /// `decode` then `apply`.
    pub fn restore(&self, token: &str, user: User) -> Result<User> {
        let claims = self.decode(token)?;
        self.apply(&claims, user)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
