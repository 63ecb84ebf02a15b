//! Read-through permission cache stored on the user record.
//!
//! The cache is not time based. Every time a record is read back from the
//! store its permission set is recomputed and replaced wholesale, so writers
//! that change a role assignment never invalidate anything explicitly. The
//! session snapshot in [`super::session`] is a separate, longer-lived copy.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::MergedPermissions;
use super::policy::PolicyError;
use super::resolver::PermissionResolver;
use super::user::{User, UserId};
use crate::error::{LecternError, Result};
use crate::telemetry::metrics::AuthzMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Cached Permissions
// ═══════════════════════════════════════════════════════════════════════════════

/// State of the permission field on a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CachedPermissions {
    /// Never computed, or dropped by the store.
    #[default]
    Absent,
    Resolved(MergedPermissions),
    /// Present but undecodable. Authorization against it fails closed.
    Malformed(String),
}

impl CachedPermissions {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn resolved(&self) -> Option<&MergedPermissions> {
        match self {
            Self::Resolved(p) => Some(p),
            _ => None,
        }
    }
}

impl Serialize for CachedPermissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(p) => p.serialize(serializer),
            Self::Absent | Self::Malformed(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CachedPermissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(serde_json::Value::Null) => Self::Absent,
            Some(value) => match serde_json::from_value::<MergedPermissions>(value) {
                Ok(p) => Self::Resolved(p),
                Err(e) => Self::Malformed(e.to_string()),
            },
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission Cache
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PermissionCache {
    resolver: Arc<PermissionResolver>,
}

impl PermissionCache {
    pub fn new(resolver: Arc<PermissionResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Refresh checkpoint: recompute and replace the cached set.
    pub fn materialize(&self, mut user: User) -> User {
        let merged = self.resolver.resolve(&user);
        debug!(
            user_id = %user.id(),
            projects = merged.projects().len(),
            "Refreshed permission cache"
        );
        user.replace_permissions(CachedPermissions::Resolved(merged));
        AuthzMetrics::cache_refresh();
        user
    }

    /// The permission set to authorize against.
    ///
    /// Falls back to resolving on the fly when nothing is cached. A malformed
    /// cache is an error; callers must deny.
    pub fn permissions_for<'a>(
        &self,
        user: &'a User,
    ) -> std::result::Result<Cow<'a, MergedPermissions>, PolicyError> {
        match user.cached_permissions() {
            CachedPermissions::Resolved(p) => Ok(Cow::Borrowed(p)),
            CachedPermissions::Absent => Ok(Cow::Owned(self.resolver.resolve(user))),
            CachedPermissions::Malformed(reason) => Err(PolicyError::MalformedCache {
                user: user.id().to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Storage Seam
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable user storage, owned by the surrounding application.
///
/// Implementations must never return a torn write; last writer wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch(&self, id: &UserId) -> Result<Option<User>>;

    async fn save(&self, user: User) -> Result<()>;
}

/// DashMap-backed store for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id().clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn fetch(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn save(&self, user: User) -> Result<()> {
        self.insert(user);
        Ok(())
    }
}

/// Reads users through the store and refreshes their permission cache.
pub struct UserLoader<S> {
    store: S,
    cache: PermissionCache,
}

impl<S: UserStore> UserLoader<S> {
    pub fn new(store: S, cache: PermissionCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load(&self, id: &UserId) -> Result<Option<User>> {
        let user = self.store.fetch(id).await?;
        if user.is_none() {
            warn!(user_id = %id, "User record not found");
        }
        Ok(user.map(|u| self.cache.materialize(u)))
    }

    pub async fn load_required(&self, id: &UserId) -> Result<User> {
        self.load(id)
            .await?
            .ok_or_else(|| LecternError::not_found("user", id.as_str()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::{Operation, ResourceId};
    use crate::rbac::project::ProjectSlug;
    use crate::rbac::registry::RoleRegistry;
    use crate::rbac::user::{PrivilegedUser, UserKind};

    fn cache() -> PermissionCache {
        let registry = Arc::new(RoleRegistry::builtin().unwrap());
        PermissionCache::new(Arc::new(PermissionResolver::new(registry)))
    }

    #[test]
    fn test_malformed_payload_is_captured_not_rejected() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u1",
            "permissions": { "articles": "everything" },
        }))
        .unwrap();

        assert!(matches!(user.cached_permissions(), CachedPermissions::Malformed(_)));
        assert!(cache().permissions_for(&user).is_err());
    }

    #[test]
    fn test_absent_cache_falls_back_to_resolver() {
        let user: User = PrivilegedUser::new("u1", UserKind::Standard)
            .with_roles(["alpha"])
            .into();
        let perms = cache().permissions_for(&user).unwrap();
        assert!(perms.allows(ResourceId::Articles, Operation::Create));
        assert!(matches!(perms, Cow::Owned(_)));
    }

    #[test]
    fn test_materialize_replaces_stale_cache() {
        let user: User = PrivilegedUser::new("u1", UserKind::Standard)
            .with_roles(["beta"])
            .into();
        let cache = cache();
        let mut user = cache.materialize(user);
        assert!(
            user.cached_permissions().resolved().unwrap().projects().contains(&ProjectSlug::Beta)
        );

        if let User::Privileged(ref mut p) = user {
            p.roles = crate::rbac::user::RoleAssignment::Flat(vec!["gamma".into()]);
        }
        let user = cache.materialize(user);
        let projects = user.cached_permissions().resolved().unwrap().projects();
        assert!(projects.contains(&ProjectSlug::Gamma));
        assert!(!projects.contains(&ProjectSlug::Beta));
    }

    #[tokio::test]
    async fn test_loader_recomputes_on_every_read() {
        let store = InMemoryUserStore::new();
        store.insert(
            PrivilegedUser::new("u1", UserKind::Standard)
                .with_roles(["viewer"])
                .into(),
        );
        let loader = UserLoader::new(store.clone(), cache());

        let first = loader.load_required(&UserId::new("u1")).await.unwrap();
        assert!(!first
            .cached_permissions()
            .resolved()
            .unwrap()
            .allows(ResourceId::Articles, Operation::Update));

        store
            .save(PrivilegedUser::new("u1", UserKind::Standard).with_roles(["editor"]).into())
            .await
            .unwrap();

        let second = loader.load_required(&UserId::new("u1")).await.unwrap();
        assert!(second
            .cached_permissions()
            .resolved()
            .unwrap()
            .allows(ResourceId::Articles, Operation::Update));
    }

    #[tokio::test]
    async fn test_loader_missing_user() {
        let loader = UserLoader::new(InMemoryUserStore::new(), cache());
        assert!(loader.load(&UserId::new("ghost")).await.unwrap().is_none());
        let err = loader.load_required(&UserId::new("ghost")).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::RecordNotFound);
    }

    struct OfflineStore;

    #[async_trait]
    impl UserStore for OfflineStore {
        async fn fetch(&self, _id: &UserId) -> Result<Option<User>> {
            Err(LecternError::storage("connection refused"))
        }

        async fn save(&self, _user: User) -> Result<()> {
            Err(LecternError::storage("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_loader_propagates_store_failure() {
        let loader = UserLoader::new(OfflineStore, cache());
        let err = loader.load(&UserId::new("u1")).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::StorageError);
        assert_eq!(err.http_status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
