//! Wiring: build the registry, gate, visibility policy and session codec from
//! configuration.

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::rbac::{
    AuthorizationGate, MergedPermissions, PrivilegedUser, ProjectScope, RoleRegistry, RoleSlug,
    SessionCodec, User, UserId, UserKind, VisibilityPolicy,
};

/// The assembled access-control engine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AccessEngine {
    registry: Arc<RoleRegistry>,
    gate: AuthorizationGate,
    visibility: VisibilityPolicy,
    scope: ProjectScope,
    default_roles: Vec<RoleSlug>,
}

impl AccessEngine {
    /// Load and validate the catalog, then assemble every component.
    ///
    /// Catalog errors are fatal; callers should abort startup.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(RoleRegistry::from_config(&config.catalog)?);
        let scope = ProjectScope::new(registry.projects().to_vec());
        let gate = AuthorizationGate::from_registry(registry.clone());
        let visibility = VisibilityPolicy::new(
            gate.clone(),
            scope.clone(),
            config.visibility.admin_view_mode,
        );

        info!(
            roles = registry.len(),
            projects = scope.projects().len(),
            admin_view_mode = %config.visibility.admin_view_mode,
            "Access engine ready"
        );

        Ok(Self {
            registry,
            gate,
            visibility,
            scope,
            default_roles: config.catalog.default_roles.clone(),
        })
    }

    /// Engine over the built-in catalog with default settings.
    pub fn builtin() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn visibility(&self) -> &VisibilityPolicy {
        &self.visibility
    }

    pub fn projects(&self) -> &ProjectScope {
        &self.scope
    }

    /// Resolve the merged permission set for a user.
    pub fn resolve(&self, user: &User) -> MergedPermissions {
        self.gate.cache().resolver().resolve(user)
    }

    /// A new standard user holding the configured default roles.
    pub fn provision_user(&self, id: impl Into<UserId>) -> PrivilegedUser {
        PrivilegedUser::new(id, UserKind::Standard).with_roles(self.default_roles.iter().cloned())
    }

    pub fn session_codec(config: &Config) -> Result<SessionCodec> {
        SessionCodec::from_config(&config.session)
    }
}
