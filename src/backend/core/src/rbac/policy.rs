//! Authorization gate.
//!
//! Answers "may this user perform this operation on this resource (and
//! optionally this document, in this locale)?". Decisions are pure and
//! synchronous. Any internal failure denies.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::cache::PermissionCache;
use super::models::{Locale, Operation, ResourceId};
use super::registry::RoleRegistry;
use super::resolver::PermissionResolver;
use super::user::User;
use crate::telemetry::metrics::AuthzMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from the policy engine.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Permission cache for user {user} is malformed: {reason}")]
    MalformedCache { user: String, reason: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason.
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Request
// ═══════════════════════════════════════════════════════════════════════════════

/// One authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub resource: ResourceId,
    pub operation: Operation,
    /// Target document, for document-level grants.
    pub document_id: Option<String>,
    /// Target content locale, for `translate`.
    pub locale: Option<Locale>,
}

impl AccessRequest {
    pub fn new(resource: ResourceId, operation: Operation) -> Self {
        Self {
            resource,
            operation,
            document_id: None,
            locale: None,
        }
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gate
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    cache: PermissionCache,
}

impl AuthorizationGate {
    pub fn new(cache: PermissionCache) -> Self {
        Self { cache }
    }

    /// Build the resolver and cache over a registry.
    pub fn from_registry(registry: Arc<RoleRegistry>) -> Self {
        Self::new(PermissionCache::new(Arc::new(PermissionResolver::new(registry))))
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// `hasPermission(user, resource, operation, document?)`.
    pub fn has_permission(
        &self,
        user: Option<&User>,
        resource: ResourceId,
        operation: Operation,
        document_id: Option<&str>,
    ) -> bool {
        let mut request = AccessRequest::new(resource, operation);
        request.document_id = document_id.map(str::to_string);
        self.check(user, &request).is_allowed()
    }

    /// Like [`has_permission`](Self::has_permission) with a full request,
    /// including the target locale.
    pub fn has_permission_in(&self, user: Option<&User>, request: &AccessRequest) -> bool {
        self.check(user, request).is_allowed()
    }

    /// Evaluate a request. Internal errors become a deny.
    pub fn check(&self, user: Option<&User>, request: &AccessRequest) -> PolicyDecision {
        let decision = match user {
            None => PolicyDecision::Deny("Anonymous callers are denied".to_string()),
            Some(user) => match self.evaluate(user, request) {
                Ok(decision) => decision,
                Err(e) => {
                    error!(
                        user_id = %user.id(),
                        resource = %request.resource,
                        operation = %request.operation,
                        error = %e,
                        "Authorization failed internally, denying"
                    );
                    AuthzMetrics::internal_error(request.resource);
                    PolicyDecision::Deny(format!("Internal authorization error: {}", e))
                }
            },
        };

        AuthzMetrics::decision(request.resource, request.operation, decision.is_allowed());

        decision
    }

    /// Allow if ANY of the operations is allowed on the resource.
    pub fn check_any(
        &self,
        user: Option<&User>,
        resource: ResourceId,
        operations: &[Operation],
    ) -> PolicyDecision {
        for op in operations {
            if self.check(user, &AccessRequest::new(resource, *op)).is_allowed() {
                return PolicyDecision::Allow;
            }
        }
        PolicyDecision::Deny(format!(
            "None of the required operations are permitted on {}",
            resource
        ))
    }

    fn evaluate(
        &self,
        user: &User,
        request: &AccessRequest,
    ) -> Result<PolicyDecision, PolicyError> {
        let AccessRequest {
            resource,
            operation,
            ..
        } = *request;

        if user.is_admin() {
            return Ok(PolicyDecision::Allow);
        }

        if user.is_inactive() {
            return Ok(PolicyDecision::Deny(format!("User {} is inactive", user.id())));
        }

        if let Some(document_id) = request.document_id.as_deref() {
            if user
                .custom_resource_access()
                .iter()
                .any(|grant| grant.matches(resource, document_id))
            {
                debug!(
                    user_id = %user.id(),
                    resource = %resource,
                    document_id = document_id,
                    "Granted by custom resource access"
                );
                return Ok(PolicyDecision::Allow);
            }
        }

        let permissions = self.cache.permissions_for(user)?;
        let granted = permissions.get(resource);

        if operation == Operation::Translate {
            if !granted.allows(Operation::Translate) {
                return Ok(deny(user, request));
            }
            // Locale grants come from the same snapshot as the union, so a
            // restored session keeps its login-time locales.
            if let Some(locale) = request.locale.as_ref() {
                if !permissions.get_in_locale(resource, locale).allows(Operation::Translate) {
                    return Ok(PolicyDecision::Deny(format!(
                        "User {} holds no role for locale {} that can translate {}",
                        user.id(),
                        locale,
                        resource
                    )));
                }
            }
            return Ok(PolicyDecision::Allow);
        }

        if granted.contains(operation) {
            Ok(PolicyDecision::Allow)
        } else {
            Ok(deny(user, request))
        }
    }
}

fn deny(user: &User, request: &AccessRequest) -> PolicyDecision {
    PolicyDecision::Deny(format!(
        "User {} may not {} {}",
        user.id(),
        request.operation,
        request.resource
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::user::{PrivilegedUser, RestrictedUser, UserKind};

    fn gate() -> AuthorizationGate {
        AuthorizationGate::from_registry(Arc::new(RoleRegistry::builtin().unwrap()))
    }

    fn standard(roles: &[&str]) -> User {
        PrivilegedUser::new("u1", UserKind::Standard)
            .with_roles(roles.iter().copied())
            .into()
    }

    #[test]
    fn test_anonymous_denied() {
        assert!(!gate().has_permission(None, ResourceId::Articles, Operation::Read, None));
    }

    #[test]
    fn test_admin_allowed_everything() {
        let admin: User = PrivilegedUser::new("root", UserKind::Admin).into();
        let gate = gate();
        for resource in ResourceId::ALL {
            for op in Operation::ALL {
                assert!(gate.has_permission(Some(&admin), resource, op, None));
            }
        }
    }

    #[test]
    fn test_inactive_denied_even_with_custom_access() {
        let user: User = PrivilegedUser::new("gone", UserKind::Inactive)
            .with_roles(["viewer"])
            .with_custom_access(ResourceId::Pages, "home")
            .into();
        let gate = gate();
        assert!(!gate.has_permission(Some(&user), ResourceId::Pages, Operation::Read, None));
        assert!(
            !gate.has_permission(Some(&user), ResourceId::Pages, Operation::Update, Some("home"))
        );
    }

    #[test]
    fn test_custom_access_is_additive() {
        let user: User = PrivilegedUser::new("u2", UserKind::Standard)
            .with_custom_access(ResourceId::Pages, "home")
            .into();
        let gate = gate();
        assert!(
            gate.has_permission(Some(&user), ResourceId::Pages, Operation::Delete, Some("home"))
        );
        assert!(
            !gate.has_permission(Some(&user), ResourceId::Pages, Operation::Delete, Some("about"))
        );
        assert!(!gate.has_permission(Some(&user), ResourceId::Pages, Operation::Delete, None));
    }

    #[test]
    fn test_role_permissions() {
        let user = standard(&["editor"]);
        let gate = gate();
        assert!(gate.has_permission(Some(&user), ResourceId::Articles, Operation::Update, None));
        assert!(!gate.has_permission(Some(&user), ResourceId::Articles, Operation::Delete, None));
        assert!(!gate.has_permission(Some(&user), ResourceId::Settings, Operation::Read, None));
    }

    #[test]
    fn test_update_covers_translate_but_not_reverse() {
        let gate = gate();
        let editor = standard(&["editor"]);
        assert!(
            gate.has_permission(Some(&editor), ResourceId::Articles, Operation::Translate, None)
        );

        let translator = standard(&["translator"]);
        assert!(
            gate.has_permission(Some(&translator), ResourceId::Articles, Operation::Translate, None)
        );
        assert!(
            !gate.has_permission(Some(&translator), ResourceId::Articles, Operation::Update, None)
        );
        assert!(
            !gate.has_permission(Some(&translator), ResourceId::Articles, Operation::Create, None)
        );
        assert!(
            !gate.has_permission(Some(&translator), ResourceId::Articles, Operation::Delete, None)
        );
    }

    #[test]
    fn test_translate_scoped_to_assigned_locale() {
        let user: User = PrivilegedUser::new("t1", UserKind::Standard)
            .with_locale_roles("fr", ["translator"])
            .into();
        let gate = gate();
        let request = AccessRequest::new(ResourceId::Articles, Operation::Translate);

        assert!(gate.has_permission_in(Some(&user), &request.clone().with_locale("fr")));
        assert!(!gate.has_permission_in(Some(&user), &request.clone().with_locale("de")));
        // Without a target locale the collection-level union applies.
        assert!(gate.has_permission_in(Some(&user), &request));
    }

    #[test]
    fn test_flat_assignment_translates_in_any_locale() {
        let user = standard(&["translator"]);
        let request = AccessRequest::new(ResourceId::Pages, Operation::Translate).with_locale("de");
        assert!(gate().has_permission_in(Some(&user), &request));
    }

    #[test]
    fn test_malformed_cache_fails_closed() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u3",
            "roles": ["alpha-manager"],
            "permissions": ["not", "a", "map"],
        }))
        .unwrap();
        let gate = gate();
        let request = AccessRequest::new(ResourceId::Articles, Operation::Read);
        let decision = gate.check(Some(&user), &request);
        assert!(decision.is_denied());
    }

    #[test]
    fn test_restricted_user() {
        let user: User = RestrictedUser::new("r1", vec!["beta".into()]).into();
        let gate = gate();
        assert!(gate.has_permission(Some(&user), ResourceId::Media, Operation::Create, None));
        assert!(!gate.has_permission(Some(&user), ResourceId::Media, Operation::Delete, None));
    }

    #[test]
    fn test_check_any() {
        let viewer = standard(&["viewer"]);
        let gate = gate();

        assert!(gate
            .check_any(Some(&viewer), ResourceId::Tags, &Operation::WRITE)
            .is_denied());
        assert!(gate
            .check_any(Some(&viewer), ResourceId::Tags, &[Operation::Delete, Operation::Read])
            .is_allowed());
    }
}
