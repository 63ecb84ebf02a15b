//! Computes a user's merged permission set from the role registry.

use std::sync::Arc;
use tracing::warn;

use super::models::{Locale, MergedPermissions, OperationSet, ResourceId, Role, RoleSlug};
use super::registry::RoleRegistry;
use super::user::{RoleBearing, User, UserId};

/// Pure, total resolution of role assignments.
///
/// The result is a union, so it is idempotent and monotonic in the set of
/// assigned roles.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    registry: Arc<RoleRegistry>,
}

impl PermissionResolver {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Resolve the collection-level permission set.
    ///
    /// Admins and inactive users resolve to the empty set: the gate handles
    /// both before consulting it. Per-locale assignments contribute across
    /// all locales, and each locale's own grants are kept alongside so
    /// locale-targeted decisions read from the same snapshot. Document-level
    /// grants are never folded in.
    pub fn resolve(&self, user: &User) -> MergedPermissions {
        if user.is_admin() || user.is_inactive() {
            return MergedPermissions::empty();
        }
        let mut merged = self.resolve_roles(user.id(), user.assigned_roles());
        if user.assigns_per_locale() {
            for locale in user.assigned_locales() {
                let roles = user.roles_for_locale(locale);
                if roles.is_empty() {
                    merged.absorb_in_locale(locale.clone(), None);
                }
                for slug in roles {
                    merged.absorb_in_locale(locale.clone(), self.role(user.id(), slug));
                }
            }
        }
        merged
    }

    /// Union of the named roles. Unknown slugs contribute nothing.
    pub fn resolve_roles<'a>(
        &self,
        user_id: &UserId,
        slugs: impl IntoIterator<Item = &'a RoleSlug>,
    ) -> MergedPermissions {
        let mut merged = MergedPermissions::empty();
        for role in slugs.into_iter().filter_map(|slug| self.role(user_id, slug)) {
            merged.absorb(role);
        }
        merged
    }

    /// Operations on `resource` granted by roles assigned for `locale`.
    ///
    /// Flat assignments apply to every locale.
    pub fn locale_grants(
        &self,
        user: &User,
        resource: ResourceId,
        locale: &Locale,
    ) -> OperationSet {
        self.resolve(user).get_in_locale(resource, locale)
    }

    fn role(&self, user_id: &UserId, slug: &RoleSlug) -> Option<&Role> {
        let role = self.registry.lookup(slug);
        if role.is_none() {
            warn!(user_id = %user_id, role = %slug, "Ignoring unknown role assigned to user");
        }
        role
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
