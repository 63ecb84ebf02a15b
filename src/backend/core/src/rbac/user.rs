//! User records as seen by the policy engine.
//!
//! Two kinds exist. Privileged users carry a kind, a role assignment that may
//! be split per locale, document-level grants and a project selection.
//! Restricted users carry only project-bound role slugs.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use super::cache::CachedPermissions;
use super::models::{Locale, ResourceId, RoleSlug};
use super::project::ProjectSlug;

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Account state of a privileged user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Inactive,
    #[default]
    Standard,
    /// Bypasses every role and permission check.
    Admin,
}

/// Role slugs assigned to a user, either flat or keyed by locale.
///
/// Locale keys are normalised on decode. Keys that normalise to the same tag
/// (`"FR"` and `"fr"`) are merged, so no assignment is lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoleAssignment {
    Flat(Vec<RoleSlug>),
    PerLocale(BTreeMap<Locale, Vec<RoleSlug>>),
}

impl<'de> Deserialize<'de> for RoleAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flat(Vec<RoleSlug>),
            PerLocale(BTreeMap<String, Vec<RoleSlug>>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flat(slugs) => Self::Flat(slugs),
            Raw::PerLocale(raw) => {
                let mut by_locale: BTreeMap<Locale, Vec<RoleSlug>> = BTreeMap::new();
                for (tag, slugs) in raw {
                    let locale = Locale::new(&tag);
                    if by_locale.contains_key(&locale) {
                        warn!(
                            key = %tag,
                            locale = %locale,
                            "Merging role assignments for locale keys with the same tag"
                        );
                    }
                    by_locale.entry(locale).or_default().extend(slugs);
                }
                Self::PerLocale(by_locale)
            }
        })
    }
}

impl Default for RoleAssignment {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl RoleAssignment {
    /// Every assigned slug, across all locales.
    pub fn all(&self) -> Vec<&RoleSlug> {
        match self {
            Self::Flat(slugs) => slugs.iter().collect(),
            Self::PerLocale(by_locale) => by_locale.values().flatten().collect(),
        }
    }

    /// Slugs that apply when writing content in `locale`.
    pub fn for_locale(&self, locale: &Locale) -> Vec<&RoleSlug> {
        match self {
            Self::Flat(slugs) => slugs.iter().collect(),
            Self::PerLocale(by_locale) => by_locale
                .get(locale)
                .map(|slugs| slugs.iter().collect())
                .unwrap_or_default(),
        }
    }

    /// Locales with an explicit assignment. Empty for flat assignments.
    pub fn locales(&self) -> Vec<&Locale> {
        match self {
            Self::Flat(_) => Vec::new(),
            Self::PerLocale(by_locale) => by_locale.keys().collect(),
        }
    }

    pub fn is_per_locale(&self) -> bool {
        matches!(self, Self::PerLocale(_))
    }
}

/// Document-level grant, independent of roles and always additive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomResourceAccess {
    pub resource: ResourceId,
    pub document_id: String,
}

impl CustomResourceAccess {
    pub fn new(resource: ResourceId, document_id: impl Into<String>) -> Self {
        Self {
            resource,
            document_id: document_id.into(),
        }
    }

    pub fn matches(&self, resource: ResourceId, document_id: &str) -> bool {
        self.resource == resource && self.document_id == document_id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Capabilities
// ═══════════════════════════════════════════════════════════════════════════════

/// Anything that carries a role assignment.
pub trait RoleBearing {
    fn assigned_roles(&self) -> Vec<&RoleSlug>;

    fn roles_for_locale(&self, locale: &Locale) -> Vec<&RoleSlug>;

    fn assigns_per_locale(&self) -> bool {
        false
    }

    fn assigned_locales(&self) -> Vec<&Locale> {
        Vec::new()
    }
}

/// Anything that may have a current project selection.
pub trait ProjectScoped {
    fn current_project(&self) -> Option<ProjectSlug>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Privileged User
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivilegedUser {
    pub id: UserId,
    #[serde(default)]
    pub kind: UserKind,
    #[serde(default)]
    pub roles: RoleAssignment,
    #[serde(default)]
    pub custom_resource_access: Vec<CustomResourceAccess>,
    #[serde(default)]
    pub current_project: Option<ProjectSlug>,
    #[serde(default, skip_serializing_if = "CachedPermissions::is_absent")]
    pub(crate) permissions: CachedPermissions,
}

impl PrivilegedUser {
    pub fn new(id: impl Into<UserId>, kind: UserKind) -> Self {
        Self {
            id: id.into(),
            kind,
            roles: RoleAssignment::default(),
            custom_resource_access: Vec::new(),
            current_project: None,
            permissions: CachedPermissions::Absent,
        }
    }

    pub fn with_roles<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleSlug>,
    {
        self.roles = RoleAssignment::Flat(slugs.into_iter().map(Into::into).collect());
        self
    }

    /// Assign roles for one locale, switching to per-locale assignment.
    pub fn with_locale_roles<I, S>(mut self, locale: impl Into<Locale>, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleSlug>,
    {
        let mut by_locale = match self.roles {
            RoleAssignment::PerLocale(map) => map,
            RoleAssignment::Flat(_) => BTreeMap::new(),
        };
        by_locale
            .entry(locale.into())
            .or_default()
            .extend(slugs.into_iter().map(Into::into));
        self.roles = RoleAssignment::PerLocale(by_locale);
        self
    }

    pub fn with_custom_access(
        mut self,
        resource: ResourceId,
        document_id: impl Into<String>,
    ) -> Self {
        self.custom_resource_access
            .push(CustomResourceAccess::new(resource, document_id));
        self
    }

    pub fn with_current_project(mut self, project: ProjectSlug) -> Self {
        self.current_project = Some(project);
        self
    }

    /// Strict comparison against the admin kind.
    pub fn is_admin(&self) -> bool {
        self.kind == UserKind::Admin
    }
}

impl RoleBearing for PrivilegedUser {
    fn assigned_roles(&self) -> Vec<&RoleSlug> {
        self.roles.all()
    }

    fn roles_for_locale(&self, locale: &Locale) -> Vec<&RoleSlug> {
        self.roles.for_locale(locale)
    }

    fn assigns_per_locale(&self) -> bool {
        self.roles.is_per_locale()
    }

    fn assigned_locales(&self) -> Vec<&Locale> {
        self.roles.locales()
    }
}

impl ProjectScoped for PrivilegedUser {
    fn current_project(&self) -> Option<ProjectSlug> {
        self.current_project
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Restricted User
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedUser {
    pub id: UserId,
    #[serde(default)]
    pub roles: Vec<RoleSlug>,
    #[serde(default, skip_serializing_if = "CachedPermissions::is_absent")]
    pub(crate) permissions: CachedPermissions,
}

impl RestrictedUser {
    pub fn new(id: impl Into<UserId>, roles: Vec<RoleSlug>) -> Self {
        Self {
            id: id.into(),
            roles,
            permissions: CachedPermissions::Absent,
        }
    }
}

impl RoleBearing for RestrictedUser {
    fn assigned_roles(&self) -> Vec<&RoleSlug> {
        self.roles.iter().collect()
    }

    fn roles_for_locale(&self, _locale: &Locale) -> Vec<&RoleSlug> {
        self.assigned_roles()
    }
}

impl ProjectScoped for RestrictedUser {
    fn current_project(&self) -> Option<ProjectSlug> {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// User
// ═══════════════════════════════════════════════════════════════════════════════

/// A materialised user record.
///
/// Decoding is strict about known fields and ignores unknown ones, so a stray
/// `"admin": "yes"` on a record never changes its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum User {
    Privileged(PrivilegedUser),
    Restricted(RestrictedUser),
}

impl User {
    pub fn id(&self) -> &UserId {
        match self {
            Self::Privileged(u) => &u.id,
            Self::Restricted(u) => &u.id,
        }
    }

    /// Restricted users have no kind of their own and behave as standard.
    pub fn kind(&self) -> UserKind {
        match self {
            Self::Privileged(u) => u.kind,
            Self::Restricted(_) => UserKind::Standard,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Privileged(u) if u.is_admin())
    }

    pub fn is_inactive(&self) -> bool {
        self.kind() == UserKind::Inactive
    }

    pub fn custom_resource_access(&self) -> &[CustomResourceAccess] {
        match self {
            Self::Privileged(u) => &u.custom_resource_access,
            Self::Restricted(_) => &[],
        }
    }

    pub fn cached_permissions(&self) -> &CachedPermissions {
        match self {
            Self::Privileged(u) => &u.permissions,
            Self::Restricted(u) => &u.permissions,
        }
    }

    /// Replace the cached permission set wholesale.
    pub(crate) fn replace_permissions(&mut self, permissions: CachedPermissions) {
        match self {
            Self::Privileged(u) => u.permissions = permissions,
            Self::Restricted(u) => u.permissions = permissions,
        }
    }
}

impl RoleBearing for User {
    fn assigned_roles(&self) -> Vec<&RoleSlug> {
        match self {
            Self::Privileged(u) => u.assigned_roles(),
            Self::Restricted(u) => u.assigned_roles(),
        }
    }

    fn roles_for_locale(&self, locale: &Locale) -> Vec<&RoleSlug> {
        match self {
            Self::Privileged(u) => u.roles_for_locale(locale),
            Self::Restricted(u) => u.roles_for_locale(locale),
        }
    }

    fn assigns_per_locale(&self) -> bool {
        match self {
            Self::Privileged(u) => u.assigns_per_locale(),
            Self::Restricted(u) => u.assigns_per_locale(),
        }
    }

    fn assigned_locales(&self) -> Vec<&Locale> {
        match self {
            Self::Privileged(u) => u.assigned_locales(),
            Self::Restricted(u) => u.assigned_locales(),
        }
    }
}

impl ProjectScoped for User {
    fn current_project(&self) -> Option<ProjectSlug> {
        match self {
            Self::Privileged(u) => u.current_project(),
            Self::Restricted(u) => u.current_project(),
        }
    }
}

impl From<PrivilegedUser> for User {
    fn from(user: PrivilegedUser) -> Self {
        Self::Privileged(user)
    }
}

impl From<RestrictedUser> for User {
    fn from(user: RestrictedUser) -> Self {
        Self::Restricted(user)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flat_assignment() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u1",
            "kind": "standard",
            "roles": ["editor", "viewer"],
        }))
        .unwrap();

        assert_eq!(user.assigned_roles().len(), 2);
        assert!(!user.assigns_per_locale());
        assert!(user.cached_permissions().is_absent());
    }

    #[test]
    fn test_decode_per_locale_assignment() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u2",
            "roles": { "FR": ["translator"], "de": ["viewer"] },
        }))
        .unwrap();

        assert!(user.assigns_per_locale());
        assert_eq!(user.assigned_roles().len(), 2);
        let fr = user.roles_for_locale(&Locale::new("fr"));
        assert_eq!(fr, vec![&RoleSlug::new("translator")]);
        assert!(user.roles_for_locale(&Locale::new("it")).is_empty());
    }

    #[test]
    fn test_locale_keys_differing_in_case_are_merged() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u2",
            "roles": { "FR": ["translator"], "fr": ["viewer"], "pt_BR": ["viewer"] },
        }))
        .unwrap();

        let mut fr: Vec<_> = user
            .roles_for_locale(&Locale::new("fr"))
            .into_iter()
            .map(RoleSlug::as_str)
            .collect();
        fr.sort_unstable();
        assert_eq!(fr, vec!["translator", "viewer"]);
        assert_eq!(user.assigned_roles().len(), 3);

        let locales: Vec<_> = user.assigned_locales().into_iter().map(Locale::as_str).collect();
        assert_eq!(locales, vec!["fr", "pt-br"]);
    }

    #[test]
    fn test_truthy_admin_field_is_ignored() {
        let user: User = serde_json::from_value(serde_json::json!({
            "type": "privileged",
            "id": "u3",
            "kind": "standard",
            "admin": "yes",
        }))
        .unwrap();

        assert!(!user.is_admin());
        assert_eq!(user.kind(), UserKind::Standard);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = serde_json::from_value::<User>(serde_json::json!({
            "type": "privileged",
            "id": "u4",
            "kind": "superuser",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_restricted_user_has_no_project_or_custom_access() {
        let user: User = RestrictedUser::new("r1", vec!["alpha".into()]).into();
        assert_eq!(user.current_project(), None);
        assert!(user.custom_resource_access().is_empty());
        assert_eq!(user.kind(), UserKind::Standard);
    }

    #[test]
    fn test_custom_access_match() {
        let grant = CustomResourceAccess::new(ResourceId::Pages, "home");
        assert!(grant.matches(ResourceId::Pages, "home"));
        assert!(!grant.matches(ResourceId::Articles, "home"));
        assert!(!grant.matches(ResourceId::Pages, "about"));
    }
}
