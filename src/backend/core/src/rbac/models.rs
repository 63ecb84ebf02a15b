//! RBAC data models: operations, resources, roles and the merged permission set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::project::ProjectSlug;

/// Failure to parse one of the closed enumerations from its slug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseSlugError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseSlugError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed role identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSlug(pub String);

impl RoleSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoleSlug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoleSlug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Content locale, normalised to a lowercase tag (`fr`, `de`, `pt-br`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_ascii_lowercase().replace('_', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Locale {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Locale {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Operation
// ═══════════════════════════════════════════════════════════════════════════════

/// An action a user may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Locale-targeted write; narrower than `Update`.
    Translate,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Translate,
    ];

    /// Operations that make a resource manageable in the admin UI.
    pub const WRITE: [Operation; 3] = [Self::Create, Self::Update, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Translate => "translate",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ParseSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseSlugError::new("operation", s))
    }
}

/// A set of operations stored as a bitmask.
///
/// Serialized as an ordered array of operation names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationSet(u8);

impl OperationSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::of(&Operation::ALL)
    }

    pub fn of(ops: &[Operation]) -> Self {
        ops.iter().fold(Self::empty(), |set, op| set.with(*op))
    }

    pub const fn with(self, op: Operation) -> Self {
        Self(self.0 | op.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Literal membership, without any implication between operations.
    pub const fn contains(self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    /// Membership with the collection-level implication `update ⇒ translate`.
    pub const fn allows(self, op: Operation) -> bool {
        match op {
            Operation::Translate => {
                self.contains(Operation::Translate) || self.contains(Operation::Update)
            }
            _ => self.contains(op),
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every operation in `self` is also in `other`.
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::ALL.into_iter().filter(move |op| self.contains(*op))
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(ops: Vec<Operation>) -> Self {
        Self::of(&ops)
    }
}

impl From<OperationSet> for Vec<Operation> {
    fn from(set: OperationSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for OperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|op| op.as_str()).collect();
        write!(f, "{}", names.join(","))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource
// ═══════════════════════════════════════════════════════════════════════════════

/// The closed set of managed collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceId {
    Articles,
    Pages,
    Media,
    Categories,
    Tags,
    Authors,
    Navigation,
    Redirects,
    Users,
    Settings,
}

impl ResourceId {
    pub const COUNT: usize = 10;

    pub const ALL: [ResourceId; Self::COUNT] = [
        Self::Articles,
        Self::Pages,
        Self::Media,
        Self::Categories,
        Self::Tags,
        Self::Authors,
        Self::Navigation,
        Self::Redirects,
        Self::Users,
        Self::Settings,
    ];

    /// Editorial content collections.
    pub const CONTENT: [ResourceId; 5] = [
        Self::Articles,
        Self::Pages,
        Self::Media,
        Self::Categories,
        Self::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Articles => "articles",
            Self::Pages => "pages",
            Self::Media => "media",
            Self::Categories => "categories",
            Self::Tags => "tags",
            Self::Authors => "authors",
            Self::Navigation => "navigation",
            Self::Redirects => "redirects",
            Self::Users => "users",
            Self::Settings => "settings",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = ParseSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseSlugError::new("resource", s))
    }
}

/// Fixed map from every [`ResourceId`] to its granted operations.
///
/// Serialized as `{ "<resource>": ["op", ...] }`, omitting empty entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ResourceId, OperationSet>",
    into = "BTreeMap<ResourceId, OperationSet>"
)]
pub struct ResourcePermissions([OperationSet; ResourceId::COUNT]);

impl ResourcePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: ResourceId) -> OperationSet {
        self.0[resource.index()]
    }

    /// Builder-style grant used when declaring roles.
    pub fn grant(mut self, resource: ResourceId, ops: &[Operation]) -> Self {
        self.insert(resource, OperationSet::of(ops));
        self
    }

    /// Grant the same operations on several resources.
    pub fn grant_all(mut self, resources: &[ResourceId], ops: &[Operation]) -> Self {
        for resource in resources {
            self.insert(*resource, OperationSet::of(ops));
        }
        self
    }

    pub(crate) fn insert(&mut self, resource: ResourceId, ops: OperationSet) {
        let slot = &mut self.0[resource.index()];
        *slot = slot.union(ops);
    }

    pub(crate) fn merge(&mut self, other: &ResourcePermissions) {
        for (slot, ops) in self.0.iter_mut().zip(other.0.iter()) {
            *slot = slot.union(*ops);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|ops| ops.is_empty())
    }

    /// Non-empty entries in resource order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, OperationSet)> + '_ {
        ResourceId::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, ops)| !ops.is_empty())
    }
}

impl From<BTreeMap<ResourceId, OperationSet>> for ResourcePermissions {
    fn from(map: BTreeMap<ResourceId, OperationSet>) -> Self {
        let mut perms = Self::new();
        for (resource, ops) in map {
            perms.insert(resource, ops);
        }
        perms
    }
}

impl From<ResourcePermissions> for BTreeMap<ResourceId, OperationSet> {
    fn from(perms: ResourcePermissions) -> Self {
        perms.iter().collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Merged Permissions
// ═══════════════════════════════════════════════════════════════════════════════

/// The resolved permission set cached on a user record and embedded in
/// session tokens.
///
/// Always replaced wholesale. There are no public mutators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPermissions {
    #[serde(flatten)]
    resources: ResourcePermissions,

    /// Union of every assigned role's bound project.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    projects: BTreeSet<ProjectSlug>,

    /// Grants of the roles assigned for each locale. Present only for
    /// per-locale assignments; empty means locale-independent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    locales: BTreeMap<Locale, ResourcePermissions>,
}

impl MergedPermissions {
    /// The deny-all set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_parts(resources: ResourcePermissions, projects: BTreeSet<ProjectSlug>) -> Self {
        Self {
            resources,
            projects,
            locales: BTreeMap::new(),
        }
    }

    /// True when grants were resolved per locale.
    pub fn is_locale_scoped(&self) -> bool {
        !self.locales.is_empty()
    }

    /// Operations on `resource` granted for `locale`.
    ///
    /// Locale-independent sets grant the collection-level operations in
    /// every locale. A locale with no assigned roles grants nothing.
    pub fn get_in_locale(&self, resource: ResourceId, locale: &Locale) -> OperationSet {
        if !self.is_locale_scoped() {
            return self.get(resource);
        }
        self.locales
            .get(locale)
            .map(|grants| grants.get(resource))
            .unwrap_or_default()
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.keys()
    }

    pub fn get(&self, resource: ResourceId) -> OperationSet {
        self.resources.get(resource)
    }

    /// Collection-level check, applying `update ⇒ translate`.
    pub fn allows(&self, resource: ResourceId, op: Operation) -> bool {
        self.get(resource).allows(op)
    }

    pub fn resources(&self) -> &ResourcePermissions {
        &self.resources
    }

    pub fn projects(&self) -> &BTreeSet<ProjectSlug> {
        &self.projects
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.projects.is_empty()
    }

    pub(crate) fn absorb(&mut self, role: &Role) {
        self.resources.merge(&role.permissions);
        if let Some(project) = role.bound_project() {
            self.projects.insert(project);
        }
    }

    /// Record one locale's grants. Repeated calls for a locale union.
    pub(crate) fn absorb_in_locale(&mut self, locale: Locale, role: Option<&Role>) {
        let grants = self.locales.entry(locale).or_default();
        if let Some(role) = role {
            grants.merge(&role.permissions);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// How a role relates to the tenant model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleScope {
    /// Not bound to any project.
    #[default]
    Global,
    /// Grants access only within the named project.
    Manager { project: ProjectSlug },
    /// One-to-one with a project; the role slug is the project slug.
    Project,
}

/// A named bundle of per-resource operation grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub slug: RoleSlug,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: ResourcePermissions,
    #[serde(default)]
    pub scope: RoleScope,
}

impl Role {
    pub fn new(
        slug: impl Into<RoleSlug>,
        label: impl Into<String>,
        description: impl Into<String>,
        permissions: ResourcePermissions,
    ) -> Self {
        Self {
            slug: slug.into(),
            label: label.into(),
            description: description.into(),
            permissions,
            scope: RoleScope::Global,
        }
    }

    /// Bind this role to a single project as a manager role.
    pub fn managing(mut self, project: ProjectSlug) -> Self {
        self.scope = RoleScope::Manager { project };
        self
    }

    /// Mark this role as the project role named by its own slug.
    pub fn project_role(mut self) -> Self {
        self.scope = RoleScope::Project;
        self
    }

    /// The project this role grants access within, if any.
    pub fn bound_project(&self) -> Option<ProjectSlug> {
        match self.scope {
            RoleScope::Global => None,
            RoleScope::Manager { project } => Some(project),
            RoleScope::Project => self.slug.as_str().parse().ok(),
        }
    }

    pub fn grants(&self, resource: ResourceId) -> OperationSet {
        self.permissions.get(resource)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse() {
        assert_eq!("translate".parse::<Operation>().unwrap(), Operation::Translate);
        let err = "publish".parse::<Operation>().unwrap_err();
        assert_eq!(err.kind, "operation");
    }

    #[test]
    fn test_update_implies_translate_only() {
        let set = OperationSet::of(&[Operation::Update]);
        assert!(set.allows(Operation::Translate));
        assert!(!set.contains(Operation::Translate));

        let translate = OperationSet::of(&[Operation::Translate]);
        assert!(!translate.allows(Operation::Update));
        assert!(!translate.allows(Operation::Create));
        assert!(!translate.allows(Operation::Delete));
    }

    #[test]
    fn test_operation_set_serializes_as_ordered_array() {
        let set = OperationSet::of(&[Operation::Update, Operation::Read]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["read","update"]"#);

        let parsed: OperationSet = serde_json::from_str(r#"["delete","delete"]"#).unwrap();
        assert_eq!(parsed, OperationSet::of(&[Operation::Delete]));
    }

    #[test]
    fn test_merged_permissions_wire_shape() {
        let mut projects = BTreeSet::new();
        projects.insert(ProjectSlug::Alpha);
        let merged = MergedPermissions::from_parts(
            ResourcePermissions::new().grant(ResourceId::Articles, &[Operation::Read]),
            projects,
        );

        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "articles": ["read"], "projects": ["alpha"] })
        );

        let back: MergedPermissions = serde_json::from_value(value).unwrap();
        assert_eq!(back, merged);
    }

    #[test]
    fn test_merged_permissions_omits_empty_projects() {
        let merged = MergedPermissions::empty();
        assert_eq!(serde_json::to_string(&merged).unwrap(), "{}");
    }

    #[test]
    fn test_unknown_resource_key_rejected() {
        let result = serde_json::from_str::<MergedPermissions>(r#"{"widgets": ["read"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_bound_project() {
        let global = Role::new("viewer", "Viewer", "", ResourcePermissions::new());
        assert_eq!(global.bound_project(), None);

        let manager = global.clone().managing(ProjectSlug::Beta);
        assert_eq!(manager.bound_project(), Some(ProjectSlug::Beta));

        let project = Role::new("gamma", "Gamma", "", ResourcePermissions::new()).project_role();
        assert_eq!(project.bound_project(), Some(ProjectSlug::Gamma));
    }

    #[test]
    fn test_locale_normalisation() {
        assert_eq!(Locale::new(" FR "), Locale::new("fr"));
        assert_eq!(Locale::new("pt_BR").as_str(), "pt-br");
    }
}
