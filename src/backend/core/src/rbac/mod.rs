//! Role-based access control and admin-UI visibility for a multi-tenant CMS.
//!
//! This module provides:
//! - **Models**: operations, resources, roles and merged permission sets
//! - **Registry**: the validated role catalog, loaded once at startup
//! - **Resolver / Cache**: per-user permission resolution, refreshed on every read
//! - **Policy**: the authorization gate (`has_permission`)
//! - **Visibility**: whether a resource is listed in the admin UI
//! - **Session**: signed permission snapshots for the life of a session
//! - **Middleware**: tower layer enforcing one `(resource, operation)` per route
//!
//! # Usage
//!
//! ```rust,ignore
//! use lectern_core::rbac::{AuthorizationGate, Operation, ResourceId, RoleRegistry};
//!
//! let registry = Arc::new(RoleRegistry::builtin()?);
//! let gate = AuthorizationGate::from_registry(registry);
//!
//! let allowed = gate.has_permission(Some(&user), ResourceId::Articles, Operation::Update, None);
//! ```

pub mod cache;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod user;
pub mod visibility;

pub use cache::{CachedPermissions, InMemoryUserStore, PermissionCache, UserLoader, UserStore};
pub use middleware::{
    AccessContext, DocumentTarget, GrantedAccess, RequireAccessLayer, RequireAccessService,
};
pub use models::{
    Locale, MergedPermissions, Operation, OperationSet, ParseSlugError, ResourceId,
    ResourcePermissions, Role, RoleScope, RoleSlug,
};
pub use policy::{AccessRequest, AuthorizationGate, PolicyDecision, PolicyError};
pub use project::{Project, ProjectScope, ProjectSlug};
pub use registry::{CatalogError, RoleCatalog, RoleRegistry};
pub use resolver::PermissionResolver;
pub use roles::PredefinedRole;
pub use session::{SessionClaims, SessionCodec};
pub use user::{
    CustomResourceAccess, PrivilegedUser, ProjectScoped, RestrictedUser, RoleAssignment,
    RoleBearing, User, UserId, UserKind,
};
pub use visibility::{admin_only_visibility, AdminViewMode, VisibilityOptions, VisibilityPolicy};
