#![allow(clippy::result_large_err)]
//! # Lectern Core
//!
//! Access-control and visibility-policy engine for a multi-tenant CMS.
//!
//! ## Architecture
//!
//! - **RBAC**: role catalog, permission resolution, authorization gate
//! - **Visibility**: admin-UI listing derived from write access and project scope
//! - **Session**: signed permission snapshots
//! - **Telemetry**: structured logging and decision metrics
//! - **Config**: layered file and environment configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod rbac;
pub mod telemetry;

pub use engine::AccessEngine;
pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, LecternError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::AccessEngine;
    pub use crate::error::{ErrorCode, LecternError, Result};
    pub use crate::rbac::{
        admin_only_visibility, AccessContext, AccessRequest, AdminViewMode, AuthorizationGate,
        CustomResourceAccess, Locale, MergedPermissions, Operation, OperationSet,
        PermissionCache, PolicyDecision, PredefinedRole, PrivilegedUser, ProjectScope,
        ProjectSlug, RequireAccessLayer, ResourceId, RestrictedUser, Role, RoleRegistry,
        RoleSlug, SessionCodec, User, UserId, UserKind, UserLoader, UserStore,
        VisibilityOptions, VisibilityPolicy,
    };
}
