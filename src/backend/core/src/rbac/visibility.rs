//! Admin-UI visibility derived from the permission model.
//!
//! A management resource is listed only for users who can write to it, and
//! only inside the projects it belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::error;

use super::models::{MergedPermissions, Operation, ResourceId};
use super::policy::AuthorizationGate;
use super::project::{ProjectScope, ProjectSlug};
use super::user::{User, UserKind};

/// How `exclude_from_admin_view` treats admins in the aggregate view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminViewMode {
    /// Admins always see the resource when no project is selected.
    #[default]
    AdminsSeeAll,
    /// The flag hides the resource from everyone, admins included.
    HideFromEveryone,
}

impl fmt::Display for AdminViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AdminsSeeAll => "admins_see_all",
            Self::HideFromEveryone => "hide_from_everyone",
        })
    }
}

/// Per-resource listing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityOptions {
    #[serde(default)]
    pub exclude_from_admin_view: bool,
}

impl VisibilityOptions {
    pub fn excluded_from_admin_view() -> Self {
        Self {
            exclude_from_admin_view: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisibilityPolicy {
    gate: AuthorizationGate,
    scope: Arc<ProjectScope>,
    mode: AdminViewMode,
}

impl VisibilityPolicy {
    pub fn new(gate: AuthorizationGate, scope: ProjectScope, mode: AdminViewMode) -> Self {
        Self {
            gate,
            scope: Arc::new(scope),
            mode,
        }
    }

    pub fn mode(&self) -> AdminViewMode {
        self.mode
    }

    /// `isHidden(resource, allowedProjects, options, user)`.
    pub fn is_hidden(
        &self,
        resource: ResourceId,
        allowed_projects: &[ProjectSlug],
        options: &VisibilityOptions,
        user: Option<&User>,
    ) -> bool {
        let Some(user) = user else {
            return true;
        };

        // Read access alone never lists a management resource.
        if self
            .gate
            .check_any(Some(user), resource, &Operation::WRITE)
            .is_denied()
        {
            return true;
        }

        let current = if user.is_admin() {
            self.scope.current(user, &MergedPermissions::empty())
        } else {
            match self.gate.cache().permissions_for(user) {
                Ok(permissions) => self.scope.current(user, &permissions),
                Err(e) => {
                    error!(
                        user_id = %user.id(),
                        error = %e,
                        "Visibility check failed, hiding resource"
                    );
                    return true;
                }
            }
        };

        match current {
            None => match self.mode {
                AdminViewMode::AdminsSeeAll => options.exclude_from_admin_view && !user.is_admin(),
                AdminViewMode::HideFromEveryone => options.exclude_from_admin_view,
            },
            Some(project) => !allowed_projects.contains(&project),
        }
    }

    /// Curried form for navigation renderers: fix the resource, then ask per user.
    pub fn hidden_predicate(
        &self,
        resource: ResourceId,
        allowed_projects: Vec<ProjectSlug>,
        options: VisibilityOptions,
    ) -> impl Fn(Option<&User>) -> bool + Send + Sync + 'static {
        let policy = self.clone();
        move |user| policy.is_hidden(resource, &allowed_projects, &options, user)
    }
}

/// Hidden unless the user is an admin.
///
/// Only the decoded kind counts, never a loose `admin` field on the record.
pub fn admin_only_visibility(user: Option<&User>) -> bool {
    !matches!(user.map(User::kind), Some(UserKind::Admin))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
