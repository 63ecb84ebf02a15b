//! Tenant model: the closed set of projects and a user's current selection.
//!
//! A user works inside at most one project at a time. The absence of a
//! selection is the aggregate "admin view" spanning every project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::models::{MergedPermissions, ParseSlugError};
use super::user::{ProjectScoped, User};
use crate::error::{ErrorCode, LecternError, Result};

/// Closed, versioned list of tenants.
///
/// Adding a member requires a matching project role in the catalog and an
/// update to every `allowed_projects` list that should include it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSlug {
    Alpha,
    Beta,
    Gamma,
}

impl ProjectSlug {
    pub const ALL: [ProjectSlug; 3] = [Self::Alpha, Self::Beta, Self::Gamma];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Gamma => "gamma",
        }
    }
}

impl fmt::Display for ProjectSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectSlug {
    type Err = ParseSlugError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseSlugError::new("project", s))
    }
}

/// A tenant as listed in the role catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub slug: ProjectSlug,
    pub label: String,
}

impl Project {
    pub fn new(slug: ProjectSlug, label: impl Into<String>) -> Self {
        Self {
            slug,
            label: label.into(),
        }
    }
}

/// Project selection rules for a loaded catalog.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    projects: Vec<Project>,
}

impl ProjectScope {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, slug: ProjectSlug) -> Option<&Project> {
        self.projects.iter().find(|p| p.slug == slug)
    }

    /// Projects the user may select. Admins may enter any catalog project.
    pub fn available(&self, user: &User, permissions: &MergedPermissions) -> Vec<ProjectSlug> {
        self.projects
            .iter()
            .map(|p| p.slug)
            .filter(|slug| user.is_admin() || permissions.projects().contains(slug))
            .collect()
    }

    /// The user's effective current project.
    ///
    /// A stored selection the user no longer has access to (for example after
    /// a role change revoked it) reads as unset, which is the aggregate view.
    pub fn current(&self, user: &User, permissions: &MergedPermissions) -> Option<ProjectSlug> {
        let selected = user.current_project()?;
        if self.get(selected).is_none() {
            debug!(
                user_id = %user.id(),
                project = %selected,
                "Selected project is not in the catalog"
            );
            return None;
        }
        if user.is_admin() || permissions.projects().contains(&selected) {
            Some(selected)
        } else {
            debug!(
                user_id = %user.id(),
                project = %selected,
                "Selected project no longer permitted, treating as unset"
            );
            None
        }
    }

    /// Change the user's selection; `None` returns to the aggregate view.
    pub fn select(
        &self,
        user: &mut User,
        project: Option<ProjectSlug>,
        permissions: &MergedPermissions,
    ) -> Result<()> {
        let User::Privileged(privileged) = user else {
            return Err(LecternError::new(
                ErrorCode::ProjectNotPermitted,
                "Restricted users cannot select a project",
            ));
        };

        if let Some(slug) = project {
            if self.get(slug).is_none() {
                return Err(LecternError::new(
                    ErrorCode::UnknownProject,
                    format!("Unknown project: {}", slug),
                ));
            }
            let admin = privileged.is_admin();
            if !admin && !permissions.projects().contains(&slug) {
                return Err(LecternError::new(
                    ErrorCode::ProjectNotPermitted,
                    format!("Project {} is not available to this user", slug),
                )
                .with_context("user_id", privileged.id.as_str()));
            }
        }

        privileged.current_project = project;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
