//! Immutable catalog of role definitions, loaded once at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use super::models::{Role, RoleScope, RoleSlug};
use super::project::{Project, ProjectSlug};
use super::roles::builtin_catalog;
use crate::config::CatalogConfig;

/// Startup configuration errors. Any of these aborts loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate role slug in catalog: {0}")]
    DuplicateRole(RoleSlug),

    #[error("Duplicate project in catalog: {0}")]
    DuplicateProject(ProjectSlug),

    #[error("Project role '{0}' does not name a catalog project")]
    UnboundProjectRole(RoleSlug),

    #[error("Manager role '{role}' is bound to project '{project}', which is not in the catalog")]
    UnknownManagerProject { role: RoleSlug, project: ProjectSlug },

    #[error("Project '{0}' has no project role")]
    MissingProjectRole(ProjectSlug),

    #[error("Unknown role referenced by {context}: {slug}")]
    UnknownRole { context: String, slug: RoleSlug },

    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(String),
}

/// Serialized form of the catalog: projects plus role definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleCatalog {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl RoleCatalog {
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        toml::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn from_json_str(source: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Read a `.json` or `.toml` catalog file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }
}

/// Lookup table of validated roles.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: BTreeMap<RoleSlug, Role>,
    projects: Vec<Project>,
}

impl RoleRegistry {
    /// Validate and index a catalog.
    pub fn load(catalog: RoleCatalog) -> Result<Self, CatalogError> {
        let mut project_slugs = BTreeSet::new();
        for project in &catalog.projects {
            if !project_slugs.insert(project.slug) {
                return Err(CatalogError::DuplicateProject(project.slug));
            }
        }

        let mut roles = BTreeMap::new();
        let mut bound_projects = BTreeSet::new();
        for role in catalog.roles {
            match role.scope {
                RoleScope::Project => {
                    let project = role
                        .bound_project()
                        .filter(|p| project_slugs.contains(p))
                        .ok_or_else(|| CatalogError::UnboundProjectRole(role.slug.clone()))?;
                    bound_projects.insert(project);
                }
                RoleScope::Manager { project } if !project_slugs.contains(&project) => {
                    return Err(CatalogError::UnknownManagerProject {
                        role: role.slug.clone(),
                        project,
                    });
                }
                _ => {}
            }

            if roles.contains_key(&role.slug) {
                return Err(CatalogError::DuplicateRole(role.slug));
            }
            roles.insert(role.slug.clone(), role);
        }

        if let Some(missing) = project_slugs.difference(&bound_projects).next() {
            return Err(CatalogError::MissingProjectRole(*missing));
        }

        info!(
            roles = roles.len(),
            projects = catalog.projects.len(),
            "Role registry loaded"
        );

        Ok(Self {
            roles,
            projects: catalog.projects,
        })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::load(builtin_catalog())
    }

    /// Load the configured catalog (built-in when no path is set) and check
    /// the configured default roles against it.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let catalog = match &config.path {
            Some(path) => RoleCatalog::from_file(path)?,
            None => builtin_catalog(),
        };
        let registry = Self::load(catalog)?;
        registry.validate_references("catalog.default_roles", &config.default_roles)?;
        Ok(registry)
    }

    /// Fail if any of `slugs` is not in the registry.
    pub fn validate_references<'a>(
        &self,
        context: &str,
        slugs: impl IntoIterator<Item = &'a RoleSlug>,
    ) -> Result<(), CatalogError> {
        for slug in slugs {
            if !self.roles.contains_key(slug) {
                return Err(CatalogError::UnknownRole {
                    context: context.to_string(),
                    slug: slug.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn lookup(&self, slug: &RoleSlug) -> Option<&Role> {
        self.roles.get(slug)
    }

    /// Roles ordered by slug.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, slug: ProjectSlug) -> Option<&Project> {
        self.projects.iter().find(|p| p.slug == slug)
    }

    /// The one-to-one role of a project.
    pub fn project_role(&self, project: ProjectSlug) -> Option<&Role> {
        self.roles
            .values()
            .find(|r| r.scope == RoleScope::Project && r.bound_project() == Some(project))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
