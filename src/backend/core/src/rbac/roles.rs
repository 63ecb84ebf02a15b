//! Built-in role catalog.
//!
//! | Role              | Scope           | Grants                                              |
//! |-------------------|-----------------|-----------------------------------------------------|
//! | `alpha` / `beta` / `gamma` | project | create, read, update on editorial content     |
//! | `<project>-manager` | manager       | full control of content, navigation and redirects   |
//! | `editor`          | global          | read and update articles and pages, upload media    |
//! | `translator`      | global          | read and translate localisable content              |
//! | `viewer`          | global          | read-only access to content                         |

use super::models::{Operation, ResourceId, ResourcePermissions, Role};
use super::project::{Project, ProjectSlug};
use super::registry::RoleCatalog;

use Operation::{Create, Delete, Read, Translate, Update};

const LOCALISED: [ResourceId; 4] = [
    ResourceId::Articles,
    ResourceId::Pages,
    ResourceId::Categories,
    ResourceId::Navigation,
];

/// Predefined role templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedRole {
    Project(ProjectSlug),
    Manager(ProjectSlug),
    Editor,
    Translator,
    Viewer,
}

impl PredefinedRole {
    pub fn slug(&self) -> String {
        match self {
            Self::Project(p) => p.as_str().to_string(),
            Self::Manager(p) => format!("{}-manager", p),
            Self::Editor => "editor".to_string(),
            Self::Translator => "translator".to_string(),
            Self::Viewer => "viewer".to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Project(p) => format!("{} contributor", project_label(*p)),
            Self::Manager(p) => format!("{} manager", project_label(*p)),
            Self::Editor => "Editor".to_string(),
            Self::Translator => "Translator".to_string(),
            Self::Viewer => "Viewer".to_string(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Project(_) => "Writes editorial content for a single project",
            Self::Manager(_) => "Manages content, navigation and redirects for a single project",
            Self::Editor => "Reviews and updates articles and pages",
            Self::Translator => "Translates localisable content",
            Self::Viewer => "Read-only access to content",
        }
    }

    pub fn permissions(&self) -> ResourcePermissions {
        match self {
            Self::Project(_) => {
                ResourcePermissions::new().grant_all(&ResourceId::CONTENT, &[Create, Read, Update])
            }
            Self::Manager(_) => ResourcePermissions::new()
                .grant_all(&ResourceId::CONTENT, &[Create, Read, Update, Delete])
                .grant_all(
                    &[ResourceId::Navigation, ResourceId::Redirects, ResourceId::Authors],
                    &[Create, Read, Update, Delete],
                )
                .grant(ResourceId::Users, &[Read]),
            Self::Editor => ResourcePermissions::new()
                .grant_all(&[ResourceId::Articles, ResourceId::Pages], &[Read, Update])
                .grant(ResourceId::Media, &[Create, Read]),
            Self::Translator => {
                ResourcePermissions::new().grant_all(&LOCALISED, &[Read, Translate])
            }
            Self::Viewer => ResourcePermissions::new().grant_all(&ResourceId::CONTENT, &[Read]),
        }
    }

    pub fn to_role(&self) -> Role {
        let role = Role::new(self.slug(), self.label(), self.description(), self.permissions());
        match self {
            Self::Project(_) => role.project_role(),
            Self::Manager(p) => role.managing(*p),
            _ => role,
        }
    }

    pub fn all() -> Vec<PredefinedRole> {
        let mut roles: Vec<PredefinedRole> =
            ProjectSlug::ALL.into_iter().map(Self::Project).collect();
        roles.extend(ProjectSlug::ALL.into_iter().map(Self::Manager));
        roles.extend([Self::Editor, Self::Translator, Self::Viewer]);
        roles
    }

    pub fn all_defaults() -> Vec<Role> {
        Self::all().into_iter().map(|r| r.to_role()).collect()
    }
}

fn project_label(project: ProjectSlug) -> &'static str {
    match project {
        ProjectSlug::Alpha => "Alpha",
        ProjectSlug::Beta => "Beta",
        ProjectSlug::Gamma => "Gamma",
    }
}

/// Every project plus the predefined roles.
pub fn builtin_catalog() -> RoleCatalog {
    RoleCatalog {
        projects: ProjectSlug::ALL
            .into_iter()
            .map(|p| Project::new(p, project_label(p)))
            .collect(),
        roles: PredefinedRole::all_defaults(),
    }
}
