//! The authenticated caller and what it may do.
//!
//! Every access rule for projects, assignments, schemas, and entries is a
//! method here, so handlers never compare role strings.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Entry, Role};

#[derive(Debug, Clone, Serialize)]
pub struct AdminAccess {
    pub user_id: Uuid,
    /// May update and delete entries authored by others.
    pub entry_override: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectManagerAccess {
    pub user_id: Uuid,
    pub assigned_projects: HashSet<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Principal {
    Admin(AdminAccess),
    ProjectManager(ProjectManagerAccess),
}

/// Which entries a principal may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryScope {
    All,
    AuthoredBy(Uuid),
}

impl Principal {
    pub fn user_id(&self) -> Uuid {
        match self {
            Principal::Admin(a) => a.user_id,
            Principal::ProjectManager(pm) => pm.user_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Admin(_) => Role::Admin,
            Principal::ProjectManager(_) => Role::ProjectManager,
        }
    }

    pub fn require_admin(&self) -> Result<&AdminAccess, AppError> {
        match self {
            Principal::Admin(a) => Ok(a),
            Principal::ProjectManager(_) => {
                Err(AppError::Forbidden("Admin access required".to_string()))
            }
        }
    }

    pub fn can_view_project(&self, project_id: Uuid) -> bool {
        match self {
            Principal::Admin(_) => true,
            Principal::ProjectManager(pm) => pm.assigned_projects.contains(&project_id),
        }
    }

    pub fn require_project_visible(&self, project_id: Uuid) -> Result<(), AppError> {
        if self.can_view_project(project_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not assigned to this project".to_string(),
            ))
        }
    }

    pub fn entry_scope(&self) -> EntryScope {
        match self {
            Principal::Admin(_) => EntryScope::All,
            Principal::ProjectManager(pm) => EntryScope::AuthoredBy(pm.user_id),
        }
    }

    /// Returns the submitting user's id when the principal may create an
    /// entry for `project_id`.
    pub fn require_can_submit(&self, project_id: Uuid) -> Result<Uuid, AppError> {
        match self {
            Principal::Admin(_) => Err(AppError::Forbidden(
                "Admins do not submit field data".to_string(),
            )),
            Principal::ProjectManager(pm) if pm.assigned_projects.contains(&project_id) => {
                Ok(pm.user_id)
            }
            Principal::ProjectManager(_) => Err(AppError::Forbidden(
                "You are not assigned to this project".to_string(),
            )),
        }
    }

    pub fn can_read_entry(&self, entry: &Entry) -> bool {
        match self.entry_scope() {
            EntryScope::All => true,
            EntryScope::AuthoredBy(user_id) => entry.user_id == user_id,
        }
    }

    pub fn require_can_read_entry(&self, entry: &Entry) -> Result<(), AppError> {
        if self.can_read_entry(entry) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only access your own entries".to_string(),
            ))
        }
    }

    /// Role-level gate for update and delete, checked before the entry is loaded.
    pub fn require_entry_writer(&self) -> Result<(), AppError> {
        match self {
            Principal::Admin(a) if !a.entry_override => Err(AppError::Forbidden(
                "Admins cannot modify field entries".to_string(),
            )),
            Principal::Admin(_) | Principal::ProjectManager(_) => Ok(()),
        }
    }

    /// Update and delete: owners only, plus admins when the override is on.
    pub fn require_can_modify_entry(&self, entry: &Entry) -> Result<(), AppError> {
        match self {
            Principal::Admin(a) if a.entry_override => Ok(()),
            Principal::Admin(_) => Err(AppError::Forbidden(
                "Admins cannot modify field entries".to_string(),
            )),
            Principal::ProjectManager(pm) if entry.user_id == pm.user_id => Ok(()),
            Principal::ProjectManager(_) => Err(AppError::Forbidden(
                "You can only modify your own entries".to_string(),
            )),
        }
    }
}
