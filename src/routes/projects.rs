use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::middleware::audit;
use crate::models::{Assignment, Project, Role};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignAction {
    Assign,
    Unassign,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub user_id: Uuid,
    pub action: AssignAction,
}

fn validate(req: &ProjectRequest) -> Result<(&str, Option<&str>), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(AppError::BadRequest(
            "Name must be between 1 and 200 characters".to_string(),
        ));
    }
    let description = req
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    Ok((name, description))
}

/// All projects for admins; assigned projects for project managers.
pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = match &principal {
        Principal::Admin(_) => db::projects::list_all(&state.pool).await?,
        Principal::ProjectManager(pm) => {
            db::projects::list_assigned(&state.pool, pm.user_id).await?
        }
    };
    Ok(Json(projects))
}

pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let admin = principal.require_admin()?;
    let (name, description) = validate(&req)?;

    let project = db::projects::create(&state.pool, name, description, admin.user_id).await?;

    audit::log_event(
        &state.pool,
        Some(admin.user_id),
        "project.created",
        "project",
        Some(project.id),
        None,
    )
    .await;

    Ok(Json(project))
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    principal.require_project_visible(id)?;
    let project = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let admin = principal.require_admin()?;
    let (name, description) = validate(&req)?;

    let project = db::projects::update(&state.pool, id, name, description)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Project not found".to_string()),
            _ => AppError::Database(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(admin.user_id),
        "project.updated",
        "project",
        Some(project.id),
        None,
    )
    .await;

    Ok(Json(project))
}

/// Deleting a project also removes its schema, assignments, and entries.
pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = principal.require_admin()?;

    if db::projects::delete(&state.pool, id).await? == 0 {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(admin.user_id),
        "project.deleted",
        "project",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

/// Idempotent assign/unassign toggle for a project manager.
pub async fn assign(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = principal.require_admin()?;

    db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let changed = match req.action {
        AssignAction::Assign => {
            let user = db::users::find_by_id(&state.pool, req.user_id)
                .await?
                .ok_or_else(|| AppError::validation("User does not exist"))?;
            if user.role != Role::ProjectManager {
                return Err(AppError::validation(
                    "Only project managers can be assigned to projects",
                ));
            }
            db::assignments::assign(&state.pool, id, user.id)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                        AppError::NotFound("Project not found".to_string())
                    }
                    _ => AppError::Database(e),
                })?
        }
        AssignAction::Unassign => db::assignments::unassign(&state.pool, id, req.user_id).await?,
    };

    let (action, message) = match req.action {
        AssignAction::Assign => ("project.assigned", "Project manager assigned"),
        AssignAction::Unassign => ("project.unassigned", "Project manager unassigned"),
    };

    if changed {
        audit::log_event(
            &state.pool,
            Some(admin.user_id),
            action,
            "project",
            Some(id),
            Some(serde_json::json!({ "user_id": req.user_id })),
        )
        .await;
    }

    Ok(Json(serde_json::json!({ "message": message, "changed": changed })))
}

pub async fn assignments(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    principal.require_admin()?;

    db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let assignments = db::assignments::list_for_project(&state.pool, id).await?;
    Ok(Json(assignments))
}
