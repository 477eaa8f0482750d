use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{password, Principal};
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::middleware::audit;
use crate::models::{Role, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub role: Role,
    /// Left unchanged when absent or empty.
    pub password: Option<String>,
}

fn unique_username(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("A user with this username already exists".to_string())
        }
        sqlx::Error::RowNotFound => AppError::NotFound("User not found".to_string()),
        _ => AppError::Database(e),
    }
}

fn clean_username(username: &str) -> Result<&str, AppError> {
    let username = username.trim();
    if username.is_empty() || username.len() > 100 {
        return Err(AppError::BadRequest(
            "Username must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(username)
}

pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    principal.require_admin()?;
    let users = db::users::list_all(&state.pool).await?;
    Ok(Json(users))
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    principal.require_admin()?;
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    Json(req): Json<CreateUser>,
) -> Result<Json<User>, AppError> {
    principal.require_admin()?;

    let username = clean_username(&req.username)?;
    password::check_length(&req.password).map_err(AppError::BadRequest)?;
    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(&state.pool, username, &pw_hash, req.role)
        .await
        .map_err(unique_username)?;

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "user.created",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "role": user.role })),
    )
    .await;

    Ok(Json(user))
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    principal.require_admin()?;

    let username = clean_username(&req.username)?;
    let pw_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(pw) => {
            password::check_length(pw).map_err(AppError::BadRequest)?;
            Some(password::hash(pw).map_err(AppError::Internal)?)
        }
        None => None,
    };

    if id == principal.user_id() && req.role != Role::Admin {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let user = db::users::update(&mut *tx, id, username, req.role, pw_hash.as_deref())
        .await
        .map_err(unique_username)?;

    // Only project managers hold assignments.
    if user.role != Role::ProjectManager {
        db::assignments::remove_all_for_user(&mut *tx, user.id).await?;
    }

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "user.updated",
        "user",
        Some(user.id),
        Some(serde_json::json!({
            "role": user.role,
            "password_changed": pw_hash.is_some(),
        })),
    )
    .await;

    Ok(Json(user))
}

pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    principal.require_admin()?;

    if id == principal.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let deleted = db::users::delete(&state.pool, id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::Conflict(
                    "User has submitted entries and cannot be deleted".to_string(),
                )
            }
            _ => AppError::Database(e),
        })?;
    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "user.deleted",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
