use askama::Template;
use axum::extract::State;
use axum::response::Html;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::middleware::audit;
use crate::models::Form;
use crate::render::html::FormTemplate;
use crate::render::FormState;
use crate::schema::{FieldSpec, FormSchema};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SchemaRequest {
    pub schema: Vec<FieldSpec>,
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Form>, AppError> {
    principal.require_project_visible(project_id)?;
    let form = db::forms::find_by_project(&state.pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;
    Ok(Json(form))
}

/// Replace the project's whole schema, creating it if absent. Existing
/// entries are left as they are.
pub async fn put(
    principal: Principal,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<SchemaRequest>,
) -> Result<Json<Form>, AppError> {
    let admin = principal.require_admin()?;
    let schema = FormSchema::new(req.schema)?;

    db::projects::find_by_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| AppError::PreconditionFailed("Project does not exist".to_string()))?;

    let form = db::forms::upsert(&state.pool, project_id, &schema)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::PreconditionFailed("Project does not exist".to_string())
            }
            _ => AppError::Database(e),
        })?;

    tracing::info!(
        project_id = %project_id,
        fields = schema.fields().len(),
        "Form schema saved"
    );

    audit::log_event(
        &state.pool,
        Some(admin.user_id),
        "form.saved",
        "project",
        Some(project_id),
        Some(serde_json::json!({ "fields": schema.fields().len() })),
    )
    .await;

    Ok(Json(form))
}

pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = principal.require_admin()?;

    if db::forms::delete(&state.pool, project_id).await? == 0 {
        return Err(AppError::NotFound("Form not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(admin.user_id),
        "form.deleted",
        "project",
        Some(project_id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

/// Blank HTML form for a new entry.
pub async fn render(
    principal: Principal,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    principal.require_project_visible(project_id)?;

    let project = db::projects::find_by_id(&state.pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let form = db::forms::find_by_project(&state.pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

    let form_state = FormState::new(&form.schema, None);
    let template = FormTemplate::new(
        project.name,
        project.id.to_string(),
        "/api/v1/entries".to_string(),
        "post",
        "Submit",
        form_state.controls(&Default::default()),
    );

    render_html(&template)
}

pub(crate) fn render_html(template: &FormTemplate) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("Template render failed: {e}")))
}
