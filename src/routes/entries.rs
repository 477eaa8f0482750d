use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::middleware::audit;
use crate::models::Entry;
use crate::render::html::FormTemplate;
use crate::render::FormState;
use crate::schema::FormSchema;
use crate::state::SharedState;
use crate::submission::{metadata, pipeline};

use super::forms::render_html;

#[derive(Deserialize)]
pub struct ListParams {
    pub project_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ExportParams {
    pub project_id: Uuid,
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEntry {
    pub project_id: Uuid,
    pub data: serde_json::Value,
    pub gps_location: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateEntry {
    pub data: serde_json::Value,
    pub gps_location: Option<String>,
}

fn clean_gps(gps: Option<String>) -> Option<String> {
    gps.map(|g| g.trim().to_string()).filter(|g| !g.is_empty())
}

/// Every entry for admins; only authored entries for project managers.
pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Entry>>, AppError> {
    let entries = db::entries::list(&state.pool, principal.entry_scope(), params.project_id).await?;
    Ok(Json(entries))
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    let entry = db::entries::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;
    principal.require_can_read_entry(&entry)?;
    Ok(Json(entry))
}

pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CreateEntry>,
) -> Result<Json<Entry>, AppError> {
    let client = metadata::extract(&headers, Some(addr.ip()), &state.config.trusted_proxies);

    let entry = pipeline::submit(
        &state.pool,
        &principal,
        pipeline::Submission {
            project_id: req.project_id,
            data: req.data,
            gps_location: clean_gps(req.gps_location),
        },
        &client,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "entry.created",
        "entry",
        Some(entry.id),
        Some(serde_json::json!({ "project_id": entry.project_id })),
    )
    .await;

    Ok(Json(entry))
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEntry>,
) -> Result<Json<Entry>, AppError> {
    let client = metadata::extract(&headers, Some(addr.ip()), &state.config.trusted_proxies);

    let entry = pipeline::revise(
        &state.pool,
        &principal,
        id,
        req.data,
        clean_gps(req.gps_location),
        &client,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "entry.updated",
        "entry",
        Some(entry.id),
        None,
    )
    .await;

    Ok(Json(entry))
}

pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let entry = pipeline::remove(&state.pool, &principal, id).await?;

    audit::log_event(
        &state.pool,
        Some(principal.user_id()),
        "entry.deleted",
        "entry",
        Some(entry.id),
        Some(serde_json::json!({
            "project_id": entry.project_id,
            "author_id": entry.user_id,
        })),
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

/// HTML edit form for an existing entry, pre-filled with its data.
pub async fn edit_form(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    principal.require_entry_writer()?;

    let entry = db::entries::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;
    principal.require_can_modify_entry(&entry)?;

    let project = db::projects::find_by_id(&state.pool, entry.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let form = db::forms::find_by_project(&state.pool, entry.project_id)
        .await?
        .ok_or_else(|| AppError::PreconditionFailed("Project has no form schema".to_string()))?;

    let form_state = FormState::new(&form.schema, entry.data.as_object());
    let errors = form_state.validate();
    let template = FormTemplate::new(
        project.name,
        project.id.to_string(),
        format!("/api/v1/entries/{}", entry.id),
        "put",
        "Save",
        form_state.controls(&errors),
    );

    render_html(&template)
}

/// Visible entries for one project as JSON or CSV.
pub async fn export(
    principal: Principal,
    State(state): State<SharedState>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, AppError> {
    principal.require_project_visible(params.project_id)?;

    let entries =
        db::entries::list(&state.pool, principal.entry_scope(), Some(params.project_id)).await?;

    match params.format.as_deref().unwrap_or("json") {
        "csv" => {
            let form = db::forms::find_by_project(&state.pool, params.project_id).await?;
            let csv = export_csv(form.as_ref().map(|f| &*f.schema), &entries);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"entries.csv\"",
                    ),
                ],
                csv,
            )
                .into_response())
        }
        "json" => Ok(Json(entries).into_response()),
        other => Err(AppError::BadRequest(format!(
            "Unsupported export format '{other}'"
        ))),
    }
}

/// Columns follow the schema's field order; keys that are no longer in the
/// schema come after, in first-seen order.
fn export_csv(schema: Option<&FormSchema>, entries: &[Entry]) -> String {
    use std::fmt::Write;
    let mut csv = String::new();

    let mut keys: Vec<String> = schema
        .map(|s| s.field_names().map(str::to_string).collect())
        .unwrap_or_default();
    for entry in entries {
        if let Some(obj) = entry.data.as_object() {
            for key in obj.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
    }

    let _ = write!(csv, "id,user_id,created_at");
    for key in &keys {
        let _ = write!(csv, ",{}", csv_escape(key));
    }
    let _ = writeln!(csv);

    for entry in entries {
        let _ = write!(
            csv,
            "{},{},{}",
            entry.id,
            entry.user_id,
            entry.created_at.to_rfc3339()
        );
        for key in &keys {
            let val = entry
                .data
                .get(key)
                .map(|v| match v {
                    serde_json::Value::String(s) => csv_escape(s),
                    other => csv_escape(&other.to_string()),
                })
                .unwrap_or_default();
            let _ = write!(csv, ",{val}");
        }
        let _ = writeln!(csv);
    }

    csv
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn entry(data: serde_json::Value) -> Entry {
        Entry {
            id: Uuid::now_v7(),
            project_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            data,
            ip_address: None,
            gps_location: None,
            user_agent: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn csv_columns_follow_schema_order_then_orphaned_keys() {
        let schema: FormSchema = serde_json::from_value(json!([
            { "name": "site", "type": "text" },
            { "name": "count", "type": "number" }
        ]))
        .unwrap();
        let entries = [
            entry(json!({ "count": 2, "site": "North, upper" })),
            entry(json!({ "legacy": "x\"y", "site": "South" })),
        ];

        let csv = export_csv(Some(&schema), &entries);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "id,user_id,created_at,site,count,legacy");
        assert!(lines[1].ends_with(",\"North, upper\",2,"));
        assert!(lines[2].ends_with(",South,,\"x\"\"y\""));
    }

    #[test]
    fn blank_gps_is_dropped() {
        assert_eq!(clean_gps(Some("  ".to_string())), None);
        assert_eq!(
            clean_gps(Some(" 1.5,2.5 ".to_string())).as_deref(),
            Some("1.5,2.5")
        );
    }
}
