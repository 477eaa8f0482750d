use axum::extract::State;
use serde::Deserialize;

use crate::auth::Principal;
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::models::AuditEvent;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AuditParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Most recent audit events first.
pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    principal.require_admin()?;

    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);

    let events = db::audit::list(&state.pool, limit, offset).await?;
    Ok(Json(events))
}
