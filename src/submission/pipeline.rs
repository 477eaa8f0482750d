//! Entry writes. Each one reads the project's current schema, validates,
//! and writes inside a single transaction, holding a share lock on the
//! schema row so a concurrent schema replacement cannot slip in between.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db;
use crate::db::entries::NewEntry;
use crate::error::AppError;
use crate::models::{Entry, Form};

use super::metadata::ClientInfo;

pub struct Submission {
    pub project_id: Uuid,
    pub data: Value,
    pub gps_location: Option<String>,
}

pub async fn submit(
    pool: &PgPool,
    principal: &Principal,
    submission: Submission,
    client: &ClientInfo,
) -> Result<Entry, AppError> {
    let user_id = principal.require_can_submit(submission.project_id)?;

    let mut tx = pool.begin().await?;

    db::projects::find_for_share(&mut *tx, submission.project_id)
        .await?
        .ok_or_else(|| AppError::PreconditionFailed("Project does not exist".to_string()))?;

    let form = current_form(&mut tx, submission.project_id).await?;
    let data = Value::Object(form.schema.check_entry(&submission.data)?);

    let entry = db::entries::create(
        &mut *tx,
        &NewEntry {
            project_id: submission.project_id,
            user_id,
            data: &data,
            ip_address: Some(&client.ip),
            gps_location: submission.gps_location.as_deref(),
            user_agent: client.user_agent.as_deref(),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        entry_id = %entry.id,
        project_id = %entry.project_id,
        "Entry submitted"
    );
    Ok(entry)
}

/// Replace an entry's data, validated against the project's current schema.
pub async fn revise(
    pool: &PgPool,
    principal: &Principal,
    entry_id: Uuid,
    data: Value,
    gps_location: Option<String>,
    client: &ClientInfo,
) -> Result<Entry, AppError> {
    principal.require_entry_writer()?;

    let mut tx = pool.begin().await?;

    let entry = db::entries::find_for_update(&mut *tx, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;
    principal.require_can_modify_entry(&entry)?;

    let form = current_form(&mut tx, entry.project_id).await?;
    let data = Value::Object(form.schema.check_entry(&data)?);

    let updated = db::entries::update(
        &mut *tx,
        entry.id,
        &data,
        gps_location.as_deref(),
        client.user_agent.as_deref(),
    )
    .await?;

    tx.commit().await?;
    Ok(updated)
}

pub async fn remove(pool: &PgPool, principal: &Principal, entry_id: Uuid) -> Result<Entry, AppError> {
    principal.require_entry_writer()?;

    let mut tx = pool.begin().await?;

    let entry = db::entries::find_for_update(&mut *tx, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;
    principal.require_can_modify_entry(&entry)?;

    db::entries::delete(&mut *tx, entry.id).await?;
    tx.commit().await?;
    Ok(entry)
}

async fn current_form(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    project_id: Uuid,
) -> Result<Form, AppError> {
    db::forms::find_for_share(&mut **tx, project_id)
        .await?
        .ok_or_else(|| {
            AppError::PreconditionFailed("Project has no form schema".to_string())
        })
}
