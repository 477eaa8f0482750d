use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::EntryScope;
use crate::models::Entry;

pub struct NewEntry<'a> {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub data: &'a serde_json::Value,
    pub ip_address: Option<&'a str>,
    pub gps_location: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    entry: &NewEntry<'_>,
) -> Result<Entry, sqlx::Error> {
    sqlx::query_as::<_, Entry>(
        "INSERT INTO entries (project_id, user_id, data, ip_address, gps_location, user_agent)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(entry.project_id)
    .bind(entry.user_id)
    .bind(entry.data)
    .bind(entry.ip_address)
    .bind(entry.gps_location)
    .bind(entry.user_agent)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Entry>, sqlx::Error> {
    sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_for_update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Entry>, sqlx::Error> {
    sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Entries visible under `scope`, optionally narrowed to one project.
pub async fn list(
    pool: &PgPool,
    scope: EntryScope,
    project_id: Option<Uuid>,
) -> Result<Vec<Entry>, sqlx::Error> {
    let author = match scope {
        EntryScope::All => None,
        EntryScope::AuthoredBy(user_id) => Some(user_id),
    };

    sqlx::query_as::<_, Entry>(
        "SELECT * FROM entries
         WHERE ($1::uuid IS NULL OR user_id = $1)
           AND ($2::uuid IS NULL OR project_id = $2)
         ORDER BY created_at DESC",
    )
    .bind(author)
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    data: &serde_json::Value,
    gps_location: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Entry, sqlx::Error> {
    sqlx::query_as::<_, Entry>(
        "UPDATE entries
         SET data = $2, gps_location = $3, user_agent = $4, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(data)
    .bind(gps_location)
    .bind(user_agent)
    .fetch_one(executor)
    .await
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM entries WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
