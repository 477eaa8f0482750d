use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Form;
use crate::schema::FormSchema;

pub async fn find_by_project(pool: &PgPool, project_id: Uuid) -> Result<Option<Form>, sqlx::Error> {
    sqlx::query_as::<_, Form>("SELECT * FROM forms WHERE project_id = $1")
        .bind(project_id)
        .fetch_optional(pool)
        .await
}

/// Read the schema under a share lock. A concurrent upsert of the same
/// schema waits until the surrounding transaction ends.
pub async fn find_for_share<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
) -> Result<Option<Form>, sqlx::Error> {
    sqlx::query_as::<_, Form>("SELECT * FROM forms WHERE project_id = $1 FOR SHARE")
        .bind(project_id)
        .fetch_optional(executor)
        .await
}

/// Replace the whole schema for a project, creating it if absent.
pub async fn upsert(
    pool: &PgPool,
    project_id: Uuid,
    schema: &FormSchema,
) -> Result<Form, sqlx::Error> {
    sqlx::query_as::<_, Form>(
        "INSERT INTO forms (project_id, schema) VALUES ($1, $2)
         ON CONFLICT (project_id) DO UPDATE SET schema = EXCLUDED.schema, updated_at = now()
         RETURNING *",
    )
    .bind(project_id)
    .bind(Json(schema))
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, project_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM forms WHERE project_id = $1")
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
