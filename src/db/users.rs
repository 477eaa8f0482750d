use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Role, User};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, role)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_one(executor)
    .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn count_all<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Update username and role, and the password hash when one is given.
pub async fn update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    username: &str,
    role: Role,
    password_hash: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET username = $2, role = $3, password_hash = COALESCE($4, password_hash)
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(username)
    .bind(role)
    .bind(password_hash)
    .fetch_one(executor)
    .await
}

pub async fn record_login(pool: &PgPool, id: Uuid, ip: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_ip = $2, last_login_at = now() WHERE id = $1")
        .bind(id)
        .bind(ip)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
