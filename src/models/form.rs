use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::schema::FormSchema;

/// A project's stored form schema.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Form {
    pub project_id: Uuid,
    pub schema: Json<FormSchema>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
