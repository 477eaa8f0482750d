use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub data: serde_json::Value,
    pub ip_address: Option<String>,
    pub gps_location: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
