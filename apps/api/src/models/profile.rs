use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One stored version of a user's profile section. `entries` holds a JSON array of
/// `ParsedEntry` values, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileSectionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub section: String,
    pub version: i32,
    pub entries: Value,
    pub entry_count: i32,
    pub created_at: DateTime<Utc>,
}
