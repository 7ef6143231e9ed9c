use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted record of a generation request's output.
/// Rows are append-only; this subsystem never updates or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreationRow {
    pub id: i64,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub publish: bool,
    pub created_at: DateTime<Utc>,
}
