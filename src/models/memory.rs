use crate::models::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered turn. Rows are ordered by `id`, which grows with insertion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: i64,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&MemoryRecord> for Message {
    fn from(record: &MemoryRecord) -> Self {
        Message::new(record.role, record.content.clone())
    }
}
