use crate::models::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Full, append-only conversation log of a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub messages: Json<Vec<Message>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(user_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            messages: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn append(&mut self, messages: &[Message]) {
        self.messages.0.extend_from_slice(messages);
        self.updated_at = Utc::now();
    }
}
