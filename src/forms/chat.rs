use crate::models::{Message, Role};
use serde::Deserialize;
use serde_valid::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default, rename = "userId", alias = "user_id")]
    #[validate(max_length = 255)]
    pub user_id: Option<String>,
    #[validate(min_items = 1)]
    #[validate]
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// The user id, if present and not blank.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Chat clients may only submit user and assistant turns.
    pub fn has_only_chat_roles(&self) -> bool {
        self.messages
            .iter()
            .all(|m| matches!(m.role, Role::User | Role::Assistant))
    }
}
