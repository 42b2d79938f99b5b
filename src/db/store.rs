use super::{conversation, memory};
use crate::models::{ConversationRecord, MemoryRecord, Message};
use actix_web::web;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

/// Conversation log and short-term memory of chat users.
/// Routes depend on this trait; tests swap in [`mock::InMemoryChatStore`].
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Newest `limit` memory rows of the user, oldest-first.
    async fn recent_memory(&self, user_id: &str, limit: i64) -> Result<Vec<MemoryRecord>, String>;

    /// Appends `exchange` to the conversation and `remembered` to memory.
    /// Both writes land together or not at all.
    async fn save_exchange(
        &self,
        user_id: &str,
        exchange: &[Message],
        remembered: &[Message],
    ) -> Result<ConversationRecord, String>;

    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>, String>;

    /// Bulk-deletes the user's memory rows, returns how many were removed.
    async fn clear_memory(&self, user_id: &str) -> Result<u64, String>;
}

pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChatStore for PgChatStore {
    async fn recent_memory(&self, user_id: &str, limit: i64) -> Result<Vec<MemoryRecord>, String> {
        memory::fetch_recent(&self.pool, user_id, limit).await
    }

    async fn save_exchange(
        &self,
        user_id: &str,
        exchange: &[Message],
        remembered: &[Message],
    ) -> Result<ConversationRecord, String> {
        let span = tracing::info_span!("Saving chat exchange", user_id = %user_id);
        async {
            let mut tx = self.pool.begin().await.map_err(|err| {
                tracing::error!("Failed to begin transaction: {:?}", err);
                "Database error".to_string()
            })?;

            let record = conversation::append(&mut *tx, user_id, exchange).await?;
            memory::insert(&mut *tx, user_id, remembered).await?;

            tx.commit().await.map_err(|err| {
                tracing::error!("Failed to commit chat exchange: {:?}", err);
                "Failed to save conversation".to_string()
            })?;

            Ok::<_, String>(record)
        }
        .instrument(span)
        .await
    }

    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>, String> {
        conversation::fetch_by_user(&self.pool, user_id).await
    }

    async fn clear_memory(&self, user_id: &str) -> Result<u64, String> {
        memory::delete_by_user(&self.pool, user_id).await
    }
}

pub fn init(pg_pool: PgPool) -> web::Data<Arc<dyn ChatStore>> {
    let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pg_pool));
    web::Data::new(store)
}

pub mod mock {
    use super::*;
    use crate::models::ConversationRecord;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct State {
        conversations: HashMap<String, ConversationRecord>,
        memories: Vec<MemoryRecord>,
        next_id: i64,
    }

    /// In-process store for tests and local runs without a database.
    #[derive(Default)]
    pub struct InMemoryChatStore {
        state: Mutex<State>,
        fail_writes: bool,
    }

    impl InMemoryChatStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store whose writes always fail
        pub fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub async fn memory_count(&self, user_id: &str) -> usize {
            let state = self.state.lock().await;
            state.memories.iter().filter(|m| m.user_id == user_id).count()
        }

        pub async fn seed_memory(&self, user_id: &str, messages: &[Message]) {
            let mut state = self.state.lock().await;
            for message in messages {
                push_memory(&mut state, user_id, message);
            }
        }
    }

    fn push_memory(state: &mut State, user_id: &str, message: &Message) {
        state.next_id += 1;
        let id = state.next_id;
        state.memories.push(MemoryRecord {
            id,
            user_id: user_id.to_string(),
            role: message.role,
            content: message.content.clone(),
            created_at: Utc::now(),
        });
    }

    #[async_trait::async_trait]
    impl ChatStore for InMemoryChatStore {
        async fn recent_memory(
            &self,
            user_id: &str,
            limit: i64,
        ) -> Result<Vec<MemoryRecord>, String> {
            let state = self.state.lock().await;
            let mut records: Vec<MemoryRecord> = state
                .memories
                .iter()
                .rev()
                .filter(|m| m.user_id == user_id)
                .take(limit.max(0) as usize)
                .cloned()
                .collect();
            records.reverse();
            Ok(records)
        }

        async fn save_exchange(
            &self,
            user_id: &str,
            exchange: &[Message],
            remembered: &[Message],
        ) -> Result<ConversationRecord, String> {
            if self.fail_writes {
                return Err("Failed to save conversation".to_string());
            }
            let mut state = self.state.lock().await;
            let record = state
                .conversations
                .entry(user_id.to_string())
                .or_insert_with(|| ConversationRecord::new(user_id.to_string()));
            record.append(exchange);
            let record = record.clone();

            for message in remembered {
                push_memory(&mut state, user_id, message);
            }
            Ok(record)
        }

        async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>, String> {
            let state = self.state.lock().await;
            Ok(state.conversations.get(user_id).cloned().into_iter().collect())
        }

        async fn clear_memory(&self, user_id: &str) -> Result<u64, String> {
            if self.fail_writes {
                return Err("Failed to clear memory".to_string());
            }
            let mut state = self.state.lock().await;
            let before = state.memories.len();
            state.memories.retain(|m| m.user_id != user_id);
            Ok((before - state.memories.len()) as u64)
        }
    }

}
