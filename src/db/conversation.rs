use crate::models::{registry, ConversationRecord, Message};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::Instrument;
use uuid::Uuid;

fn table() -> Result<&'static str, String> {
    registry::table(registry::CONVERSATION).map_err(|err| {
        tracing::error!("Conversation model lookup failed: {}", err);
        "Conversation storage is not registered".to_string()
    })
}

/// Appends `messages` to the user's conversation, creating it on first use.
pub async fn append(
    conn: &mut PgConnection,
    user_id: &str,
    messages: &[Message],
) -> Result<ConversationRecord, String> {
    let table = table()?;
    let query_span = tracing::info_span!("Appending messages to conversation", user_id = %user_id);
    let sql = format!(
        r#"
        INSERT INTO {table} (id, user_id, messages, created_at, updated_at)
        VALUES ($1, $2, $3, NOW(), NOW())
        ON CONFLICT (user_id)
        DO UPDATE SET messages = {table}.messages || EXCLUDED.messages, updated_at = NOW()
        RETURNING id, user_id, messages, created_at, updated_at
        "#
    );

    sqlx::query_as::<_, ConversationRecord>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Json(messages.to_vec()))
        .fetch_one(&mut *conn)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to append conversation: {:?}", err);
            "Failed to save conversation".to_string()
        })
}

pub async fn fetch_by_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ConversationRecord>, String> {
    let table = table()?;
    let query_span = tracing::info_span!("Fetching conversations by user", user_id = %user_id);
    let sql = format!(
        r#"
        SELECT id, user_id, messages, created_at, updated_at
        FROM {table}
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#
    );

    sqlx::query_as::<_, ConversationRecord>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch conversations: {:?}", err);
            "Database error".to_string()
        })
}
