use crate::models::{registry, MemoryRecord, Message};
use sqlx::{PgConnection, PgPool};
use tracing::Instrument;

fn table() -> Result<&'static str, String> {
    registry::table(registry::MEMORY).map_err(|err| {
        tracing::error!("Memory model lookup failed: {}", err);
        "Memory storage is not registered".to_string()
    })
}

pub async fn insert(
    conn: &mut PgConnection,
    user_id: &str,
    messages: &[Message],
) -> Result<u64, String> {
    let table = table()?;
    let sql = format!("INSERT INTO {table} (user_id, role, content) VALUES ($1, $2, $3)");
    let mut inserted = 0;

    for message in messages {
        let query_span = tracing::info_span!("Saving memory", user_id = %user_id, role = message.role.as_str());
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(message.role)
            .bind(&message.content)
            .execute(&mut *conn)
            .instrument(query_span)
            .await
            .map_err(|err| {
                tracing::error!("Failed to save memory: {:?}", err);
                "Failed to save memory".to_string()
            })?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Newest `limit` rows of the user, returned oldest-first.
pub async fn fetch_recent(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<MemoryRecord>, String> {
    let table = table()?;
    let query_span = tracing::info_span!("Fetching memory", user_id = %user_id, limit = limit);
    let sql = format!(
        r#"
        SELECT id, user_id, role, content, created_at
        FROM {table}
        WHERE user_id = $1
        ORDER BY id DESC
        LIMIT $2
        "#
    );

    let mut records = sqlx::query_as::<_, MemoryRecord>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch memory: {:?}", err);
            "Database error".to_string()
        })?;

    records.reverse();
    Ok(records)
}

pub async fn delete_by_user(pool: &PgPool, user_id: &str) -> Result<u64, String> {
    let table = table()?;
    let query_span = tracing::info_span!("Clearing memory", user_id = %user_id);
    let sql = format!("DELETE FROM {table} WHERE user_id = $1");

    sqlx::query(&sql)
        .bind(user_id)
        .execute(pool)
        .instrument(query_span)
        .await
        .map(|result| result.rows_affected())
        .map_err(|err| {
            tracing::error!("Failed to clear memory: {:?}", err);
            "Failed to clear memory".to_string()
        })
}
