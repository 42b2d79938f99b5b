use crate::db::ChatStore;
use crate::helpers::ApiError;
use actix_web::{delete, web, Responder, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub deleted: u64,
}

/// DELETE /api/memory/{user_id}
/// Forgets every remembered turn of the user. The conversation log is kept.
#[tracing::instrument(name = "Clear memory.", skip(store))]
#[delete("/memory/{user_id}")]
pub async fn clear_handler(
    path: web::Path<(String,)>,
    store: web::Data<Arc<dyn ChatStore>>,
) -> Result<impl Responder, ApiError> {
    let deleted = store
        .clear_memory(&path.0)
        .await
        .map_err(ApiError::Persistence)?;
    tracing::info!(user_id = %path.0, deleted, "Memory cleared");
    Ok(web::Json(Cleared { deleted }))
}
