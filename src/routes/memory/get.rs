use crate::configuration::ChatSettings;
use crate::db::ChatStore;
use crate::helpers::ApiError;
use actix_web::{get, web, Responder, Result};
use std::sync::Arc;

/// GET /api/memory/{user_id}
/// The memory window the next chat request would start from, oldest first.
#[tracing::instrument(name = "Get memory.", skip(store, settings))]
#[get("/memory/{user_id}")]
pub async fn list_handler(
    path: web::Path<(String,)>,
    store: web::Data<Arc<dyn ChatStore>>,
    settings: web::Data<ChatSettings>,
) -> Result<impl Responder, ApiError> {
    store
        .recent_memory(&path.0, settings.memory_limit)
        .await
        .map(web::Json)
        .map_err(ApiError::Persistence)
}
