use crate::db::ChatStore;
use crate::helpers::ApiError;
use actix_web::{get, web, Responder, Result};
use std::sync::Arc;

/// GET /api/conversations/{user_id}
/// Returns the saved conversation of a user; empty list when there is none.
#[tracing::instrument(name = "Get conversations.", skip(store))]
#[get("/conversations/{user_id}")]
pub async fn history_handler(
    path: web::Path<(String,)>,
    store: web::Data<Arc<dyn ChatStore>>,
) -> Result<impl Responder, ApiError> {
    let user_id = path.0.as_str();
    store
        .conversations(user_id)
        .await
        .map(web::Json)
        .map_err(ApiError::Persistence)
}
