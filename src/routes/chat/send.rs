use crate::configuration::ChatSettings;
use crate::connectors::LlmConnector;
use crate::db::ChatStore;
use crate::forms;
use crate::helpers::ApiError;
use crate::models::{Message, Role};
use crate::services::context;
use actix_web::{post, web, Responder, Result};
use serde::Serialize;
use serde_valid::Validate;
use std::sync::Arc;

/// Reply used when the model returns no candidate text.
pub const NO_RESPONSE: &str = "No response.";

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /api/chat
/// Answers the submitted session with the user's recent memory as context,
/// then records the turns added since the last reply together with the answer.
#[tracing::instrument(name = "Chat request.", skip_all)]
#[post("/chat")]
pub async fn send_handler(
    web::Json(form): web::Json<forms::ChatRequest>,
    store: web::Data<Arc<dyn ChatStore>>,
    llm: web::Data<Arc<dyn LlmConnector>>,
    settings: web::Data<ChatSettings>,
) -> Result<impl Responder, ApiError> {
    let user_id = form
        .user_id()
        .ok_or_else(|| ApiError::validation("userId is required in request body"))?
        .to_string();

    if let Err(errors) = form.validate() {
        tracing::debug!("Invalid chat request: {}", errors);
        return Err(ApiError::validation(format!(
            "Invalid chat request: {}",
            errors
        )));
    }
    if !form.has_only_chat_roles() {
        return Err(ApiError::validation(
            "messages may only contain user and assistant turns",
        ));
    }

    let memory: Vec<Message> = store
        .recent_memory(&user_id, settings.memory_limit)
        .await
        .map_err(ApiError::Persistence)?
        .iter()
        .map(Message::from)
        .collect();

    let context = context::assemble(&memory, &form.messages, settings.token_budget);
    tracing::debug!(
        user_id = %user_id,
        memory = memory.len(),
        submitted = form.messages.len(),
        context = context.len(),
        "Context assembled"
    );

    let completion = llm.generate(&context).await.map_err(|err| {
        tracing::error!("LLM call failed: {}", err);
        ApiError::from(err)
    })?;
    let reply = completion
        .text
        .unwrap_or_else(|| NO_RESPONSE.to_string());

    // clients resend their session; earlier turns are already recorded
    let submitted = context::new_turns(&form.messages);
    let assistant = Message::assistant(reply.clone());
    let mut exchange = submitted.to_vec();
    exchange.push(assistant.clone());

    let mut remembered = Vec::with_capacity(2);
    if settings.persist_user_turns {
        if let Some(turn) = submitted.iter().rev().find(|m| m.role == Role::User) {
            remembered.push(turn.clone());
        }
    }
    remembered.push(assistant);

    store
        .save_exchange(&user_id, &exchange, &remembered)
        .await
        .map_err(ApiError::Persistence)?;

    Ok(web::Json(ChatReply { reply }))
}
