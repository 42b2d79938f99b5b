use super::ApiError;
use actix_web::{error, web};

/// JSON extractor config: malformed bodies become `400 {"error": ..}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let msg = match &err {
            error::JsonPayloadError::Deserialize(err) => format!(
                "Invalid request body (line {}, column {}): {}",
                err.line(),
                err.column(),
                err
            ),
            _ => format!("Invalid request body: {}", err),
        };
        tracing::debug!("{}", msg);
        ApiError::Validation(msg).into()
    })
}
