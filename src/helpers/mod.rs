mod error;
pub(crate) mod json;

pub use error::ApiError;
pub use json::json_config;
