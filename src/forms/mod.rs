pub mod chat;
pub mod upload;

pub use chat::ChatRequest;
pub use upload::UploadFromUrl;
