//! External Service Connectors
//!
//! Adapters for the services chatdesk talks to: the generative text API,
//! object storage and OCR. Every integration goes through a connector so the
//! routes stay independent of the HTTP details and testable.
//!
//! ## Architecture Pattern
//!
//! 1. Define trait in `{service}.rs` → allows mocking in tests
//! 2. Implement HTTP client in same file, with an adapter that maps every known
//!    upstream response shape onto one normalized type
//! 3. Configuration in `config.rs` → enable/disable per environment
//! 4. Inject trait object into routes → disabled connectors fall back to mocks
//!
//! ## Usage in Routes
//!
//! ```ignore
//! pub async fn handler(
//!     llm: web::Data<Arc<dyn LlmConnector>>,
//! ) -> Result<impl Responder> {
//!     let completion = llm.generate(&context).await?;
//! }
//! ```

pub mod config;
pub mod errors;
pub mod llm;
pub mod ocr;
pub mod storage;

pub use config::{ConnectorConfig, LlmConfig, OcrConfig, StorageConfig};
pub use errors::ConnectorError;
pub use llm::{Completion, GeminiClient, LlmConnector};
pub use ocr::{OcrConnector, OcrSpaceClient};
pub use storage::{CloudinaryClient, StorageConnector, StoredObject};

pub use llm::init as init_llm;
pub use llm::init_summarizer;
pub use ocr::init as init_ocr;
pub use storage::init as init_storage;
