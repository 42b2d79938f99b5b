pub mod chat;
pub mod health_checks;
pub mod memory;
pub mod upload;

pub use health_checks::*;
