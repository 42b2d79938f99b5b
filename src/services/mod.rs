pub mod context;
pub mod extraction;
pub mod remote;
pub mod summary;

pub use summary::Summarizer;
