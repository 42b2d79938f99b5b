mod conversation;
mod memory;
mod message;
pub mod registry;
mod upload;

pub use conversation::*;
pub use memory::*;
pub use message::*;
pub use registry::ModelRegistry;
pub use upload::*;
