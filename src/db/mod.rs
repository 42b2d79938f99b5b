pub mod conversation;
pub mod memory;
mod store;

pub use store::{init, mock, ChatStore, PgChatStore};
