mod history;
mod send;

pub use history::*;
pub use send::*;
