//! Conversation store and model invoker.

pub mod history;
pub mod invoker;
pub mod message;

pub use history::Conversation;
pub use invoker::ModelInvoker;
pub use message::{ChatMessage, ChatRole};
