//! 会话层：conversation_id -> 对话记录

pub mod store;

pub use store::{ConversationHandle, ConversationStore, MemoryConversationStore};
