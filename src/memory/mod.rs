//! 会话记忆：仅进程内的对话记录

pub mod conversation;

pub use conversation::{Conversation, Message, Role};
