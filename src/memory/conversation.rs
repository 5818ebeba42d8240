//! 对话记录
//!
//! 每个会话一份有序消息列表：以一条 system 消息开头，之后只追加。
//! 可选的保留上限只在两轮请求之间生效，单轮内绝不删除或改写消息。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 用户的真实输入（observation 也以 user 角色写入，需排除）
    fn starts_turn(&self) -> bool {
        self.role == Role::User && !self.content.trim_start().starts_with(r#"{"step":"observe""#)
    }
}

/// 单个会话的消息记录
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// 新会话：仅含一条 system 消息
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 保留开头的 system 消息与最近至多 max_messages 条，其余丢弃；返回丢弃条数
    ///
    /// 切点总落在某轮用户输入上，保留的历史不会以孤立的 assistant 回复或 observation 开头。
    /// 最近一轮本身超过上限时整轮保留。
    pub fn retain_recent(&mut self, max_messages: usize) -> usize {
        let head = self
            .messages
            .iter()
            .take_while(|m| m.role == Role::System)
            .count();
        let body = self.messages.len() - head;
        if body <= max_messages {
            return 0;
        }
        let cut = head + (body - max_messages);
        let start = (cut..self.messages.len())
            .find(|&i| self.messages[i].starts_turn())
            .or_else(|| (head..cut).rev().find(|&i| self.messages[i].starts_turn()))
            .unwrap_or(head);
        self.messages.drain(head..start);
        start - head
    }
}
