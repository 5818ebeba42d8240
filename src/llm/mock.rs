//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 按顺序返回预置回复；预置用尽后回显最后一条 User 消息为 output 指令，
//! 并记录每次调用收到的消息列表，便于断言编排循环的行为。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一组原始回复构建
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::default();
        for r in replies {
            mock.push_reply(r);
        }
        mock
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
    }

    /// 已发生的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 第 n 次调用收到的消息列表
    pub fn call(&self, n: usize) -> Option<Vec<Message>> {
        self.calls.lock().ok().and_then(|c| c.get(n).cloned())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        if let Some(reply) = next {
            return reply;
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(serde_json::json!({
            "step": "output",
            "content": format!("Echo from Mock: {}", last_user),
        })
        .to_string())
    }
}
