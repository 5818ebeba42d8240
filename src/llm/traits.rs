//! LLM 客户端抽象
//!
//! 编排循环只需要一种调用：提交完整消息列表，要求模型以「单个 JSON 对象」作答。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 模型调用失败（超时、传输、API 错误、空回复）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM request could not be built: {0}")]
    InvalidRequest(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 强制 JSON 输出模式的非流式完成，返回原始文本
    async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
