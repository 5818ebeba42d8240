//! 服务级错误类型
//!
//! 编排循环本身不向外抛错（所有失败都转为自然语言回复），AgentError 只出现在
//! 组件构建、凭证解析、会话查找等循环之外的边界上。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    /// 请求未携带凭证，且兜底登录未开启或失败
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
