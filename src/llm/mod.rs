//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// 根据 [llm] 配置创建客户端：provider = "mock" 时使用离线回显客户端
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.as_str() {
        "mock" => {
            tracing::info!("Using mock LLM client");
            Arc::new(MockLlmClient::new())
        }
        other => {
            if other != "openai" {
                tracing::warn!(provider = %other, "Unknown LLM provider, falling back to OpenAI-compatible client");
            }
            tracing::info!(model = %cfg.llm.model, "Using OpenAI-compatible LLM client");
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                cfg.llm.api_key.as_deref(),
                cfg.llm.timeouts.request,
            ))
        }
    }
}
