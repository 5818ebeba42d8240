//! 无界面聊天服务
//!
//! 供 HTTP API 与终端 REPL 共用：
//! create_agent_components 构建 LLM / HR 网关 / 工具执行器 / 编排器，
//! ChatService::chat 解析凭证、定位会话、跑一轮编排并返回回复。

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::backend::{create_gateway_from_config, BusinessClock, HrGateway};
use crate::config::{AppConfig, FallbackLoginSection};
use crate::core::{AgentError, ShutdownManager};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::Message;
use crate::react::{build_system_prompt, load_persona, Orchestrator, ReactEvent, TerminalState};
use crate::session::{ConversationStore, MemoryConversationStore};
use crate::tools::{hr_registry, ToolContext, ToolExecutor};

/// 角色设定覆盖文件的查找顺序
const PERSONA_PATHS: [&str; 2] = ["config/prompts/system.md", "../config/prompts/system.md"];

/// 预构建的 Agent 组件，可多会话共享
pub struct AgentComponents {
    pub orchestrator: Orchestrator,
    pub gateway: Arc<dyn HrGateway>,
    pub system_prompt: String,
    pub clock: BusinessClock,
}

/// 从配置创建组件：LLM 客户端与 HR 网关按配置构建
pub fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    let llm = create_llm_from_config(cfg);
    let gateway = create_gateway_from_config(&cfg.backend)?;
    assemble_components(cfg, llm, gateway)
}

/// 以给定的 LLM 与网关组装组件（测试与离线演示注入 Mock / Fake）
pub fn assemble_components(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    gateway: Arc<dyn HrGateway>,
) -> Result<AgentComponents, AgentError> {
    let registry = Arc::new(hr_registry()?);
    let persona = PERSONA_PATHS.iter().find_map(|p| load_persona(Path::new(p)));
    let system_prompt = build_system_prompt(persona.as_deref(), &registry);
    let executor = Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs));

    Ok(AgentComponents {
        orchestrator: Orchestrator::new(llm, executor, cfg.app.max_iterations),
        gateway,
        system_prompt,
        clock: BusinessClock::new(cfg.app.utc_offset_minutes),
    })
}

/// POST /chat 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// 一轮对话的回复
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    /// RFC 3339
    pub timestamp: String,
}

/// 聊天服务：组件 + 会话存储 + 凭证策略
pub struct ChatService {
    components: AgentComponents,
    store: Arc<dyn ConversationStore>,
    shutdown: Arc<ShutdownManager>,
    fallback_login: FallbackLoginSection,
    max_history_messages: Option<usize>,
}

impl ChatService {
    pub fn new(cfg: &AppConfig, components: AgentComponents, shutdown: Arc<ShutdownManager>) -> Self {
        Self {
            components,
            store: Arc::new(MemoryConversationStore::new()),
            shutdown,
            fallback_login: cfg.backend.fallback_login.clone(),
            max_history_messages: cfg.app.max_history_messages,
        }
    }

    pub fn from_config(cfg: &AppConfig, shutdown: Arc<ShutdownManager>) -> Result<Self, AgentError> {
        Ok(Self::new(cfg, create_agent_components(cfg)?, shutdown))
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.components.orchestrator.executor().tool_names()
    }

    pub async fn conversation_count(&self) -> usize {
        self.store.len().await
    }

    /// 派生请求级取消令牌（服务关闭时一并取消）
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.request_token()
    }

    /// 解析本次请求的 HR 凭证：请求头 token 优先，其次是开启时的兜底登录
    pub async fn resolve_credential(&self, bearer: Option<&str>) -> Result<String, AgentError> {
        if let Some(token) = bearer.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        if !self.fallback_login.enabled {
            return Err(AgentError::Unauthorized("Authorization header is required".into()));
        }
        let (Some(email), Some(password)) = (
            self.fallback_login.email.as_deref(),
            self.fallback_login.password.as_deref(),
        ) else {
            return Err(AgentError::Unauthorized("fallback login is not configured".into()));
        };
        tracing::info!("No token provided, using fallback credentials");
        self.components.gateway.login(email, password).await.map_err(|e| {
            tracing::error!(error = %e, "Fallback login failed");
            AgentError::Unauthorized("Authentication required and fallback failed".into())
        })
    }

    /// 处理一条用户消息
    ///
    /// 同一会话在整轮期间持有会话锁；保留上限在本轮结束后才生效。
    pub async fn chat(
        &self,
        request: ChatRequest,
        bearer: Option<&str>,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<ChatReply, AgentError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AgentError::InvalidRequest("message must not be empty".into()));
        }
        let token = self.resolve_credential(bearer).await?;

        let conversation_id = request
            .conversation_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!(conversation_id = %conversation_id, chars = message.chars().count(), "Chat request received");

        let handle = self
            .store
            .get_or_create(&conversation_id, &self.components.system_prompt)
            .await;
        let mut conversation = handle.lock().await;

        let ctx = ToolContext::new(self.components.gateway.clone(), Some(token), self.components.clock);
        let result = self
            .components
            .orchestrator
            .run_turn(&mut conversation, message, &ctx, cancel, events)
            .await;

        if let Some(max) = self.max_history_messages {
            let dropped = conversation.retain_recent(max);
            if dropped > 0 {
                tracing::debug!(conversation_id = %conversation_id, dropped, "Trimmed conversation history");
            }
        }
        if result.state != TerminalState::Completed {
            tracing::warn!(conversation_id = %conversation_id, state = ?result.state, "Turn ended without output");
        }

        Ok(ChatReply {
            response: result.response,
            conversation_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Vec<Message>, AgentError> {
        self.store
            .snapshot(id)
            .await
            .ok_or_else(|| AgentError::ConversationNotFound(id.to_string()))
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), AgentError> {
        if self.store.delete(id).await {
            tracing::info!(conversation_id = %id, "Conversation deleted");
            Ok(())
        } else {
            Err(AgentError::ConversationNotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::backend::FakeGateway;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;

    fn service(cfg: &AppConfig, llm: Arc<MockLlmClient>, gateway: FakeGateway) -> ChatService {
        let components = assemble_components(cfg, llm, Arc::new(gateway)).unwrap();
        ChatService::new(cfg, components, Arc::new(ShutdownManager::new()))
    }

    fn request(message: &str, conversation_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            conversation_id: conversation_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_chat_creates_conversation() {
        let cfg = AppConfig::default();
        let svc = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new());

        let reply = svc
            .chat(request("hello", None), Some("tok"), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(reply.response, "Echo from Mock: hello");
        assert!(uuid::Uuid::parse_str(&reply.conversation_id).is_ok());
        let messages = svc.get_conversation(&reply.conversation_id).await.unwrap();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_token_is_forwarded_to_backend() {
        let cfg = AppConfig::default();
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_all_employees"}"#,
            r#"{"step":"output","content":"done"}"#,
        ]));
        let gateway = Arc::new(FakeGateway::new().ok("/employees", &[], json!({"data": []})));
        let components = assemble_components(&cfg, llm, gateway.clone()).unwrap();
        let svc = ChatService::new(&cfg, components, Arc::new(ShutdownManager::new()));

        svc.chat(request("list", Some("c1")), Some("Bearer-less-token"), &CancellationToken::new(), None)
            .await
            .unwrap();

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.as_deref(), Some("Bearer-less-token"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected() {
        let cfg = AppConfig::default();
        let llm = Arc::new(MockLlmClient::new());
        let svc = service(&cfg, llm.clone(), FakeGateway::new().with_login_token("t"));

        let err = svc
            .chat(request("hi", None), None, &CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Unauthorized(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_login_when_enabled() {
        let mut cfg = AppConfig::default();
        cfg.backend.fallback_login = FallbackLoginSection {
            enabled: true,
            email: Some("hr@example.com".into()),
            password: Some("secret".into()),
        };
        let svc = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new().with_login_token("fallback"));
        assert_eq!(svc.resolve_credential(None).await.unwrap(), "fallback");
        assert_eq!(svc.resolve_credential(Some("  own ")).await.unwrap(), "own");

        let rejecting = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new());
        assert!(matches!(
            rejecting.resolve_credential(None).await,
            Err(AgentError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_message_is_invalid() {
        let cfg = AppConfig::default();
        let svc = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new());
        let err = svc
            .chat(request("   ", None), Some("tok"), &CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_history_retention_applies_between_turns() {
        let mut cfg = AppConfig::default();
        cfg.app.max_history_messages = Some(2);
        let svc = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new());
        let cancel = CancellationToken::new();

        for text in ["one", "two", "three"] {
            svc.chat(request(text, Some("c1")), Some("tok"), &cancel, None).await.unwrap();
        }

        let messages = svc.get_conversation("c1").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "three");
    }

    #[tokio::test]
    async fn test_delete_conversation() {
        let cfg = AppConfig::default();
        let svc = service(&cfg, Arc::new(MockLlmClient::new()), FakeGateway::new());
        svc.chat(request("hi", Some("c1")), Some("tok"), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(svc.conversation_count().await, 1);

        svc.delete_conversation("c1").await.unwrap();
        assert!(matches!(
            svc.delete_conversation("c1").await,
            Err(AgentError::ConversationNotFound(_))
        ));
        assert!(svc.get_conversation("c1").await.is_err());
    }
}
