//! 路由处理函数与错误映射

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::agent::{ChatReply, ChatRequest};
use crate::core::AgentError;
use crate::server::AppState;

/// 对外错误：状态码 + `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        let (status, detail) = match &e {
            AgentError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AgentError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AgentError::ConversationNotFound(_) => (StatusCode::NOT_FOUND, "Conversation not found".to_string()),
            AgentError::Backend(_) => (StatusCode::BAD_GATEWAY, "HR backend is unavailable".to_string()),
            AgentError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "Request failed");
        }
        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// 取出 `Authorization: Bearer <token>`；也接受不带前缀的裸 token
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub(super) async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API is running", state.app_name),
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.service.tool_names(),
    }))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "conversations": state.service.conversation_count().await,
    }))
}

/// 编排在独立任务中运行；客户端断开时 DropGuard 取消令牌，循环在下一个边界退出
pub(super) async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let bearer = bearer_token(&headers);
    let cancel = state.service.request_token();
    let _guard = cancel.clone().drop_guard();

    let service = state.service.clone();
    let task = tokio::spawn(async move { service.chat(request, bearer.as_deref(), &cancel, None).await });
    let reply = task.await.map_err(|e| {
        tracing::error!(error = %e, "Chat task aborted");
        ApiError::internal("Internal server error")
    })??;
    Ok(Json(reply))
}

pub(super) async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let messages = state.service.get_conversation(&id).await?;
    Ok(Json(json!({
        "conversation_id": id,
        "messages": messages,
    })))
}

pub(super) async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_conversation(&id).await?;
    Ok(Json(json!({ "message": "Conversation deleted successfully" })))
}
