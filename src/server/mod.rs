//! HTTP API（axum）
//!
//! 路由：`GET /`、`GET /health`、`POST /chat`、`GET|DELETE /conversations/:id`。
//! 错误统一为 `{"detail": ...}` JSON。

mod handlers;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::ChatService;
use crate::config::ServerSection;

pub use handlers::ApiError;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
    pub app_name: String,
}

/// 构建路由
pub fn router(state: AppState, server: &ServerSection) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route(
            "/conversations/:id",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

/// CORS：配置 "*" 时放开全部来源，否则只允许列出的来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
