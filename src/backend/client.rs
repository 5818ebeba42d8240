//! HR 后端网关：HTTP 调用、状态码分类、瞬时错误重试、登录换取令牌
//!
//! 共享的 HttpHrGateway 不保存任何凭证，令牌随每次请求传入。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::backend::outcome::{ApiFailure, ApiResponse, ErrorKind};
use crate::config::BackendSection;
use crate::core::AgentError;

const USER_AGENT: &str = concat!("HR-Buddy/", env!("CARGO_PKG_VERSION"));

/// 一次后端请求；endpoint 相对于 `{base_url}/api`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// 值为 None 时不追加
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// HR 后端抽象；测试中用内存实现替换
#[async_trait]
pub trait HrGateway: Send + Sync {
    /// 执行请求；失败已分类，不会 panic 或返回 Err
    async fn request(&self, req: ApiRequest, token: Option<&str>) -> ApiResponse;

    /// 用账号密码换取 bearer 令牌
    async fn login(&self, email: &str, password: &str) -> Result<String, AgentError>;
}

/// 非 2xx 状态码 -> 失败分类（纯函数）
pub fn classify_status(status: u16, body: Option<&Value>) -> ApiFailure {
    let failure = match status {
        401 => ApiFailure::new(ErrorKind::Authentication, "Authentication required or token expired"),
        403 => ApiFailure::new(
            ErrorKind::Permission,
            "Insufficient permissions to access this resource",
        ),
        404 => ApiFailure::new(ErrorKind::NotFound, "Resource not found or endpoint does not exist"),
        400 => {
            let detail = body
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Invalid request parameters");
            let failure = ApiFailure::new(ErrorKind::Validation, format!("Bad request: {}", detail));
            match body {
                Some(b) => failure.with_details(b.clone()),
                None => failure,
            }
        }
        other => ApiFailure::new(ErrorKind::Unexpected, format!("HTTP {} from HR backend", other)),
    };
    failure.with_status(status)
}

/// reqwest 传输错误 -> 失败分类
fn classify_transport(err: &reqwest::Error) -> ApiFailure {
    if err.is_timeout() {
        ApiFailure::new(
            ErrorKind::Timeout,
            "Request timed out. The server might be busy, please try again.",
        )
    } else if err.is_connect() {
        ApiFailure::new(
            ErrorKind::Connection,
            "Unable to connect to the server. Please check your internet connection.",
        )
    } else {
        ApiFailure::new(ErrorKind::Unexpected, format!("Unexpected error: {}", err))
    }
}

/// 第 attempt 次重试前的等待：base × 1.5^attempt
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1.5_f64.powi(attempt as i32);
    Duration::from_millis((base_ms as f64 * factor) as u64)
}

/// 基于 reqwest 的 HR 后端网关
pub struct HttpHrGateway {
    client: Client,
    api_base: String,
    max_attempts: u32,
    retry_delay_ms: u64,
}

impl HttpHrGateway {
    pub fn new(cfg: &BackendSection) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AgentError::ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: format!("{}/api", cfg.base_url.trim_end_matches('/')),
            max_attempts: cfg.max_retries.max(1),
            retry_delay_ms: cfg.retry_delay_ms,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint.trim_start_matches('/'))
    }

    async fn send_once(&self, req: &ApiRequest, token: Option<&str>) -> ApiResponse {
        let mut builder = self
            .client
            .request(req.method.clone(), self.url(&req.endpoint))
            .query(&req.query);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = match builder.send().await {
            Ok(r) => r,
            Err(e) => return ApiResponse::Failure(classify_transport(&e)),
        };
        let status = resp.status();
        let text = match resp.text().await {
            Ok(t) => t,
            Err(e) => return ApiResponse::Failure(classify_transport(&e).with_status(status.as_u16())),
        };
        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            return ApiResponse::Failure(classify_status(status.as_u16(), parsed.as_ref()));
        }
        match parsed {
            Some(data) => ApiResponse::Success {
                status: status.as_u16(),
                data,
            },
            None => ApiResponse::Failure(
                ApiFailure::new(ErrorKind::JsonDecode, "Invalid JSON response from server")
                    .with_status(status.as_u16()),
            ),
        }
    }
}

#[async_trait]
impl HrGateway for HttpHrGateway {
    async fn request(&self, req: ApiRequest, token: Option<&str>) -> ApiResponse {
        let mut attempt = 0;
        loop {
            let response = self.send_once(&req, token).await;
            let transient = matches!(&response, ApiResponse::Failure(f) if f.kind.is_transient());
            attempt += 1;
            if !transient || attempt >= self.max_attempts {
                if transient {
                    tracing::error!(endpoint = %req.endpoint, attempts = attempt, "All attempts to HR backend failed");
                }
                return response;
            }
            let delay = backoff_delay(self.retry_delay_ms, attempt - 1);
            tracing::warn!(
                endpoint = %req.endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "HR backend request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<String, AgentError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AgentError::Backend(format!("login request failed: {}", e)))?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AgentError::Unauthorized("login rejected by HR backend".into()));
        }
        if !status.is_success() {
            return Err(AgentError::Backend(format!("login returned HTTP {}", status)));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AgentError::Backend(format!("login response: {}", e)))?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AgentError::Backend("token not found in login response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(classify_status(401, None).kind, ErrorKind::Authentication);
        assert_eq!(classify_status(403, None).kind, ErrorKind::Permission);
        assert_eq!(classify_status(404, None).kind, ErrorKind::NotFound);
        assert_eq!(classify_status(500, None).kind, ErrorKind::Unexpected);
        assert_eq!(classify_status(502, None).status, Some(502));
    }

    #[test]
    fn test_classify_bad_request_keeps_body() {
        let body = json!({"message": "endDate is required"});
        let failure = classify_status(400, Some(&body));
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(failure.message, "Bad request: endDate is required");
        assert_eq!(failure.details, Some(body));
    }

    #[test]
    fn test_backoff_grows() {
        assert_eq!(backoff_delay(500, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(750));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1125));
    }

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::get("/hr/attendance")
            .query("operation", "records")
            .query("page", 1)
            .query_opt("employeeName", None::<String>);
        assert_eq!(req.query_value("operation"), Some("records"));
        assert_eq!(req.query_value("page"), Some("1"));
        assert_eq!(req.query_value("employeeName"), None);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_classified() {
        let cfg = BackendSection {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            max_retries: 1,
            retry_delay_ms: 1,
            ..BackendSection::default()
        };
        let gateway = HttpHrGateway::new(&cfg).unwrap();
        match gateway.request(ApiRequest::get("/employees"), Some("t")).await {
            ApiResponse::Failure(f) => assert!(f.kind.is_transient() || f.kind == ErrorKind::Unexpected),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
