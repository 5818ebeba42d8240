//! 统一结果信封
//!
//! ApiResponse 是网关的原始结果（成功载荷 / 分类后的失败），
//! Outcome 是工具调用归一化后交给编排循环的结果。Outcome 用枚举表达，
//! 成功时只有 data，失败时只有错误信息，二者不会同时存在。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 后端错误分类（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "authentication_error")]
    Authentication,
    #[serde(rename = "permission_error")]
    Permission,
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "not_found_error")]
    NotFound,
    #[serde(rename = "timeout_error")]
    Timeout,
    #[serde(rename = "connection_error")]
    Connection,
    #[serde(rename = "json_decode_error")]
    JsonDecode,
    #[serde(rename = "unexpected_error", other)]
    Unexpected,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Authentication,
        ErrorKind::Permission,
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::Timeout,
        ErrorKind::Connection,
        ErrorKind::JsonDecode,
        ErrorKind::Unexpected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::Permission => "permission_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found_error",
            ErrorKind::Timeout => "timeout_error",
            ErrorKind::Connection => "connection_error",
            ErrorKind::JsonDecode => "json_decode_error",
            ErrorKind::Unexpected => "unexpected_error",
        }
    }

    /// 是否值得在网关层重试
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Connection)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 网关失败详情
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub kind: ErrorKind,
    /// 原始错误信息（只写日志，不直接展示给用户）
    pub message: String,
    pub status: Option<u16>,
    pub details: Option<Value>,
}

impl ApiFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// 网关原始结果
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Success { status: u16, data: Value },
    Failure(ApiFailure),
}

/// 工具调用的归一化结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        data: Value,
        /// 预先格式化的展示文本；存在时观察消息优先使用它
        summary: Option<String>,
    },
    Failure {
        kind: ErrorKind,
        /// 原始错误信息
        message: String,
        /// 可直接展示给用户的信息
        user_message: String,
    },
}

impl Outcome {
    pub fn success(data: Value) -> Self {
        Outcome::Success {
            data,
            summary: None,
        }
    }

    pub fn success_with_summary(data: Value, summary: impl Into<String>) -> Self {
        Outcome::Success {
            data,
            summary: Some(summary.into()),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, user_message: impl Into<String>) -> Self {
        Outcome::Failure {
            kind,
            message: message.into(),
            user_message: user_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Success { data, .. } => Some(data),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Outcome::Success { summary, .. } => summary.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Failure { message, .. } => Some(message),
            Outcome::Success { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Failure { kind, .. } => Some(*kind),
            Outcome::Success { .. } => None,
        }
    }

    pub fn user_message(&self) -> Option<&str> {
        match self {
            Outcome::Failure { user_message, .. } => Some(user_message),
            Outcome::Success { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<&'a str>,
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            success: self.is_success(),
            data: self.data(),
            summary: self.summary(),
            error_message: self.error_message(),
            error_kind: self.error_kind(),
            user_message: self.user_message(),
        }
        .serialize(serializer)
    }
}
