//! 响应归一化
//!
//! 把网关的 ApiResponse 转成 Outcome：失败按错误分类套用固定模板生成用户可读信息
//! （原始信息只进日志），成功时剥掉后端外层 `{success, data}` 并附加展示摘要。

use serde_json::Value;

use crate::backend::outcome::{ApiFailure, ApiResponse, ErrorKind, Outcome};

/// 错误分类 -> 用户可读信息（纯函数，覆盖全部分类）
pub fn user_message(kind: ErrorKind, raw: &str, details: Option<&Value>) -> String {
    match kind {
        ErrorKind::Authentication => {
            "It seems your session has expired. Please log in again to access this information."
                .to_string()
        }
        ErrorKind::Permission => {
            "You don't have permission to access this information. Please contact your HR administrator."
                .to_string()
        }
        ErrorKind::Validation => {
            // 后端校验信息本身面向用户，可以透出
            let detail = details
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .unwrap_or(raw);
            if detail.is_empty() {
                "There was an issue with the request format. Please check the details and try again."
                    .to_string()
            } else {
                format!("There was an issue with the request format. {}", detail)
            }
        }
        ErrorKind::NotFound => {
            "The requested information could not be found. It may not exist or may have been moved."
                .to_string()
        }
        ErrorKind::Timeout => {
            "The HR system took too long to respond. The server might be busy, please try again in a moment."
                .to_string()
        }
        ErrorKind::Connection => {
            "I couldn't reach the HR system right now. Please check the connection and try again."
                .to_string()
        }
        ErrorKind::JsonDecode => {
            "The HR system returned data I couldn't read. Please try again later.".to_string()
        }
        ErrorKind::Unexpected => {
            "I'm unable to retrieve that information right now due to a system error. Please try again later or contact support if the issue persists."
                .to_string()
        }
    }
}

/// 失败 -> Outcome，记录原始信息
pub fn failure_outcome(operation: &str, failure: &ApiFailure) -> Outcome {
    tracing::error!(
        operation,
        kind = %failure.kind,
        status = ?failure.status,
        message = %failure.message,
        "Backend call failed"
    );
    Outcome::failure(
        failure.kind,
        failure.message.clone(),
        user_message(failure.kind, &failure.message, failure.details.as_ref()),
    )
}

/// 取出后端外层 `{success, data}` 中的载荷；没有 data 字段时返回整个 body
pub fn unwrap_payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// ApiResponse -> Outcome
///
/// 后端以 200 返回 `{"success": false, "message": ...}` 时同样视为失败。
pub fn normalize<F>(operation: &str, response: ApiResponse, summarize: F) -> Outcome
where
    F: FnOnce(&Value) -> Option<String>,
{
    match response {
        ApiResponse::Failure(failure) => failure_outcome(operation, &failure),
        ApiResponse::Success { status, data } => {
            if data.get("success").and_then(Value::as_bool) == Some(false) {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Backend reported failure")
                    .to_string();
                let failure = ApiFailure::new(ErrorKind::Unexpected, message)
                    .with_status(status)
                    .with_details(data);
                return failure_outcome(operation, &failure);
            }
            let payload = unwrap_payload(data);
            match summarize(&payload) {
                Some(summary) => Outcome::success_with_summary(payload, summary),
                None => Outcome::success(payload),
            }
        }
    }
}
