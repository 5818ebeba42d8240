//! 模型指令解析
//!
//! 模型每轮必须回复单个 JSON 对象：
//! `{"step":"plan","thinking":..}` / `{"step":"action","function":..,"input":..}` / `{"step":"output","content":..}`。
//! 允许包裹在 ```json 代码块中；非 JSON 或非对象视为格式错误。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// output 指令缺少 content 时的回复
pub const MISSING_OUTPUT_CONTENT: &str = "I couldn't process your request properly.";

/// 解析后的模型指令
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Plan {
        thinking: String,
    },
    Action {
        /// 缺失时为空串，按未知工具处理
        function: String,
        input: Value,
    },
    Output {
        content: String,
    },
    /// 未识别的 step（包括缺失 step 或模型自己输出 observe）
    Unknown {
        step: Option<String>,
        content: Option<String>,
    },
}

impl Directive {
    pub fn step_name(&self) -> &str {
        match self {
            Directive::Plan { .. } => "plan",
            Directive::Action { .. } => "action",
            Directive::Output { .. } => "output",
            Directive::Unknown { step, .. } => step.as_deref().unwrap_or("<missing>"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("Model reply is not a JSON object: {0}")]
    InvalidFormat(String),
}

/// 去掉 ```json ... ``` 或 ``` ... ``` 包裹
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// 解析模型原始回复
pub fn parse_directive(raw: &str) -> Result<Directive, DirectiveError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| DirectiveError::InvalidFormat(e.to_string()))?;
    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(DirectiveError::InvalidFormat(format!(
                "expected an object, got {}",
                json_type_name(&other)
            )))
        }
    };

    let step = obj.get("step").and_then(Value::as_str).map(|s| s.trim().to_lowercase());
    let directive = match step.as_deref() {
        Some("plan") => Directive::Plan {
            thinking: text_field(&obj, "thinking")
                .or_else(|| text_field(&obj, "content"))
                .unwrap_or_default(),
        },
        Some("action") => Directive::Action {
            function: obj
                .get("function")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            input: obj.get("input").cloned().unwrap_or(Value::Null),
        },
        Some("output") => Directive::Output {
            content: text_field(&obj, "content").unwrap_or_else(|| MISSING_OUTPUT_CONTENT.to_string()),
        },
        _ => Directive::Unknown {
            step: obj.get("step").map(|s| s.as_str().map(str::to_string).unwrap_or_else(|| s.to_string())),
            content: text_field(&obj, "content"),
        },
    };
    Ok(directive)
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 指令格式（仅用于生成 JSON Schema 注入 system prompt）
#[allow(dead_code)]
#[derive(Serialize, Deserialize, JsonSchema)]
struct DirectiveFormat {
    /// 当前步骤
    step: DirectiveStep,
    /// plan：思考过程
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<String>,
    /// action：要调用的工具名
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    /// action：工具参数，对象（按参数名）或单个值
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
    /// output：给用户的最终回答
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[allow(dead_code)]
#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum DirectiveStep {
    Plan,
    Action,
    Output,
}

/// 返回指令格式的 JSON Schema 字符串，可拼入 system prompt
pub fn directive_schema_json() -> String {
    let schema = schema_for!(DirectiveFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_each_step() {
        assert_eq!(
            parse_directive(r#"{"step":"plan","thinking":"look up attendance"}"#).unwrap(),
            Directive::Plan { thinking: "look up attendance".into() }
        );
        assert_eq!(
            parse_directive(r#"{"step":"action","function":"get_attendance_overview","input":{"period":"today"}}"#)
                .unwrap(),
            Directive::Action {
                function: "get_attendance_overview".into(),
                input: json!({"period": "today"}),
            }
        );
        assert_eq!(
            parse_directive(r#"{"step":"output","content":"All good"}"#).unwrap(),
            Directive::Output { content: "All good".into() }
        );
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        assert_eq!(
            parse_directive(r#"{"step":"action"}"#).unwrap(),
            Directive::Action { function: String::new(), input: Value::Null }
        );
        assert_eq!(
            parse_directive(r#"{"step":"output"}"#).unwrap(),
            Directive::Output { content: MISSING_OUTPUT_CONTENT.into() }
        );
    }

    #[test]
    fn test_unknown_steps() {
        assert_eq!(
            parse_directive(r#"{"step":"observe","content":"hmm"}"#).unwrap(),
            Directive::Unknown { step: Some("observe".into()), content: Some("hmm".into()) }
        );
        assert_eq!(
            parse_directive(r#"{"answer": 42}"#).unwrap(),
            Directive::Unknown { step: None, content: None }
        );
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let raw = "```json\n{\"step\":\"output\",\"content\":\"hi\"}\n```";
        assert_eq!(parse_directive(raw).unwrap(), Directive::Output { content: "hi".into() });
    }

    #[test]
    fn test_invalid_format() {
        assert!(parse_directive("Sure! Here is the data").is_err());
        assert!(parse_directive("[1, 2]").is_err());
        assert!(parse_directive("").is_err());
    }

    #[test]
    fn test_schema_mentions_steps() {
        let schema = directive_schema_json();
        assert!(schema.contains("\"plan\""));
        assert!(schema.contains("\"function\""));
    }
}
