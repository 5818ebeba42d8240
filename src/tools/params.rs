//! 工具参数：声明、绑定与校验
//!
//! 模型给出的 input 形态不固定：null、标量、JSON 字符串或对象都可能出现。
//! 先绑定（按名或按位置），再按声明校验类型、补默认值。

use serde_json::{Map, Value};

use crate::backend::dates::{format_api_date, parse_date, Period};
use crate::tools::registry::ToolError;

/// 参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    /// YYYY-MM-DD（也接受 DD/MM/YYYY、DD-MM-YYYY）
    Date,
    /// today | yesterday | week | month | last_month | quarter
    Period,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            _ => "string",
        }
    }
}

/// 参数声明
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// 缺省值（按 kind 解析）
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        kind: ParamKind,
        default: Option<&'static str>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default,
            description,
        }
    }

    /// prompt 中的一行签名，如 `period: period = "month"`
    pub fn signature(&self) -> String {
        let kind = match self.kind {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Date => "date",
            ParamKind::Period => "period",
        };
        match (self.required, self.default) {
            (true, _) => format!("{}: {}", self.name, kind),
            (false, Some(d)) => format!("{}: {} = \"{}\"", self.name, kind, d),
            (false, None) => format!("{}?: {}", self.name, kind),
        }
    }
}

/// 绑定并校验后的参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.str(name)
            .ok_or_else(|| ToolError::InvalidArgs(format!("missing required parameter '{}'", name)))
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// 校验阶段已规范化，这里解析不会失败；缺失时返回 fallback
    pub fn period_or(&self, name: &str, fallback: Period) -> Period {
        self.str(name).and_then(|s| s.parse().ok()).unwrap_or(fallback)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// 参数声明 -> JSON Schema（object）
pub fn params_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    for p in params {
        let mut prop = serde_json::json!({
            "type": p.kind.json_type(),
            "description": p.description,
        });
        match p.kind {
            ParamKind::Period => prop["enum"] = serde_json::json!(Period::NAMES),
            ParamKind::Date => prop["format"] = Value::from("date"),
            _ => {}
        }
        if let Some(d) = p.default {
            prop["default"] = Value::from(d);
        }
        properties.insert(p.name.to_string(), prop);
    }
    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// 绑定 + 校验
pub fn resolve_args(params: &[ParamSpec], input: &Value) -> Result<ToolArgs, ToolError> {
    let bound = bind(params, input)?;
    validate(params, bound)
}

fn bind(params: &[ParamSpec], input: &Value) -> Result<Map<String, Value>, ToolError> {
    match input {
        Value::Null => Ok(Map::new()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
                return bind_mapping(params, map);
            }
            if trimmed.is_empty() {
                return Ok(Map::new());
            }
            bind_positional(params, vec![Value::String(trimmed.to_string())])
        }
        Value::Object(map) => bind_mapping(params, map.clone()),
        Value::Array(items) => bind_positional(params, items.clone()),
        scalar => bind_positional(params, vec![scalar.clone()]),
    }
}

fn bind_mapping(params: &[ParamSpec], map: Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
    let unknown: Vec<String> = map
        .keys()
        .filter(|k| !params.iter().any(|p| p.name == k.as_str()))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Ok(map);
    }
    // 键名全部对不上时，一到两个值按出现顺序当作位置参数；部分命中则只报未知键
    if unknown.len() == map.len() && map.len() <= 2 {
        return bind_positional(params, map.into_iter().map(|(_, v)| v).collect());
    }
    Err(ToolError::InvalidArgs(format!(
        "unknown parameter(s): {}; expected: {}",
        unknown.join(", "),
        expected_names(params)
    )))
}

fn bind_positional(params: &[ParamSpec], values: Vec<Value>) -> Result<Map<String, Value>, ToolError> {
    if values.len() > params.len() {
        return Err(ToolError::InvalidArgs(if params.is_empty() {
            "this tool takes no parameters".to_string()
        } else {
            format!(
                "too many values: got {}, expected at most {} ({})",
                values.len(),
                params.len(),
                expected_names(params)
            )
        }));
    }
    Ok(params
        .iter()
        .zip(values)
        .map(|(p, v)| (p.name.to_string(), v))
        .collect())
}

fn expected_names(params: &[ParamSpec]) -> String {
    if params.is_empty() {
        return "none".to_string();
    }
    params.iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
}

fn validate(params: &[ParamSpec], mut bound: Map<String, Value>) -> Result<ToolArgs, ToolError> {
    let mut values = Map::new();
    for p in params {
        // 可选参数传空串等同于未传
        let raw = bound
            .remove(p.name)
            .filter(|v| !v.is_null())
            .filter(|v| p.required || v.as_str().map_or(true, |s| !s.trim().is_empty()));
        let raw = match (raw, p.default) {
            (Some(v), _) => v,
            (None, Some(d)) => Value::from(d),
            (None, None) if p.required => {
                return Err(ToolError::InvalidArgs(format!(
                    "missing required parameter '{}'",
                    p.name
                )))
            }
            (None, None) => continue,
        };
        values.insert(p.name.to_string(), coerce(p, raw)?);
    }
    Ok(ToolArgs { values })
}

fn coerce(p: &ParamSpec, raw: Value) -> Result<Value, ToolError> {
    let invalid = |expected: &str| {
        ToolError::InvalidArgs(format!("parameter '{}' must be {}, got {}", p.name, expected, raw))
    };
    match p.kind {
        ParamKind::String => match &raw {
            Value::String(s) if !s.trim().is_empty() => Ok(Value::from(s.trim())),
            Value::Number(n) => Ok(Value::from(n.to_string())),
            Value::Bool(b) => Ok(Value::from(b.to_string())),
            _ => Err(invalid("a non-empty string")),
        },
        ParamKind::Integer => match &raw {
            Value::Number(n) if n.is_i64() => Ok(raw.clone()),
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid("an integer")),
            _ => Err(invalid("an integer")),
        },
        ParamKind::Date => raw
            .as_str()
            .and_then(parse_date)
            .map(|d| Value::from(format_api_date(d)))
            .ok_or_else(|| invalid("a date in YYYY-MM-DD format")),
        ParamKind::Period => raw
            .as_str()
            .and_then(|s| s.parse::<Period>().ok())
            .map(|period| Value::from(period.as_str()))
            .ok_or_else(|| invalid(&format!("one of {}", Period::NAMES.join(", ")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ANALYSIS: &[ParamSpec] = &[
        ParamSpec::required("employee_id", ParamKind::String, "Employee ID"),
        ParamSpec::optional("period", ParamKind::Period, Some("month"), "Period"),
    ];

    const RECORDS: &[ParamSpec] = &[
        ParamSpec::required("start_date", ParamKind::Date, "Start"),
        ParamSpec::required("end_date", ParamKind::Date, "End"),
        ParamSpec::optional("employee_name", ParamKind::String, None, "Name filter"),
        ParamSpec::optional("page", ParamKind::Integer, Some("1"), "Page"),
    ];

    #[test]
    fn test_null_applies_defaults() {
        let params = &[ParamSpec::optional("period", ParamKind::Period, Some("today"), "")];
        let args = resolve_args(params, &Value::Null).unwrap();
        assert_eq!(args.str("period"), Some("today"));
    }

    #[test]
    fn test_scalar_binds_to_first_param() {
        let args = resolve_args(ANALYSIS, &json!("EMP001")).unwrap();
        assert_eq!(args.str("employee_id"), Some("EMP001"));
        assert_eq!(args.str("period"), Some("month"));
    }

    #[test]
    fn test_json_string_is_mapping() {
        let args = resolve_args(ANALYSIS, &json!(r#"{"employee_id": "EMP7", "period": "week"}"#)).unwrap();
        assert_eq!(args.str("employee_id"), Some("EMP7"));
        assert_eq!(args.str("period"), Some("week"));
    }

    #[test]
    fn test_named_binding() {
        let args = resolve_args(ANALYSIS, &json!({"period": "this month", "employee_id": "E1"})).unwrap();
        assert_eq!(args.str("employee_id"), Some("E1"));
        assert_eq!(args.str("period"), Some("month"));
    }

    #[test]
    fn test_positional_fallback_for_unknown_keys() {
        // 键名不匹配时，按出现顺序绑定
        let args = resolve_args(ANALYSIS, &json!({"id": "E9", "range": "week"})).unwrap();
        assert_eq!(args.str("employee_id"), Some("E9"));
        assert_eq!(args.str("period"), Some("week"));

        let one = resolve_args(ANALYSIS, &json!({"name": "E2"})).unwrap();
        assert_eq!(one.str("employee_id"), Some("E2"));
    }

    #[test]
    fn test_known_and_unknown_keys_report_only_unknown() {
        let err = resolve_args(ANALYSIS, &json!({"period": "week", "foo": "E1"})).unwrap_err();
        match err {
            ToolError::InvalidArgs(msg) => {
                assert!(msg.starts_with("unknown parameter(s): foo;"));
                assert!(msg.contains("expected: employee_id, period"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_optional_is_absent() {
        let args = resolve_args(RECORDS, &json!({
            "start_date": "2026-10-01",
            "end_date": "2026-10-07",
            "employee_name": "",
            "page": " "
        }))
        .unwrap();
        assert_eq!(args.str("employee_name"), None);
        assert_eq!(args.str("start_date"), Some("2026-10-01"));
        // 空串回落到默认值
        assert_eq!(args.get("page"), Some(&json!(1)));

        // 必填参数仍然拒绝空串
        assert!(resolve_args(ANALYSIS, &json!({"employee_id": "  "})).is_err());
    }

    #[test]
    fn test_three_unknown_keys_rejected() {
        let err = resolve_args(RECORDS, &json!({"from": "2024-07-01", "to": "2024-07-31", "who": "x"})).unwrap_err();
        match err {
            ToolError::InvalidArgs(msg) => assert!(msg.contains("from, to, who")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_required() {
        let err = resolve_args(ANALYSIS, &json!({})).unwrap_err();
        assert_eq!(err, ToolError::InvalidArgs("missing required parameter 'employee_id'".into()));
    }

    #[test]
    fn test_coercion_and_dates() {
        let args = resolve_args(
            RECORDS,
            &json!({"start_date": "01/07/2024", "end_date": "2024-07-31", "page": "3"}),
        )
        .unwrap();
        assert_eq!(args.str("start_date"), Some("2024-07-01"));
        assert_eq!(args.i64("page"), Some(3));
        assert!(args.get("employee_name").is_none());

        assert!(resolve_args(RECORDS, &json!({"start_date": "July", "end_date": "2024-07-31"})).is_err());
        assert!(resolve_args(ANALYSIS, &json!({"employee_id": "E1", "period": "decade"})).is_err());
    }

    #[test]
    fn test_no_param_tool() {
        assert!(resolve_args(&[], &Value::Null).unwrap().is_empty());
        assert!(resolve_args(&[], &json!("")).unwrap().is_empty());
        assert!(resolve_args(&[], &json!({})).unwrap().is_empty());
        assert!(resolve_args(&[], &json!("something")).is_err());
    }

    #[test]
    fn test_schema_lists_required() {
        let schema = params_schema(ANALYSIS);
        assert_eq!(schema["required"], json!(["employee_id"]));
        assert_eq!(schema["properties"]["period"]["default"], json!("month"));
        assert_eq!(schema["properties"]["period"]["enum"][0], json!("today"));
    }
}
