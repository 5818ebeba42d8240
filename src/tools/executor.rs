//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时：解析参数、在超时内调用工具并隔离 panic，
//! 每次调用输出结构化审计日志（JSON）。工具调用从不重试。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::Value;
use tokio::time::timeout;

use crate::backend::{ErrorKind, Outcome};
use crate::backend::normalizer::user_message;
use crate::tools::params::{params_schema, resolve_args};
use crate::tools::registry::{ToolContext, ToolError, ToolRegistry};

/// 一次工具调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// 名称未注册
    UnknownTool,
    /// 参数校验失败；expected 为该工具的参数 schema
    InvalidArgs { message: String, expected: Value },
    /// 工具正常返回（成功或已分类的失败）
    Completed(Outcome),
    /// 工具内部异常或 panic
    Failed(String),
}

/// 工具执行器：对每次调用施加超时，并隔离工具异常
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.registry.tool_names()
    }

    /// 执行指定工具；输出 JSON 审计日志
    pub async fn execute(&self, ctx: &ToolContext, tool_name: &str, input: &Value) -> Dispatch {
        let Some(tool) = self.registry.get(tool_name) else {
            audit(tool_name, "unknown_tool", 0, input);
            return Dispatch::UnknownTool;
        };

        let args = match resolve_args(tool.params(), input) {
            Ok(args) => args,
            Err(e) => {
                audit(tool_name, "invalid_args", 0, input);
                return Dispatch::InvalidArgs {
                    message: e.to_string(),
                    expected: params_schema(tool.params()),
                };
            }
        };

        let start = Instant::now();
        let call = AssertUnwindSafe(tool.invoke(ctx, args)).catch_unwind();
        let result = timeout(self.timeout, call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let dispatch = match result {
            Ok(Ok(Ok(outcome))) => Dispatch::Completed(outcome),
            Ok(Ok(Err(ToolError::InvalidArgs(message)))) => Dispatch::InvalidArgs {
                message,
                expected: params_schema(tool.params()),
            },
            Ok(Ok(Err(ToolError::Failed(message)))) => Dispatch::Failed(message),
            Ok(Err(panic)) => Dispatch::Failed(panic_message(panic.as_ref())),
            Err(_) => {
                let raw = format!("Tool '{}' timed out after {}s", tool_name, self.timeout.as_secs());
                Dispatch::Completed(Outcome::failure(
                    ErrorKind::Timeout,
                    raw.clone(),
                    user_message(ErrorKind::Timeout, &raw, None),
                ))
            }
        };

        let label = match &dispatch {
            Dispatch::Completed(o) if o.is_success() => "ok",
            Dispatch::Completed(_) => "error",
            Dispatch::InvalidArgs { .. } => "invalid_args",
            Dispatch::Failed(_) => "exception",
            Dispatch::UnknownTool => "unknown_tool",
        };
        audit(tool_name, label, duration_ms, input);
        if let Dispatch::Failed(message) = &dispatch {
            tracing::error!(tool = %tool_name, error = %message, "Tool raised an exception");
        }
        dispatch
    }
}

fn audit(tool_name: &str, outcome: &str, duration_ms: u64, input: &Value) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool_name,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": duration_ms,
        "args_preview": args_preview(input),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::backend::BusinessClock;
    use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
    use crate::tools::registry::{Tool, ToolId};
    use crate::backend::fake::FakeGateway;

    struct Panicky;

    #[async_trait]
    impl Tool for Panicky {
        fn id(&self) -> ToolId {
            ToolId::GetTodayDate
        }
        fn description(&self) -> &str {
            "panics"
        }
        async fn invoke(&self, _ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
            panic!("boom");
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn id(&self) -> ToolId {
            ToolId::GetYesterdayDate
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        async fn invoke(&self, _ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Outcome::success(json!(null)))
        }
    }

    struct NeedsId;

    const NEEDS_ID_PARAMS: &[ParamSpec] = &[ParamSpec::required("employee_id", ParamKind::String, "id")];

    #[async_trait]
    impl Tool for NeedsId {
        fn id(&self) -> ToolId {
            ToolId::GetEmployeeTaskAnalysis
        }
        fn description(&self) -> &str {
            "needs an id"
        }
        fn params(&self) -> &[ParamSpec] {
            NEEDS_ID_PARAMS
        }
        async fn invoke(&self, _ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
            Ok(Outcome::success(json!(args.require_str("employee_id")?)))
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Panicky).unwrap();
        registry.register(Slow).unwrap();
        registry.register(NeedsId).unwrap();
        ToolExecutor::new(Arc::new(registry), timeout_secs)
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(FakeGateway::new()), Some("t".into()), BusinessClock::default())
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let d = executor(5).execute(&ctx(), "get_today_date", &Value::Null).await;
        assert_eq!(d, Dispatch::Failed("boom".into()));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure_outcome() {
        let d = executor(1).execute(&ctx(), "get_yesterday_date", &Value::Null).await;
        match d {
            Dispatch::Completed(o) => assert_eq!(o.error_kind(), Some(ErrorKind::Timeout)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_invalid() {
        let exec = executor(5);
        assert_eq!(exec.execute(&ctx(), "delete_everything", &Value::Null).await, Dispatch::UnknownTool);
        match exec.execute(&ctx(), "get_employee_task_analysis", &Value::Null).await {
            Dispatch::InvalidArgs { message, expected } => {
                assert!(message.contains("employee_id"));
                assert_eq!(expected["required"], json!(["employee_id"]));
            }
            other => panic!("unexpected {:?}", other),
        }
        let ok = exec.execute(&ctx(), "get_employee_task_analysis", &json!("EMP1")).await;
        assert_eq!(ok, Dispatch::Completed(Outcome::success(json!("EMP1"))));
    }
}
