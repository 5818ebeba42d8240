//! 编排主循环
//!
//! Plan -> Action (Tool) -> Observe -> ... -> Output；每轮最多 max_iterations 次模型调用。
//! 每次迭代恰好追加一条 assistant 消息，至多追加一条 observation（role = user）。
//! 任何失败都在循环内收敛为终态回复，run_turn 从不返回错误。

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::backend::normalizer::user_message;
use crate::backend::{ErrorKind, Outcome};
use crate::llm::LlmClient;
use crate::memory::{Conversation, Message};
use crate::react::directive::{parse_directive, Directive};
use crate::react::events::ReactEvent;
use crate::tools::{Dispatch, ToolContext, ToolExecutor};

/// 默认最大迭代次数
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

pub const INVALID_FORMAT_MESSAGE: &str =
    "I received an invalid response format from the AI system. Please try rephrasing your question.";
pub const FALLBACK_MESSAGE: &str = "I encountered an issue processing your request.";
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "I'm having trouble reaching the AI service right now. Please try again in a moment.";
pub const CANCELLED_MESSAGE: &str = "The request was cancelled before it could be completed.";

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一轮对话的终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// 模型给出 output
    Completed,
    /// 未识别的 step
    Fallback,
    /// 模型回复不是 JSON 对象
    InvalidFormat,
    /// 模型调用失败
    ModelUnavailable,
    IterationLimit,
    Cancelled,
}

/// 一轮对话的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub response: String,
    pub state: TerminalState,
    /// 实际发生的迭代（模型调用）次数
    pub iterations: usize,
    /// 本轮消耗的 token：(prompt, completion, total)
    pub token_usage: (u64, u64, u64),
}

/// 两次累计快照之差；客户端计数被重置时按 0 计
pub fn usage_delta(before: (u64, u64, u64), after: (u64, u64, u64)) -> (u64, u64, u64) {
    (
        after.0.saturating_sub(before.0),
        after.1.saturating_sub(before.1),
        after.2.saturating_sub(before.2),
    )
}

/// 编排器：持有模型客户端与工具执行器，无会话状态
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    max_iterations: usize,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, executor: Arc<ToolExecutor>, max_iterations: usize) -> Self {
        Self {
            llm,
            executor,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 执行一轮对话：追加用户消息，循环调用模型直到终态
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_input: &str,
        ctx: &ToolContext,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<ReactEvent>>,
    ) -> TurnResult {
        conversation.push(Message::user(user_input));
        let usage_before = self.llm.token_usage();

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return self.finish(TerminalState::Cancelled, CANCELLED_MESSAGE.to_string(), iteration - 1, usage_before, events);
            }
            emit(events, ReactEvent::Iteration {
                iteration,
                max_iterations: self.max_iterations,
            });

            let reply = tokio::select! {
                _ = cancel.cancelled() => {
                    return self.finish(TerminalState::Cancelled, CANCELLED_MESSAGE.to_string(), iteration, usage_before, events);
                }
                reply = self.llm.complete_json(conversation.messages()) => reply,
            };
            let raw = match reply {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!(iteration, error = %e, "Model call failed");
                    return self.finish(
                        TerminalState::ModelUnavailable,
                        MODEL_UNAVAILABLE_MESSAGE.to_string(),
                        iteration,
                        usage_before,
                        events,
                    );
                }
            };
            conversation.push(Message::assistant(raw.clone()));

            let directive = match parse_directive(&raw) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(iteration, error = %e, "Model reply is not a valid directive");
                    return self.finish(
                        TerminalState::InvalidFormat,
                        INVALID_FORMAT_MESSAGE.to_string(),
                        iteration,
                        usage_before,
                        events,
                    );
                }
            };
            tracing::debug!(iteration, step = directive.step_name(), "Directive received");

            match directive {
                Directive::Plan { thinking } => {
                    emit(events, ReactEvent::Thinking { text: thinking });
                }
                Directive::Action { function, input } => {
                    emit(events, ReactEvent::ToolCall {
                        tool: function.clone(),
                        input: input.clone(),
                    });
                    let dispatch = tokio::select! {
                        _ = cancel.cancelled() => {
                            return self.finish(TerminalState::Cancelled, CANCELLED_MESSAGE.to_string(), iteration, usage_before, events);
                        }
                        d = self.executor.execute(ctx, &function, &input) => d,
                    };
                    let observation = self.observation(&function, dispatch);
                    let ok = observation.get("error").is_none();
                    let content = observation.to_string();
                    emit(events, ReactEvent::Observation {
                        tool: function,
                        ok,
                        preview: preview(&content),
                    });
                    conversation.push(Message::user(content));
                }
                Directive::Output { content } => {
                    return self.finish(TerminalState::Completed, content, iteration, usage_before, events);
                }
                Directive::Unknown { step, content } => {
                    tracing::warn!(iteration, step = ?step, "Unknown step in model reply");
                    let response = content.unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
                    return self.finish(TerminalState::Fallback, response, iteration, usage_before, events);
                }
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "Iteration limit reached");
        let response = format!(
            "I reached the maximum processing iterations ({}) without completing your request. Please try a simpler request.",
            self.max_iterations
        );
        self.finish(TerminalState::IterationLimit, response, self.max_iterations, usage_before, events)
    }

    /// 将一次工具调用结果转为 observation JSON
    fn observation(&self, tool_name: &str, dispatch: Dispatch) -> Value {
        match dispatch {
            Dispatch::UnknownTool => {
                let available = self.executor.tool_names();
                json!({
                    "step": "observe",
                    "error": format!("Tool '{}' not available. Available tools: {}", tool_name, available.join(", ")),
                    "available_tools": available,
                })
            }
            Dispatch::InvalidArgs { message, expected } => json!({
                "step": "observe",
                "tool_name": tool_name,
                "error": user_message(ErrorKind::Validation, &message, None),
                "error_kind": ErrorKind::Validation.as_str(),
                "expected": expected,
            }),
            Dispatch::Completed(Outcome::Success { data, summary }) => json!({
                "step": "observe",
                "tool_name": tool_name,
                "output": summary.map(Value::String).unwrap_or(data),
            }),
            Dispatch::Completed(Outcome::Failure { kind, user_message, .. }) => json!({
                "step": "observe",
                "tool_name": tool_name,
                "error": user_message,
                "error_kind": kind.as_str(),
            }),
            Dispatch::Failed(message) => json!({
                "step": "observe",
                "tool_name": tool_name,
                "error": format!("Tool execution failed for {}: {}", tool_name, message),
                "error_kind": ErrorKind::Unexpected.as_str(),
            }),
        }
    }

    fn finish(
        &self,
        state: TerminalState,
        response: String,
        iterations: usize,
        usage_before: (u64, u64, u64),
        events: Option<&UnboundedSender<ReactEvent>>,
    ) -> TurnResult {
        match state {
            TerminalState::Completed | TerminalState::Fallback => {
                emit(events, ReactEvent::Output { text: response.clone() });
            }
            _ => emit(events, ReactEvent::Error { text: response.clone() }),
        }
        let token_usage = usage_delta(usage_before, self.llm.token_usage());
        let (prompt_tokens, completion_tokens, total_tokens) = token_usage;
        tracing::info!(
            state = ?state,
            iterations,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "Turn finished"
        );
        TurnResult {
            response,
            state,
            iterations,
            token_usage,
        }
    }
}

fn emit(events: Option<&UnboundedSender<ReactEvent>>, event: ReactEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", s.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::backend::dates::format_api_date;
    use crate::backend::{BusinessClock, FakeGateway};
    use crate::llm::mock::MockLlmClient;
    use crate::llm::LlmError;
    use crate::memory::Role;
    use crate::tools::{hr_registry, Tool, ToolArgs, ToolError, ToolId, ToolRegistry};

    fn ctx(gateway: FakeGateway) -> ToolContext {
        ToolContext::new(Arc::new(gateway), Some("token".into()), BusinessClock::default())
    }

    fn orchestrator(llm: Arc<MockLlmClient>, registry: ToolRegistry) -> Orchestrator {
        let executor = Arc::new(ToolExecutor::new(Arc::new(registry), 5));
        Orchestrator::new(llm, executor, DEFAULT_MAX_ITERATIONS)
    }

    fn observation_at(conv: &Conversation, index: usize) -> Value {
        let msg = &conv.messages()[index];
        assert_eq!(msg.role, Role::User);
        serde_json::from_str(&msg.content).unwrap()
    }

    #[tokio::test]
    async fn test_today_date_then_output() {
        let clock = BusinessClock::default();
        let today = format_api_date(clock.today());
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_today_date"}"#.to_string(),
            format!(r#"{{"step":"output","content":"Today is {}."}}"#, today),
        ]));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "What's the date?", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::Completed);
        assert_eq!(result.response, format!("Today is {}.", today));
        assert_eq!(result.iterations, 2);
        // system, user, assistant, observation, assistant
        assert_eq!(conv.len(), 5);
        let obs = observation_at(&conv, 3);
        assert_eq!(obs["tool_name"], "get_today_date");
        assert_eq!(obs["output"], today.as_str());
        // 第二次模型调用能看到 observation
        assert_eq!(llm.call(1).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_available_tools() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"bogus_tool","input":null}"#,
            r#"{"step":"output","content":"Sorry"}"#,
        ]));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::Completed);
        let obs = observation_at(&conv, 3);
        let error = obs["error"].as_str().unwrap();
        assert!(error.starts_with("Tool 'bogus_tool' not available. Available tools: get_today_date, "));
        assert_eq!(obs["available_tools"].as_array().unwrap().len(), ToolId::ALL.len());
        let second_call = llm.call(1).unwrap();
        assert!(second_call.last().unwrap().content.contains("available_tools"));
    }

    #[tokio::test]
    async fn test_invalid_json_ends_turn() {
        let llm = Arc::new(MockLlmClient::scripted(["Sure, here's the attendance!"]));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::InvalidFormat);
        assert_eq!(result.response, INVALID_FORMAT_MESSAGE);
        assert_eq!(result.iterations, 1);
        assert_eq!(llm.call_count(), 1);
        // 原始回复仍被记录
        assert_eq!(conv.messages()[2].content, "Sure, here's the attendance!");
    }

    struct Exploding;

    #[async_trait]
    impl Tool for Exploding {
        fn id(&self) -> ToolId {
            ToolId::GetTodayDate
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
            Err(ToolError::Failed("network unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_tool_exception_becomes_observation() {
        let mut registry = ToolRegistry::new();
        registry.register(Exploding).unwrap();
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_today_date","input":{}}"#,
            r#"{"step":"output","content":"The HR system is down."}"#,
        ]));
        let orch = orchestrator(llm, registry);
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "date?", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::Completed);
        let obs = observation_at(&conv, 3);
        assert_eq!(obs["error"], "Tool execution failed for get_today_date: network unreachable");
        assert_eq!(obs["error_kind"], "unexpected_error");
    }

    #[tokio::test]
    async fn test_backend_failure_uses_user_message() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_all_employees"}"#,
            r#"{"step":"output","content":"Please log in again."}"#,
        ]));
        let orch = orchestrator(llm, hr_registry().unwrap());
        let mut conv = Conversation::new("system");
        let gateway = FakeGateway::new().status("/employees", &[], 401);

        orch.run_turn(&mut conv, "list staff", &ctx(gateway), &CancellationToken::new(), None)
            .await;

        let obs = observation_at(&conv, 3);
        assert_eq!(obs["error_kind"], "authentication_error");
        assert!(obs.get("output").is_none());
        assert!(!obs["error"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn test_invalid_args_observation_carries_schema() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_date_range","input":{}}"#,
            r#"{"step":"output","content":"ok"}"#,
        ]));
        let orch = orchestrator(llm, hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        orch.run_turn(&mut conv, "range", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        let obs = observation_at(&conv, 3);
        assert_eq!(obs["error_kind"], "validation_error");
        assert!(obs["expected"]["properties"]["period"].is_object());
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let replies = (0..20).map(|_| r#"{"step":"plan","thinking":"still thinking"}"#);
        let llm = Arc::new(MockLlmClient::scripted(replies));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "loop forever", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::IterationLimit);
        assert_eq!(
            result.response,
            "I reached the maximum processing iterations (10) without completing your request. Please try a simpler request."
        );
        assert_eq!(llm.call_count(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(result.iterations, DEFAULT_MAX_ITERATIONS);
        // system + user + 10 条 assistant，plan 不追加 observation
        assert_eq!(conv.len(), 2 + DEFAULT_MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_transcript_is_append_only() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"plan","thinking":"need the date"}"#,
            r#"{"step":"action","function":"get_yesterday_date"}"#,
            r#"{"step":"action","function":"nope"}"#,
            r#"{"step":"output","content":"done"}"#,
        ]));
        let orch = orchestrator(llm, hr_registry().unwrap());
        let mut conv = Conversation::new("system");
        conv.push(Message::user("earlier question"));
        conv.push(Message::assistant(r#"{"step":"output","content":"earlier answer"}"#));
        let before = conv.messages().to_vec();

        let result = orch
            .run_turn(&mut conv, "yesterday?", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.iterations, 4);
        assert_eq!(&conv.messages()[..before.len()], before.as_slice());
        // user + 4 assistant + 2 observation
        assert_eq!(conv.len(), before.len() + 1 + 4 + 2);
        let roles: Vec<Role> = conv.messages()[before.len()..].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_unknown_step_falls_back() {
        let llm = Arc::new(MockLlmClient::scripted([r#"{"step":"observe"}"#, r#"{"step":"reflect","content":"Hmm, let me answer directly."}"#]));
        let orch = orchestrator(llm, hr_registry().unwrap());

        let mut conv = Conversation::new("system");
        let first = orch
            .run_turn(&mut conv, "a", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;
        assert_eq!(first.state, TerminalState::Fallback);
        assert_eq!(first.response, FALLBACK_MESSAGE);

        let second = orch
            .run_turn(&mut conv, "b", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;
        assert_eq!(second.response, "Hmm, let me answer directly.");
    }

    #[tokio::test]
    async fn test_model_failure_is_contained() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_error(LlmError::Timeout(30));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");

        let result = orch
            .run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(result.state, TerminalState::ModelUnavailable);
        assert_eq!(result.response, MODEL_UNAVAILABLE_MESSAGE);
        assert_eq!(llm.call_count(), 1);
        // 未追加 assistant 消息
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_model_call() {
        let llm = Arc::new(MockLlmClient::new());
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orch.run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &cancel, None).await;

        assert_eq!(result.state, TerminalState::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(llm.call_count(), 0);
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete_json(&self, _messages: &[Message]) -> Result<String, LlmError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(r#"{"step":"output","content":"too late"}"#.to_string())
        }
    }

    fn cancel_after(cancel: &CancellationToken, millis: u64) {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
            cancel.cancel();
        });
    }

    #[tokio::test]
    async fn test_cancelled_during_model_call() {
        let executor = Arc::new(ToolExecutor::new(Arc::new(hr_registry().unwrap()), 5));
        let orch = Orchestrator::new(Arc::new(SlowLlm), executor, DEFAULT_MAX_ITERATIONS);
        let mut conv = Conversation::new("system");
        let cancel = CancellationToken::new();
        cancel_after(&cancel, 50);

        let result = orch.run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &cancel, None).await;

        assert_eq!(result.state, TerminalState::Cancelled);
        assert_eq!(result.response, CANCELLED_MESSAGE);
        assert_eq!(result.iterations, 1);
        // 只有 system + user，模型回复未写入
        assert_eq!(conv.len(), 2);
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn id(&self) -> ToolId {
            ToolId::GetTodayDate
        }

        fn description(&self) -> &str {
            "never returns in time"
        }

        async fn invoke(&self, _ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Outcome::success(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_cancelled_during_tool_call() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool).unwrap();
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_today_date"}"#,
            r#"{"step":"output","content":"unreachable"}"#,
        ]));
        let orch = orchestrator(llm.clone(), registry);
        let mut conv = Conversation::new("system");
        let cancel = CancellationToken::new();
        cancel_after(&cancel, 50);

        let result = orch.run_turn(&mut conv, "date?", &ctx(FakeGateway::new()), &cancel, None).await;

        assert_eq!(result.state, TerminalState::Cancelled);
        assert_eq!(result.iterations, 1);
        assert_eq!(llm.call_count(), 1);
        // assistant 的 action 已记录，但没有 observation
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_leave_records_reach_observation() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"action","function":"get_team_pending_leave_requests"}"#,
            r#"{"step":"output","content":"Asha Rao has a pending leave request."}"#,
        ]));
        let orch = orchestrator(llm.clone(), hr_registry().unwrap());
        let mut conv = Conversation::new("system");
        let gateway = FakeGateway::new().ok(
            "/leaves",
            &[("status", "pending")],
            serde_json::json!({"success": true, "data": [
                {"employeeName": "Asha Rao", "leaveType": "sick", "startDate": "2026-10-20",
                 "endDate": "2026-10-21", "status": "pending", "reason": "Fever"}
            ]}),
        );

        orch.run_turn(&mut conv, "pending leaves?", &ctx(gateway), &CancellationToken::new(), None)
            .await;

        let obs = observation_at(&conv, 3);
        let output = obs["output"].as_str().unwrap();
        assert!(output.contains("Asha Rao"));
        assert!(output.contains("Reason: Fever"));
        // 模型看到的正是这条 observation
        assert!(llm.call(1).unwrap().last().unwrap().content.contains("Asha Rao"));
    }

    /// 每次调用累计 (10, 5, 15) 个 token
    struct MeteredLlm {
        inner: MockLlmClient,
        usage: std::sync::Mutex<(u64, u64, u64)>,
    }

    #[async_trait]
    impl LlmClient for MeteredLlm {
        async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError> {
            if let Ok(mut usage) = self.usage.lock() {
                *usage = (usage.0 + 10, usage.1 + 5, usage.2 + 15);
            }
            self.inner.complete_json(messages).await
        }

        fn token_usage(&self) -> (u64, u64, u64) {
            *self.usage.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_token_usage_is_per_turn() {
        let llm = Arc::new(MeteredLlm {
            inner: MockLlmClient::scripted([
                r#"{"step":"plan","thinking":"think"}"#,
                r#"{"step":"output","content":"first"}"#,
                r#"{"step":"output","content":"second"}"#,
            ]),
            usage: std::sync::Mutex::new((0, 0, 0)),
        });
        let executor = Arc::new(ToolExecutor::new(Arc::new(hr_registry().unwrap()), 5));
        let orch = Orchestrator::new(llm, executor, DEFAULT_MAX_ITERATIONS);
        let mut conv = Conversation::new("system");

        let first = orch
            .run_turn(&mut conv, "a", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;
        let second = orch
            .run_turn(&mut conv, "b", &ctx(FakeGateway::new()), &CancellationToken::new(), None)
            .await;

        assert_eq!(first.token_usage, (20, 10, 30));
        assert_eq!(second.token_usage, (10, 5, 15));
    }

    #[test]
    fn test_usage_delta_saturates() {
        assert_eq!(usage_delta((10, 5, 15), (25, 9, 34)), (15, 4, 19));
        assert_eq!(usage_delta((10, 5, 15), (0, 0, 0)), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let llm = Arc::new(MockLlmClient::scripted([
            r#"{"step":"plan","thinking":"check the date"}"#,
            r#"{"step":"action","function":"get_today_date"}"#,
            r#"{"step":"output","content":"done"}"#,
        ]));
        let orch = orchestrator(llm, hr_registry().unwrap());
        let mut conv = Conversation::new("system");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        orch.run_turn(&mut conv, "hi", &ctx(FakeGateway::new()), &CancellationToken::new(), Some(&tx))
            .await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert!(events.contains(&ReactEvent::Thinking { text: "check the date".into() }));
        assert!(events.iter().any(|e| matches!(e, ReactEvent::Observation { tool, ok: true, .. } if tool == "get_today_date")));
        assert_eq!(events.last(), Some(&ReactEvent::Output { text: "done".into() }));
    }
}
