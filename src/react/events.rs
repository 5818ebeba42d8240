//! 编排过程事件：用于终端 / 前端展示思考、工具调用、观察与回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 第几轮迭代
    Iteration { iteration: usize, max_iterations: usize },
    /// 模型的规划内容（plan 指令）
    Thinking { text: String },
    /// 调用工具
    ToolCall {
        tool: String,
        input: serde_json::Value,
    },
    /// 观察（预览，避免过长）
    Observation { tool: String, ok: bool, preview: String },
    /// 最终回复
    Output { text: String },
    Error { text: String },
}
