//! System prompt 构建：角色设定 + JSON 指令协议 + 指令 Schema + 工具清单
//!
//! 角色设定可由 config/prompts/system.md 覆盖，其余部分始终由注册表生成，保证与实际工具一致。

use std::fmt::Write as _;
use std::path::Path;

use crate::react::directive::directive_schema_json;
use crate::tools::ToolRegistry;

/// 默认角色设定
pub const DEFAULT_PERSONA: &str = "You are HR Buddy, an AI assistant for HR management. \
You help HR staff and managers understand attendance, task reports, leave and regularization requests, \
and employee performance by calling the HR tools listed below.";

const PROTOCOL: &str = r#"CRITICAL: You MUST always respond with a single valid JSON object using one of these structures:

For planning: {"step": "plan", "thinking": "your planning thoughts"}
For taking action: {"step": "action", "function": "tool_name", "input": {"param": "value"}}
For final response: {"step": "output", "content": "your final response to the user"}

You operate in a plan -> action -> observe -> output workflow. After each action you will receive
an observation message {"step": "observe", ...} with the tool output or an error.

ERROR HANDLING RULES:
- When an observation contains "error", explain that message to the user; it is already user-friendly.
- For authentication or permission errors, tell the user to log in again or contact their HR administrator.
- For employee-specific questions, call search_employee_by_name first to get the employeeId.
- If several employees match a name, ask the user which one they mean.
- Resolve relative dates with get_today_date or get_date_range before calling tools that need dates.

OUTPUT RULES:
- Format answers clearly with short sections and bullet points.
- Provide actionable insights, not just raw data.
- Never invent data that was not returned by a tool."#;

/// 读取角色设定覆盖文件；不存在或为空时返回 None
pub fn load_persona(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        tracing::info!(path = %path.display(), "Loaded system prompt persona override");
        Some(text.to_string())
    }
}

/// 组装完整的 system prompt
pub fn build_system_prompt(persona: Option<&str>, registry: &ToolRegistry) -> String {
    let mut prompt = String::new();
    prompt.push_str(persona.unwrap_or(DEFAULT_PERSONA));
    prompt.push_str("\n\n");
    prompt.push_str(PROTOCOL);
    prompt.push_str("\n\nDirective JSON Schema:\n");
    prompt.push_str(&directive_schema_json());
    prompt.push_str("\n\nAvailable Tools:\n");
    for tool in registry.iter() {
        let params = tool
            .params()
            .iter()
            .map(|p| p.signature())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            prompt,
            "- {}({}): {}. Returns: {}",
            tool.id(),
            params,
            tool.description(),
            tool.returns()
        );
    }
    prompt.push_str(
        "\nPeriod values: today, yesterday, week, month, last_month, quarter. Dates use YYYY-MM-DD.",
    );
    prompt
}
