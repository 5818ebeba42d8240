//! 编排层：模型指令解析、system prompt、plan / action / observe 主循环与过程事件

pub mod directive;
pub mod events;
pub mod loop_;
pub mod prompt;

pub use directive::{directive_schema_json, parse_directive, Directive, DirectiveError};
pub use events::ReactEvent;
pub use loop_::{Orchestrator, TerminalState, TurnResult, DEFAULT_MAX_ITERATIONS};
pub use prompt::{build_system_prompt, load_persona};
