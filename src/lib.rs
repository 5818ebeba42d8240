//! HR Buddy - HR 数据助手服务
//!
//! 模块划分：
//! - **agent**: 聊天服务（凭证解析、会话定位、单轮编排）
//! - **backend**: HR 后端网关、错误分类与结果规范化、业务日期
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与优雅关闭
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话消息记录
//! - **observability**: tracing 初始化
//! - **react**: 模型指令解析、system prompt 与 plan / action / observe 主循环
//! - **server**: axum HTTP API
//! - **session**: 会话存储
//! - **tools**: HR 工具注册表、参数解析与执行器

pub mod agent;
pub mod backend;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod server;
pub mod session;
pub mod tools;
