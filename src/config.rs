//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HRB__*` 覆盖（双下划线表示嵌套，如 `HRB__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub backend: BackendSection,
    pub server: ServerSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名、单轮最大迭代数、对话保留策略、业务时区
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 单次用户请求内 Plan/Action/Observe 的最大迭代数（熔断）
    pub max_iterations: usize,
    /// 对话保留的最大消息条数（不含 system）；未设置表示永久保留
    pub max_history_messages: Option<usize>,
    /// 业务时区相对 UTC 的分钟偏移，默认 IST（+05:30）
    pub utc_offset_minutes: i32,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "HR Buddy".to_string(),
            max_iterations: 10,
            max_history_messages: None,
            utc_offset_minutes: 330,
        }
    }
}

/// [llm] 段：OpenAI 兼容端点、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY
    pub api_key: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次模型调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 30 }
    }
}

/// [backend] 段：HR 后端地址、超时、重试与兜底登录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// http / fake
    pub provider: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// 仅对超时 / 连接错误重试
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub fallback_login: FallbackLoginSection,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            provider: "http".to_string(),
            base_url: "https://hrms-backend.up.railway.app".to_string(),
            timeout_secs: 15,
            max_retries: 2,
            retry_delay_ms: 500,
            fallback_login: FallbackLoginSection::default(),
        }
    }
}

/// [backend.fallback_login] 段：请求未携带凭证时是否用静态账号登录（默认关闭）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FallbackLoginSection {
    pub enabled: bool,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// [server] 段：监听地址与 CORS
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".into(),
                "http://localhost:3000".into(),
            ],
        }
    }
}

/// [tools] 段：单次工具调用超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 15,
        }
    }
}

/// 从 config 目录加载配置，环境变量 HRB__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HRB__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HRB")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
