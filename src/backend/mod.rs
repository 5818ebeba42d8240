//! HR 后端：网关、结果信封、错误归一化、展示格式化与业务日期

pub mod client;
pub mod dates;
pub mod fake;
pub mod format;
pub mod normalizer;
pub mod outcome;

use std::sync::Arc;

use crate::config::BackendSection;
use crate::core::AgentError;

pub use client::{classify_status, ApiRequest, HrGateway, HttpHrGateway};
pub use dates::{BusinessClock, Period};
pub use fake::FakeGateway;
pub use format::PayloadDomain;
pub use normalizer::{normalize, user_message};
pub use outcome::{ApiFailure, ApiResponse, ErrorKind, Outcome};

/// 根据 [backend] 配置创建网关：provider = "fake" 时使用内置演示数据
pub fn create_gateway_from_config(cfg: &BackendSection) -> Result<Arc<dyn HrGateway>, AgentError> {
    match cfg.provider.as_str() {
        "fake" => {
            tracing::info!("Using in-memory demo HR gateway");
            Ok(Arc::new(FakeGateway::demo()))
        }
        other => {
            if other != "http" {
                tracing::warn!(provider = %other, "Unknown backend provider, falling back to HTTP gateway");
            }
            tracing::info!(base_url = %cfg.base_url, "Using HTTP HR gateway");
            Ok(Arc::new(HttpHrGateway::new(cfg)?))
        }
    }
}
