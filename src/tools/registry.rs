//! 工具注册表
//!
//! 所有工具实现 Tool trait（id / description / params / invoke），由 ToolRegistry 在启动时
//! 一次性注册，之后只读；ToolExecutor 在调用时加超时并隔离 panic。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::{ApiRequest, BusinessClock, HrGateway, Outcome};
use crate::backend::format::{summarize, PayloadDomain};
use crate::backend::normalizer::normalize;
use crate::core::AgentError;
use crate::tools::params::{ParamSpec, ToolArgs};

/// 全部工具标识（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    GetTodayDate,
    GetYesterdayDate,
    GetDateRange,
    GetAllEmployees,
    GetUserProfile,
    SearchEmployeeByName,
    GetAttendanceOverview,
    GetTeamAttendanceToday,
    GetAttendanceRecords,
    GetEmployeeAttendanceAnalysis,
    GetTaskReportsOverview,
    GetTaskReports,
    GetEmployeeTaskAnalysis,
    GetEmployeePerformanceOverview,
    GetTeamPerformanceDashboard,
    GetTeamPendingLeaveRequests,
    GetLeaveRequestsByEmployee,
    GetTeamPendingRegularizationRequests,
    GetRegularizations,
}

impl ToolId {
    pub const ALL: [ToolId; 19] = [
        ToolId::GetTodayDate,
        ToolId::GetYesterdayDate,
        ToolId::GetDateRange,
        ToolId::GetAllEmployees,
        ToolId::GetUserProfile,
        ToolId::SearchEmployeeByName,
        ToolId::GetAttendanceOverview,
        ToolId::GetTeamAttendanceToday,
        ToolId::GetAttendanceRecords,
        ToolId::GetEmployeeAttendanceAnalysis,
        ToolId::GetTaskReportsOverview,
        ToolId::GetTaskReports,
        ToolId::GetEmployeeTaskAnalysis,
        ToolId::GetEmployeePerformanceOverview,
        ToolId::GetTeamPerformanceDashboard,
        ToolId::GetTeamPendingLeaveRequests,
        ToolId::GetLeaveRequestsByEmployee,
        ToolId::GetTeamPendingRegularizationRequests,
        ToolId::GetRegularizations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::GetTodayDate => "get_today_date",
            ToolId::GetYesterdayDate => "get_yesterday_date",
            ToolId::GetDateRange => "get_date_range",
            ToolId::GetAllEmployees => "get_all_employees",
            ToolId::GetUserProfile => "get_user_profile",
            ToolId::SearchEmployeeByName => "search_employee_by_name",
            ToolId::GetAttendanceOverview => "get_attendance_overview",
            ToolId::GetTeamAttendanceToday => "get_team_attendance_today",
            ToolId::GetAttendanceRecords => "get_attendance_records",
            ToolId::GetEmployeeAttendanceAnalysis => "get_employee_attendance_analysis",
            ToolId::GetTaskReportsOverview => "get_task_reports_overview",
            ToolId::GetTaskReports => "get_task_reports",
            ToolId::GetEmployeeTaskAnalysis => "get_employee_task_analysis",
            ToolId::GetEmployeePerformanceOverview => "get_employee_performance_overview",
            ToolId::GetTeamPerformanceDashboard => "get_team_performance_dashboard",
            ToolId::GetTeamPendingLeaveRequests => "get_team_pending_leave_requests",
            ToolId::GetLeaveRequestsByEmployee => "get_leave_requests_by_employee",
            ToolId::GetTeamPendingRegularizationRequests => "get_team_pending_regularization_requests",
            ToolId::GetRegularizations => "get_regularizations",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|id| id.as_str() == s).ok_or(())
    }
}

/// 工具调用错误；参数错误会带着参数 schema 反馈给模型，其余视为工具内部异常
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Failed(String),
}

/// 单次请求的工具上下文：网关、该请求的凭证、业务时钟
#[derive(Clone)]
pub struct ToolContext {
    pub gateway: Arc<dyn HrGateway>,
    pub token: Option<String>,
    pub clock: BusinessClock,
}

impl ToolContext {
    pub fn new(gateway: Arc<dyn HrGateway>, token: Option<String>, clock: BusinessClock) -> Self {
        Self {
            gateway,
            token,
            clock,
        }
    }

    /// 发请求、归一化并按领域生成摘要
    pub async fn fetch(&self, operation: &str, req: ApiRequest, domain: PayloadDomain) -> Outcome {
        let response = self.gateway.request(req, self.token.as_deref()).await;
        let clock = self.clock;
        normalize(operation, response, |data| Some(summarize(domain, data, &clock)))
    }
}

/// 工具 trait：标识、描述（供 LLM 理解）、参数声明、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;

    fn description(&self) -> &str;

    /// 参数声明，顺序即位置参数的绑定顺序
    fn params(&self) -> &[ParamSpec] {
        &[]
    }

    /// 返回值说明（写进 system prompt）
    fn returns(&self) -> &str {
        "JSON data"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError>;
}

/// 工具注册表：保留注册顺序，按 ToolId 索引
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<ToolId, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重复注册同一 id 视为配置错误
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        let id = tool.id();
        if self.index.contains_key(&id) {
            return Err(AgentError::ConfigError(format!("tool '{}' registered twice", id)));
        }
        self.index.insert(id, self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    /// 按名称查找；名称不在封闭枚举内或未注册时返回 None
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let id = name.parse::<ToolId>().ok()?;
        self.index.get(&id).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.id().as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }
}
