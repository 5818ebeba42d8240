//! 工具层：注册表、参数解析、执行器与 HR 查询工具

pub mod attendance;
pub mod calendar;
pub mod employees;
pub mod executor;
pub mod leave;
pub mod params;
pub mod performance;
pub mod registry;
pub mod tasks;

pub use attendance::{
    AttendanceOverviewTool, AttendanceRecordsTool, EmployeeAttendanceAnalysisTool, TeamAttendanceTodayTool,
};
pub use calendar::{DateRangeTool, TodayDateTool, YesterdayDateTool};
pub use employees::{AllEmployeesTool, SearchEmployeeTool, UserProfileTool};
pub use executor::{Dispatch, ToolExecutor};
pub use leave::{
    LeaveRequestsByEmployeeTool, PendingLeaveRequestsTool, PendingRegularizationsTool, RegularizationsTool,
};
pub use params::{ParamKind, ParamSpec, ToolArgs};
pub use performance::{PerformanceOverviewTool, TeamDashboardTool};
pub use registry::{Tool, ToolContext, ToolError, ToolId, ToolRegistry};
pub use tasks::{EmployeeTaskAnalysisTool, TaskReportsOverviewTool, TaskReportsTool};

use crate::core::AgentError;

/// 注册全部 HR 工具（顺序即 prompt 中的列出顺序）
pub fn hr_registry() -> Result<ToolRegistry, AgentError> {
    let mut registry = ToolRegistry::new();
    registry.register(TodayDateTool)?;
    registry.register(YesterdayDateTool)?;
    registry.register(DateRangeTool)?;
    registry.register(AllEmployeesTool)?;
    registry.register(UserProfileTool)?;
    registry.register(SearchEmployeeTool)?;
    registry.register(AttendanceOverviewTool)?;
    registry.register(TeamAttendanceTodayTool)?;
    registry.register(AttendanceRecordsTool)?;
    registry.register(EmployeeAttendanceAnalysisTool)?;
    registry.register(TaskReportsOverviewTool)?;
    registry.register(TaskReportsTool)?;
    registry.register(EmployeeTaskAnalysisTool)?;
    registry.register(PerformanceOverviewTool)?;
    registry.register(TeamDashboardTool)?;
    registry.register(PendingLeaveRequestsTool)?;
    registry.register(LeaveRequestsByEmployeeTool)?;
    registry.register(PendingRegularizationsTool)?;
    registry.register(RegularizationsTool)?;
    tracing::info!(tools = registry.len(), "HR tools registered");
    Ok(registry)
}
