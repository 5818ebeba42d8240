//! 工作日报工具：概览、日报列表、个人任务分析（`/hr/task-reports`）

use async_trait::async_trait;

use crate::backend::dates::{format_api_date, Period};
use crate::backend::format::PayloadDomain;
use crate::backend::{ApiRequest, ErrorKind, Outcome};
use crate::tools::attendance::EMPLOYEE_ANALYSIS_PARAMS;
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};

const ENDPOINT: &str = "/hr/task-reports";

pub(crate) fn overview_request(period: Period) -> ApiRequest {
    ApiRequest::get(ENDPOINT)
        .query("operation", "overview")
        .query("period", period.as_str())
}

const OVERVIEW_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "period",
    ParamKind::Period,
    Some("month"),
    "Reporting period",
)];

pub struct TaskReportsOverviewTool;

#[async_trait]
impl Tool for TaskReportsOverviewTool {
    fn id(&self) -> ToolId {
        ToolId::GetTaskReportsOverview
    }

    fn description(&self) -> &str {
        "Team task-reporting statistics, productivity and quality scores, top performers"
    }

    fn params(&self) -> &[ParamSpec] {
        OVERVIEW_PARAMS
    }

    fn returns(&self) -> &str {
        "task reports overview"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let period = args.period_or("period", Period::Month);
        Ok(ctx
            .fetch("task_overview", overview_request(period), PayloadDomain::Tasks)
            .await)
    }
}

const REPORTS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("start_date", ParamKind::Date, "First day (YYYY-MM-DD)"),
    ParamSpec::required("end_date", ParamKind::Date, "Last day (YYYY-MM-DD)"),
    ParamSpec::optional("page", ParamKind::Integer, Some("1"), "Page number"),
    ParamSpec::optional("limit", ParamKind::Integer, Some("50"), "Reports per page"),
];

pub struct TaskReportsTool;

#[async_trait]
impl Tool for TaskReportsTool {
    fn id(&self) -> ToolId {
        ToolId::GetTaskReports
    }

    fn description(&self) -> &str {
        "Submitted daily task reports between two dates"
    }

    fn params(&self) -> &[ParamSpec] {
        REPORTS_PARAMS
    }

    fn returns(&self) -> &str {
        "task reports"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = ApiRequest::get(ENDPOINT)
            .query("operation", "reports")
            .query("startDate", args.require_str("start_date")?)
            .query("endDate", args.require_str("end_date")?)
            .query("page", args.i64("page").unwrap_or(1))
            .query("limit", args.i64("limit").unwrap_or(50));
        Ok(ctx.fetch("task_reports", req, PayloadDomain::Tasks).await)
    }
}

/// 个人任务分析；没有日报时给出更具体的提示
pub async fn employee_task_analysis(ctx: &ToolContext, employee_id: &str, period: Period) -> Outcome {
    let (start, end) = ctx.clock.date_range(period);
    let req = ApiRequest::get(ENDPOINT)
        .query("operation", "employee")
        .query("employeeId", employee_id)
        .query("startDate", format_api_date(start))
        .query("endDate", format_api_date(end));
    let outcome = ctx.fetch("task_employee_analysis", req, PayloadDomain::Tasks).await;
    match outcome {
        Outcome::Failure {
            kind: ErrorKind::NotFound,
            message,
            ..
        } => Outcome::failure(
            ErrorKind::NotFound,
            message,
            format!(
                "No task reports found for employee {} in the {} period. The employee might not have submitted any task reports during this time.",
                employee_id,
                period.as_str()
            ),
        ),
        other => other,
    }
}

pub struct EmployeeTaskAnalysisTool;

#[async_trait]
impl Tool for EmployeeTaskAnalysisTool {
    fn id(&self) -> ToolId {
        ToolId::GetEmployeeTaskAnalysis
    }

    fn description(&self) -> &str {
        "Productivity and quality analysis of one employee's task reports"
    }

    fn params(&self) -> &[ParamSpec] {
        EMPLOYEE_ANALYSIS_PARAMS
    }

    fn returns(&self) -> &str {
        "employee task analysis"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let employee_id = args.require_str("employee_id")?;
        let period = args.period_or("period", Period::Month);
        Ok(employee_task_analysis(ctx, employee_id, period).await)
    }
}
