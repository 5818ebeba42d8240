//! 考勤工具：团队概览、今日考勤、考勤记录、个人考勤分析
//!
//! 全部走 `/hr/attendance`，由 operation 查询参数区分 overview / records / employee。

use async_trait::async_trait;

use crate::backend::dates::{format_api_date, Period};
use crate::backend::format::PayloadDomain;
use crate::backend::{ApiRequest, Outcome};
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};

const ENDPOINT: &str = "/hr/attendance";

/// 团队考勤概览请求（看板复用）
pub(crate) fn overview_request(ctx: &ToolContext, period: Period) -> ApiRequest {
    let (start, end) = ctx.clock.date_range(period);
    ApiRequest::get(ENDPOINT)
        .query("operation", "overview")
        .query("period", period.as_str())
        .query("startDate", format_api_date(start))
        .query("endDate", format_api_date(end))
}

/// 个人考勤分析请求（组合工具复用）
pub fn employee_request(ctx: &ToolContext, employee_id: &str, period: Period) -> ApiRequest {
    let (start, end) = ctx.clock.date_range(period);
    ApiRequest::get(ENDPOINT)
        .query("operation", "employee")
        .query("employeeId", employee_id)
        .query("startDate", format_api_date(start))
        .query("endDate", format_api_date(end))
}

const OVERVIEW_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "period",
    ParamKind::Period,
    Some("today"),
    "Reporting period",
)];

pub struct AttendanceOverviewTool;

#[async_trait]
impl Tool for AttendanceOverviewTool {
    fn id(&self) -> ToolId {
        ToolId::GetAttendanceOverview
    }

    fn description(&self) -> &str {
        "Team attendance statistics (present, absent, late, rates) and insights for a period"
    }

    fn params(&self) -> &[ParamSpec] {
        OVERVIEW_PARAMS
    }

    fn returns(&self) -> &str {
        "attendance overview"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let period = args.period_or("period", Period::Today);
        Ok(ctx
            .fetch("attendance_overview", overview_request(ctx, period), PayloadDomain::Attendance)
            .await)
    }
}

pub struct TeamAttendanceTodayTool;

#[async_trait]
impl Tool for TeamAttendanceTodayTool {
    fn id(&self) -> ToolId {
        ToolId::GetTeamAttendanceToday
    }

    fn description(&self) -> &str {
        "Today's attendance for the whole team"
    }

    fn returns(&self) -> &str {
        "attendance overview"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = overview_request(ctx, Period::Today).query("date", format_api_date(ctx.clock.today()));
        Ok(ctx
            .fetch("attendance_team_today", req, PayloadDomain::Attendance)
            .await)
    }
}

const RECORDS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("start_date", ParamKind::Date, "First day (YYYY-MM-DD)"),
    ParamSpec::required("end_date", ParamKind::Date, "Last day (YYYY-MM-DD)"),
    ParamSpec::optional("employee_name", ParamKind::String, None, "Filter by employee name"),
    ParamSpec::optional("page", ParamKind::Integer, Some("1"), "Page number"),
    ParamSpec::optional("limit", ParamKind::Integer, Some("50"), "Records per page"),
];

pub struct AttendanceRecordsTool;

#[async_trait]
impl Tool for AttendanceRecordsTool {
    fn id(&self) -> ToolId {
        ToolId::GetAttendanceRecords
    }

    fn description(&self) -> &str {
        "Daily attendance records (status, check-in, check-out) between two dates"
    }

    fn params(&self) -> &[ParamSpec] {
        RECORDS_PARAMS
    }

    fn returns(&self) -> &str {
        "attendance records"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = ApiRequest::get(ENDPOINT)
            .query("operation", "records")
            .query("startDate", args.require_str("start_date")?)
            .query("endDate", args.require_str("end_date")?)
            .query("page", args.i64("page").unwrap_or(1))
            .query("limit", args.i64("limit").unwrap_or(50))
            .query_opt("employeeName", args.str("employee_name"));
        Ok(ctx
            .fetch("attendance_records", req, PayloadDomain::Attendance)
            .await)
    }
}

pub(crate) const EMPLOYEE_ANALYSIS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("employee_id", ParamKind::String, "Employee ID (use search_employee_by_name first)"),
    ParamSpec::optional("period", ParamKind::Period, Some("month"), "Analysis period"),
];

pub struct EmployeeAttendanceAnalysisTool;

#[async_trait]
impl Tool for EmployeeAttendanceAnalysisTool {
    fn id(&self) -> ToolId {
        ToolId::GetEmployeeAttendanceAnalysis
    }

    fn description(&self) -> &str {
        "Attendance rate and punctuality analysis for one employee"
    }

    fn params(&self) -> &[ParamSpec] {
        EMPLOYEE_ANALYSIS_PARAMS
    }

    fn returns(&self) -> &str {
        "employee attendance analysis"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let employee_id = args.require_str("employee_id")?;
        let period = args.period_or("period", Period::Month);
        Ok(ctx
            .fetch(
                "attendance_employee_analysis",
                employee_request(ctx, employee_id, period),
                PayloadDomain::Attendance,
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::{BusinessClock, FakeGateway};
    use crate::tools::params::resolve_args;

    #[tokio::test]
    async fn test_overview_request_shape() {
        let gateway = Arc::new(FakeGateway::new().ok(
            ENDPOINT,
            &[("operation", "overview")],
            json!({"success": true, "data": {"overview": {"statistics": {"totalEmployees": 4}}}}),
        ));
        let ctx = ToolContext::new(gateway.clone(), Some("t".into()), BusinessClock::default());
        let args = resolve_args(OVERVIEW_PARAMS, &json!({"period": "week"})).unwrap();
        let outcome = AttendanceOverviewTool.invoke(&ctx, args).await.unwrap();
        assert!(outcome.summary().unwrap().contains("**Total Employees:** 4"));

        let (req, _) = &gateway.requests()[0];
        assert_eq!(req.query_value("period"), Some("week"));
        assert_eq!(req.query_value("endDate"), Some(format_api_date(ctx.clock.today()).as_str()));
    }

    #[tokio::test]
    async fn test_records_defaults_and_filter() {
        let gateway = Arc::new(FakeGateway::new().ok(ENDPOINT, &[("operation", "records")], json!({"records": []})));
        let ctx = ToolContext::new(gateway.clone(), None, BusinessClock::default());
        let args = resolve_args(RECORDS_PARAMS, &json!(["2024-07-01", "2024-07-31"])).unwrap();
        let outcome = AttendanceRecordsTool.invoke(&ctx, args).await.unwrap();
        assert_eq!(outcome.summary(), Some("No attendance records found for the specified criteria."));

        let (req, _) = &gateway.requests()[0];
        assert_eq!(req.query_value("page"), Some("1"));
        assert_eq!(req.query_value("limit"), Some("50"));
        assert_eq!(req.query_value("employeeName"), None);
    }
}
