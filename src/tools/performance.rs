//! 组合工具：员工绩效概览（查找员工 + 考勤分析 + 任务分析）与团队看板（考勤概览 + 日报概览）

use async_trait::async_trait;
use serde_json::json;

use crate::backend::dates::Period;
use crate::backend::format::{title_case, PayloadDomain};
use crate::backend::Outcome;
use crate::tools::attendance::{employee_request, overview_request as attendance_overview_request};
use crate::tools::employees::find_employee;
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};
use crate::tools::tasks::{employee_task_analysis, overview_request as task_overview_request};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("employee_name", ParamKind::String, "Employee name"),
    ParamSpec::optional("period", ParamKind::Period, Some("month"), "Analysis period"),
];

pub struct PerformanceOverviewTool;

#[async_trait]
impl Tool for PerformanceOverviewTool {
    fn id(&self) -> ToolId {
        ToolId::GetEmployeePerformanceOverview
    }

    fn description(&self) -> &str {
        "Combined attendance and task performance overview for an employee, looked up by name"
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn returns(&self) -> &str {
        "{employee, attendance, tasks}"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let name = args.require_str("employee_name")?;
        let period = args.period_or("period", Period::Month);

        let found = find_employee(ctx, name).await;
        let Some(employee) = found.data().cloned() else {
            return Ok(found);
        };
        let employee_id = employee["employeeId"]
            .as_str()
            .ok_or_else(|| ToolError::Failed(format!("employee '{}' has no employeeId", name)))?;
        let full_name = employee["name"].as_str().unwrap_or(name);

        let (attendance, tasks) = tokio::join!(
            ctx.fetch(
                "attendance_employee_analysis",
                employee_request(ctx, employee_id, period),
                PayloadDomain::Attendance,
            ),
            employee_task_analysis(ctx, employee_id, period),
        );

        let mut summary = format!("📊 **Performance Overview for {}**\n\n", full_name);
        if let Some(text) = attendance.summary() {
            summary.push_str("## Attendance Performance\n");
            summary.push_str(text);
            summary.push_str("\n\n");
        }
        if let Some(text) = tasks.summary() {
            summary.push_str("## Task Performance\n");
            summary.push_str(text);
            summary.push_str("\n\n");
        }
        summary.push_str("## Overall Assessment\n");
        if attendance.is_success() && tasks.is_success() {
            summary.push_str("✅ Complete performance data available for comprehensive analysis.");
        } else {
            summary.push_str("⚠️ Some performance data may be incomplete.");
        }

        let data = json!({
            "employee": employee,
            "attendance": attendance.data(),
            "tasks": tasks.data(),
        });
        Ok(Outcome::success_with_summary(data, summary))
    }
}

const DASHBOARD_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "period",
    ParamKind::Period,
    Some("today"),
    "Reporting period",
)];

pub struct TeamDashboardTool;

#[async_trait]
impl Tool for TeamDashboardTool {
    fn id(&self) -> ToolId {
        ToolId::GetTeamPerformanceDashboard
    }

    fn description(&self) -> &str {
        "Complete team dashboard: attendance overview and task reports overview for one period"
    }

    fn params(&self) -> &[ParamSpec] {
        DASHBOARD_PARAMS
    }

    fn returns(&self) -> &str {
        "{attendance, tasks}"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let period = args.period_or("period", Period::Today);

        let (attendance, tasks) = tokio::join!(
            ctx.fetch(
                "attendance_overview",
                attendance_overview_request(ctx, period),
                PayloadDomain::Attendance,
            ),
            ctx.fetch("task_overview", task_overview_request(period), PayloadDomain::Tasks),
        );

        // 两边都失败时把第一个失败原样交给模型
        if !attendance.is_success() && !tasks.is_success() {
            return Ok(attendance);
        }

        let mut summary = format!(
            "🎯 **Team Performance Dashboard - {}**\n\n",
            title_case(&period.as_str().replace('_', " "))
        );
        for part in [&attendance, &tasks] {
            if let (true, Some(text)) = (part.is_success(), part.summary()) {
                summary.push_str(text);
                summary.push_str("\n\n");
            }
        }

        let data = json!({
            "attendance": attendance.data(),
            "tasks": tasks.data(),
        });
        Ok(Outcome::success_with_summary(data, summary.trim_end().to_string()))
    }
}
