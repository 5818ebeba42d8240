//! 请假与考勤补登（regularization）查询工具；只读，不提交审批

use async_trait::async_trait;

use crate::backend::format::PayloadDomain;
use crate::backend::{ApiRequest, Outcome};
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};

const LEAVES: &str = "/leaves";
const REGULARIZATIONS: &str = "/regularizations";

pub struct PendingLeaveRequestsTool;

#[async_trait]
impl Tool for PendingLeaveRequestsTool {
    fn id(&self) -> ToolId {
        ToolId::GetTeamPendingLeaveRequests
    }

    fn description(&self) -> &str {
        "Pending leave requests across the team (HR/admin only)"
    }

    fn returns(&self) -> &str {
        "leave requests"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = ApiRequest::get(LEAVES).query("status", "pending");
        Ok(ctx
            .fetch("get_team_pending_leave_requests", req, PayloadDomain::Leave)
            .await)
    }
}

const BY_EMPLOYEE_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "employee_name",
    ParamKind::String,
    "Employee name",
)];

pub struct LeaveRequestsByEmployeeTool;

#[async_trait]
impl Tool for LeaveRequestsByEmployeeTool {
    fn id(&self) -> ToolId {
        ToolId::GetLeaveRequestsByEmployee
    }

    fn description(&self) -> &str {
        "Leave requests submitted by one employee (HR/admin only)"
    }

    fn params(&self) -> &[ParamSpec] {
        BY_EMPLOYEE_PARAMS
    }

    fn returns(&self) -> &str {
        "leave requests"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = ApiRequest::get(LEAVES).query("employeeName", args.require_str("employee_name")?);
        Ok(ctx
            .fetch("get_leave_requests_by_employee", req, PayloadDomain::Leave)
            .await)
    }
}

pub struct PendingRegularizationsTool;

#[async_trait]
impl Tool for PendingRegularizationsTool {
    fn id(&self) -> ToolId {
        ToolId::GetTeamPendingRegularizationRequests
    }

    fn description(&self) -> &str {
        "Pending attendance regularization requests across the team (HR/admin only)"
    }

    fn returns(&self) -> &str {
        "regularization requests"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        let req = ApiRequest::get(REGULARIZATIONS).query("status", "pending");
        Ok(ctx
            .fetch("get_team_pending_regularization_requests", req, PayloadDomain::Leave)
            .await)
    }
}

const REGULARIZATION_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "status",
    ParamKind::String,
    None,
    "pending, approved or rejected; omit for all",
)];

pub struct RegularizationsTool;

#[async_trait]
impl Tool for RegularizationsTool {
    fn id(&self) -> ToolId {
        ToolId::GetRegularizations
    }

    fn description(&self) -> &str {
        "Attendance regularization requests, optionally filtered by status"
    }

    fn params(&self) -> &[ParamSpec] {
        REGULARIZATION_PARAMS
    }

    fn returns(&self) -> &str {
        "regularization requests"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let status = args.str("status").map(str::to_lowercase);
        let req = ApiRequest::get(REGULARIZATIONS).query_opt("status", status);
        Ok(ctx
            .fetch("get_all_regularizations", req, PayloadDomain::Leave)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::{BusinessClock, ErrorKind, FakeGateway};
    use crate::tools::params::resolve_args;

    #[tokio::test]
    async fn test_pending_leaves_filter() {
        let gateway = Arc::new(FakeGateway::new().ok(
            LEAVES,
            &[("status", "pending")],
            json!({"success": true, "data": [
                {"employeeName": "Asha Rao", "leaveType": "casual", "startDate": "2026-10-22",
                 "endDate": "2026-10-23", "status": "pending", "reason": "Family function"},
                {"employeeName": "Vikram Shah", "startDate": "2026-10-27", "status": "pending"}
            ]}),
        ));
        let ctx = ToolContext::new(gateway.clone(), Some("t".into()), BusinessClock::default());
        let outcome = PendingLeaveRequestsTool.invoke(&ctx, ToolArgs::default()).await.unwrap();
        let summary = outcome.summary().unwrap();
        assert!(summary.contains("(2 total)"));
        assert!(summary.contains("**Asha Rao** - 22 October 2026 to 23 October 2026 (Casual)"));
        assert!(summary.contains("Reason: Family function"));
        assert!(summary.contains("**Vikram Shah** - 27 October 2026"));
    }

    #[tokio::test]
    async fn test_regularizations_without_status() {
        let gateway = Arc::new(FakeGateway::new().status(REGULARIZATIONS, &[], 403));
        let ctx = ToolContext::new(gateway.clone(), Some("t".into()), BusinessClock::default());
        let args = resolve_args(REGULARIZATION_PARAMS, &serde_json::Value::Null).unwrap();
        let outcome = RegularizationsTool.invoke(&ctx, args).await.unwrap();
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Permission));
        assert_eq!(gateway.requests()[0].0.query_value("status"), None);
    }
}
