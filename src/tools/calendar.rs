//! 日期工具：今天、昨天、周期区间（业务时区）

use async_trait::async_trait;
use serde_json::json;

use crate::backend::dates::{format_api_date, Period};
use crate::backend::Outcome;
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};

pub struct TodayDateTool;

#[async_trait]
impl Tool for TodayDateTool {
    fn id(&self) -> ToolId {
        ToolId::GetTodayDate
    }

    fn description(&self) -> &str {
        "Get today's date in YYYY-MM-DD format"
    }

    fn returns(&self) -> &str {
        "date string"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        Ok(Outcome::success(json!(format_api_date(ctx.clock.today()))))
    }
}

pub struct YesterdayDateTool;

#[async_trait]
impl Tool for YesterdayDateTool {
    fn id(&self) -> ToolId {
        ToolId::GetYesterdayDate
    }

    fn description(&self) -> &str {
        "Get yesterday's date in YYYY-MM-DD format"
    }

    fn returns(&self) -> &str {
        "date string"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        Ok(Outcome::success(json!(format_api_date(ctx.clock.yesterday()))))
    }
}

const RANGE_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "period",
    ParamKind::Period,
    "today, yesterday, week, month, last_month or quarter",
)];

pub struct DateRangeTool;

#[async_trait]
impl Tool for DateRangeTool {
    fn id(&self) -> ToolId {
        ToolId::GetDateRange
    }

    fn description(&self) -> &str {
        "Get the start and end dates (YYYY-MM-DD) of a period"
    }

    fn params(&self) -> &[ParamSpec] {
        RANGE_PARAMS
    }

    fn returns(&self) -> &str {
        "{period, start_date, end_date}"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let period = args.period_or("period", Period::Today);
        let (start, end) = ctx.clock.date_range(period);
        let (start, end) = (format_api_date(start), format_api_date(end));
        Ok(Outcome::success_with_summary(
            json!({ "period": period.as_str(), "start_date": start, "end_date": end }),
            format!("{} covers {} to {}", period.as_str(), start, end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{BusinessClock, FakeGateway};
    use crate::tools::params::resolve_args;

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(FakeGateway::new()), None, BusinessClock::default())
    }

    #[tokio::test]
    async fn test_today_and_yesterday() {
        let ctx = ctx();
        let today = TodayDateTool.invoke(&ctx, ToolArgs::default()).await.unwrap();
        let yesterday = YesterdayDateTool.invoke(&ctx, ToolArgs::default()).await.unwrap();
        assert_eq!(today.data(), Some(&json!(format_api_date(ctx.clock.today()))));
        assert_eq!(yesterday.data(), Some(&json!(format_api_date(ctx.clock.yesterday()))));
    }

    #[tokio::test]
    async fn test_date_range() {
        let ctx = ctx();
        let args = resolve_args(DateRangeTool.params(), &json!("month")).unwrap();
        let outcome = DateRangeTool.invoke(&ctx, args).await.unwrap();
        let data = outcome.data().unwrap();
        assert_eq!(data["period"], json!("month"));
        assert!(data["start_date"].as_str().unwrap().ends_with("-01"));
        assert!(outcome.summary().unwrap().starts_with("month covers"));
    }
}
