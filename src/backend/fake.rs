//! 内存版 HR 网关（用于测试与离线演示，无需后端）
//!
//! 按 endpoint + 查询参数匹配预置响应，未匹配时返回 404；记录每次请求及其令牌。
//! `backend.provider = "fake"` 时使用 [`FakeGateway::demo`] 的演示数据。

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::client::{classify_status, ApiRequest, HrGateway};
use crate::backend::outcome::ApiResponse;
use crate::core::AgentError;

struct Route {
    endpoint: String,
    filters: Vec<(String, String)>,
    response: ApiResponse,
}

#[derive(Default)]
pub struct FakeGateway {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<(ApiRequest, Option<String>)>>,
    login_token: Option<String>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登录成功时返回的令牌；未设置时登录被拒绝
    pub fn with_login_token(mut self, token: impl Into<String>) -> Self {
        self.login_token = Some(token.into());
        self
    }

    /// 预置响应；filters 中的查询参数须全部出现在请求里才算匹配
    pub fn route(self, endpoint: &str, filters: &[(&str, &str)], response: ApiResponse) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                endpoint: endpoint.trim_start_matches('/').to_string(),
                filters: filters
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                response,
            });
        }
        self
    }

    /// 预置成功响应（body 即后端原始 JSON）
    pub fn ok(self, endpoint: &str, filters: &[(&str, &str)], body: Value) -> Self {
        self.route(endpoint, filters, ApiResponse::Success { status: 200, data: body })
    }

    /// 预置按状态码分类的失败
    pub fn status(self, endpoint: &str, filters: &[(&str, &str)], status: u16) -> Self {
        self.route(endpoint, filters, ApiResponse::Failure(classify_status(status, None)))
    }

    /// 演示数据：几名员工、考勤与日报概览、待审批的请假与补登
    pub fn demo() -> Self {
        let employees = json!([
            {"employeeId": "EMP001", "firstName": "Asha", "lastName": "Rao",
             "department": "Engineering", "position": "Backend Engineer"},
            {"employeeId": "EMP002", "firstName": "Vikram", "lastName": "Shah",
             "department": "Engineering", "position": "QA Engineer"},
            {"employeeId": "EMP003", "firstName": "Meera", "lastName": "Iyer",
             "department": "Human Resources", "position": "HR Manager"}
        ]);
        Self::new()
            .with_login_token("demo-token")
            .ok("/employees/profile", &[], json!({"success": true, "data": {"user": {
                "employeeId": "EMP003", "firstName": "Meera", "lastName": "Iyer",
                "email": "meera.iyer@example.com", "department": "Human Resources",
                "position": "HR Manager", "role": "hr"
            }}}))
            .ok("/employees", &[], json!({"success": true, "data": employees}))
            .ok("/hr/attendance", &[("operation", "overview")], json!({"success": true, "data": {"overview": {
                "statistics": {"totalEmployees": 3, "presentToday": 2, "attendanceRate": 66.7,
                               "absentToday": 1, "lateToday": 1, "punctualityRate": 50},
                "insights": [{"message": "One late arrival in Engineering"}]
            }}}))
            .ok("/hr/attendance", &[("operation", "records")], json!({"success": true, "data": {"records": [
                {"employeeName": "Asha Rao", "date": "2026-10-19", "status": "present",
                 "checkIn": "2026-10-19T03:35:00.000Z", "checkOut": "2026-10-19T12:40:00.000Z"},
                {"employeeName": "Vikram Shah", "date": "2026-10-19", "status": "late",
                 "checkIn": "2026-10-19T05:10:00.000Z"}
            ]}}))
            .ok("/hr/attendance", &[("operation", "employee"), ("employeeId", "EMP001")], json!({"success": true, "data": {
                "employee": {"name": "Asha Rao", "department": "Engineering", "position": "Backend Engineer"},
                "analysis": {"attendanceRate": 96, "punctualityScore": 92}
            }}))
            .ok("/hr/task-reports", &[("operation", "overview")], json!({"success": true, "data": {"overview": {
                "statistics": {"totalEmployees": 3, "employeesWithTasks": 2, "taskReportingRate": 66.7,
                               "avgProductivityScore": 84, "avgQualityScore": 88, "completionRate": 90},
                "topPerformers": [{"name": "Asha Rao", "avgQualityScore": 93}]
            }}}))
            .ok("/hr/task-reports", &[("operation", "reports")], json!({"success": true, "data": {"reports": [
                {"employeeName": "Asha Rao", "date": "2026-10-19", "tasks": [{"title": "API review"}],
                 "productivityScore": 90, "qualityScore": 93}
            ]}}))
            .ok("/hr/task-reports", &[("operation", "employee"), ("employeeId", "EMP001")], json!({"success": true, "data": {
                "employee": {"name": "Asha Rao"},
                "analysis": {"productivityScore": 90, "qualityScore": 93, "taskCategories": {"development": 6}},
                "recommendations": ["Keep up the consistent reporting"]
            }}))
            .ok("/leaves", &[], json!({"success": true, "data": [
                {"employeeName": "Vikram Shah", "leaveType": "casual", "startDate": "2026-10-22",
                 "endDate": "2026-10-23", "status": "pending", "reason": "Family function"}
            ]}))
            .ok("/regularizations", &[], json!({"success": true, "data": [
                {"employeeName": "Asha Rao", "date": "2026-10-16", "status": "pending",
                 "reason": "Forgot to check out"}
            ]}))
    }

    pub fn requests(&self) -> Vec<(ApiRequest, Option<String>)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HrGateway for FakeGateway {
    async fn request(&self, req: ApiRequest, token: Option<&str>) -> ApiResponse {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((req.clone(), token.map(str::to_string)));
        }
        let endpoint = req.endpoint.trim_start_matches('/');
        let matched = self.routes.lock().ok().and_then(|routes| {
            routes
                .iter()
                .find(|r| {
                    r.endpoint == endpoint
                        && r.filters.iter().all(|(k, v)| req.query_value(k) == Some(v.as_str()))
                })
                .map(|r| r.response.clone())
        });
        matched.unwrap_or_else(|| ApiResponse::Failure(classify_status(404, None)))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<String, AgentError> {
        self.login_token
            .clone()
            .ok_or_else(|| AgentError::Unauthorized("login rejected by HR backend".into()))
    }
}
