//! 员工工具：员工列表、当前用户资料、按姓名查找员工

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::format::{employee_list, employee_name, PayloadDomain};
use crate::backend::{ApiRequest, ErrorKind, Outcome};
use crate::tools::params::{ParamKind, ParamSpec, ToolArgs};
use crate::tools::registry::{Tool, ToolContext, ToolError, ToolId};

const SUGGESTION_LIMIT: usize = 10;

pub struct AllEmployeesTool;

#[async_trait]
impl Tool for AllEmployeesTool {
    fn id(&self) -> ToolId {
        ToolId::GetAllEmployees
    }

    fn description(&self) -> &str {
        "List all employees with their IDs, departments and positions"
    }

    fn returns(&self) -> &str {
        "employee list"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        Ok(ctx
            .fetch("all_employees", ApiRequest::get("/employees"), PayloadDomain::Employees)
            .await)
    }
}

pub struct UserProfileTool;

#[async_trait]
impl Tool for UserProfileTool {
    fn id(&self) -> ToolId {
        ToolId::GetUserProfile
    }

    fn description(&self) -> &str {
        "Get the profile of the currently logged-in user"
    }

    fn returns(&self) -> &str {
        "profile object"
    }

    async fn invoke(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<Outcome, ToolError> {
        Ok(ctx
            .fetch("user_profile", ApiRequest::get("/employees/profile"), PayloadDomain::Profile)
            .await)
    }
}

const SEARCH_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "employee_name",
    ParamKind::String,
    "Full or partial employee name",
)];

pub struct SearchEmployeeTool;

/// 匹配规则：全名包含查询串，或与名 / 姓完全相同，或全名以查询串开头（均忽略大小写）
pub fn name_matches(emp: &Value, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }
    let first = emp.get("firstName").and_then(Value::as_str).unwrap_or("").trim().to_lowercase();
    let last = emp.get("lastName").and_then(Value::as_str).unwrap_or("").trim().to_lowercase();
    let full = employee_name(emp).to_lowercase();
    full.contains(&query) || query == first || query == last || full.starts_with(&query)
}

fn summary_entry(emp: &Value) -> Value {
    json!({
        "employeeId": emp.get("employeeId").cloned().unwrap_or(Value::Null),
        "name": employee_name(emp),
        "department": emp.get("department").and_then(Value::as_str).unwrap_or("N/A"),
        "position": emp.get("position").and_then(Value::as_str).unwrap_or("N/A"),
    })
}

/// 在员工目录中查找唯一匹配；找不到或不唯一时返回可直接展示的失败
pub async fn find_employee(ctx: &ToolContext, query: &str) -> Outcome {
    let directory = ctx
        .fetch("search_employee_by_name", ApiRequest::get("/employees"), PayloadDomain::General)
        .await;
    let Some(data) = directory.data() else {
        return directory;
    };

    let employees = employee_list(data);
    tracing::info!(query, employees = employees.len(), "Searching employee directory");
    if employees.is_empty() {
        return Outcome::failure(
            ErrorKind::NotFound,
            "No employees found in the system",
            "No employees found in the system. Please check if the employee data is properly loaded.",
        );
    }

    let matches: Vec<Value> = employees
        .iter()
        .filter(|e| name_matches(e, query))
        .map(summary_entry)
        .collect();

    match matches.as_slice() {
        [] => {
            let suggestions = employees
                .iter()
                .take(SUGGESTION_LIMIT)
                .map(employee_name)
                .collect::<Vec<_>>()
                .join(", ");
            Outcome::failure(
                ErrorKind::NotFound,
                format!("No employee found with name '{}'", query),
                format!(
                    "I couldn't find any employee named '{}'. Please check the spelling or try with a different name.\n\nSome employee names in the system: {}...",
                    query, suggestions
                ),
            )
        }
        [only] => {
            let name = only["name"].as_str().unwrap_or_default().to_string();
            let id = only["employeeId"].as_str().unwrap_or("N/A").to_string();
            Outcome::success_with_summary(only.clone(), format!("Found employee: {} (ID: {})", name, id))
        }
        many => {
            let listing = many
                .iter()
                .map(|e| {
                    format!(
                        "• {} ({}) - {}",
                        e["name"].as_str().unwrap_or_default(),
                        e["employeeId"].as_str().unwrap_or("N/A"),
                        e["department"].as_str().unwrap_or("N/A")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Outcome::failure(
                ErrorKind::Validation,
                format!("Multiple employees found with name '{}'", query),
                format!(
                    "I found multiple employees with similar names:\n{}\n\nPlease be more specific with the full name.",
                    listing
                ),
            )
        }
    }
}

#[async_trait]
impl Tool for SearchEmployeeTool {
    fn id(&self) -> ToolId {
        ToolId::SearchEmployeeByName
    }

    fn description(&self) -> &str {
        "Find an employee by name and return their employeeId, department and position"
    }

    fn params(&self) -> &[ParamSpec] {
        SEARCH_PARAMS
    }

    fn returns(&self) -> &str {
        "{employeeId, name, department, position}"
    }

    async fn invoke(&self, ctx: &ToolContext, args: ToolArgs) -> Result<Outcome, ToolError> {
        let query = args.require_str("employee_name")?;
        Ok(find_employee(ctx, query).await)
    }
}
