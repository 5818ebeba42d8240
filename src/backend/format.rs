//! 展示格式化：把后端载荷整理成 markdown 风格的摘要文本
//!
//! 摘要只用于观察消息，模型据此组织最终回答；格式化失败时返回通用文本，不影响结果。

use std::fmt::Write as _;

use serde_json::Value;

use crate::backend::dates::{display_date, BusinessClock};

const RECORD_PREVIEW: usize = 10;
const REPORT_PREVIEW: usize = 5;
const INSIGHT_PREVIEW: usize = 3;
const DIRECTORY_PREVIEW: usize = 20;

/// 载荷所属的业务领域，决定使用哪种格式化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDomain {
    Attendance,
    Tasks,
    Employees,
    Leave,
    Profile,
    General,
}

pub fn summarize(domain: PayloadDomain, data: &Value, clock: &BusinessClock) -> String {
    match domain {
        PayloadDomain::Attendance => attendance_summary(data, clock),
        PayloadDomain::Tasks => task_summary(data),
        PayloadDomain::Employees => employee_directory_summary(data),
        PayloadDomain::Leave => leave_summary(data),
        PayloadDomain::Profile => profile_summary(data),
        PayloadDomain::General => general_summary(data),
    }
}

/// 取字段并转为展示文本；缺失时为 "N/A"
fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "N/A".to_string(),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn insight_lines(out: &mut String, items: Option<&Value>) {
    for item in items.and_then(Value::as_array).into_iter().flatten().take(INSIGHT_PREVIEW) {
        let text = match item {
            Value::String(s) => s.clone(),
            other => str_field(other, "message")
                .or_else(|| str_field(other, "title"))
                .unwrap_or("No message")
                .to_string(),
        };
        let _ = writeln!(out, "• {}", text);
    }
}

pub fn attendance_summary(data: &Value, clock: &BusinessClock) -> String {
    if let Some(overview) = data.get("overview") {
        let stats = overview.get("statistics").unwrap_or(&Value::Null);
        let mut out = String::from("📊 **Attendance Overview**\n\n");
        let _ = writeln!(out, "• **Total Employees:** {}", field(stats, "totalEmployees"));
        let _ = writeln!(
            out,
            "• **Present Today:** {} ({}%)",
            field(stats, "presentToday"),
            field(stats, "attendanceRate")
        );
        let _ = writeln!(out, "• **Absent Today:** {}", field(stats, "absentToday"));
        let _ = writeln!(out, "• **Late Arrivals:** {}", field(stats, "lateToday"));
        let _ = writeln!(out, "• **Punctuality Rate:** {}%", field(stats, "punctualityRate"));
        if overview.get("insights").and_then(Value::as_array).is_some_and(|a| !a.is_empty()) {
            out.push_str("\n💡 **Key Insights:**\n");
            insight_lines(&mut out, overview.get("insights"));
        }
        return out;
    }

    if let Some(records) = data.get("records").and_then(Value::as_array) {
        if records.is_empty() {
            return "No attendance records found for the specified criteria.".to_string();
        }
        let mut out = format!("📋 **Attendance Records** ({} records)\n\n", records.len());
        for record in records.iter().take(RECORD_PREVIEW) {
            let name = str_field(record, "employeeName").unwrap_or("Unknown");
            let date = str_field(record, "date").map(display_date).unwrap_or_else(|| "N/A".into());
            let status = title_case(str_field(record, "status").unwrap_or("Unknown"));
            let _ = writeln!(out, "**{}** - {}", name, date);
            out.push_str(&format!("  Status: {}", status));
            if let Some(t) = str_field(record, "checkIn") {
                out.push_str(&format!(" | In: {}", clock.display_time(t)));
            }
            if let Some(t) = str_field(record, "checkOut") {
                out.push_str(&format!(" | Out: {}", clock.display_time(t)));
            }
            out.push_str("\n\n");
        }
        if records.len() > RECORD_PREVIEW {
            let _ = write!(out, "... and {} more records", records.len() - RECORD_PREVIEW);
        }
        return out;
    }

    if let Some(employee) = data.get("employee") {
        let name = str_field(employee, "name").unwrap_or("Employee");
        let mut out = format!("👤 **{} - Attendance Analysis**\n\n", name);
        if let Some(analysis) = data.get("analysis").filter(|a| !a.is_null()) {
            let _ = writeln!(out, "• **Attendance Rate:** {}%", field(analysis, "attendanceRate"));
            let _ = writeln!(out, "• **Punctuality Score:** {}%", field(analysis, "punctualityScore"));
            let _ = writeln!(out, "• **Department:** {}", field(employee, "department"));
            let _ = writeln!(out, "• **Position:** {}", field(employee, "position"));
        }
        return out;
    }

    match data {
        Value::Array(items) => format!("Attendance data retrieved: {} items", items.len()),
        _ => "Attendance data retrieved successfully".to_string(),
    }
}

pub fn task_summary(data: &Value) -> String {
    if let Some(overview) = data.get("overview") {
        let stats = overview.get("statistics").unwrap_or(&Value::Null);
        let mut out = String::from("📈 **Task Reports Overview**\n\n");
        let _ = writeln!(out, "• **Total Employees:** {}", field(stats, "totalEmployees"));
        let _ = writeln!(out, "• **Employees with Tasks:** {}", field(stats, "employeesWithTasks"));
        let _ = writeln!(out, "• **Task Reporting Rate:** {}%", field(stats, "taskReportingRate"));
        let _ = writeln!(out, "• **Average Productivity Score:** {}/100", field(stats, "avgProductivityScore"));
        let _ = writeln!(out, "• **Average Quality Score:** {}/100", field(stats, "avgQualityScore"));
        let _ = writeln!(out, "• **Completion Rate:** {}%", field(stats, "completionRate"));
        let performers = overview.get("topPerformers").and_then(Value::as_array);
        if let Some(performers) = performers.filter(|p| !p.is_empty()) {
            out.push_str("\n🏆 **Top Performers:**\n");
            for p in performers.iter().take(INSIGHT_PREVIEW) {
                let _ = writeln!(
                    out,
                    "• {} - Quality: {}/100",
                    str_field(p, "name").unwrap_or("Unknown"),
                    field(p, "avgQualityScore")
                );
            }
        }
        return out;
    }

    if let Some(reports) = data.get("reports").and_then(Value::as_array) {
        if reports.is_empty() {
            return "No task reports found for the specified criteria.".to_string();
        }
        let mut out = format!("📝 **Task Reports** ({} reports)\n\n", reports.len());
        for report in reports.iter().take(REPORT_PREVIEW) {
            let name = str_field(report, "employeeName").unwrap_or("Unknown");
            let date = str_field(report, "date").map(display_date).unwrap_or_else(|| "N/A".into());
            let tasks = report.get("tasks").and_then(Value::as_array).map_or(0, Vec::len);
            let _ = writeln!(out, "**{}** - {}", name, date);
            out.push_str(&format!("  Tasks: {}", tasks));
            if report.get("productivityScore").is_some() {
                out.push_str(&format!(" | Productivity: {}/100", field(report, "productivityScore")));
            }
            if report.get("qualityScore").is_some() {
                out.push_str(&format!(" | Quality: {}/100", field(report, "qualityScore")));
            }
            out.push_str("\n\n");
        }
        if reports.len() > REPORT_PREVIEW {
            let _ = write!(out, "... and {} more reports", reports.len() - REPORT_PREVIEW);
        }
        return out;
    }

    if let Some(employee) = data.get("employee") {
        let name = str_field(employee, "name").unwrap_or("Employee");
        let mut out = format!("👤 **{} - Task Performance**\n\n", name);
        if let Some(analysis) = data.get("analysis").filter(|a| !a.is_null()) {
            let _ = writeln!(out, "• **Productivity Score:** {}/100", field(analysis, "productivityScore"));
            let _ = writeln!(out, "• **Quality Score:** {}/100", field(analysis, "qualityScore"));
            let categories = analysis
                .get("taskCategories")
                .and_then(Value::as_object)
                .filter(|c| !c.is_empty())
                .map(|c| c.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(out, "• **Task Categories:** {}", categories);
        }
        if data.get("recommendations").and_then(Value::as_array).is_some_and(|r| !r.is_empty()) {
            out.push_str("\n💡 **Recommendations:**\n");
            insight_lines(&mut out, data.get("recommendations"));
        }
        return out;
    }

    match data {
        Value::Array(items) => format!("Task reports data retrieved: {} items", items.len()),
        _ => "Task reports data retrieved successfully".to_string(),
    }
}

/// 员工列表载荷可能是数组，也可能包在 data / employees 字段里
pub fn employee_list(data: &Value) -> &[Value] {
    let list = match data {
        Value::Array(items) => Some(items),
        Value::Object(map) => map
            .get("data")
            .or_else(|| map.get("employees"))
            .and_then(Value::as_array),
        _ => None,
    };
    list.map(Vec::as_slice).unwrap_or(&[])
}

/// "First Last"，两者都缺失时回退到 name 字段
pub fn employee_name(emp: &Value) -> String {
    let first = str_field(emp, "firstName").unwrap_or("");
    let last = str_field(emp, "lastName").unwrap_or("");
    let full = format!("{} {}", first, last).trim().to_string();
    if full.is_empty() {
        str_field(emp, "name").unwrap_or("Unknown").to_string()
    } else {
        full
    }
}

pub fn employee_directory_summary(data: &Value) -> String {
    let employees = employee_list(data);
    if employees.is_empty() {
        return general_summary(data);
    }
    let mut out = format!("👥 **Employees** ({} total)\n\n", employees.len());
    for emp in employees.iter().take(DIRECTORY_PREVIEW) {
        let _ = writeln!(
            out,
            "• {} ({}) - {}",
            employee_name(emp),
            field(emp, "employeeId"),
            field(emp, "department")
        );
    }
    if employees.len() > DIRECTORY_PREVIEW {
        let _ = write!(out, "... and {} more employees", employees.len() - DIRECTORY_PREVIEW);
    }
    out
}

/// 请假与补登记录共用：补登只有 date，请假有 startDate / endDate
pub fn leave_summary(data: &Value) -> String {
    let requests = employee_list(data);
    if requests.is_empty() {
        return match data {
            Value::Array(_) => "No requests found for the specified criteria.".to_string(),
            _ => general_summary(data),
        };
    }
    let mut out = format!("🗓️ **Requests** ({} total)\n\n", requests.len());
    for request in requests.iter().take(RECORD_PREVIEW) {
        let name = str_field(request, "employeeName")
            .map(str::to_string)
            .unwrap_or_else(|| employee_name(request));
        let kind = str_field(request, "leaveType").or_else(|| str_field(request, "type"));
        let dates = match (str_field(request, "startDate"), str_field(request, "endDate")) {
            (Some(start), Some(end)) if start != end => format!("{} to {}", display_date(start), display_date(end)),
            (Some(start), _) => display_date(start),
            _ => str_field(request, "date").map(display_date).unwrap_or_else(|| "N/A".into()),
        };
        let status = title_case(str_field(request, "status").unwrap_or("Unknown"));
        match kind {
            Some(kind) => {
                let _ = writeln!(out, "**{}** - {} ({})", name, dates, title_case(kind));
            }
            None => {
                let _ = writeln!(out, "**{}** - {}", name, dates);
            }
        }
        out.push_str(&format!("  Status: {}", status));
        if let Some(reason) = str_field(request, "reason") {
            out.push_str(&format!(" | Reason: {}", reason));
        }
        out.push_str("\n\n");
    }
    if requests.len() > RECORD_PREVIEW {
        let _ = write!(out, "... and {} more requests", requests.len() - RECORD_PREVIEW);
    }
    out
}

pub fn profile_summary(data: &Value) -> String {
    let profile = data.get("user").or_else(|| data.get("employee")).unwrap_or(data);
    if !profile.is_object() {
        return general_summary(data);
    }
    let mut out = format!("👤 **{}**\n\n", employee_name(profile));
    let _ = writeln!(out, "• **Employee ID:** {}", field(profile, "employeeId"));
    let _ = writeln!(out, "• **Email:** {}", field(profile, "email"));
    let _ = writeln!(out, "• **Department:** {}", field(profile, "department"));
    let _ = writeln!(out, "• **Position:** {}", field(profile, "position"));
    if let Some(role) = str_field(profile, "role") {
        let _ = writeln!(out, "• **Role:** {}", role);
    }
    out
}

pub fn general_summary(data: &Value) -> String {
    match data {
        Value::Array(items) => format!("Retrieved {} items successfully", items.len()),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => format!("Data retrieved successfully: {} fields", map.len()),
        },
        _ => "Data retrieved successfully".to_string(),
    }
}
