//! 业务日期：固定时区偏移下的 today / yesterday / 周期区间，以及日期时间展示格式

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

/// API 使用的日期格式
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// 可接受的输入日期格式（按顺序尝试）
const INPUT_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y"];

/// 统计周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Yesterday,
    Week,
    Month,
    LastMonth,
    Quarter,
}

impl Period {
    pub const NAMES: [&'static str; 6] = ["today", "yesterday", "week", "month", "last_month", "quarter"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Yesterday => "yesterday",
            Period::Week => "week",
            Period::Month => "month",
            Period::LastMonth => "last_month",
            Period::Quarter => "quarter",
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "today" => Ok(Period::Today),
            "yesterday" => Ok(Period::Yesterday),
            "week" | "this_week" => Ok(Period::Week),
            "month" | "this_month" => Ok(Period::Month),
            "last_month" | "previous_month" => Ok(Period::LastMonth),
            "quarter" | "this_quarter" => Ok(Period::Quarter),
            _ => Err(format!(
                "unknown period '{}', expected one of: {}",
                s,
                Period::NAMES.join(", ")
            )),
        }
    }
}

/// 业务时钟：HR 系统所在时区的「今天」
#[derive(Debug, Clone, Copy)]
pub struct BusinessClock {
    offset: FixedOffset,
}

impl BusinessClock {
    /// offset_minutes 超出范围时回退为 UTC
    pub fn new(offset_minutes: i32) -> Self {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
            tracing::warn!(offset_minutes, "Invalid UTC offset, using UTC");
            Utc.fix()
        });
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn yesterday(&self) -> NaiveDate {
        self.today() - Duration::days(1)
    }

    pub fn date_range(&self, period: Period) -> (NaiveDate, NaiveDate) {
        date_range_from(self.today(), period)
    }

    /// 将 UTC 时间戳转为业务时区的 "02:30 PM"；无法解析时原样返回
    pub fn display_time(&self, raw: &str) -> String {
        match parse_timestamp(raw) {
            Some(utc) => utc.with_timezone(&self.offset).format("%I:%M %p").to_string(),
            None => raw.to_string(),
        }
    }
}

impl Default for BusinessClock {
    fn default() -> Self {
        Self::new(330)
    }
}

/// 以给定「今天」计算周期的起止日期（含端点）
pub fn date_range_from(today: NaiveDate, period: Period) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Today => (today, today),
        Period::Yesterday => {
            let y = today - Duration::days(1);
            (y, y)
        }
        Period::Week => {
            let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            (start, today)
        }
        Period::Month => (today.with_day(1).unwrap_or(today), today),
        Period::LastMonth => {
            let first_of_this = today.with_day(1).unwrap_or(today);
            let last_of_prev = first_of_this - Duration::days(1);
            (last_of_prev.with_day(1).unwrap_or(last_of_prev), last_of_prev)
        }
        Period::Quarter => {
            let quarter_month = (today.month0() / 3) * 3 + 1;
            let start = NaiveDate::from_ymd_opt(today.year(), quarter_month, 1).unwrap_or(today);
            (start, today)
        }
    }
}

/// 解析多种输入格式的日期
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    INPUT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date_naive()))
}

/// 解析 ISO 时间戳（带或不带 Z / 毫秒），无时区时视为 UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// "25 July 2024"；无法解析时原样返回
pub fn display_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(d) => d.format("%d %B %Y").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("today".parse::<Period>().unwrap(), Period::Today);
        assert_eq!("This Month".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("last-month".parse::<Period>().unwrap(), Period::LastMonth);
        assert!("fortnight".parse::<Period>().is_err());
    }

    #[test]
    fn test_date_ranges() {
        // 2024-07-25 是星期四
        let today = d(2024, 7, 25);
        assert_eq!(date_range_from(today, Period::Today), (today, today));
        assert_eq!(date_range_from(today, Period::Yesterday), (d(2024, 7, 24), d(2024, 7, 24)));
        assert_eq!(date_range_from(today, Period::Week), (d(2024, 7, 22), today));
        assert_eq!(date_range_from(today, Period::Month), (d(2024, 7, 1), today));
        assert_eq!(date_range_from(today, Period::LastMonth), (d(2024, 6, 1), d(2024, 6, 30)));
        assert_eq!(date_range_from(today, Period::Quarter), (d(2024, 7, 1), today));
    }

    #[test]
    fn test_last_month_across_year_boundary() {
        let today = d(2025, 1, 10);
        assert_eq!(date_range_from(today, Period::LastMonth), (d(2024, 12, 1), d(2024, 12, 31)));
    }

    #[test]
    fn test_parse_and_display_dates() {
        assert_eq!(parse_date("2024-07-25"), Some(d(2024, 7, 25)));
        assert_eq!(parse_date("25/07/2024"), Some(d(2024, 7, 25)));
        assert_eq!(parse_date("2024-07-25T10:00:00.000Z"), Some(d(2024, 7, 25)));
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(display_date("2024-07-25"), "25 July 2024");
        assert_eq!(display_date("soon"), "soon");
    }

    #[test]
    fn test_display_time_in_ist() {
        let clock = BusinessClock::new(330);
        assert_eq!(clock.display_time("2024-07-25T09:00:00.000Z"), "02:30 PM");
        assert_eq!(clock.display_time("not a time"), "not a time");
    }
}
