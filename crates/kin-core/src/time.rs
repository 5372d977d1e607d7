//! Date grounding for relative-date phrases ("tomorrow", "next Monday").

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

/// Current UTC time as Unix millis. Used for state timestamps.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local wall-clock instant the parser grounds relative dates against.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `local_now()`, optionally moved onto the `YYYY-MM-DD` day `date` while
/// keeping the current wall-clock time.
pub fn reference_now(date: Option<&str>) -> Result<NaiveDateTime, chrono::ParseError> {
    let now = local_now();
    match date {
        Some(d) => Ok(NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")?.and_time(now.time())),
        None => Ok(now),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateContext {
    /// `YYYY-MM-DD`
    pub today: String,
    /// English weekday name, e.g. `Saturday`.
    pub day_of_week: String,
    pub day_num: u32,
    /// English month name, e.g. `June`.
    pub month: String,
    pub year: i32,
    /// 24-hour `HH:MM`
    pub time: String,
}

impl DateContext {
    pub fn build(now: NaiveDateTime) -> Self {
        let date = now.date();
        Self {
            today: date.format("%Y-%m-%d").to_string(),
            day_of_week: date.format("%A").to_string(),
            day_num: date.day(),
            month: date.format("%B").to_string(),
            year: date.year(),
            time: format!("{:02}:{:02}", now.hour(), now.minute()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_known_date() {
        let ctx = DateContext::build(at(2024, 6, 1, 9, 5));
        assert_eq!(ctx.today, "2024-06-01");
        assert_eq!(ctx.day_of_week, "Saturday");
        assert_eq!(ctx.day_num, 1);
        assert_eq!(ctx.month, "June");
        assert_eq!(ctx.year, 2024);
        assert_eq!(ctx.time, "09:05");
    }

    #[test]
    fn test_leap_day() {
        let ctx = DateContext::build(at(2028, 2, 29, 23, 59));
        assert_eq!(ctx.today, "2028-02-29");
        assert_eq!(ctx.day_of_week, "Tuesday");
        assert_eq!(ctx.month, "February");
        assert_eq!(ctx.time, "23:59");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(DateContext::build(at(2026, 2, 21, 0, 0))).unwrap();
        assert_eq!(json["dayOfWeek"], "Saturday");
        assert_eq!(json["dayNum"], 21);
    }

    #[test]
    fn test_reference_now_pins_date() {
        let pinned = reference_now(Some("2024-06-01")).unwrap();
        assert_eq!(pinned.date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(reference_now(Some("June 1st")).is_err());
        assert!(reference_now(None).is_ok());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01T00:00:00Z
        assert!(now_millis() > 1_704_067_200_000);
    }
}
