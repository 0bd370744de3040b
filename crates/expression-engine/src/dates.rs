use crate::ast::DateUnit;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Parses the date and timestamp spellings found in source documents.
/// Date-only input resolves to midnight; offsets are normalised to UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// `None` when the result falls outside the representable range.
pub fn add(dt: NaiveDateTime, unit: DateUnit, amount: i64) -> Option<NaiveDateTime> {
    match unit {
        DateUnit::Day => dt.checked_add_signed(Duration::try_days(amount)?),
        DateUnit::Hour => dt.checked_add_signed(Duration::try_hours(amount)?),
        DateUnit::Minute => dt.checked_add_signed(Duration::try_minutes(amount)?),
        DateUnit::Month => add_months(dt, amount),
        DateUnit::Year => add_months(dt, amount.checked_mul(12)?),
    }
}

fn add_months(dt: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let n = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(n)
    } else {
        dt.checked_sub_months(n)
    }
}
