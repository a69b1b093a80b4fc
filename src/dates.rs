//! Date coercion and interval math shared by the plan store and the timeline.
//!
//! All instants are UTC. Bare calendar dates (`2025-03-01`) are read as UTC
//! midnight so a date typed on the command line and the same date read back
//! from storage land on the same instant.

use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

const MS_PER_DAY: f64 = 86_400_000.0;

/// A loosely typed date as it arrives from input or storage.
#[derive(Debug, Clone, PartialEq)]
pub enum DateLike {
    Text(String),
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    Instant(DateTime<Utc>),
}

impl DateLike {
    /// Interpret the value, or `None` when it does not name a valid instant.
    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(s) => parse_text(s),
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Instant(dt) => Some(*dt),
        }
    }
}

impl From<&str> for DateLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DateLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DateLike {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl From<DateTime<Utc>> for DateLike {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Instant(dt)
    }
}

impl From<NaiveDate> for DateLike {
    fn from(d: NaiveDate) -> Self {
        Self::Instant(midnight(d))
    }
}

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(midnight)
}

/// Coerce `value` into an instant, returning `fallback` when the value is
/// absent or does not parse. Never fails.
pub fn parse_plan_date(value: Option<DateLike>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    value.and_then(|v| v.to_instant()).unwrap_or(fallback)
}

/// [`parse_plan_date`] with the current time as fallback.
pub fn parse_plan_date_or_now(value: Option<DateLike>) -> DateTime<Utc> {
    parse_plan_date(value, Utc::now())
}

/// UTC midnight at the start of `date`.
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Fractional days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MS_PER_DAY
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `months` after the month containing `date`, or
/// `None` past the representable calendar.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let first = start_of_month(date);
    let delta = Months::new(months.unsigned_abs());
    if months >= 0 {
        first.checked_add_months(delta)
    } else {
        first.checked_sub_months(delta)
    }
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = start_of_month(date);
    let days = match add_months(first, 1) {
        Some(next) => (next - first).num_days(),
        // The last representable month ends at NaiveDate::MAX.
        None => (NaiveDate::MAX - first).num_days() + 1,
    };
    days as u32
}

/// A closed interval of instants. `start <= end` is not enforced: phase dates
/// are stored exactly as entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_reversed(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Intersection of `[start, end]` with `[window_start, window_end]`.
/// `None` means no visible overlap.
pub fn clamp_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Option<DateRange> {
    let clamped_start = start.max(window_start);
    let clamped_end = end.min(window_end);
    if clamped_end < clamped_start {
        return None;
    }
    Some(DateRange::new(clamped_start, clamped_end))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    Millis(i64),
}

/// Serde adapter for persisted date fields: accepts ISO-8601 text or epoch
/// milliseconds and rejects anything else, so a corrupt aggregate fails to
/// load instead of silently shifting dates.
pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let like = match RawDate::deserialize(deserializer)? {
        RawDate::Text(s) => DateLike::Text(s),
        RawDate::Millis(ms) => DateLike::Millis(ms),
    };
    like.to_instant()
        .ok_or_else(|| de::Error::custom(format!("unparseable date {like:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_supported_text_forms() {
        let fallback = ymd(2000, 1, 1);
        assert_eq!(
            parse_plan_date(Some("2025-03-01".into()), fallback),
            ymd(2025, 3, 1)
        );
        assert_eq!(
            parse_plan_date(Some("2025-03-01T00:00:00Z".into()), fallback),
            ymd(2025, 3, 1)
        );
        assert_eq!(
            parse_plan_date(Some("2025-03-01T02:00:00+02:00".into()), fallback),
            ymd(2025, 3, 1)
        );
        assert_eq!(
            parse_plan_date(Some("2025-03-01T12:30".into()), fallback),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn millis_and_instants_pass_through() {
        let fallback = ymd(2000, 1, 1);
        let dt = ymd(2025, 6, 15);
        assert_eq!(
            parse_plan_date(Some(dt.timestamp_millis().into()), fallback),
            dt
        );
        assert_eq!(parse_plan_date(Some(dt.into()), fallback), dt);
    }

    #[test]
    fn bad_input_yields_fallback() {
        let fallback = ymd(2000, 1, 1);
        assert_eq!(parse_plan_date(None, fallback), fallback);
        assert_eq!(parse_plan_date(Some("".into()), fallback), fallback);
        assert_eq!(parse_plan_date(Some("not a date".into()), fallback), fallback);
        assert_eq!(parse_plan_date(Some("2025-13-40".into()), fallback), fallback);
        assert_eq!(parse_plan_date(Some(i64::MAX.into()), fallback), fallback);
    }

    #[test]
    fn or_now_uses_current_time() {
        let before = Utc::now();
        let parsed = parse_plan_date_or_now(Some("garbage".into()));
        assert!(parsed >= before);
    }

    #[test]
    fn iso_round_trip_reproduces_instant() {
        let dt = Utc.with_ymd_and_hms(2025, 7, 4, 13, 45, 12).unwrap()
            + chrono::Duration::milliseconds(250);
        let text = dt.to_rfc3339();
        assert_eq!(parse_plan_date(Some(text.into()), ymd(2000, 1, 1)), dt);
    }

    #[test]
    fn clamp_inside_window_is_unchanged() {
        let r = clamp_interval(ymd(2025, 2, 1), ymd(2025, 3, 1), ymd(2025, 1, 1), ymd(2025, 12, 31))
            .unwrap();
        assert_eq!(r, DateRange::new(ymd(2025, 2, 1), ymd(2025, 3, 1)));
    }

    #[test]
    fn clamp_trims_both_ends() {
        let r = clamp_interval(ymd(2024, 6, 1), ymd(2026, 6, 1), ymd(2025, 1, 1), ymd(2025, 12, 31))
            .unwrap();
        assert_eq!(r, DateRange::new(ymd(2025, 1, 1), ymd(2025, 12, 31)));
    }

    #[test]
    fn clamp_outside_window_is_none() {
        assert!(clamp_interval(ymd(2024, 1, 1), ymd(2024, 6, 1), ymd(2025, 1, 1), ymd(2025, 12, 31))
            .is_none());
        assert!(clamp_interval(ymd(2026, 1, 1), ymd(2026, 6, 1), ymd(2025, 1, 1), ymd(2025, 12, 31))
            .is_none());
    }

    #[test]
    fn clamp_reversed_interval_is_none() {
        assert!(clamp_interval(ymd(2025, 6, 1), ymd(2025, 3, 1), ymd(2025, 1, 1), ymd(2025, 12, 31))
            .is_none());
    }

    #[test]
    fn days_between_is_fractional() {
        let a = ymd(2025, 1, 1);
        assert_eq!(days_between(a, ymd(2025, 1, 11)), 10.0);
        assert_eq!(days_between(a, a + chrono::Duration::hours(12)), 0.5);
        assert_eq!(days_between(ymd(2025, 1, 11), a), -10.0);
    }

    #[test]
    fn month_helpers() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(start_of_month(d), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(add_months(d, 1), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(add_months(d, -1), NaiveDate::from_ymd_opt(2023, 12, 1));
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap()), 28);
    }

    #[test]
    fn month_helpers_at_calendar_limits() {
        assert_eq!(add_months(NaiveDate::MAX, 1), None);
        assert_eq!(add_months(NaiveDate::MIN, -1), None);
        assert_eq!(days_in_month(NaiveDate::MAX), 31);
    }

    #[test]
    fn deserialize_accepts_text_and_millis() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_instant")]
            at: DateTime<Utc>,
        }
        let a: Holder = serde_json::from_str(r#"{"at":"2025-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(a.at, ymd(2025, 1, 1));
        let ms = ymd(2025, 1, 1).timestamp_millis();
        let b: Holder = serde_json::from_str(&format!(r#"{{"at":{ms}}}"#)).unwrap();
        assert_eq!(b.at, ymd(2025, 1, 1));
        assert!(serde_json::from_str::<Holder>(r#"{"at":"yesterday"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"at":null}"#).is_err());
    }
}
