//! crates/health_report_core/src/date_range.rs
//!
//! Turns the optional `start_date` / `end_date` strings of a report request into
//! an inclusive [`TimeWindow`].

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::domain::TimeWindow;

/// Length of the window used when the caller leaves a bound out.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("Invalid date format for {field}: '{value}'")]
    InvalidDateFormat { field: &'static str, value: String },
    #[error("start_date ({start}) must not be after end_date ({end})")]
    Reversed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl Bound {
    fn field(self) -> &'static str {
        match self {
            Bound::Start => "start_date",
            Bound::End => "end_date",
        }
    }

    /// The time of day a bare date expands to.
    fn time_of_day(self) -> Option<NaiveTime> {
        match self {
            Bound::Start => NaiveTime::from_hms_opt(0, 0, 0),
            Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999),
        }
    }
}

/// Resolves the report window.
///
/// * both bounds absent: the trailing [`DEFAULT_WINDOW_DAYS`] ending at `now`
/// * only `start`: from `start` to `now`
/// * only `end`: the [`DEFAULT_WINDOW_DAYS`] ending at `end`
///
/// A window whose start falls after its end is rejected, never swapped.
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeWindow, DateRangeError> {
    let start_raw = start;
    let end_raw = end;
    let start = start.map(|v| parse_bound(v, Bound::Start)).transpose()?;
    let end = end.map(|v| parse_bound(v, Bound::End)).transpose()?;

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, now),
        (None, Some(end)) => (default_start(end, Bound::End, end_raw)?, end),
        (None, None) => (default_start(now, Bound::Start, start_raw)?, now),
    };

    TimeWindow::new(start, end).map_err(|_| DateRangeError::Reversed { start, end })
}

/// The start of a default-length window ending at `end`. Dates too close to the
/// minimum representable instant cannot be extended backwards.
fn default_start(
    end: DateTime<Utc>,
    bound: Bound,
    raw: Option<&str>,
) -> Result<DateTime<Utc>, DateRangeError> {
    end.checked_sub_signed(Duration::days(DEFAULT_WINDOW_DAYS))
        .ok_or_else(|| DateRangeError::InvalidDateFormat {
            field: bound.field(),
            value: raw.map_or_else(|| end.to_rfc3339(), str::to_string),
        })
}

fn parse_bound(value: &str, bound: Bound) -> Result<DateTime<Utc>, DateRangeError> {
    parse_instant(value.trim(), bound).ok_or_else(|| DateRangeError::InvalidDateFormat {
        field: bound.field(),
        value: value.to_string(),
    })
}

fn parse_instant(value: &str, bound: Bound) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(bound.time_of_day()?)));
    }
    // An unencoded `+` in a query string arrives as a space: "...T10:00:00 02:00".
    if value.contains(' ') {
        if let Ok(instant) = DateTime::parse_from_rfc3339(&value.replace(' ', "+")) {
            return Some(instant.with_timezone(&Utc));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn defaults_to_trailing_thirty_days() {
        let window = resolve_window(None, None, now()).unwrap();
        assert_eq!(window.end(), now());
        assert_eq!(window.start(), now() - Duration::days(30));
    }

    #[test]
    fn accepts_rfc3339_naive_and_bare_dates() {
        let window = resolve_window(
            Some("2024-06-01T08:30:00+02:00"),
            Some("2024-06-10T10:00:00.123456"),
            now(),
        )
        .unwrap();
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap());
        assert_eq!(
            window.end(),
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap()
                + Duration::microseconds(123_456)
        );

        let window = resolve_window(Some("2024-06-01"), Some("2024-06-01"), now()).unwrap();
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(
            window.end(),
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap()
                + Duration::nanoseconds(999_999_999)
        );
    }

    #[test]
    fn bare_end_date_covers_the_last_second_of_the_day() {
        let window = resolve_window(Some("2024-06-01"), Some("2024-06-01"), now()).unwrap();
        let late =
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap() + Duration::milliseconds(400);
        assert!(window.contains(late));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn end_date_near_the_minimum_instant_is_rejected_not_panicking() {
        assert_eq!(
            resolve_window(None, Some("-262143-01-10"), now()),
            Err(DateRangeError::InvalidDateFormat {
                field: "end_date",
                value: "-262143-01-10".to_string(),
            })
        );
        assert!(resolve_window(None, Some("+262142-12-31"), now()).is_ok());
    }

    #[test]
    fn restores_plus_sign_lost_in_query_encoding() {
        let window =
            resolve_window(Some("2024-06-01T00:00:00 02:00"), None, now()).unwrap();
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 5, 31, 22, 0, 0).unwrap());
    }

    #[test]
    fn one_sided_bounds_use_documented_defaults() {
        let only_start = resolve_window(Some("2024-06-15"), None, now()).unwrap();
        assert_eq!(only_start.end(), now());

        let only_end = resolve_window(None, Some("2024-06-20T00:00:00Z"), now()).unwrap();
        assert_eq!(
            only_end.start(),
            Utc.with_ymd_and_hms(2024, 5, 21, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_and_reversed_windows() {
        assert_eq!(
            resolve_window(Some("yesterday"), None, now()),
            Err(DateRangeError::InvalidDateFormat {
                field: "start_date",
                value: "yesterday".to_string(),
            })
        );
        assert!(matches!(
            resolve_window(None, Some(""), now()),
            Err(DateRangeError::InvalidDateFormat { field: "end_date", .. })
        ));
        assert!(matches!(
            resolve_window(Some("2024-06-20"), Some("2024-06-10"), now()),
            Err(DateRangeError::Reversed { .. })
        ));
    }
}
