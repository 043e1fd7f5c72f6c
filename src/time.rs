// src/time.rs
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

pub fn now() -> String {
    Utc::now().to_rfc3339()
}

pub fn business_offset(offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
}

/// Today's calendar date in the business timezone.
pub fn business_today(offset_hours: i32) -> NaiveDate {
    Utc::now()
        .with_timezone(&business_offset(offset_hours))
        .date_naive()
}

/// The business-timezone calendar day a UTC timestamp falls on.
pub fn business_day(ts: DateTime<Utc>, offset_hours: i32) -> NaiveDate {
    ts.with_timezone(&business_offset(offset_hours)).date_naive()
}

/// Resolve a named sales range into inclusive [start, end] calendar days.
///
/// `7` and `14` are trailing windows ending today; `month` runs from the
/// first of the current month through today.
pub fn range_bounds(range: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match range {
        "7" => Some((today - Duration::days(6), today)),
        "14" => Some((today - Duration::days(13), today)),
        "month" => Some((today.with_day(1).unwrap_or(today), today)),
        _ => None,
    }
}

/// Every calendar day in [start, end], in order. Day buckets must never be
/// skipped even when no sales land on them.
pub fn day_span(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        days.push(d);
        d += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_range_7_spans_seven_days_inclusive() {
        let (start, end) = range_bounds("7", d("2025-03-10")).unwrap();
        assert_eq!(start, d("2025-03-04"));
        assert_eq!(end, d("2025-03-10"));
        assert_eq!(day_span(start, end).len(), 7);
    }

    #[test]
    fn test_range_14_spans_fourteen_days() {
        let (start, end) = range_bounds("14", d("2025-03-10")).unwrap();
        assert_eq!(day_span(start, end).len(), 14);
    }

    #[test]
    fn test_range_month_starts_on_the_first() {
        let (start, end) = range_bounds("month", d("2025-03-10")).unwrap();
        assert_eq!(start, d("2025-03-01"));
        assert_eq!(end, d("2025-03-10"));
        assert_eq!(day_span(start, end).len(), 10);
    }

    #[test]
    fn test_unknown_range_rejected() {
        assert!(range_bounds("30", d("2025-03-10")).is_none());
        assert!(range_bounds("", d("2025-03-10")).is_none());
    }

    #[test]
    fn test_day_span_crosses_month_boundary() {
        let days = day_span(d("2025-01-30"), d("2025-02-02"));
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], d("2025-01-30"));
        assert_eq!(days[3], d("2025-02-02"));
    }

    #[test]
    fn test_business_day_respects_offset() {
        // 02:00 UTC is still the previous day at UTC-5
        let ts = DateTime::parse_from_rfc3339("2025-03-10T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(business_day(ts, -5), d("2025-03-09"));
        assert_eq!(business_day(ts, 0), d("2025-03-10"));
    }
}
