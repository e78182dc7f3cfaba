use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

// Cutoff offsets past the supported calendar range saturate; clamping first
// keeps the Duration seconds math inside i64. The ±9999-year calendar spans
// roughly 7.3 million days.
const MAX_CUTOFF_OFFSET_DAYS: i64 = 8_000_000;

/// Parses a strict `YYYY-MM-DD` date. Wrong separators, unpadded components,
/// trailing text, and out-of-range days are all `None`.
pub(crate) fn parse_iso_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), &ISO_DATE).ok()
}

pub(crate) fn format_iso(date: Date) -> String {
    date.format(&ISO_DATE).unwrap_or_else(|_| date.to_string())
}

pub(crate) fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Lower bound for "updated within the last N months", using 30-day months
/// so the server-side and local filters agree on the window.
///
/// `months_back <= 0` moves the cutoff to today or into the future, which
/// legitimately empties the result set.
pub(crate) fn cutoff_for_window(today: Date, months_back: i64) -> Date {
    let days = months_back
        .saturating_mul(30)
        .clamp(-MAX_CUTOFF_OFFSET_DAYS, MAX_CUTOFF_OFFSET_DAYS);

    match today.checked_sub(Duration::days(days)) {
        Some(cutoff) => cutoff,
        None if days > 0 => Date::MIN,
        None => Date::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_strict_iso_dates() {
        assert_eq!(parse_iso_date("2024-03-01"), Some(date!(2024 - 03 - 01)));
        assert_eq!(parse_iso_date(" 2024-03-01 "), Some(date!(2024 - 03 - 01)));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_iso_date("not-a-date"), None);
        assert_eq!(parse_iso_date("2024-13-01"), None);
        assert_eq!(parse_iso_date("2024-02-30"), None);
        assert_eq!(parse_iso_date("2024-3-1"), None);
        assert_eq!(parse_iso_date("2024-03-01T00:00:00"), None);
        assert_eq!(parse_iso_date(""), None);
    }

    #[test]
    fn formats_round_trip() {
        let day = date!(2024 - 01 - 05);
        assert_eq!(format_iso(day), "2024-01-05");
        assert_eq!(parse_iso_date(&format_iso(day)), Some(day));
    }

    #[test]
    fn cutoff_uses_thirty_day_months() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(cutoff_for_window(today, 3), date!(2024 - 03 - 17));
        assert_eq!(cutoff_for_window(today, 0), today);
    }

    #[test]
    fn negative_window_moves_cutoff_into_the_future() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(cutoff_for_window(today, -1), date!(2024 - 07 - 15));
    }

    #[test]
    fn absurd_windows_saturate_at_calendar_bounds() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(cutoff_for_window(today, i64::MAX), Date::MIN);
        assert_eq!(cutoff_for_window(today, i64::MIN), Date::MAX);
    }
}
