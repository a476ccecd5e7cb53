use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected a time like 09:15, got {0:?}")]
pub struct TimeParseError(pub String);

/// This is the standard way of reading a wall time from user input. Only the
/// strict `HH:MM` shape is accepted, so `9:15` and `09:15:30` are refused.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, TimeParseError> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return Err(TimeParseError(raw.to_owned()));
    }
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| TimeParseError(raw.to_owned()))
}

/// Renders how long ago `past` was, to the largest two units that matter.
/// A moment less than a minute ago, or one that lies in the future after a
/// clock adjustment, reads as "just now".
pub fn format_relative<Tz2: TimeZone>(past: DateTime<Tz2>, now: DateTime<Tz2>) -> String {
    let elapsed = now.signed_duration_since(past);
    if elapsed < Duration::minutes(1) {
        return "just now".to_owned();
    }
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();
    if hours < 1 {
        format!("{minutes}m ago")
    } else if days < 1 {
        format!("{}h{}m ago", hours, minutes - hours * 60)
    } else {
        format!("{}d{}h ago", days, hours - days * 24)
    }
}

/// Resolves a logged date and wall time to a real moment in `timezone`.
/// Times skipped by a DST jump have no such moment. Times that occur twice
/// resolve to the earlier pass.
pub fn local_moment(date: NaiveDate, time: NaiveTime, timezone: Tz) -> Option<DateTime<Tz>> {
    match timezone.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(moment) => Some(moment),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
    use chrono_tz::Europe::Amsterdam;
    use chrono_tz::Tz;

    use super::{format_relative, local_moment, parse_time_of_day, TimeParseError};

    fn moment(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        Amsterdam.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn accepts_only_strict_hh_mm() {
        assert_eq!(
            parse_time_of_day("09:15"),
            Ok(NaiveTime::from_hms_opt(9, 15, 0).unwrap())
        );
        assert_eq!(
            parse_time_of_day(" 23:59 "),
            Ok(NaiveTime::from_hms_opt(23, 59, 0).unwrap())
        );

        for bad in ["9:15", "09:15:30", "0915", "25:00", "09:60", "aa:bb", ""] {
            assert_eq!(
                parse_time_of_day(bad),
                Err(TimeParseError(bad.trim().to_owned())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn relative_spans_use_two_largest_units() {
        let now = moment(2025, 9, 3, 12, 0);
        assert_eq!(format_relative(moment(2025, 9, 3, 11, 15), now), "45m ago");
        assert_eq!(format_relative(moment(2025, 9, 3, 9, 10), now), "2h50m ago");
        assert_eq!(format_relative(moment(2025, 9, 1, 8, 0), now), "2d4h ago");
    }

    #[test]
    fn fresh_and_future_moments_read_as_just_now() {
        let now = Amsterdam
            .with_ymd_and_hms(2025, 9, 3, 12, 0, 30)
            .unwrap();
        assert_eq!(format_relative(moment(2025, 9, 3, 12, 0), now), "just now");
        assert_eq!(format_relative(moment(2025, 9, 3, 12, 5), now), "just now");
    }

    #[test]
    fn dst_gap_has_no_moment() {
        // Amsterdam skipped 02:00-03:00 on 2025-03-30.
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let skipped = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        assert_eq!(local_moment(date, skipped, Amsterdam), None);

        let fine = NaiveTime::from_hms_opt(3, 30, 0).unwrap();
        assert!(local_moment(date, fine, Amsterdam).is_some());
    }

    #[test]
    fn dst_repeat_resolves_to_first_pass() {
        // 02:30 happened twice on 2025-10-26, first at utc offset +02:00.
        let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let doubled = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let resolved = local_moment(date, doubled, Amsterdam).unwrap();
        assert_eq!(
            resolved.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 10, 26, 0, 30, 0).unwrap()
        );
    }
}
