use time::{Duration, PrimitiveDateTime, UtcOffset};
use time_tz::{Offset, OffsetResult, PrimitiveDateTimeExt, TimeZone};

/// Get the UTC offset that `canonical_timezone` observes at the wall-clock time `local_time`.
///
/// If `local_time` occurs twice because the clocks went back, the offset of the
/// earlier instant is returned. If it is skipped because the clocks went forward,
/// the offset in effect just before the gap is returned, which maps `local_time`
/// onto the first instant after the gap.
///
/// Returns `None` if `canonical_timezone` is not a known timezone name.
pub fn get_offset_at(canonical_timezone: &str, local_time: PrimitiveDateTime) -> Option<UtcOffset> {
    let timezone = time_tz::timezones::get_by_name(canonical_timezone)?;

    let offset = match local_time.assume_timezone(timezone) {
        OffsetResult::Some(instant) => instant.offset(),
        OffsetResult::Ambiguous(first, second) => first.min(second).offset(),
        OffsetResult::None => {
            let day_before = local_time.checked_sub(Duration::DAY)?;
            timezone.get_offset_utc(&day_before.assume_utc()).to_utc()
        }
    };

    Some(offset)
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::datetime};

    use super::get_offset_at;

    #[test]
    fn utc_has_zero_offset() {
        let got = get_offset_at("Etc/UTC", datetime!(2023-01-01 0:00));

        assert_eq!(got, Some(UtcOffset::UTC));
    }

    #[test]
    fn offset_follows_daylight_saving() {
        let winter = get_offset_at("Pacific/Auckland", datetime!(2023-07-01 0:00)).unwrap();
        let summer = get_offset_at("Pacific/Auckland", datetime!(2023-01-01 0:00)).unwrap();

        assert_eq!(winter.whole_hours(), 12);
        assert_eq!(summer.whole_hours(), 13);
    }

    #[test]
    fn offset_is_taken_at_local_time_not_utc() {
        // Auckland leaves daylight saving at 03:00 local on 1 April 2029.
        let before_change = get_offset_at("Pacific/Auckland", datetime!(2029-04-01 0:00)).unwrap();
        let after_change = get_offset_at("Pacific/Auckland", datetime!(2029-04-01 12:00)).unwrap();

        assert_eq!(before_change.whole_hours(), 13);
        assert_eq!(after_change.whole_hours(), 12);
    }

    #[test]
    fn skipped_local_time_uses_offset_before_gap() {
        // Asuncion skipped from 00:00 to 01:00 on 1 October 2023.
        let got = get_offset_at("America/Asuncion", datetime!(2023-10-01 0:00)).unwrap();

        assert_eq!(got.whole_hours(), -4);
    }

    #[test]
    fn unknown_timezone_is_none() {
        assert_eq!(get_offset_at("Mars/Olympus_Mons", datetime!(2023-01-01 0:00)), None);
    }
}
