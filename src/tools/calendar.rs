use chrono::{DateTime, Datelike, Duration, FixedOffset};

/// Hours in one full cycle of the Gregorian calendar (400 years).
/// Day-of-year repeats exactly with this period.
const GREGORIAN_CYCLE_HOURS: u64 = 146_097 * 24;

/// Maps the running hour index of a dataset to the day number used by the
/// solar geometry formulas.
pub trait DayMapping: Send + Sync {
    fn day_number(&self, hour: u64) -> u64;
}

/// Counts days from the start of the dataset, `n = hour / 24`.
/// Day 0 is the first 24 hours. This matches the day of year (shifted by one)
/// only when the dataset starts at local midnight of January 1st.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HourIndexDays;

impl DayMapping for HourIndexDays {
    fn day_number(&self, hour: u64) -> u64 {
        hour / 24
    }
}

/// Calendar aware mapping for datasets that don't start on January 1st.
/// Returns the ordinal day of year (1 - 366) of the local date the hour
/// falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarDays {
    start: DateTime<FixedOffset>,
}

impl CalendarDays {
    /// # Arguments
    /// * `start` - local civil time of hour index 0
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        CalendarDays { start }
    }
}

impl DayMapping for CalendarDays {
    fn day_number(&self, hour: u64) -> u64 {
        // Folding into one calendar cycle keeps the offset far from chrono's limits
        let offset = Duration::hours((hour % GREGORIAN_CYCLE_HOURS) as i64);
        u64::from((self.start + offset).ordinal())
    }
}

impl<F> DayMapping for F
where
    F: Fn(u64) -> u64 + Send + Sync,
{
    fn day_number(&self, hour: u64) -> u64 {
        self(hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case(0, 0)]
    #[test_case(23, 0)]
    #[test_case(24, 1)]
    #[test_case(47, 1)]
    #[test_case(8759, 364)]
    #[test_case(8760, 365)]
    fn hour_index_days(hour: u64, expected: u64) {
        assert_eq!(HourIndexDays.day_number(hour), expected);
    }

    #[proptest]
    fn hour_index_days_non_decreasing(#[strategy(0u64..1_000_000)] hour: u64) {
        assert!(HourIndexDays.day_number(hour) <= HourIndexDays.day_number(hour + 1));
    }

    fn start(s: &str) -> CalendarDays {
        CalendarDays::new(DateTime::parse_from_rfc3339(s).unwrap())
    }

    #[test_case("2023-01-01T00:00:00+05:00", 0, 1; "first hour")]
    #[test_case("2023-01-01T00:00:00+05:00", 23, 1; "last hour of first day")]
    #[test_case("2023-01-01T00:00:00+05:00", 24, 2; "second day")]
    #[test_case("2023-01-01T00:00:00+05:00", 8760, 1; "wraps to next year")]
    #[test_case("2023-06-21T00:00:00+05:00", 12, 172; "summer solstice")]
    #[test_case("2024-12-31T00:00:00+00:00", 0, 366; "leap year")]
    fn calendar_days(s: &str, hour: u64, expected: u64) {
        assert_eq!(start(s).day_number(hour), expected);
    }

    #[test]
    fn calendar_days_uses_local_date() {
        // Starts at 04:00 UTC on Jan 2nd, which is still Jan 1st locally
        let days = start("2023-01-01T23:00:00-05:00");
        assert_eq!(days.day_number(0), 1);
        assert_eq!(days.day_number(1), 2);
    }

    /// Folding into one 400 year cycle must not change the result
    #[proptest]
    fn calendar_days_cycle(#[strategy(0u64..3 * GREGORIAN_CYCLE_HOURS)] hour: u64) {
        let start_time = DateTime::parse_from_rfc3339("2023-03-01T00:00:00+01:00").unwrap();
        let expected = u64::from((start_time + Duration::hours(hour as i64)).ordinal());
        assert_eq!(CalendarDays::new(start_time).day_number(hour), expected);
    }

    #[test]
    fn calendar_days_huge_hour() {
        let day = start("2023-01-01T00:00:00+00:00").day_number(u64::MAX);
        assert!((1..=366).contains(&day));
    }

    #[test]
    fn closure_mapping() {
        let shifted = |hour: u64| hour / 24 + 31;
        assert_eq!(shifted.day_number(0), 31);
        assert_eq!(shifted.day_number(48), 33);
    }
}
