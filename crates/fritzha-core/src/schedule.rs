// ── Cycle scheduling ──
//
// Cycles land on round clock times when the interval allows it: with a
// 120 s interval the poller measures at :00, :02, :04 ... of every hour
// instead of 120 s after whenever it happened to start.

use std::time::Duration;

use chrono::Timelike;

/// Intervals that are multiples of one of these align to the full hour
/// using the minute only.
const HOUR_ALIGNED: [u64; 10] = [60, 120, 240, 300, 360, 600, 720, 900, 1200, 1800];

/// Intervals that are multiples of one of these align within the hour
/// using minute and second.
const MINUTE_ALIGNED: [u64; 9] = [2, 4, 5, 6, 10, 12, 15, 20, 30];

/// Time to sleep from `now` until the next cycle boundary.
pub fn next_cycle_delay<T: Timelike>(interval_secs: u64, now: &T) -> Duration {
    if interval_secs == 0 {
        return Duration::ZERO;
    }

    let minute_secs = u64::from(now.minute()) * 60;
    let second = u64::from(now.second());
    // Leap seconds show up as nanos >= 1e9.
    let subsec = Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)));

    let boundary = if HOUR_ALIGNED.iter().any(|f| interval_secs % f == 0) {
        (minute_secs / interval_secs + 1) * interval_secs
    } else if MINUTE_ALIGNED.iter().any(|f| interval_secs % f == 0) {
        ((minute_secs + second) / interval_secs + 1) * interval_secs
    } else {
        return Duration::from_secs(interval_secs);
    };

    let elapsed = Duration::from_secs(minute_secs + second) + subsec;
    Duration::from_secs(boundary).saturating_sub(elapsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn two_minute_interval_lands_on_even_minutes() {
        assert_eq!(next_cycle_delay(120, &at(10, 3, 10)), Duration::from_secs(50));
        assert_eq!(next_cycle_delay(120, &at(10, 4, 0)), Duration::from_secs(120));
        assert_eq!(next_cycle_delay(120, &at(10, 59, 30)), Duration::from_secs(30));
    }

    #[test]
    fn hour_alignment_uses_minute_only() {
        // minute 7 falls into the second five-minute slot of the hour
        assert_eq!(next_cycle_delay(300, &at(8, 7, 30)), Duration::from_secs(150));
        assert_eq!(next_cycle_delay(3600, &at(8, 15, 0)), Duration::from_secs(2700));
    }

    #[test]
    fn sub_second_part_is_subtracted() {
        let now = NaiveTime::from_hms_milli_opt(10, 3, 10, 250).unwrap();
        assert_eq!(next_cycle_delay(120, &now), Duration::from_millis(49_750));
    }

    #[test]
    fn short_intervals_align_within_the_minute() {
        assert_eq!(next_cycle_delay(30, &at(12, 0, 45)), Duration::from_secs(15));
        assert_eq!(next_cycle_delay(10, &at(12, 5, 3)), Duration::from_secs(7));
        assert_eq!(next_cycle_delay(15, &at(12, 5, 59)), Duration::from_secs(1));
    }

    #[test]
    fn other_intervals_sleep_plainly() {
        assert_eq!(next_cycle_delay(7, &at(12, 5, 3)), Duration::from_secs(7));
        assert_eq!(next_cycle_delay(133, &at(0, 0, 0)), Duration::from_secs(133));
    }

    #[test]
    fn zero_interval_never_waits() {
        assert_eq!(next_cycle_delay(0, &at(1, 2, 3)), Duration::ZERO);
    }
}
