use chrono::NaiveTime;

use crate::model::attendance::{ClockEvent, ClockEventType};

/// Minutes from `start` to `end`, both read as offsets from midnight of the
/// same day. No rollover: an `end` before `start` gives a negative value.
pub fn elapsed_minutes(start: NaiveTime, end: NaiveTime) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

/// Sum of all complete `break-start` → `break-end` pairs, in the order the
/// events are given.
///
/// A `break-end` without a pending start is ignored, a repeated
/// `break-start` replaces the pending one, and a trailing unmatched
/// `break-start` contributes nothing.
pub fn total_break_minutes(events: &[ClockEvent]) -> f64 {
    let mut total = 0.0;
    let mut pending: Option<NaiveTime> = None;

    for event in events {
        match event.kind {
            ClockEventType::BreakStart => pending = Some(event.time),
            ClockEventType::BreakEnd => {
                if let Some(start) = pending.take() {
                    total += elapsed_minutes(start, event.time);
                }
            }
            ClockEventType::ClockIn | ClockEventType::ClockOut => {}
        }
    }

    total
}

/// Worked hours between the two punches minus breaks, floored at zero and
/// rounded to 2 decimal places.
pub fn work_hours(clock_in: NaiveTime, clock_out: NaiveTime, break_minutes: f64) -> f64 {
    let worked = (elapsed_minutes(clock_in, clock_out) - break_minutes).max(0.0);
    round_to(worked / 60.0, 2)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    fn ev(kind: ClockEventType, time: &str) -> ClockEvent {
        ClockEvent::new(kind, t(time))
    }

    #[test]
    fn elapsed_counts_seconds() {
        assert_eq!(elapsed_minutes(t("09:00:00"), t("18:00:00")), 540.0);
        assert_eq!(elapsed_minutes(t("09:00:00"), t("09:00:30")), 0.5);
        assert_eq!(elapsed_minutes(t("10:00:00"), t("09:00:00")), -60.0);
    }

    #[test]
    fn pairs_breaks_in_order() {
        let events = [
            ev(ClockEventType::ClockIn, "09:00:00"),
            ev(ClockEventType::BreakStart, "12:00:00"),
            ev(ClockEventType::BreakEnd, "13:00:00"),
            ev(ClockEventType::BreakStart, "15:00:00"),
            ev(ClockEventType::BreakEnd, "15:15:00"),
        ];
        assert_eq!(total_break_minutes(&events), 75.0);
    }

    #[test]
    fn trailing_break_start_is_ignored() {
        let events = [
            ev(ClockEventType::ClockIn, "09:00:00"),
            ev(ClockEventType::BreakStart, "12:00:00"),
            ev(ClockEventType::ClockOut, "18:00:00"),
        ];
        assert_eq!(total_break_minutes(&events), 0.0);
    }

    #[test]
    fn orphan_end_and_repeated_start() {
        let events = [
            ev(ClockEventType::BreakEnd, "10:00:00"),
            ev(ClockEventType::BreakStart, "12:00:00"),
            ev(ClockEventType::BreakStart, "12:30:00"),
            ev(ClockEventType::BreakEnd, "13:00:00"),
        ];
        assert_eq!(total_break_minutes(&events), 30.0);
    }

    #[test]
    fn work_hours_floors_at_zero() {
        assert_eq!(work_hours(t("09:00:00"), t("18:00:00"), 60.0), 8.0);
        assert_eq!(work_hours(t("09:00:00"), t("09:00:00"), 0.0), 0.0);
        assert_eq!(work_hours(t("09:00:00"), t("09:30:00"), 45.0), 0.0);
        assert_eq!(work_hours(t("09:00:00"), t("17:20:00"), 0.0), 8.33);
    }
}
