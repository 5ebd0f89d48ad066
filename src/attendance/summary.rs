use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::time::round_to;
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    #[schema(example = 20)]
    pub work_days: u32,
    #[schema(example = 160.5)]
    pub total_hours: f64,
    #[schema(example = 8.0)]
    pub avg_hours: f64,
}

/// Raw, unrounded aggregates over a set of day records. The SQL store
/// computes these with one aggregate query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTotals {
    /// Records matched, with or without a clock-in.
    pub records: u64,
    pub work_days: u32,
    pub work_hours: f64,
}

impl DayTotals {
    pub fn add(&mut self, record: &AttendanceRecord) {
        self.records += 1;
        if record.clock_in.is_some() {
            self.work_days += 1;
        }
        self.work_hours += record.work_hours.unwrap_or(0.0);
    }

    /// Display totals (1 decimal place); the average is taken before rounding.
    pub fn summary(&self) -> AttendanceSummary {
        let avg = if self.work_days > 0 {
            self.work_hours / self.work_days as f64
        } else {
            0.0
        };

        AttendanceSummary {
            work_days: self.work_days,
            total_hours: round_to(self.work_hours, 1),
            avg_hours: round_to(avg, 1),
        }
    }
}

impl<'a> FromIterator<&'a AttendanceRecord> for DayTotals {
    fn from_iter<I: IntoIterator<Item = &'a AttendanceRecord>>(records: I) -> Self {
        let mut totals = DayTotals::default();
        for record in records {
            totals.add(record);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn summarize(records: &[AttendanceRecord]) -> AttendanceSummary {
        records.iter().collect::<DayTotals>().summary()
    }

    fn record(day: u32, work_hours: Option<f64>) -> AttendanceRecord {
        AttendanceRecord {
            id: day as u64,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            clock_in: NaiveTime::from_hms_opt(9, 0, 0),
            clock_out: work_hours.and(NaiveTime::from_hms_opt(18, 0, 0)),
            break_minutes: work_hours.map(|_| 60),
            work_hours,
        }
    }

    #[test]
    fn month_with_an_open_day() {
        let records = vec![record(2, Some(8.0)), record(3, Some(7.5)), record(4, None)];
        let summary = summarize(&records);
        // The open day counts as a work day but contributes no hours.
        assert_eq!(summary.work_days, 3);
        assert_eq!(summary.total_hours, 15.5);
        assert_eq!(summary.avg_hours, 5.2);
    }

    #[test]
    fn day_without_clock_in_is_not_a_work_day() {
        let mut blank = record(4, None);
        blank.clock_in = None;
        let records = vec![record(2, Some(8.0)), record(3, Some(7.5)), blank];
        let summary = summarize(&records);
        assert_eq!(summary.work_days, 2);
        assert_eq!(summary.total_hours, 15.5);
        assert_eq!(summary.avg_hours, 7.8);
    }

    #[test]
    fn totals_count_records_apart_from_work_days() {
        let mut blank = record(4, None);
        blank.clock_in = None;
        let totals: DayTotals = [record(2, Some(8.0)), blank].iter().collect();
        assert_eq!(totals.records, 2);
        assert_eq!(totals.work_days, 1);
        assert_eq!(totals.work_hours, 8.0);
    }

    #[test]
    fn empty_set_averages_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.work_days, 0);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.avg_hours, 0.0);
    }
}
