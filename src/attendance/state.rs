use chrono::NaiveTime;
use thiserror::Error;

use crate::attendance::time::{round_to, total_break_minutes, work_hours};
use crate::model::attendance::{AttendanceRecord, ClockEvent, ClockEventType};

/// Why a punch was refused. Rejections never change the day's state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ClockRejection {
    #[error("Already clocked in today")]
    AlreadyClockedIn,
    #[error("Clock-in is required first")]
    NotYetClockedIn,
    #[error("Already clocked out today")]
    AlreadyClockedOut,
}

impl ClockRejection {
    pub fn code(&self) -> &'static str {
        match self {
            ClockRejection::AlreadyClockedIn => "ALREADY_CLOCKED_IN",
            ClockRejection::NotYetClockedIn => "NOT_YET_CLOCKED_IN",
            ClockRejection::AlreadyClockedOut => "ALREADY_CLOCKED_OUT",
        }
    }
}

/// Attendance of one user on one date.
///
/// A blank state means no record exists yet for the day. Only a clock-in
/// may leave the blank state, since that is what creates the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayState {
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    /// Accepted punches in arrival order.
    pub events: Vec<ClockEvent>,
    pub break_minutes: Option<i32>,
    pub work_hours: Option<f64>,
}

impl DayState {
    pub fn from_record(record: &AttendanceRecord, events: Vec<ClockEvent>) -> Self {
        Self {
            clock_in: record.clock_in,
            clock_out: record.clock_out,
            events,
            break_minutes: record.break_minutes,
            work_hours: record.work_hours,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.clock_in.is_none() && self.events.is_empty()
    }

    /// Validates `event` against the current state and returns the next one.
    pub fn apply(&self, event: ClockEvent) -> Result<DayState, ClockRejection> {
        let mut next = self.clone();

        match event.kind {
            ClockEventType::ClockIn => {
                if self.clock_in.is_some() {
                    return Err(ClockRejection::AlreadyClockedIn);
                }
                next.clock_in = Some(event.time);
                next.events.push(event);
            }
            ClockEventType::ClockOut => {
                let clock_in = self.clock_in.ok_or(ClockRejection::NotYetClockedIn)?;
                if self.clock_out.is_some() {
                    return Err(ClockRejection::AlreadyClockedOut);
                }
                next.clock_out = Some(event.time);
                next.events.push(event);

                let breaks = total_break_minutes(&next.events);
                next.break_minutes = Some(round_to(breaks, 0) as i32);
                next.work_hours = Some(work_hours(clock_in, event.time, breaks));
            }
            ClockEventType::BreakStart | ClockEventType::BreakEnd => {
                if self.is_blank() {
                    return Err(ClockRejection::NotYetClockedIn);
                }
                next.events.push(event);
            }
        }

        Ok(next)
    }

    /// Record columns that differ between `self` and `next`.
    pub fn changes_to(&self, next: &DayState) -> RecordChanges {
        RecordChanges {
            clock_in: next.clock_in.filter(|_| next.clock_in != self.clock_in),
            clock_out: next.clock_out.filter(|_| next.clock_out != self.clock_out),
            break_minutes: next.break_minutes.filter(|_| next.break_minutes != self.break_minutes),
            work_hours: next.work_hours.filter(|_| next.work_hours != self.work_hours),
        }
    }
}

/// Columns of `attendance_records` to overwrite; `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChanges {
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub break_minutes: Option<i32>,
    pub work_hours: Option<f64>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.clock_in.is_none()
            && self.clock_out.is_none()
            && self.break_minutes.is_none()
            && self.work_hours.is_none()
    }
}
