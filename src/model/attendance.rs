use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Kind of a single punch. Stored in `attendance_details.type` using the
/// kebab-case spelling.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ClockEventType {
    #[serde(alias = "出勤")]
    #[strum(to_string = "clock-in", serialize = "出勤")]
    ClockIn,
    #[serde(alias = "退勤")]
    #[strum(to_string = "clock-out", serialize = "退勤")]
    ClockOut,
    #[serde(alias = "休憩開始")]
    #[strum(to_string = "break-start", serialize = "休憩開始")]
    BreakStart,
    #[serde(alias = "休憩終了")]
    #[strum(to_string = "break-end", serialize = "休憩終了")]
    BreakEnd,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClockEvent {
    #[serde(rename = "type")]
    pub kind: ClockEventType,
    #[schema(example = "09:00:00", value_type = String)]
    pub time: NaiveTime,
}

impl ClockEvent {
    pub fn new(kind: ClockEventType, time: NaiveTime) -> Self {
        Self { kind, time }
    }
}

/// One row of `attendance_records`: the day summary of a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(skip_serializing)]
    pub id: u64,
    #[serde(skip_serializing)]
    pub user_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub clock_in: Option<NaiveTime>,
    #[schema(example = "18:00:00", value_type = Option<String>)]
    pub clock_out: Option<NaiveTime>,
    #[schema(example = 60)]
    pub break_minutes: Option<i32>,
    #[schema(example = 8.0)]
    pub work_hours: Option<f64>,
}

/// Raw `attendance_details` row; `event_type` is parsed into a
/// [`ClockEventType`] by the store.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceDetailRow {
    pub event_type: String,
    pub time: NaiveTime,
}
