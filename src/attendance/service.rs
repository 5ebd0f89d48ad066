use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    attendance::{
        filter::HistoryFilter,
        state::{ClockRejection, DayState},
        summary::AttendanceSummary,
    },
    error::AppError,
    model::attendance::{AttendanceRecord, ClockEvent, ClockEventType},
    store::{AttendanceStore, AttendanceTx, StoreError},
};

/// Result of an accepted punch.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockOutcome {
    pub record: AttendanceRecord,
    pub event: ClockEvent,
}

/// Applies one punch for `user_id` on `date` in a single transaction.
///
/// The record lookup, lazy creation, detail append and the derived-field
/// update on clock-out either all persist or none do.
#[instrument(name = "attendance_clock", skip(store), fields(kind = %event.kind, time = %event.time))]
pub async fn clock(
    store: &dyn AttendanceStore,
    user_id: u64,
    date: NaiveDate,
    event: ClockEvent,
) -> Result<ClockOutcome, AppError> {
    let mut tx = store.begin().await?;

    match apply_in_tx(tx.as_mut(), user_id, date, event).await {
        Ok(outcome) => {
            tx.commit().await?;
            info!(record_id = outcome.record.id, "Punch recorded");
            Ok(outcome)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            match &e {
                AppError::StateConflict(reason) => info!(%reason, "Punch rejected"),
                other => warn!(error = %other, "Punch failed"),
            }
            Err(e)
        }
    }
}

async fn apply_in_tx(
    tx: &mut dyn AttendanceTx,
    user_id: u64,
    date: NaiveDate,
    event: ClockEvent,
) -> Result<ClockOutcome, AppError> {
    let existing = tx.find_record(user_id, date).await?;

    let current = match &existing {
        Some(record) => DayState::from_record(record, tx.list_details(record.id).await?),
        None => DayState::default(),
    };

    let next = current.apply(event)?;
    let changes = current.changes_to(&next);

    let record_id = match &existing {
        Some(record) => {
            if !changes.is_empty() {
                tx.update_record(record.id, &changes).await?;
            }
            record.id
        }
        None => {
            debug!("Creating day record");
            tx.create_record(user_id, date, &changes)
                .await
                .map_err(|e| match e {
                    // Lost the race against a concurrent first clock-in.
                    StoreError::Duplicate => AppError::from(ClockRejection::AlreadyClockedIn),
                    other => AppError::from(other),
                })?
        }
    };

    tx.append_detail(record_id, &event).await?;

    Ok(ClockOutcome {
        record: AttendanceRecord {
            id: record_id,
            user_id,
            date,
            clock_in: next.clock_in,
            clock_out: next.clock_out,
            break_minutes: next.break_minutes,
            work_hours: next.work_hours,
        },
        event,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    NotClockedIn,
    Working,
    OnBreak,
    ClockedOut,
}

impl WorkStatus {
    /// Status implied by the latest punch.
    pub fn from_last(event: Option<&ClockEvent>) -> Self {
        match event.map(|e| e.kind) {
            None => WorkStatus::NotClockedIn,
            Some(ClockEventType::ClockIn | ClockEventType::BreakEnd) => WorkStatus::Working,
            Some(ClockEventType::BreakStart) => WorkStatus::OnBreak,
            Some(ClockEventType::ClockOut) => WorkStatus::ClockedOut,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    #[schema(value_type = Option<String>)]
    pub clock_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub clock_out: Option<NaiveTime>,
    pub status: WorkStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayView {
    pub details: Vec<ClockEvent>,
    pub summary: TodaySummary,
}

/// Punches of the day sorted by time, plus the current status.
pub async fn today(
    store: &dyn AttendanceStore,
    user_id: u64,
    date: NaiveDate,
) -> Result<TodayView, AppError> {
    let Some(record) = store.find_record(user_id, date).await? else {
        return Ok(TodayView {
            details: vec![],
            summary: TodaySummary {
                clock_in: None,
                clock_out: None,
                status: WorkStatus::NotClockedIn,
            },
        });
    };

    let details = sorted_details(store, record.id).await?;

    Ok(TodayView {
        summary: TodaySummary {
            clock_in: record.clock_in,
            clock_out: record.clock_out,
            status: WorkStatus::from_last(details.last()),
        },
        details,
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayView {
    pub record: Option<AttendanceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ClockEvent>>,
}

pub async fn day(
    store: &dyn AttendanceStore,
    user_id: u64,
    date: NaiveDate,
) -> Result<DayView, AppError> {
    match store.find_record(user_id, date).await? {
        None => Ok(DayView {
            record: None,
            details: None,
        }),
        Some(record) => {
            let details = sorted_details(store, record.id).await?;
            Ok(DayView {
                record: Some(record),
                details: Some(details),
            })
        }
    }
}

async fn sorted_details(
    store: &dyn AttendanceStore,
    record_id: u64,
) -> Result<Vec<ClockEvent>, AppError> {
    let mut details = store.list_details(record_id).await?;
    // stable: punches with the same time keep arrival order
    details.sort_by_key(|e| e.time);
    Ok(details)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub records: Vec<AttendanceRecord>,
    pub summary: AttendanceSummary,
    pub pagination: Pagination,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 30;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One page of matching records (newest first) with a summary over all of
/// them.
pub async fn history(
    store: &dyn AttendanceStore,
    user_id: u64,
    filter: &HistoryFilter,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<HistoryPage, AppError> {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);

    let totals = store.record_totals(user_id, filter).await?;
    let total = totals.records;

    let offset = u64::from(page - 1).saturating_mul(u64::from(limit));
    let records = store.page_records(user_id, filter, limit, offset).await?;

    Ok(HistoryPage {
        records,
        summary: totals.summary(),
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
        },
    })
}

/// Matching records oldest first, for export.
pub async fn export_records(
    store: &dyn AttendanceStore,
    user_id: u64,
    filter: &HistoryFilter,
) -> Result<Vec<AttendanceRecord>, AppError> {
    let mut records = store.list_records(user_id, filter).await?;
    records.sort_by_key(|r| r.date);
    Ok(records)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekStats {
    pub work_days: u32,
    pub total_hours: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub work_days: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub month: AttendanceSummary,
    pub week: WeekStats,
    pub total: TotalStats,
}

/// Current month, current ISO week and all-time figures relative to `today`.
pub async fn stats(
    store: &dyn AttendanceStore,
    user_id: u64,
    today: NaiveDate,
) -> Result<UserStats, AppError> {
    use chrono::Datelike;

    let this_month = HistoryFilter::MonthOfYear {
        year: today.year(),
        month: today.month(),
    };

    let month = store.record_totals(user_id, &this_month).await?.summary();
    let week = store
        .record_totals(user_id, &HistoryFilter::week_of(today))
        .await?
        .summary();
    let total = store.record_totals(user_id, &HistoryFilter::All).await?;

    Ok(UserStats {
        month,
        week: WeekStats {
            work_days: week.work_days,
            total_hours: week.total_hours,
        },
        total: TotalStats {
            work_days: total.work_days,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn punch(kind: ClockEventType, time: &str) -> ClockEvent {
        ClockEvent::new(kind, NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap())
    }

    #[actix_web::test]
    async fn full_day_is_persisted() {
        let store = MemoryStore::new();
        for ev in [
            punch(ClockEventType::ClockIn, "09:00:00"),
            punch(ClockEventType::BreakStart, "12:00:00"),
            punch(ClockEventType::BreakEnd, "13:00:00"),
        ] {
            clock(&store, 1, day(), ev).await.unwrap();
        }
        let out = clock(&store, 1, day(), punch(ClockEventType::ClockOut, "18:00:00"))
            .await
            .unwrap();

        assert_eq!(out.record.work_hours, Some(8.0));
        assert_eq!(out.record.break_minutes, Some(60));

        let stored = store.find_record(1, day()).await.unwrap().unwrap();
        assert_eq!(stored, out.record);
        assert_eq!(store.list_details(stored.id).await.unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn rejected_punch_changes_nothing() {
        let store = MemoryStore::new();
        clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        let before = store.find_record(1, day()).await.unwrap();

        let err = clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(ClockRejection::AlreadyClockedIn)));
        assert_eq!(store.find_record(1, day()).await.unwrap(), before);
        assert_eq!(store.detail_count().await, 1);
    }

    #[actix_web::test]
    async fn losing_the_creation_race_reports_already_clocked_in() {
        let store = MemoryStore::new();
        store.insert_record(stored(1, "2026-03-02", None)).await;
        store.race_record_creation();

        let err = clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:01:00"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StateConflict(ClockRejection::AlreadyClockedIn)));
        assert_eq!(store.detail_count().await, 0);
        let record = store.find_record(1, day()).await.unwrap().unwrap();
        assert_eq!(record.id, 1);
    }

    #[actix_web::test]
    async fn clock_out_first_is_rejected() {
        let store = MemoryStore::new();
        let err = clock(&store, 1, day(), punch(ClockEventType::ClockOut, "18:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(ClockRejection::NotYetClockedIn)));
        assert!(store.find_record(1, day()).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn store_failure_rolls_back_record_creation() {
        let store = MemoryStore::new();
        store.fail_appends();

        let err = clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(store.find_record(1, day()).await.unwrap().is_none());
        assert_eq!(store.detail_count().await, 0);
    }

    #[actix_web::test]
    async fn store_failure_rolls_back_clock_out() {
        let store = MemoryStore::new();
        clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        store.fail_appends();

        clock(&store, 1, day(), punch(ClockEventType::ClockOut, "18:00:00"))
            .await
            .unwrap_err();
        let record = store.find_record(1, day()).await.unwrap().unwrap();
        assert_eq!(record.clock_out, None);
        assert_eq!(record.work_hours, None);
    }

    #[actix_web::test]
    async fn users_and_days_are_independent() {
        let store = MemoryStore::new();
        let next_day = day().succ_opt().unwrap();
        clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        clock(&store, 2, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        clock(&store, 1, next_day, punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        assert_eq!(store.detail_count().await, 3);
    }

    #[actix_web::test]
    async fn today_reports_status_from_latest_punch() {
        let store = MemoryStore::new();
        let view = today(&store, 1, day()).await.unwrap();
        assert_eq!(view.summary.status, WorkStatus::NotClockedIn);
        assert!(view.details.is_empty());

        clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        clock(&store, 1, day(), punch(ClockEventType::BreakStart, "12:00:00"))
            .await
            .unwrap();
        let view = today(&store, 1, day()).await.unwrap();
        assert_eq!(view.summary.status, WorkStatus::OnBreak);
        assert_eq!(view.details.len(), 2);
    }

    #[actix_web::test]
    async fn today_sorts_punches_by_time() {
        let store = MemoryStore::new();
        clock(&store, 1, day(), punch(ClockEventType::ClockIn, "09:00:00"))
            .await
            .unwrap();
        clock(&store, 1, day(), punch(ClockEventType::BreakEnd, "13:00:00"))
            .await
            .unwrap();
        clock(&store, 1, day(), punch(ClockEventType::BreakStart, "12:00:00"))
            .await
            .unwrap();

        let view = today(&store, 1, day()).await.unwrap();
        let kinds: Vec<_> = view.details.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [ClockEventType::ClockIn, ClockEventType::BreakStart, ClockEventType::BreakEnd]
        );
        assert_eq!(view.summary.status, WorkStatus::Working);
    }

    fn stored(id: u64, date: &str, work_hours: Option<f64>) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: 1,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            clock_in: NaiveTime::from_hms_opt(9, 0, 0),
            clock_out: None,
            break_minutes: None,
            work_hours,
        }
    }

    #[actix_web::test]
    async fn history_pages_newest_first_and_summarizes_all() {
        let store = MemoryStore::new();
        store.insert_record(stored(1, "2026-03-02", Some(8.0))).await;
        store.insert_record(stored(2, "2026-03-03", Some(7.5))).await;
        store.insert_record(stored(3, "2025-03-10", Some(6.0))).await;
        store.insert_record(stored(4, "2026-04-01", Some(9.0))).await;

        let page = history(&store, 1, &HistoryFilter::Month(3), Some(1), Some(2))
            .await
            .unwrap();
        let dates: Vec<_> = page.records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, ["2026-03-03", "2026-03-02"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.summary.work_days, 3);
        assert_eq!(page.summary.total_hours, 21.5);

        let page = history(&store, 1, &HistoryFilter::Month(3), Some(2), Some(2))
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].date.to_string(), "2025-03-10");
    }

    #[actix_web::test]
    async fn export_is_oldest_first() {
        let store = MemoryStore::new();
        store.insert_record(stored(1, "2026-03-03", Some(8.0))).await;
        store.insert_record(stored(2, "2026-03-02", Some(7.5))).await;

        let records = export_records(
            &store,
            1,
            &HistoryFilter::MonthOfYear { year: 2026, month: 3 },
        )
        .await
        .unwrap();
        assert_eq!(records[0].id, 2);
        assert_eq!(records[1].id, 1);
    }

    #[actix_web::test]
    async fn stats_split_month_week_and_total() {
        let store = MemoryStore::new();
        // 2026-03-04 is a Wednesday; 03-02 is the Monday of the same week.
        store.insert_record(stored(1, "2026-03-02", Some(8.0))).await;
        store.insert_record(stored(2, "2026-03-04", Some(7.0))).await;
        store.insert_record(stored(3, "2026-02-27", Some(6.0))).await;
        store.insert_record(stored(4, "2025-03-04", Some(5.0))).await;

        let today = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let stats = stats(&store, 1, today).await.unwrap();
        assert_eq!(stats.month.work_days, 2);
        assert_eq!(stats.month.total_hours, 15.0);
        assert_eq!(stats.month.avg_hours, 7.5);
        assert_eq!(stats.week.work_days, 2);
        assert_eq!(stats.total.work_days, 4);
    }
}
