use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    MySql, MySqlConnection, MySqlPool, Transaction, mysql::MySqlArguments, query::QueryAs,
};
use tracing::debug;

use crate::{
    attendance::{filter::HistoryFilter, state::RecordChanges, summary::DayTotals},
    model::attendance::{AttendanceDetailRow, AttendanceRecord, ClockEvent, ClockEventType},
    store::{AttendanceStore, AttendanceTx, StoreError},
    utils::db_utils::{SqlValue, build_update_sql, execute_update, is_unique_violation},
};

const RECORD_COLUMNS: &str =
    "id, user_id, date, clock_in, clock_out, break_minutes, work_hours";

// COUNT(clock_in) skips rows without a clock-in.
const TOTALS_SELECT: &str = "SELECT COUNT(*), COUNT(clock_in), \
     CAST(COALESCE(SUM(work_hours), 0) AS DOUBLE) FROM attendance_records";

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    Date(NaiveDate),
    U32(u32),
    I32(i32),
}

fn filter_clause(filter: &HistoryFilter) -> (&'static str, Vec<FilterValue>) {
    match *filter {
        HistoryFilter::All => ("", vec![]),
        HistoryFilter::Date(date) => (" AND date = ?", vec![FilterValue::Date(date)]),
        HistoryFilter::Month(month) => (" AND MONTH(date) = ?", vec![FilterValue::U32(month)]),
        HistoryFilter::MonthOfYear { year, month } => (
            " AND MONTH(date) = ? AND YEAR(date) = ?",
            vec![FilterValue::U32(month), FilterValue::I32(year)],
        ),
        HistoryFilter::IsoWeek { year, week } => (
            // mode 1: weeks start on Monday, week 1 has more than 3 days
            " AND YEARWEEK(date, 1) = ?",
            vec![FilterValue::I32(year * 100 + week as i32)],
        ),
    }
}

fn bind_filter<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    args: Vec<FilterValue>,
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::Date(v) => query.bind(v),
            FilterValue::U32(v) => query.bind(v),
            FilterValue::I32(v) => query.bind(v),
        };
    }
    query
}

fn changed_columns(changes: &RecordChanges) -> Vec<(&'static str, SqlValue)> {
    let mut columns = Vec::new();
    if let Some(t) = changes.clock_in {
        columns.push(("clock_in", SqlValue::Time(t)));
    }
    if let Some(t) = changes.clock_out {
        columns.push(("clock_out", SqlValue::Time(t)));
    }
    if let Some(m) = changes.break_minutes {
        columns.push(("break_minutes", SqlValue::I32(m)));
    }
    if let Some(h) = changes.work_hours {
        columns.push(("work_hours", SqlValue::F64(h)));
    }
    columns
}

fn to_events(rows: Vec<AttendanceDetailRow>) -> Result<Vec<ClockEvent>, StoreError> {
    rows.into_iter()
        .map(|row| {
            ClockEventType::from_str(&row.event_type)
                .map(|kind| ClockEvent::new(kind, row.time))
                .map_err(|_| StoreError::Corrupt(format!("unknown punch type {:?}", row.event_type)))
        })
        .collect()
}

async fn fetch_details(
    conn: &mut MySqlConnection,
    record_id: u64,
) -> Result<Vec<ClockEvent>, StoreError> {
    let rows = sqlx::query_as::<_, AttendanceDetailRow>(
        r#"
        SELECT type AS event_type, time
        FROM attendance_details
        WHERE record_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(record_id)
    .fetch_all(conn)
    .await?;

    to_events(rows)
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn begin(&self) -> Result<Box<dyn AttendanceTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlAttendanceTx { tx }))
    }

    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE user_id = ? AND date = ?",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (where_sql, args) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE user_id = ?{} ORDER BY date DESC",
            RECORD_COLUMNS, where_sql
        );
        debug!(sql = %sql, ?filter, "Listing attendance records");

        let query = bind_filter(sqlx::query_as::<_, AttendanceRecord>(&sql).bind(user_id), args);
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn page_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (where_sql, args) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE user_id = ?{} ORDER BY date DESC LIMIT ? OFFSET ?",
            RECORD_COLUMNS, where_sql
        );
        debug!(sql = %sql, ?filter, limit, offset, "Paging attendance records");

        let query = bind_filter(sqlx::query_as::<_, AttendanceRecord>(&sql).bind(user_id), args)
            .bind(limit)
            .bind(offset);
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn record_totals(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<DayTotals, StoreError> {
        let (where_sql, args) = filter_clause(filter);
        let sql = format!("{} WHERE user_id = ?{}", TOTALS_SELECT, where_sql);

        let query = bind_filter(sqlx::query_as::<_, (i64, i64, f64)>(&sql).bind(user_id), args);
        let (records, work_days, work_hours) = query.fetch_one(&self.pool).await?;

        Ok(DayTotals {
            records: records.max(0) as u64,
            work_days: work_days.clamp(0, u32::MAX as i64) as u32,
            work_hours,
        })
    }

    async fn list_details(&self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_details(&mut conn, record_id).await
    }
}

pub struct MySqlAttendanceTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl AttendanceTx for MySqlAttendanceTx {
    async fn find_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE user_id = ? AND date = ? FOR UPDATE",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn create_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
        changes: &RecordChanges,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (user_id, date, clock_in)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(changes.clock_in)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(result.last_insert_id())
    }

    async fn update_record(&mut self, id: u64, changes: &RecordChanges) -> Result<(), StoreError> {
        if let Some(update) =
            build_update_sql("attendance_records", changed_columns(changes), "id", id)
        {
            execute_update(&mut self.tx, update).await?;
        }
        Ok(())
    }

    async fn append_detail(&mut self, record_id: u64, event: &ClockEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_details (record_id, type, time)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(record_id)
        .bind(event.kind.as_ref())
        .bind(event.time)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_details(&mut self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError> {
        fetch_details(&mut self.tx, record_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
