//! Persistence for attendance records and their punch log.
//!
//! Writes go through an [`AttendanceTx`] obtained from
//! [`AttendanceStore::begin`] so a punch is applied all-or-nothing.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::attendance::filter::HistoryFilter;
use crate::attendance::state::RecordChanges;
use crate::attendance::summary::DayTotals;
use crate::model::attendance::{AttendanceRecord, ClockEvent};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key rejected the write.
    #[error("duplicate entry")]
    Duplicate,
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AttendanceTx>, StoreError>;

    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Records matching `filter`, newest date first.
    async fn list_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// At most `limit` records matching `filter`, newest date first,
    /// skipping the first `offset`.
    async fn page_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Count and hour totals over every record matching `filter`.
    async fn record_totals(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<DayTotals, StoreError>;

    /// Punches of a record in arrival order.
    async fn list_details(&self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError>;
}

/// A unit of work against the store. Dropping it without `commit` discards
/// every write made through it.
#[async_trait]
pub trait AttendanceTx: Send {
    /// Looks up and locks the (user, date) record for the rest of the
    /// transaction.
    async fn find_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn create_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
        changes: &RecordChanges,
    ) -> Result<u64, StoreError>;

    async fn update_record(&mut self, id: u64, changes: &RecordChanges) -> Result<(), StoreError>;

    async fn append_detail(&mut self, record_id: u64, event: &ClockEvent) -> Result<(), StoreError>;

    async fn list_details(&mut self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
