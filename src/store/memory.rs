//! In-process store for tests. A transaction holds the table lock for its
//! whole life and works on a copy that replaces the tables on commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    attendance::{filter::HistoryFilter, state::RecordChanges, summary::DayTotals},
    model::attendance::{AttendanceRecord, ClockEvent},
    store::{AttendanceStore, AttendanceTx, StoreError},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    records: Vec<AttendanceRecord>,
    details: Vec<(u64, ClockEvent)>,
    next_id: u64,
}

impl Tables {
    fn find(&self, user_id: u64, date: NaiveDate) -> Option<&AttendanceRecord> {
        self.records
            .iter()
            .find(|r| r.user_id == user_id && r.date == date)
    }

    fn matching<'a>(
        &'a self,
        user_id: u64,
        filter: &'a HistoryFilter,
    ) -> impl Iterator<Item = &'a AttendanceRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.user_id == user_id && filter.matches(r.date))
    }

    fn details_of(&self, record_id: u64) -> Vec<ClockEvent> {
        self.details
            .iter()
            .filter(|(id, _)| *id == record_id)
            .map(|(_, ev)| *ev)
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_appends: Arc<AtomicBool>,
    blind_lookups: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `append_detail` fail, to exercise rollback.
    pub fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }

    /// Makes transactional lookups miss existing records, as if another
    /// writer inserted the day's record after this one looked.
    pub fn race_record_creation(&self) {
        self.blind_lookups.store(true, Ordering::SeqCst);
    }

    pub async fn insert_record(&self, record: AttendanceRecord) {
        let mut tables = self.tables.lock().await;
        tables.next_id = tables.next_id.max(record.id);
        tables.records.push(record);
    }

    pub async fn detail_count(&self) -> usize {
        self.tables.lock().await.details.len()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AttendanceTx>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            work,
            fail_appends: self.fail_appends.load(Ordering::SeqCst),
            blind_lookups: self.blind_lookups.load(Ordering::SeqCst),
        }))
    }

    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.tables.lock().await.find(user_id, date).cloned())
    }

    async fn list_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<_> = tables.matching(user_id, filter).cloned().collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    async fn page_records(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let records = self.list_records(user_id, filter).await?;
        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn record_totals(
        &self,
        user_id: u64,
        filter: &HistoryFilter,
    ) -> Result<DayTotals, StoreError> {
        Ok(self.tables.lock().await.matching(user_id, filter).collect())
    }

    async fn list_details(&self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError> {
        Ok(self.tables.lock().await.details_of(record_id))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    fail_appends: bool,
    blind_lookups: bool,
}

#[async_trait]
impl AttendanceTx for MemoryTx {
    async fn find_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        if self.blind_lookups {
            return Ok(None);
        }
        Ok(self.work.find(user_id, date).cloned())
    }

    async fn create_record(
        &mut self,
        user_id: u64,
        date: NaiveDate,
        changes: &RecordChanges,
    ) -> Result<u64, StoreError> {
        if self.work.find(user_id, date).is_some() {
            return Err(StoreError::Duplicate);
        }
        self.work.next_id += 1;
        let id = self.work.next_id;
        self.work.records.push(AttendanceRecord {
            id,
            user_id,
            date,
            clock_in: changes.clock_in,
            clock_out: None,
            break_minutes: None,
            work_hours: None,
        });
        Ok(id)
    }

    async fn update_record(&mut self, id: u64, changes: &RecordChanges) -> Result<(), StoreError> {
        if let Some(record) = self.work.records.iter_mut().find(|r| r.id == id) {
            if changes.clock_in.is_some() {
                record.clock_in = changes.clock_in;
            }
            if changes.clock_out.is_some() {
                record.clock_out = changes.clock_out;
            }
            if changes.break_minutes.is_some() {
                record.break_minutes = changes.break_minutes;
            }
            if changes.work_hours.is_some() {
                record.work_hours = changes.work_hours;
            }
        }
        Ok(())
    }

    async fn append_detail(&mut self, record_id: u64, event: &ClockEvent) -> Result<(), StoreError> {
        if self.fail_appends {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.work.details.push((record_id, *event));
        Ok(())
    }

    async fn list_details(&mut self, record_id: u64) -> Result<Vec<ClockEvent>, StoreError> {
        Ok(self.work.details_of(record_id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, work, .. } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
