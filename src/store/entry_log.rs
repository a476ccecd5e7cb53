use std::{
    collections::BTreeMap,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::PathBuf,
};

use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

use super::entities::{Entry, EntryKind, InvalidEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid entry: {0}")]
    Validation(#[from] InvalidEntry),
    #[error("no {0} entry to delete")]
    NotFound(EntryKind),
    #[error("log file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("log file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Interface for abstracting access to the persisted log.
pub trait EntryStore {
    /// Validates `entry` and files it at the end of `date`'s sequence.
    fn append(
        &self,
        date: NaiveDate,
        entry: Entry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the most recently appended entry of `kind`, whatever day it
    /// was filed under, and returns it together with that day.
    fn delete_last(
        &self,
        kind: EntryKind,
    ) -> impl Future<Output = Result<(NaiveDate, Entry), StoreError>> + Send;

    /// Entries between two dates inclusive, oldest day first, recording
    /// order within a day.
    fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<(NaiveDate, Entry)>, StoreError>> + Send;

    /// Entries of a single day in recording order.
    fn entries_on(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Entry>, StoreError>> + Send;
}

impl<T: Deref + Sync> EntryStore for T
where
    T::Target: EntryStore + Sync,
{
    fn append(
        &self,
        date: NaiveDate,
        entry: Entry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.deref().append(date, entry)
    }

    fn delete_last(
        &self,
        kind: EntryKind,
    ) -> impl Future<Output = Result<(NaiveDate, Entry), StoreError>> + Send {
        self.deref().delete_last(kind)
    }

    fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<(NaiveDate, Entry)>, StoreError>> + Send {
        self.deref().entries_between(from, to)
    }

    fn entries_on(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Entry>, StoreError>> + Send {
        self.deref().entries_on(date)
    }
}

/// The whole log as it sits in the file: ISO date -> entries in recording
/// order. Pure, so the scan and pruning rules stay testable without disk.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct EntryLog(BTreeMap<NaiveDate, Vec<Entry>>);

impl EntryLog {
    pub fn push(&mut self, date: NaiveDate, entry: Entry) {
        self.0.entry(date).or_default().push(entry);
    }

    /// Removes the most recently appended entry of `kind`: newest date first,
    /// within a date last position first. A day emptied by the removal is
    /// dropped from the map.
    pub fn take_last(&mut self, kind: EntryKind) -> Option<(NaiveDate, Entry)> {
        let date = self
            .0
            .iter()
            .rev()
            .find(|(_, entries)| entries.iter().any(|e| e.kind() == kind))
            .map(|(date, _)| *date)?;
        let day = self.0.get_mut(&date)?;
        let index = day.iter().rposition(|e| e.kind() == kind)?;
        let entry = day.remove(index);
        let emptied = day.is_empty();
        if emptied {
            self.0.remove(&date);
        }
        Some((date, entry))
    }

    pub fn day(&self, date: NaiveDate) -> &[Entry] {
        self.0.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, Entry)> {
        if from > to {
            return vec![];
        }
        self.0
            .range(from..=to)
            .flat_map(|(date, entries)| entries.iter().map(move |e| (*date, e.clone())))
            .collect()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.0.keys().next().copied()
    }

    pub fn days(&self) -> usize {
        self.0.len()
    }
}

/// The main realization of [EntryStore]. Nothing is cached: queries read the
/// file fresh and mutations rewrite it in full under an exclusive lock, so
/// the bot and the cli can share one file from two processes.
pub struct EntryStoreImpl {
    data_file: PathBuf,
}

impl EntryStoreImpl {
    /// Opens the store and performs one validating load. A corrupt file is
    /// refused here, before the process starts serving.
    pub async fn open(data_file: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = data_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let store = Self { data_file };
        let log = store.load().await?;
        debug!("opened log {:?} with {} days", store.data_file, log.days());
        Ok(store)
    }

    async fn load(&self) -> Result<EntryLog, StoreError> {
        let mut file = match File::open(&self.data_file).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(EntryLog::default()),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let result = Self::read_log(&mut file).await;
        file.unlock_async().await?;
        result
    }

    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut EntryLog) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.data_file)
            .await?;
        // Semi-safe acquire-release for the file
        file.lock_exclusive()?;
        let result = Self::mutate_locked(&mut file, op).await;
        file.unlock_async().await?;
        result
    }

    async fn mutate_locked<T>(
        file: &mut File,
        op: impl FnOnce(&mut EntryLog) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut log = Self::read_log(file).await?;
        // An op error means the file is left exactly as it was.
        let value = op(&mut log)?;
        let body = serde_json::to_vec_pretty(&log).map_err(std::io::Error::from)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        debug!("rewrote log with {} days", log.days());
        Ok(value)
    }

    async fn read_log(file: &mut File) -> Result<EntryLog, StoreError> {
        let mut raw = String::new();
        file.read_to_string(&mut raw).await?;
        if raw.trim().is_empty() {
            // A file that was only just created counts as no entries.
            return Ok(EntryLog::default());
        }
        serde_json::from_str(&raw).map_err(StoreError::Corrupt)
    }
}

impl EntryStore for EntryStoreImpl {
    async fn append(&self, date: NaiveDate, entry: Entry) -> Result<(), StoreError> {
        entry.validate()?;
        debug!("appending {} entry on {date}", entry.kind());
        self.mutate(move |log| {
            log.push(date, entry);
            Ok(())
        })
        .await
    }

    async fn delete_last(&self, kind: EntryKind) -> Result<(NaiveDate, Entry), StoreError> {
        self.mutate(move |log| log.take_last(kind).ok_or(StoreError::NotFound(kind)))
            .await
    }

    async fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Entry)>, StoreError> {
        Ok(self.load().await?.range(from, to))
    }

    async fn entries_on(&self, date: NaiveDate) -> Result<Vec<Entry>, StoreError> {
        Ok(self.load().await?.day(date).to_vec())
    }
}

#[cfg(test)]
mod log_tests {
    use chrono::{NaiveDate, NaiveTime};

    use crate::store::entities::{DiaperKind, Entry, EntryKind};

    use super::EntryLog;

    const SEPT_1: NaiveDate = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    const SEPT_3: NaiveDate = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn take_last_prefers_newest_date_then_last_position() {
        let mut log = EntryLog::default();
        log.push(SEPT_1, Entry::feeding(at(9, 0), 60, "Z"));
        log.push(SEPT_3, Entry::feeding(at(8, 0), 70, "M"));
        log.push(SEPT_3, Entry::feeding(at(12, 0), 80, "Z"));

        let (date, entry) = log.take_last(EntryKind::Feeding).unwrap();
        assert_eq!(date, SEPT_3);
        assert_eq!(entry.event.amount_ml(), Some(80));

        let (date, entry) = log.take_last(EntryKind::Feeding).unwrap();
        assert_eq!(date, SEPT_3);
        assert_eq!(entry.event.amount_ml(), Some(70));

        let (date, _) = log.take_last(EntryKind::Feeding).unwrap();
        assert_eq!(date, SEPT_1);

        assert_eq!(log.take_last(EntryKind::Feeding), None);
    }

    #[test]
    fn take_last_skips_days_without_the_kind() {
        let mut log = EntryLog::default();
        log.push(SEPT_1, Entry::temperature(at(7, 30), 37.1, "Z"));
        log.push(SEPT_3, Entry::feeding(at(9, 15), 65, "Z"));
        log.push(SEPT_3, Entry::diaper(at(10, 0), DiaperKind::Wet, "M"));

        let (date, entry) = log.take_last(EntryKind::Temperature).unwrap();
        assert_eq!(date, SEPT_1);
        assert_eq!(entry.event.temperature_celsius(), Some(37.1));
    }

    #[test]
    fn take_last_drops_emptied_days() {
        let mut log = EntryLog::default();
        log.push(SEPT_1, Entry::feeding(at(9, 0), 60, "Z"));
        log.push(SEPT_3, Entry::temperature(at(7, 30), 36.8, "Z"));

        log.take_last(EntryKind::Temperature).unwrap();
        assert_eq!(log.first_day(), Some(SEPT_1));
        assert_eq!(log.days(), 1);
        assert!(log.day(SEPT_3).is_empty());
    }

    #[test]
    fn range_is_inclusive_and_keeps_recording_order() {
        let mut log = EntryLog::default();
        log.push(SEPT_3, Entry::feeding(at(20, 0), 90, "Z"));
        // A catch-up entry for earlier in the day goes in after.
        log.push(SEPT_3, Entry::feeding(at(8, 30), 50, "Z"));
        log.push(SEPT_1, Entry::feeding(at(9, 0), 60, "M"));

        let all = log.range(SEPT_1, SEPT_3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].0, SEPT_1);
        assert_eq!(all[1].1.time, at(20, 0));
        assert_eq!(all[2].1.time, at(8, 30));

        assert!(log.range(SEPT_3, SEPT_1).is_empty());
    }
}

#[cfg(test)]
mod store_tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::tempdir;

    use crate::{
        store::entities::{DiaperKind, Entry, EntryKind},
        utils::logging::TEST_LOGGING,
    };

    use super::{EntryStore, EntryStoreImpl, StoreError};

    const SEPT_1: NaiveDate = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    const SEPT_3: NaiveDate = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn append_then_range_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;

        let entry = Entry::feeding(at(9, 15), 65, "Z");
        store.append(SEPT_3, entry.clone()).await?;

        let stored = store.entries_between(SEPT_3, SEPT_3).await?;
        assert_eq!(stored, vec![(SEPT_3, entry)]);
        Ok(())
    }

    #[tokio::test]
    async fn day_query_returns_append_order() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;

        store.append(SEPT_3, Entry::feeding(at(9, 15), 65, "Z")).await?;
        store
            .append(SEPT_3, Entry::temperature(at(9, 15), 36.6, "Z"))
            .await?;

        let day = store.entries_on(SEPT_3).await?;
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].kind(), EntryKind::Feeding);
        assert_eq!(day[1].kind(), EntryKind::Temperature);
        Ok(())
    }

    #[tokio::test]
    async fn delete_last_crosses_dates() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;

        store.append(SEPT_1, Entry::feeding(at(9, 0), 60, "M")).await?;
        store
            .append(SEPT_3, Entry::diaper(at(10, 0), DiaperKind::Both, "Z"))
            .await?;

        let (date, entry) = store.delete_last(EntryKind::Feeding).await?;
        assert_eq!(date, SEPT_1);
        assert_eq!(entry.event.amount_ml(), Some(60));

        // Only the diaper change is left.
        let rest = store.entries_between(SEPT_1, SEPT_3).await?;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].1.kind(), EntryKind::Diaper);
        Ok(())
    }

    #[tokio::test]
    async fn delete_last_without_match_changes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;

        store
            .append(SEPT_3, Entry::temperature(at(7, 30), 36.8, "Z"))
            .await?;

        let result = store.delete_last(EntryKind::Feeding).await;
        assert!(matches!(result, Err(StoreError::NotFound(EntryKind::Feeding))));

        let day = store.entries_on(SEPT_3).await?;
        assert_eq!(day.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn append_rejects_out_of_range_input() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;

        let result = store.append(SEPT_3, Entry::feeding(at(9, 0), 0, "Z")).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert!(store.entries_on(SEPT_3).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn survives_reopen() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let path = dir.path().join("log.json");

        let store = EntryStoreImpl::open(path.clone()).await?;
        store.append(SEPT_3, Entry::feeding(at(9, 15), 65, "Z")).await?;
        drop(store);

        let store = EntryStoreImpl::open(path.clone()).await?;
        let day = store.entries_on(SEPT_3).await?;
        assert_eq!(day[0].event.amount_ml(), Some(65));

        let raw = std::fs::read_to_string(path)?;
        assert!(raw.contains("\"2025-09-03\""));
        assert!(raw.contains("\"amount_ml\": 65"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = EntryStoreImpl::open(dir.path().join("log.json")).await?;
        assert!(store.entries_on(SEPT_3).await?.is_empty());
        assert!(store.entries_between(SEPT_1, SEPT_3).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_refuses_to_open() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("log.json");
        std::fs::write(&path, "{\"2025-09-03\": not json")?;

        let result = EntryStoreImpl::open(path).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
        Ok(())
    }
}
