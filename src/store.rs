// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Durable capsule records.
//!
//! A capsule record pairs the hidden carrier's path with its unlock date and
//! creation time. The carrier path is the record's identity: unique, never
//! reused, never mutated. Records are held in a single JSON file rewritten
//! on every insert, guarded by a mutex — plenty for the store's
//! insert-one / find-by-path access pattern, and each request only ever
//! holds the lock for the duration of one operation.
//!
//! Lock state is **not** stored. It is a predicate evaluated freshly on
//! every read: a capsule unlocks at 00:00:00 UTC on its stored date, so
//! `locked = now < future_date at midnight UTC`. There are no timers, no
//! background transitions, no cached states.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A persisted capsule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capsule {
    /// Path of the hidden carrier. Unique; doubles as the record key.
    pub image_path: String,
    /// Calendar date after which the capsule may be opened.
    pub future_date: NaiveDate,
    /// When the capsule was created.
    pub created_at: DateTime<Utc>,
}

/// Derived lock state — never persisted, always computed from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// `now` is before the unlock instant.
    Locked,
    /// The unlock instant has passed; extraction may proceed.
    Unlockable,
}

impl Capsule {
    /// The instant this capsule unlocks: midnight UTC on `future_date`.
    pub fn unlock_instant(&self) -> DateTime<Utc> {
        self.future_date.and_time(NaiveTime::MIN).and_utc()
    }

    /// Evaluate the lock state at `now`.
    pub fn lock_state(&self, now: DateTime<Utc>) -> LockState {
        if now < self.unlock_instant() {
            LockState::Locked
        } else {
            LockState::Unlockable
        }
    }
}

/// Errors raised by the capsule store.
#[derive(Debug)]
pub enum StoreError {
    /// The unlock date is not strictly after the current date.
    InvalidDate(NaiveDate),
    /// A record with this carrier path already exists.
    DuplicatePath(String),
    /// The store file exists but does not parse.
    Corrupt(serde_json::Error),
    /// Reading or writing the store file failed.
    Io(std::io::Error),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidDate(d) => write!(f, "unlock date {d} is not in the future"),
            Self::DuplicatePath(p) => write!(f, "capsule already exists for {p}"),
            Self::Corrupt(e) => write!(f, "store file is corrupt: {e}"),
            Self::Io(e) => write!(f, "store I/O failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corrupt(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// JSON-file-backed capsule store.
pub struct CapsuleStore {
    path: PathBuf,
    inner: Mutex<Vec<Capsule>>,
}

impl CapsuleStore {
    /// Open the store at `path`, creating parent directories as needed.
    /// A missing file is an empty store; an unparseable file is
    /// [`StoreError::Corrupt`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let records = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data).map_err(StoreError::Corrupt)?
        } else {
            Vec::new()
        };
        Ok(Self { path, inner: Mutex::new(records) })
    }

    /// Persist a new capsule record.
    ///
    /// # Errors
    /// - [`StoreError::InvalidDate`] unless `future_date` is strictly after
    ///   the current UTC calendar date.
    /// - [`StoreError::DuplicatePath`] if the carrier path is already taken.
    pub fn create(&self, image_path: &str, future_date: NaiveDate) -> Result<Capsule, StoreError> {
        let now = Utc::now();
        if future_date <= now.date_naive() {
            return Err(StoreError::InvalidDate(future_date));
        }

        let capsule = Capsule {
            image_path: image_path.to_string(),
            future_date,
            created_at: now,
        };

        let mut records = self.inner.lock().expect("store mutex poisoned");
        if records.iter().any(|c| c.image_path == image_path) {
            return Err(StoreError::DuplicatePath(image_path.to_string()));
        }
        records.push(capsule.clone());
        if let Err(e) = self.save(&records) {
            // Keep memory and disk agreeing: the record did not persist.
            records.pop();
            return Err(e);
        }
        info!("capsule persisted for {image_path}, unlocks {future_date}");
        Ok(capsule)
    }

    /// Look up a capsule by its carrier path.
    pub fn find(&self, image_path: &str) -> Option<Capsule> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .find(|c| c.image_path == image_path)
            .cloned()
    }

    /// Number of stored capsules.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, records: &[Capsule]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records).map_err(StoreError::Corrupt)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tomorrow() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(1)
    }

    #[test]
    fn create_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = CapsuleStore::open(dir.path().join("capsules.json")).unwrap();

        let capsule = store.create("uploads/a.png", tomorrow()).unwrap();
        assert_eq!(capsule.image_path, "uploads/a.png");
        assert_eq!(store.find("uploads/a.png"), Some(capsule));
        assert_eq!(store.find("uploads/missing.png"), None);
    }

    #[test]
    fn today_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CapsuleStore::open(dir.path().join("capsules.json")).unwrap();
        let result = store.create("uploads/a.png", Utc::now().date_naive());
        assert!(matches!(result, Err(StoreError::InvalidDate(_))));
        assert!(store.is_empty(), "rejected create must not persist");
    }

    #[test]
    fn past_date_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CapsuleStore::open(dir.path().join("capsules.json")).unwrap();
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        assert!(matches!(
            store.create("uploads/a.png", yesterday),
            Err(StoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn duplicate_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CapsuleStore::open(dir.path().join("capsules.json")).unwrap();
        store.create("uploads/a.png", tomorrow()).unwrap();
        assert!(matches!(
            store.create("uploads/a.png", tomorrow()),
            Err(StoreError::DuplicatePath(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsules.json");
        {
            let store = CapsuleStore::open(&path).unwrap();
            store.create("uploads/keep.png", tomorrow()).unwrap();
        }
        let reopened = CapsuleStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.find("uploads/keep.png").is_some());
    }

    #[test]
    fn corrupt_file_surfaces_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsules.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(CapsuleStore::open(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn record_serialized_shape() {
        let capsule = Capsule {
            image_path: "uploads/x.png".into(),
            future_date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
            created_at: DateTime::parse_from_rfc3339("2026-08-07T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&capsule).unwrap();
        assert_eq!(json["image_path"], "uploads/x.png");
        assert_eq!(json["future_date"], "2031-06-01");
        assert_eq!(json["created_at"], "2026-08-07T12:00:00Z");
    }

    #[test]
    fn lock_state_is_derived_at_midnight_utc() {
        let capsule = Capsule {
            image_path: "uploads/x.png".into(),
            future_date: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
            created_at: Utc::now(),
        };
        let just_before = DateTime::parse_from_rfc3339("2030-01-01T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        let at_midnight = DateTime::parse_from_rfc3339("2030-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(capsule.lock_state(just_before), LockState::Locked);
        assert_eq!(capsule.lock_state(at_midnight), LockState::Unlockable);
    }
}
