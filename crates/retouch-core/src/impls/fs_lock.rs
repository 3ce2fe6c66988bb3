//! File-backed ProcessingLock.
//!
//! The lock is a small JSON file holding its expiry. Acquisition publishes the
//! file with a no-overwrite link, so two callers cannot both create it; an
//! expired or unreadable lock file is removed and acquisition retried once.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::fs_json::{read_json, write_json_new};
use crate::domain::QueueError;
use crate::ports::{Clock, ProcessingLock};

/// File name under the data root.
pub const LOCK_FILE: &str = "processing.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub(crate) fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub struct FsProcessingLock {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FsProcessingLock {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live lock record, if any.
    async fn live(&self) -> Result<Option<LockRecord>, QueueError> {
        let record: Option<LockRecord> = read_json(&self.path).await?;
        Ok(record.filter(|r| r.expires_at > self.clock.now()))
    }

    async fn remove(&self) -> Result<(), QueueError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::storage(&self.path, e)),
        }
    }
}

#[async_trait]
impl ProcessingLock for FsProcessingLock {
    async fn try_acquire(&self, ttl: Duration) -> Result<bool, QueueError> {
        for _ in 0..2 {
            let now = self.clock.now();
            let record = LockRecord {
                acquired_at: now,
                expires_at: expiry(now, ttl),
            };
            if write_json_new(&self.path, &record).await? {
                debug!(expires_at = %record.expires_at, "processing lock acquired");
                return Ok(true);
            }
            if self.live().await?.is_some() {
                return Ok(false);
            }
            warn!(path = %self.path.display(), "replacing stale processing lock");
            self.remove().await?;
        }
        Ok(false)
    }

    async fn release(&self) -> Result<(), QueueError> {
        self.remove().await
    }

    async fn is_held(&self) -> Result<bool, QueueError> {
        Ok(self.live().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;

    fn setup(dir: &Path) -> (Arc<FixedClock>, FsProcessingLock) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let lock = FsProcessingLock::new(dir.join(LOCK_FILE), clock.clone());
        (clock, lock)
    }

    #[tokio::test]
    async fn second_acquire_fails_while_held() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, lock) = setup(tmp.path());

        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
        assert!(lock.is_held().await.unwrap());
        assert!(!lock.try_acquire(Duration::from_secs(600)).await.unwrap());
    }

    #[tokio::test]
    async fn release_frees_the_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, lock) = setup(tmp.path());

        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
        lock.release().await.unwrap();
        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lock_can_be_taken_over() {
        let tmp = tempfile::tempdir().unwrap();
        let (clock, lock) = setup(tmp.path());

        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
        clock.advance(TimeDelta::seconds(601));
        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
        assert!(lock.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn garbage_lock_file_is_treated_as_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, lock) = setup(tmp.path());
        std::fs::write(tmp.path().join(LOCK_FILE), b"1").unwrap();

        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn release_without_lock_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, lock) = setup(tmp.path());
        lock.release().await.unwrap();
    }
}
