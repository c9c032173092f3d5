//! Storage layer for safestep.
//!
//! This module provides `SQLite`-based storage for trips and the simple entity
//! records (destinations, family contacts, preferences). [`Storage`] is the raw
//! repository: it stores and fetches rows and enforces no business rules.
//! [`StorageHandle`] is the shared, lock-guarded handle that the lifecycle
//! manager, the query service and the entity store all work through.

pub mod migrations;
pub mod records;
pub mod schema;
pub mod trips;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entities::EntityKind;
use crate::error::{Error, Result};
use crate::trip::TripStatus;

/// Storage engine for trips and entity records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets a CLI invocation read while the daemon holds the write lock.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so a read-check-write sequence inside
    /// `f` cannot interleave with another writer, even one in another process
    /// sharing the database file. The transaction rolls back if `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or an error if the transaction cannot be
    /// started or committed.
    pub fn immediate<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let active_trips = self.count_trips(TripStatus::InProgress)?;
        let completed_trips = self.count_trips(TripStatus::Completed)?;
        let cancelled_trips = self.count_trips(TripStatus::Cancelled)?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_trips: active_trips + completed_trips + cancelled_trips,
            active_trips,
            completed_trips,
            cancelled_trips,
            destinations: self.count_records(EntityKind::Destination)?,
            family_contacts: self.count_records(EntityKind::FamilyContact)?,
            db_size_bytes,
        })
    }

    /// Whether the database holds no trips and no entity records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_empty(&self) -> Result<bool> {
        let trips: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        let records: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(trips == 0 && records == 0)
    }
}

/// Shared handle to the storage engine.
///
/// Every operation runs under one lock acquisition, which makes each
/// lifecycle operation atomic with respect to every other and gives readers a
/// consistent view of a trip. Cloning the handle shares the same storage.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    inner: Arc<Mutex<Storage>>,
}

impl StorageHandle {
    /// Wrap an opened storage engine.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Open the storage described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = if config.storage.in_memory {
            Storage::open_in_memory()?
        } else {
            Storage::open(config.database_path())?
        };
        Ok(Self::new(storage))
    }

    /// Open a fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Storage::open_in_memory()?))
    }

    /// Run `f` with exclusive access to the storage.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&Storage) -> Result<R>) -> Result<R> {
        // A panicking holder never leaves an open transaction behind, so the
        // connection is still usable.
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering storage lock after a panic");
            poisoned.into_inner()
        });
        f(&guard)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Total number of trips stored.
    pub total_trips: i64,
    /// Trips currently in progress (0 or 1).
    pub active_trips: i64,
    /// Trips that were completed.
    pub completed_trips: i64,
    /// Trips that were cancelled.
    pub cancelled_trips: i64,
    /// Saved destinations.
    pub destinations: i64,
    /// Family contacts.
    pub family_contacts: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Fixed-width storage form of a timestamp; sorts lexically in time order.
pub(crate) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp.
pub(crate) fn decode_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TripConfig;
    use crate::trip::{DestinationType, NewTrip, Trip};

    fn sample_trip(id: &str) -> Trip {
        Trip::start(
            id.to_string(),
            NewTrip::new("Fresh Market", DestinationType::Grocery),
            &TripConfig::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_is_empty() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.is_empty().unwrap());

        storage.insert_trip(&sample_trip("a")).unwrap();
        assert!(!storage.is_empty().unwrap());
    }

    #[test]
    fn test_immediate_commits_on_success() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .immediate(|s| s.insert_trip(&sample_trip("a")))
            .unwrap();
        assert!(storage.get_trip("a").unwrap().is_some());
    }

    #[test]
    fn test_immediate_rolls_back_on_error() {
        let storage = Storage::open_in_memory().unwrap();
        let result: Result<()> = storage.immediate(|s| {
            s.insert_trip(&sample_trip("a"))?;
            Err(Error::validation("abort"))
        });

        assert!(result.is_err());
        assert!(storage.get_trip("a").unwrap().is_none());
    }

    #[test]
    fn test_stats_counts_by_status() {
        let storage = Storage::open_in_memory().unwrap();
        let mut done = sample_trip("done");
        done.complete(Some(true), Utc::now()).unwrap();
        storage.insert_trip(&done).unwrap();
        storage.insert_trip(&sample_trip("live")).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_trips, 2);
        assert_eq!(stats.active_trips, 1);
        assert_eq!(stats.completed_trips, 1);
        assert_eq!(stats.cancelled_trips, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_time_encoding_sorts_lexically() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::nanoseconds(1);
        assert!(encode_time(&earlier) < encode_time(&later));
        assert_eq!(decode_time(&encode_time(&earlier)), Some(earlier));
    }

    #[test]
    fn test_handle_shares_storage_between_clones() {
        let handle = StorageHandle::in_memory().unwrap();
        let clone = handle.clone();

        handle.with(|s| s.insert_trip(&sample_trip("a"))).unwrap();
        let found = clone.with(|s| s.get_trip("a")).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_handle_recovers_after_panicking_holder() {
        let handle = StorageHandle::in_memory().unwrap();
        handle.with(|s| s.insert_trip(&sample_trip("a"))).unwrap();

        let panicking = handle.clone();
        let joined = std::thread::spawn(move || {
            panicking.with(|s| -> Result<()> {
                s.insert_trip(&sample_trip("b"))?;
                panic!("holder panicked");
            })
        })
        .join();
        assert!(joined.is_err());

        assert!(handle.with(|s| s.get_trip("a")).unwrap().is_some());
        handle.with(|s| s.insert_trip(&sample_trip("c"))).unwrap();
        assert!(handle.with(|s| s.get_trip("c")).unwrap().is_some());
    }

    #[test]
    fn test_handle_open_in_memory_from_config() {
        let mut config = Config::default();
        config.storage.in_memory = true;

        let handle = StorageHandle::open(&config).unwrap();
        let path = handle.with(|s| Ok(s.path().to_path_buf())).unwrap();
        assert_eq!(path, PathBuf::from(":memory:"));
    }

    #[test]
    fn test_open_file_based() {
        let db_path =
            std::env::temp_dir().join(format!("safestep_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage.insert_trip(&sample_trip("a")).unwrap();
        assert_eq!(storage.path(), db_path);
        assert!(storage.stats().unwrap().db_size_bytes > 0);

        // State survives reopening.
        drop(storage);
        let reopened = Storage::open(&db_path).unwrap();
        assert!(reopened.get_trip("a").unwrap().is_some());

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested_path = std::env::temp_dir().join(format!(
            "safestep_test_{}/nested/db.sqlite",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        if let Some(root) = nested_path.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(root);
        }
    }
}
