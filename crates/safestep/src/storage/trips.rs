//! Trip repository.
//!
//! Keyed trip storage plus `find_active`. Nothing here validates lifecycle
//! rules; the lifecycle manager decides what may be written.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::trip::{DestinationType, Trip, TripStatus};

use super::{decode_time, encode_time, Storage};

const TRIP_COLUMNS: &str = "id, destination, destination_type, status, start_time, end_time, \
     progress, current_step, total_steps, was_comfortable, safe_route_enabled";

impl Storage {
    /// Insert a new trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including when a trip
    /// with the same id already exists.
    pub fn insert_trip(&self, trip: &Trip) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO trips (id, destination, destination_type, status, start_time, end_time,
                               progress, current_step, total_steps, was_comfortable,
                               safe_route_enabled)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                trip.id,
                trip.destination,
                trip.destination_type.as_str(),
                trip.status.as_str(),
                encode_time(&trip.start_time),
                trip.end_time.as_ref().map(encode_time),
                trip.progress,
                trip.current_step,
                trip.total_steps,
                trip.was_comfortable,
                trip.safe_route_enabled,
            ],
        )?;

        debug!("Inserted trip {}", trip.id);
        Ok(())
    }

    /// Get a trip by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_trip(&self, id: &str) -> Result<Option<Trip>> {
        let trip = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"),
                [id],
                Self::row_to_trip,
            )
            .optional()?;
        Ok(trip)
    }

    /// Write back the mutable fields of a trip.
    ///
    /// Only status, end time, progress, step and feedback are written; the
    /// identity and creation-time fields are never touched. Returns `false` if
    /// no trip has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_trip(&self, trip: &Trip) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            UPDATE trips
            SET status = ?2, end_time = ?3, progress = ?4, current_step = ?5, was_comfortable = ?6
            WHERE id = ?1
            ",
            params![
                trip.id,
                trip.status.as_str(),
                trip.end_time.as_ref().map(encode_time),
                trip.progress,
                trip.current_step,
                trip.was_comfortable,
            ],
        )?;

        debug!("Updated trip {} ({} row)", trip.id, affected);
        Ok(affected > 0)
    }

    /// Find the trip currently in progress.
    ///
    /// Returns the earliest-inserted one if, against the lifecycle invariant,
    /// several exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_active(&self) -> Result<Option<Trip>> {
        let trip = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TRIP_COLUMNS} FROM trips WHERE status = ?1 ORDER BY seq ASC LIMIT 1"
                ),
                [TripStatus::InProgress.as_str()],
                Self::row_to_trip,
            )
            .optional()?;
        Ok(trip)
    }

    /// Completed and cancelled trips, most recently ended first.
    ///
    /// Equal end times keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn finished_trips(&self, limit: usize) -> Result<Vec<Trip>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {TRIP_COLUMNS} FROM trips
            WHERE status IN (?1, ?2)
            ORDER BY end_time DESC, seq ASC
            LIMIT ?3
            "
        ))?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let trips = stmt
            .query_map(
                params![
                    TripStatus::Completed.as_str(),
                    TripStatus::Cancelled.as_str(),
                    limit_i64
                ],
                Self::row_to_trip,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    /// Count trips with the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_trips(&self, status: TripStatus) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM trips WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Convert a database row to a Trip struct.
    fn row_to_trip(row: &rusqlite::Row) -> rusqlite::Result<Trip> {
        let destination_type: String = row.get(2)?;
        let status: String = row.get(3)?;
        let start_time: String = row.get(4)?;
        let end_time: Option<String> = row.get(5)?;

        let end_time = match end_time {
            Some(value) => Some(
                decode_time(&value)
                    .ok_or_else(|| conversion_error(5, format!("bad end_time: {value}")))?,
            ),
            None => None,
        };

        Ok(Trip {
            id: row.get(0)?,
            destination: row.get(1)?,
            destination_type: DestinationType::parse(&destination_type).ok_or_else(|| {
                conversion_error(2, format!("unknown destination type: {destination_type}"))
            })?,
            status: TripStatus::parse(&status)
                .ok_or_else(|| conversion_error(3, format!("unknown trip status: {status}")))?,
            start_time: decode_time(&start_time)
                .ok_or_else(|| conversion_error(4, format!("bad start_time: {start_time}")))?,
            end_time,
            progress: row.get(6)?,
            current_step: row.get(7)?,
            total_steps: row.get(8)?,
            was_comfortable: row.get(9)?,
            safe_route_enabled: row.get(10)?,
        })
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::config::TripConfig;
    use crate::trip::NewTrip;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn create_test_trip(id: &str) -> Trip {
        Trip::start(
            id.to_string(),
            NewTrip::new("Green Valley Pharmacy", DestinationType::Pharmacy),
            &TripConfig::default(),
            Utc::now(),
        )
        .unwrap()
    }

    fn finished_at(id: &str, end: chrono::DateTime<Utc>) -> Trip {
        let mut trip = create_test_trip(id);
        trip.complete(None, end).unwrap();
        trip
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let trip = create_test_trip("t1");
        storage.insert_trip(&trip).unwrap();

        let retrieved = storage.get_trip("t1").unwrap().unwrap();
        assert_eq!(retrieved, trip);
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        assert!(storage.get_trip("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let storage = create_test_storage();
        let trip = create_test_trip("t1");
        storage.insert_trip(&trip).unwrap();
        assert!(storage.insert_trip(&trip).is_err());
    }

    #[test]
    fn test_update_writes_mutable_fields_only() {
        let storage = create_test_storage();
        let trip = create_test_trip("t1");
        storage.insert_trip(&trip).unwrap();

        let mut changed = trip.clone();
        changed.destination = "Somewhere else".to_string();
        changed.total_steps = 9;
        changed.progress = 60;
        changed.current_step = 3;
        assert!(storage.update_trip(&changed).unwrap());

        let stored = storage.get_trip("t1").unwrap().unwrap();
        assert_eq!(stored.destination, "Green Valley Pharmacy");
        assert_eq!(stored.total_steps, 5);
        assert_eq!(stored.progress, 60);
        assert_eq!(stored.current_step, 3);
    }

    #[test]
    fn test_update_nonexistent() {
        let storage = create_test_storage();
        assert!(!storage.update_trip(&create_test_trip("ghost")).unwrap());
    }

    #[test]
    fn test_find_active() {
        let storage = create_test_storage();
        assert!(storage.find_active().unwrap().is_none());

        storage
            .insert_trip(&finished_at("old", Utc::now()))
            .unwrap();
        assert!(storage.find_active().unwrap().is_none());

        storage.insert_trip(&create_test_trip("live")).unwrap();
        assert_eq!(storage.find_active().unwrap().unwrap().id, "live");
    }

    #[test]
    fn test_repository_does_not_enforce_single_active() {
        let storage = create_test_storage();
        storage.insert_trip(&create_test_trip("first")).unwrap();
        storage.insert_trip(&create_test_trip("second")).unwrap();

        assert_eq!(storage.count_trips(TripStatus::InProgress).unwrap(), 2);
        assert_eq!(storage.find_active().unwrap().unwrap().id, "first");
    }

    #[test]
    fn test_finished_trips_ordering() {
        let storage = create_test_storage();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        storage
            .insert_trip(&finished_at("t1", base))
            .unwrap();
        storage
            .insert_trip(&finished_at("t3", base + Duration::hours(2)))
            .unwrap();
        storage
            .insert_trip(&finished_at("t2", base + Duration::hours(1)))
            .unwrap();
        storage.insert_trip(&create_test_trip("live")).unwrap();

        let ids: Vec<_> = storage
            .finished_trips(10)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn test_finished_trips_ties_keep_insertion_order() {
        let storage = create_test_storage();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        for id in ["a", "b", "c"] {
            storage.insert_trip(&finished_at(id, end)).unwrap();
        }

        for _ in 0..3 {
            let ids: Vec<_> = storage
                .finished_trips(10)
                .unwrap()
                .into_iter()
                .map(|t| t.id)
                .collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_finished_trips_limit() {
        let storage = create_test_storage();
        let base = Utc::now();
        for i in 0..5 {
            storage
                .insert_trip(&finished_at(&format!("t{i}"), base + Duration::minutes(i)))
                .unwrap();
        }

        let ids: Vec<_> = storage
            .finished_trips(3)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t4", "t3", "t2"]);
        assert!(storage.finished_trips(0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_status_is_reported() {
        let storage = create_test_storage();
        storage.insert_trip(&create_test_trip("t1")).unwrap();
        storage
            .conn
            .execute("UPDATE trips SET status = 'paused' WHERE id = 't1'", [])
            .unwrap();

        assert!(storage.get_trip("t1").is_err());
    }
}
