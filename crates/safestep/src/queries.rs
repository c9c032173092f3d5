//! Read-only trip views.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::guidance::{canned_route, RouteStep};
use crate::storage::{StorageHandle, StorageStats};
use crate::trip::Trip;

/// Queries over stored trips. Never mutates.
#[derive(Debug, Clone)]
pub struct TripQueries {
    storage: StorageHandle,
}

/// Snapshot for the status view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Row counts.
    pub stats: StorageStats,
    /// The trip in progress, if any.
    pub active_trip: Option<Trip>,
    /// Where the database lives.
    pub database: String,
}

impl TripQueries {
    /// Queries over `storage`.
    #[must_use]
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    /// The trip currently in progress, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn active_trip(&self) -> Result<Option<Trip>> {
        self.storage.with(|s| s.find_active())
    }

    /// Finished trips, most recently ended first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn history(&self, limit: usize) -> Result<Vec<Trip>> {
        self.storage.with(|s| s.finished_trips(limit))
    }

    /// The guidance plan for a trip.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub fn route_steps(&self, id: &str) -> Result<Vec<RouteStep>> {
        let trip = self
            .storage
            .with(|s| s.get_trip(id))?
            .ok_or_else(|| Error::not_found("trip", id))?;
        Ok(canned_route(trip.total_steps))
    }

    /// Counts per status plus entity counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.with(|s| s.stats())
    }

    /// Stats, the active trip and the database location in one consistent read.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn status(&self) -> Result<StatusReport> {
        self.storage.with(|s| {
            Ok(StatusReport {
                stats: s.stats()?,
                active_trip: s.find_active()?,
                database: s.path().display().to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::TripConfig;
    use crate::lifecycle::TripManager;
    use crate::trip::{DestinationType, NewTrip, TripStatus};

    struct Services {
        trips: TripManager,
        queries: TripQueries,
    }

    fn create_test_services() -> Services {
        let storage = StorageHandle::in_memory().expect("failed to create test storage");
        Services {
            trips: TripManager::new(storage.clone(), TripConfig::default()),
            queries: TripQueries::new(storage),
        }
    }

    fn finish(services: &Services, destination: &str, cancel: bool) -> Trip {
        let trip = services
            .trips
            .start_trip(NewTrip::new(destination, DestinationType::Other))
            .unwrap();
        if cancel {
            services.trips.cancel_trip(&trip.id).unwrap()
        } else {
            services.trips.complete_trip(&trip.id, Some(true)).unwrap()
        }
    }

    #[test]
    fn test_active_trip() {
        let services = create_test_services();
        assert!(services.queries.active_trip().unwrap().is_none());

        let trip = services
            .trips
            .start_trip(NewTrip::new("Pharmacy", DestinationType::Pharmacy))
            .unwrap();
        assert_eq!(services.queries.active_trip().unwrap(), Some(trip.clone()));

        services.trips.cancel_trip(&trip.id).unwrap();
        assert!(services.queries.active_trip().unwrap().is_none());
    }

    #[test]
    fn test_history_newest_first_and_limited() {
        let services = create_test_services();
        for (name, cancel) in [("A", false), ("B", true), ("C", false)] {
            finish(&services, name, cancel);
            thread::sleep(Duration::from_millis(2));
        }
        // An active trip is never part of history.
        services
            .trips
            .start_trip(NewTrip::new("D", DestinationType::Home))
            .unwrap();

        let names: Vec<_> = services
            .queries
            .history(10)
            .unwrap()
            .into_iter()
            .map(|t| t.destination)
            .collect();
        assert_eq!(names, vec!["C", "B", "A"]);

        let limited = services.queries.history(2).unwrap();
        assert_eq!(limited.len(), 2);
        assert!(services.queries.history(0).unwrap().is_empty());
    }

    #[test]
    fn test_history_limit_keeps_latest_end_time() {
        let storage = StorageHandle::in_memory().unwrap();
        let queries = TripQueries::new(storage.clone());
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();

        // Insert the later trip first so insertion order cannot decide.
        for (id, end) in [("later", t2), ("earlier", t1)] {
            let mut trip = Trip::start(
                id.to_string(),
                NewTrip::new(id, DestinationType::Pharmacy),
                &TripConfig::default(),
                end - chrono::Duration::minutes(20),
            )
            .unwrap();
            trip.complete(Some(true), end).unwrap();
            storage.with(|s| s.insert_trip(&trip)).unwrap();
        }

        let history = queries.history(1).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "later");
        assert_eq!(history[0].end_time, Some(t2));
    }

    #[test]
    fn test_history_is_stable() {
        let services = create_test_services();
        for name in ["A", "B", "C"] {
            finish(&services, name, false);
        }
        let first = services.queries.history(10).unwrap();
        let second = services.queries.history(10).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|t| t.status != TripStatus::InProgress));
    }

    #[test]
    fn test_route_steps() {
        let services = create_test_services();
        let trip = services
            .trips
            .start_trip(NewTrip {
                total_steps: Some(3),
                ..NewTrip::new("Home", DestinationType::Home)
            })
            .unwrap();

        let steps = services.queries.route_steps(&trip.id).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].progress, 100);
        assert!(services
            .queries
            .route_steps("nope")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_status_report() {
        let services = create_test_services();
        finish(&services, "A", true);
        let active = services
            .trips
            .start_trip(NewTrip::new("B", DestinationType::Friend))
            .unwrap();

        let report = services.queries.status().unwrap();
        assert_eq!(report.stats.cancelled_trips, 1);
        assert_eq!(report.stats.active_trips, 1);
        assert_eq!(report.active_trip.map(|t| t.id), Some(active.id));
        assert_eq!(report.database, ":memory:");
        assert_eq!(
            services.queries.stats().unwrap().total_trips,
            2,
            "stats should count both trips"
        );
        assert_eq!(
            services.queries.active_trip().unwrap().map(|t| t.status),
            Some(TripStatus::InProgress)
        );
    }
}
