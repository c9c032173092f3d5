//! Trip lifecycle manager.
//!
//! Every state change to a trip goes through [`TripManager`]. Each operation
//! loads the trip, applies one transition from [`crate::trip`] and writes the
//! result back while holding the storage lock, so two callers can never act on
//! the same stale copy. Starting a trip additionally runs inside an immediate
//! transaction, which keeps the "at most one active trip" rule even when
//! another process shares the database file.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TripConfig;
use crate::error::{Error, Result};
use crate::guidance::step_progress;
use crate::storage::{Storage, StorageHandle};
use crate::trip::{NewTrip, Trip};

/// Applies lifecycle operations to stored trips.
#[derive(Debug, Clone)]
pub struct TripManager {
    storage: StorageHandle,
    config: TripConfig,
}

impl TripManager {
    /// Create a manager over shared storage.
    #[must_use]
    pub fn new(storage: StorageHandle, config: TripConfig) -> Self {
        Self { storage, config }
    }

    /// Start a new trip.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank destination or zero step count,
    /// and a conflict error if another trip is already in progress.
    pub fn start_trip(&self, new: NewTrip) -> Result<Trip> {
        let trip = Trip::start(Uuid::new_v4().to_string(), new, &self.config, Utc::now())?;

        let result = self.storage.with(|s| {
            s.immediate(|s| {
                if let Some(active) = s.find_active()? {
                    return Err(Error::Conflict {
                        active_id: active.id,
                    });
                }
                s.insert_trip(&trip)
            })
        });

        if let Err(e) = &result {
            warn!("Refused to start trip to {}: {}", trip.destination, e);
        }
        result?;

        info!(
            "Started trip {} to {} ({} steps)",
            trip.id, trip.destination, trip.total_steps
        );
        Ok(trip)
    }

    /// Fetch a trip by id.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub fn get_trip(&self, id: &str) -> Result<Trip> {
        self.storage.with(|s| load(s, id))
    }

    /// Record progress on an in-progress trip.
    ///
    /// Reaching 100% does not complete the trip.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id, or a validation error if
    /// the trip is not in progress or the values are out of range or would go
    /// backwards.
    pub fn advance_progress(&self, id: &str, progress: u32, current_step: u32) -> Result<Trip> {
        self.mutate(id, |trip| trip.advance(progress, current_step))
            .inspect(|trip| {
                debug!(
                    "Trip {} at step {}/{} ({}%)",
                    trip.id, trip.current_step, trip.total_steps, trip.progress
                );
            })
    }

    /// Move an in-progress trip to its next guidance step.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the trip is already on its final step;
    /// the caller should complete the trip instead. Otherwise fails as
    /// [`Self::advance_progress`].
    pub fn next_step(&self, id: &str) -> Result<Trip> {
        self.mutate(id, |trip| {
            let final_step = trip.total_steps.saturating_sub(1);
            if trip.is_active() && trip.current_step >= final_step {
                return Err(Error::validation(format!(
                    "trip {} is on its final step; complete it instead",
                    trip.id
                )));
            }
            let next = trip.current_step.saturating_add(1);
            let progress = trip.progress.max(step_progress(next, trip.total_steps));
            trip.advance(progress, next)
        })
        .inspect(|trip| {
            debug!(
                "Trip {} moved to step {}/{}",
                trip.id, trip.current_step, trip.total_steps
            );
        })
    }

    /// Complete an in-progress trip, optionally recording feedback.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id, or an invalid-transition
    /// error if the trip already ended.
    pub fn complete_trip(&self, id: &str, was_comfortable: Option<bool>) -> Result<Trip> {
        let trip = self.mutate(id, |trip| trip.complete(was_comfortable, Utc::now()))?;
        info!("Completed trip {} to {}", trip.id, trip.destination);
        Ok(trip)
    }

    /// Cancel an in-progress trip.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id, or an invalid-transition
    /// error if the trip already ended.
    pub fn cancel_trip(&self, id: &str) -> Result<Trip> {
        let trip = self.mutate(id, |trip| trip.cancel(Utc::now()))?;
        info!(
            "Cancelled trip {} to {} at {}%",
            trip.id, trip.destination, trip.progress
        );
        Ok(trip)
    }

    /// Complete whichever trip is active, recording the traveller's feedback.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no trip is in progress.
    pub fn submit_feedback_for_active(&self, was_comfortable: bool) -> Result<Trip> {
        let trip = self.storage.with(|s| {
            let mut trip = s.find_active()?.ok_or_else(Error::no_active_trip)?;
            trip.complete(Some(was_comfortable), Utc::now())?;
            s.update_trip(&trip)?;
            Ok(trip)
        })?;
        info!(
            "Completed trip {} with feedback (comfortable: {})",
            trip.id, was_comfortable
        );
        Ok(trip)
    }

    /// Load, change and store a trip under one lock acquisition. Nothing is
    /// written if `change` fails.
    fn mutate(&self, id: &str, change: impl FnOnce(&mut Trip) -> Result<()>) -> Result<Trip> {
        let result = self.storage.with(|s| {
            let mut trip = load(s, id)?;
            change(&mut trip)?;
            s.update_trip(&trip)?;
            Ok(trip)
        });
        if let Err(e) = &result {
            debug!("Rejected change to trip {}: {}", id, e);
        }
        result
    }
}

fn load(storage: &Storage, id: &str) -> Result<Trip> {
    storage
        .get_trip(id)?
        .ok_or_else(|| Error::not_found("trip", id))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::trip::{DestinationType, TripStatus};

    fn create_test_manager() -> TripManager {
        crate::logging::init_test_logging();
        let storage = StorageHandle::in_memory().expect("failed to create test storage");
        TripManager::new(storage, TripConfig::default())
    }

    fn start(manager: &TripManager, destination: &str) -> Trip {
        manager
            .start_trip(NewTrip::new(destination, DestinationType::Pharmacy))
            .unwrap()
    }

    #[test]
    fn test_start_trip_defaults() {
        let manager = create_test_manager();
        let trip = start(&manager, "  Green Valley Pharmacy ");

        assert_eq!(trip.destination, "Green Valley Pharmacy");
        assert_eq!(trip.status, TripStatus::InProgress);
        assert_eq!(trip.progress, 0);
        assert_eq!(trip.current_step, 0);
        assert_eq!(trip.total_steps, 5);
        assert!(trip.safe_route_enabled);
        assert!(trip.end_time.is_none());
        assert_eq!(manager.get_trip(&trip.id).unwrap(), trip);
    }

    #[test]
    fn test_start_trip_uses_configured_step_count() {
        let storage = StorageHandle::in_memory().unwrap();
        let config = TripConfig {
            default_total_steps: 8,
            ..TripConfig::default()
        };
        let manager = TripManager::new(storage, config);

        assert_eq!(start(&manager, "Home").total_steps, 8);
    }

    #[test]
    fn test_start_trip_blank_destination() {
        let manager = create_test_manager();
        let err = manager
            .start_trip(NewTrip::new("   ", DestinationType::Home))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_second_start_conflicts() {
        let manager = create_test_manager();
        let first = start(&manager, "Pharmacy");

        let err = manager
            .start_trip(NewTrip::new("Hospital", DestinationType::Hospital))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains(&first.id));

        manager.cancel_trip(&first.id).unwrap();
        assert!(manager
            .start_trip(NewTrip::new("Hospital", DestinationType::Hospital))
            .is_ok());
    }

    #[test]
    fn test_concurrent_start_yields_one_trip() {
        let manager = create_test_manager();
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let manager = manager.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.start_trip(NewTrip::new(format!("Place {i}"), DestinationType::Other))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| r.as_ref().is_err_and(Error::is_conflict))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, threads - 1);
    }

    #[test]
    fn test_advance_progress() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");

        let trip = manager.advance_progress(&trip.id, 40, 2).unwrap();
        assert_eq!((trip.progress, trip.current_step), (40, 2));

        // Same values again are fine.
        assert!(manager.advance_progress(&trip.id, 40, 2).is_ok());

        for (progress, step) in [(30, 2), (50, 1), (101, 3), (60, 6)] {
            let err = manager
                .advance_progress(&trip.id, progress, step)
                .unwrap_err();
            assert!(err.is_validation(), "({progress}, {step}) should fail");
        }

        let stored = manager.get_trip(&trip.id).unwrap();
        assert_eq!((stored.progress, stored.current_step), (40, 2));
    }

    #[test]
    fn test_advance_to_full_does_not_complete() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");

        let trip = manager.advance_progress(&trip.id, 100, 5).unwrap();
        assert_eq!(trip.status, TripStatus::InProgress);
        assert!(trip.end_time.is_none());
    }

    #[test]
    fn test_advance_unknown_trip() {
        let manager = create_test_manager();
        assert!(manager
            .advance_progress("missing", 10, 1)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_advance_after_terminal_is_validation_error() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");
        manager.cancel_trip(&trip.id).unwrap();

        let err = manager.advance_progress(&trip.id, 50, 2).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_next_step_protocol() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");

        let mut seen = Vec::new();
        for _ in 0..4 {
            let t = manager.next_step(&trip.id).unwrap();
            seen.push((t.current_step, t.progress));
        }
        assert_eq!(seen, vec![(1, 40), (2, 60), (3, 80), (4, 100)]);

        let err = manager.next_step(&trip.id).unwrap_err();
        assert!(err.is_validation());

        let done = manager.complete_trip(&trip.id, None).unwrap();
        assert_eq!(done.status, TripStatus::Completed);
    }

    #[test]
    fn test_next_step_keeps_higher_progress() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");
        manager.advance_progress(&trip.id, 70, 0).unwrap();

        let trip = manager.next_step(&trip.id).unwrap();
        assert_eq!((trip.current_step, trip.progress), (1, 70));
    }

    #[test]
    fn test_next_step_at_largest_step_count() {
        let storage = StorageHandle::in_memory().unwrap();
        let config = TripConfig {
            max_total_steps: u32::MAX,
            ..TripConfig::default()
        };
        let manager = TripManager::new(storage, config);

        let mut new = NewTrip::new("Hospital", DestinationType::Hospital);
        new.total_steps = Some(u32::MAX);
        let trip = manager.start_trip(new).unwrap();
        manager.advance_progress(&trip.id, 10, u32::MAX).unwrap();

        let err = manager.next_step(&trip.id).unwrap_err();
        assert!(err.is_validation());

        let reloaded = manager.get_trip(&trip.id).unwrap();
        assert_eq!(reloaded.current_step, u32::MAX);
        assert!(manager.cancel_trip(&trip.id).is_ok());
    }

    #[test]
    fn test_next_step_on_single_step_trip() {
        let manager = create_test_manager();
        let mut new = NewTrip::new("Home", DestinationType::Home);
        new.total_steps = Some(1);
        let trip = manager.start_trip(new).unwrap();

        let err = manager.next_step(&trip.id).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_next_step_after_completion() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");
        manager.complete_trip(&trip.id, None).unwrap();

        let err = manager.next_step(&trip.id).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_start_trip_above_step_limit() {
        let manager = create_test_manager();
        let mut new = NewTrip::new("Hospital", DestinationType::Hospital);
        new.total_steps = Some(4_000_000_000);

        let err = manager.start_trip(new).unwrap_err();
        assert!(err.is_validation());

        // Nothing was stored, so a normal start does not conflict.
        assert_eq!(start(&manager, "Home").total_steps, 5);
    }

    #[test]
    fn test_complete_trip() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");
        manager.advance_progress(&trip.id, 60, 3).unwrap();

        let done = manager.complete_trip(&trip.id, Some(true)).unwrap();
        assert_eq!(done.status, TripStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.current_step, 3);
        assert_eq!(done.was_comfortable, Some(true));
        assert!(done.end_time.is_some());

        let err = manager.complete_trip(&trip.id, Some(false)).unwrap_err();
        assert!(err.is_invalid_transition());
        let err = manager.cancel_trip(&trip.id).unwrap_err();
        assert!(err.is_invalid_transition());

        // Terminal trip is unchanged by the failed attempts.
        assert_eq!(manager.get_trip(&trip.id).unwrap(), done);
    }

    #[test]
    fn test_cancel_keeps_progress() {
        let manager = create_test_manager();
        let trip = start(&manager, "Pharmacy");
        manager.advance_progress(&trip.id, 40, 2).unwrap();

        let cancelled = manager.cancel_trip(&trip.id).unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);
        assert_eq!((cancelled.progress, cancelled.current_step), (40, 2));
        assert!(cancelled.end_time.is_some());
        assert!(cancelled.was_comfortable.is_none());

        assert!(manager
            .complete_trip(&trip.id, None)
            .unwrap_err()
            .is_invalid_transition());
    }

    #[test]
    fn test_complete_unknown_trip() {
        let manager = create_test_manager();
        assert!(manager.complete_trip("nope", None).unwrap_err().is_not_found());
        assert!(manager.cancel_trip("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_feedback_for_active() {
        let manager = create_test_manager();
        let err = manager.submit_feedback_for_active(true).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no active trip");

        let trip = start(&manager, "Fresh Market");
        let done = manager.submit_feedback_for_active(false).unwrap();
        assert_eq!(done.id, trip.id);
        assert_eq!(done.was_comfortable, Some(false));
        assert_eq!(done.status, TripStatus::Completed);

        assert!(manager
            .submit_feedback_for_active(true)
            .unwrap_err()
            .is_not_found());
    }
}
