//! Sample data for a fresh database.
//!
//! Seeding only ever happens on a database with no trips and no records, so
//! enabling it on an existing install is harmless.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::TripConfig;
use crate::entities::{Destination, Entity, FamilyContact};
use crate::error::Result;
use crate::storage::{Storage, StorageHandle};
use crate::trip::{DestinationType, NewTrip, Trip, DEFAULT_TOTAL_STEPS, MAX_PROGRESS};

/// Insert the sample contacts, destinations and one finished trip if the
/// database is empty. Returns whether anything was written.
///
/// # Errors
///
/// Returns an error if the storage operation fails.
pub fn seed_sample_data(storage: &StorageHandle) -> Result<bool> {
    let now = Utc::now();
    let seeded = storage.with(|s| {
        s.immediate(|s| {
            if !s.is_empty()? {
                return Ok(false);
            }
            for contact in sample_contacts() {
                insert(s, &contact)?;
            }
            for destination in sample_destinations(now) {
                insert(s, &destination)?;
            }
            s.insert_trip(&sample_trip(now)?)?;
            Ok(true)
        })
    })?;

    if seeded {
        info!("Seeded sample data");
    }
    Ok(seeded)
}

fn insert<E: Entity + Serialize>(storage: &Storage, record: &E) -> Result<()> {
    storage.insert_record(E::KIND, record.id(), &serde_json::to_string(record)?)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn sample_contacts() -> Vec<FamilyContact> {
    vec![
        FamilyContact {
            id: new_id(),
            name: "Sarah Johnson".to_string(),
            phone_number: "+1 (555) 123-4567".to_string(),
            relationship: "Daughter".to_string(),
            is_primary: true,
            family_link_enabled: true,
        },
        FamilyContact {
            id: new_id(),
            name: "Michael Johnson".to_string(),
            phone_number: "+1 (555) 234-5678".to_string(),
            relationship: "Son".to_string(),
            is_primary: false,
            family_link_enabled: false,
        },
    ]
}

fn sample_destinations(now: DateTime<Utc>) -> Vec<Destination> {
    let place = |name: &str,
                 address: &str,
                 destination_type: DestinationType,
                 is_favorite: bool,
                 visit_count: u32,
                 ago: Duration| Destination {
        id: new_id(),
        name: name.to_string(),
        address: address.to_string(),
        destination_type,
        is_favorite,
        visit_count,
        last_visited: Some(now - ago),
    };

    vec![
        place(
            "Home",
            "123 Oak Street, Springfield",
            DestinationType::Home,
            true,
            50,
            Duration::hours(2),
        ),
        place(
            "Green Valley Pharmacy",
            "456 Main Street, Springfield",
            DestinationType::Pharmacy,
            true,
            25,
            Duration::days(1),
        ),
        place(
            "Springfield General Hospital",
            "789 Hospital Drive, Springfield",
            DestinationType::Hospital,
            false,
            8,
            Duration::weeks(1),
        ),
        place(
            "Fresh Market",
            "321 Market Avenue, Springfield",
            DestinationType::Grocery,
            true,
            30,
            Duration::days(2),
        ),
    ]
}

/// Yesterday's pharmacy run, completed comfortably after fifteen minutes.
fn sample_trip(now: DateTime<Utc>) -> Result<Trip> {
    let started = now - Duration::days(1);
    let mut trip = Trip::start(
        new_id(),
        NewTrip::new("Green Valley Pharmacy", DestinationType::Pharmacy),
        &TripConfig::default(),
        started,
    )?;
    trip.advance(MAX_PROGRESS, DEFAULT_TOTAL_STEPS)?;
    trip.complete(Some(true), started + Duration::minutes(15))?;
    Ok(trip)
}
