//! Entity store for the plain CRUD records.
//!
//! Destinations and family contacts implement [`Entity`], which lets
//! [`EntityStore`] create, fetch, list, patch and delete them with one generic
//! code path. Each kind validates its own payloads. Patches are typed structs
//! that name the fields they may touch, so ids can never be overwritten.
//! Preferences are a singleton and get their own pair of methods.

mod contact;
mod destination;
mod preferences;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::StorageHandle;

pub use contact::{FamilyContact, FamilyContactPatch, NewFamilyContact};
pub use destination::{Destination, DestinationFilter, DestinationPatch, NewDestination};
pub use preferences::{PreferencesPatch, TextSize, UserPreferences};

/// The id-keyed record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Saved places.
    Destination,
    /// People who may watch a trip.
    FamilyContact,
}

impl EntityKind {
    /// Storage key for the kind column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::FamilyContact => "family_contact",
        }
    }

    /// Human-readable name used in messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::FamilyContact => "family contact",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record kind the generic store can manage.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Which collection the records live in.
    const KIND: EntityKind;

    /// Creation payload.
    type New;

    /// Partial-update payload.
    type Patch;

    /// Build a record from a creation payload, applying field defaults.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the payload is invalid.
    fn from_new(id: String, new: Self::New) -> Result<Self>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a patched value is invalid. The caller
    /// discards the record on error, so partial application is harmless.
    fn apply(&mut self, patch: Self::Patch) -> Result<()>;

    /// The record's id.
    fn id(&self) -> &str;
}

/// CRUD front for destinations, contacts and preferences.
#[derive(Debug, Clone)]
pub struct EntityStore {
    storage: StorageHandle,
}

impl EntityStore {
    /// Create a store over shared storage.
    #[must_use]
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    /// Create a record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad payload, or a storage error.
    pub fn create<E: Entity>(&self, new: E::New) -> Result<E> {
        let record = E::from_new(Uuid::new_v4().to_string(), new)?;
        let body = serde_json::to_string(&record)?;
        self.storage
            .with(|s| s.insert_record(E::KIND, record.id(), &body))?;

        info!("Created {} {}", E::KIND, record.id());
        Ok(record)
    }

    /// Fetch a record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no record has this id.
    pub fn get<E: Entity>(&self, id: &str) -> Result<E> {
        let body = self
            .storage
            .with(|s| s.get_record(E::KIND, id))?
            .ok_or_else(|| Error::not_found(E::KIND.label(), id))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// All records of a kind, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or a record cannot be decoded.
    pub fn list<E: Entity>(&self) -> Result<Vec<E>> {
        self.storage
            .with(|s| s.list_records(E::KIND))?
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id or a validation error for
    /// a bad patch; nothing is written in either case.
    pub fn update<E: Entity>(&self, id: &str, patch: E::Patch) -> Result<E> {
        self.storage.with(|s| {
            let body = s
                .get_record(E::KIND, id)?
                .ok_or_else(|| Error::not_found(E::KIND.label(), id))?;
            let mut record: E = serde_json::from_str(&body)?;
            record.apply(patch)?;

            s.update_record(E::KIND, id, &serde_json::to_string(&record)?)?;
            debug!("Updated {} {}", E::KIND, id);
            Ok(record)
        })
    }

    /// Delete a record. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn delete<E: Entity>(&self, id: &str) -> Result<bool> {
        let deleted = self.storage.with(|s| s.delete_record(E::KIND, id))?;
        if deleted {
            info!("Deleted {} {}", E::KIND, id);
        }
        Ok(deleted)
    }

    /// List destinations through one of the named views.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn list_destinations(&self, filter: DestinationFilter) -> Result<Vec<Destination>> {
        let all = self.list::<Destination>()?;
        Ok(filter.apply(all))
    }

    /// Visited destinations, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn recent_destinations(&self, limit: usize) -> Result<Vec<Destination>> {
        self.list_destinations(DestinationFilter::Recent { limit })
    }

    /// Destinations marked as favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn favorite_destinations(&self) -> Result<Vec<Destination>> {
        self.list_destinations(DestinationFilter::Favorites)
    }

    /// Flip a destination's favorite flag.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub fn toggle_favorite(&self, id: &str) -> Result<Destination> {
        self.storage.with(|s| {
            let body = s
                .get_record(EntityKind::Destination, id)?
                .ok_or_else(|| Error::not_found(EntityKind::Destination.label(), id))?;
            let mut destination: Destination = serde_json::from_str(&body)?;
            destination.is_favorite = !destination.is_favorite;

            s.update_record(
                EntityKind::Destination,
                id,
                &serde_json::to_string(&destination)?,
            )?;
            Ok(destination)
        })
    }

    /// The preferences singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn preferences(&self) -> Result<UserPreferences> {
        let body = self.storage.with(|s| s.preferences_body())?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Apply a partial update to the preferences singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub fn update_preferences(&self, patch: PreferencesPatch) -> Result<UserPreferences> {
        self.storage.with(|s| {
            let mut prefs: UserPreferences = serde_json::from_str(&s.preferences_body()?)?;
            prefs.apply(patch);
            s.set_preferences_body(&serde_json::to_string(&prefs)?)?;
            info!("Updated user preferences");
            Ok(prefs)
        })
    }
}

/// Trim a required text field, rejecting blank values.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Absent fields fall back to `None` through `#[serde(default)]`; a present
/// field, including `null`, becomes `Some(..)`.
pub(crate) fn double_option<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
