//! Saved destinations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::trip::DestinationType;

use super::{double_option, require_text, Entity, EntityKind};

/// A place the user travels to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Unique identifier, assigned on creation.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Kind of place.
    #[serde(rename = "type")]
    pub destination_type: DestinationType,
    /// Shown in the favorites view.
    pub is_favorite: bool,
    /// Number of recorded visits.
    pub visit_count: u32,
    /// When the user last went there, if ever.
    pub last_visited: Option<DateTime<Utc>>,
}

/// Creation payload for a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewDestination {
    /// Display name. Must not be blank.
    pub name: String,
    /// Street address. Must not be blank.
    pub address: String,
    /// Kind of place.
    #[serde(rename = "type")]
    pub destination_type: DestinationType,
    /// Defaults to `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

/// Partial update for a destination.
///
/// `last_visited` is doubly optional: `None` leaves it alone, `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DestinationPatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// New kind of place.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub destination_type: Option<DestinationType>,
    /// New favorite flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    /// New visit count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<u32>,
    /// New last visit time, or `Some(None)` to clear it.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_visited: Option<Option<DateTime<Utc>>>,
}

/// Named views over the destination list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationFilter {
    /// Every destination, in creation order.
    All,
    /// Visited destinations, most recently visited first.
    Recent {
        /// Most destinations to return.
        limit: usize,
    },
    /// Destinations marked as favorite.
    Favorites,
}

impl DestinationFilter {
    /// Apply the view to a creation-ordered list.
    #[must_use]
    pub fn apply(self, mut destinations: Vec<Destination>) -> Vec<Destination> {
        match self {
            Self::All => destinations,
            Self::Recent { limit } => {
                destinations.retain(|d| d.last_visited.is_some());
                // Stable sort keeps creation order among equal timestamps.
                destinations.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
                destinations.truncate(limit);
                destinations
            }
            Self::Favorites => {
                destinations.retain(|d| d.is_favorite);
                destinations
            }
        }
    }
}

impl Entity for Destination {
    const KIND: EntityKind = EntityKind::Destination;
    type New = NewDestination;
    type Patch = DestinationPatch;

    fn from_new(id: String, new: NewDestination) -> Result<Self> {
        Ok(Self {
            id,
            name: require_text("name", &new.name)?,
            address: require_text("address", &new.address)?,
            destination_type: new.destination_type,
            is_favorite: new.is_favorite.unwrap_or(false),
            visit_count: 0,
            last_visited: None,
        })
    }

    fn apply(&mut self, patch: DestinationPatch) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = require_text("name", &name)?;
        }
        if let Some(address) = patch.address {
            self.address = require_text("address", &address)?;
        }
        if let Some(destination_type) = patch.destination_type {
            self.destination_type = destination_type;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(visit_count) = patch.visit_count {
            self.visit_count = visit_count;
        }
        if let Some(last_visited) = patch.last_visited {
            self.last_visited = last_visited;
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}
