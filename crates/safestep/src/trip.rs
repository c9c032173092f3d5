//! Core trip types for safestep.
//!
//! A [`Trip`] is one navigation session. Its status only ever moves through
//! [`TripStatus::transition`], which is the single place that decides whether an
//! action is legal; the methods on [`Trip`] apply the field effects of each
//! transition. Nothing here touches storage.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TripConfig;
use crate::error::{Error, Result};

/// Number of steps a trip gets when the caller does not say.
pub const DEFAULT_TOTAL_STEPS: u32 = 5;

/// Largest step count a trip may ask for unless configured otherwise.
pub const MAX_TOTAL_STEPS: u32 = 100;

/// Upper bound of the progress percentage.
pub const MAX_PROGRESS: u32 = 100;

/// Lifecycle status of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    /// The traveller is on the way.
    InProgress,
    /// The traveller arrived. Terminal.
    Completed,
    /// The trip was abandoned. Terminal.
    Cancelled,
}

/// An operation that may change a trip's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripAction {
    /// Record progress along the route.
    Advance,
    /// Finish the trip.
    Complete,
    /// Abandon the trip.
    Cancel,
}

impl TripAction {
    /// Verb used in error messages.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl TripStatus {
    /// Status reached by applying `action`, or `None` if the action is not
    /// permitted from this status.
    #[must_use]
    pub fn transition(self, action: TripAction) -> Option<Self> {
        match (self, action) {
            (Self::InProgress, TripAction::Advance) => Some(Self::InProgress),
            (Self::InProgress, TripAction::Complete) => Some(Self::Completed),
            (Self::InProgress, TripAction::Cancel) => Some(Self::Cancelled),
            (Self::Completed | Self::Cancelled, _) => None,
        }
    }

    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of place a trip (or saved destination) leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    /// A pharmacy.
    Pharmacy,
    /// A hospital or clinic.
    Hospital,
    /// The traveller's home.
    Home,
    /// A grocery store.
    Grocery,
    /// A friend's place.
    Friend,
    /// Anything else.
    Other,
}

impl DestinationType {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pharmacy => "pharmacy",
            Self::Hospital => "hospital",
            Self::Home => "home",
            Self::Grocery => "grocery",
            Self::Friend => "friend",
            Self::Other => "other",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pharmacy" => Some(Self::Pharmacy),
            "hospital" => Some(Self::Hospital),
            "home" => Some(Self::Home),
            "grocery" => Some(Self::Grocery),
            "friend" => Some(Self::Friend),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for starting a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTrip {
    /// Where the traveller is going.
    pub destination: String,
    /// What kind of place it is.
    pub destination_type: DestinationType,
    /// Prefer well-lit, low-traffic routes. Defaults to `true`.
    #[serde(default)]
    pub safe_route_enabled: Option<bool>,
    /// Number of guidance steps. Defaults to the configured step count.
    #[serde(default)]
    pub total_steps: Option<u32>,
}

impl NewTrip {
    /// Payload with only the required fields set.
    #[must_use]
    pub fn new(destination: impl Into<String>, destination_type: DestinationType) -> Self {
        Self {
            destination: destination.into(),
            destination_type,
            safe_route_enabled: None,
            total_steps: None,
        }
    }
}

/// A single navigation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Opaque identifier assigned at creation.
    pub id: String,
    /// Where the traveller is going.
    pub destination: String,
    /// What kind of place it is.
    pub destination_type: DestinationType,
    /// Current lifecycle status.
    pub status: TripStatus,
    /// When the trip started.
    pub start_time: DateTime<Utc>,
    /// When the trip reached a terminal status.
    pub end_time: Option<DateTime<Utc>>,
    /// Completion percentage, 0 to 100.
    pub progress: u32,
    /// Index of the guidance step the traveller is on.
    pub current_step: u32,
    /// Number of guidance steps on the route.
    pub total_steps: u32,
    /// Traveller feedback given on completion.
    pub was_comfortable: Option<bool>,
    /// Whether safe-route mode was on for this trip.
    pub safe_route_enabled: bool,
}

impl Trip {
    /// Build a fresh in-progress trip from a start request.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the destination is blank or the step
    /// count is zero or above `config.max_total_steps`.
    pub fn start(
        id: String,
        new: NewTrip,
        config: &TripConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let destination = new.destination.trim();
        if destination.is_empty() {
            return Err(Error::validation("destination must not be empty"));
        }

        let total_steps = new.total_steps.unwrap_or(config.default_total_steps);
        if total_steps == 0 {
            return Err(Error::validation("totalSteps must be at least 1"));
        }
        if total_steps > config.max_total_steps {
            return Err(Error::validation(format!(
                "totalSteps must be at most {}, got {total_steps}",
                config.max_total_steps
            )));
        }

        Ok(Self {
            id,
            destination: destination.to_string(),
            destination_type: new.destination_type,
            status: TripStatus::InProgress,
            start_time: now,
            end_time: None,
            progress: 0,
            current_step: 0,
            total_steps,
            was_comfortable: None,
            safe_route_enabled: new.safe_route_enabled.unwrap_or(true),
        })
    }

    /// Whether this trip is the active one.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TripStatus::InProgress
    }

    /// Record progress along the route.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the trip is no longer in progress, if
    /// either value would move backwards, or if a value is out of range. The
    /// trip is left untouched on error.
    pub fn advance(&mut self, progress: u32, current_step: u32) -> Result<()> {
        if self.status.transition(TripAction::Advance).is_none() {
            return Err(Error::validation(format!(
                "trip {} is {}; progress can only change while in progress",
                self.id, self.status
            )));
        }
        if progress > MAX_PROGRESS {
            return Err(Error::validation(format!(
                "progress must be between 0 and {MAX_PROGRESS}, got {progress}"
            )));
        }
        if progress < self.progress {
            return Err(Error::validation(format!(
                "progress cannot decrease (stored {}, got {progress})",
                self.progress
            )));
        }
        if current_step < self.current_step {
            return Err(Error::validation(format!(
                "currentStep cannot decrease (stored {}, got {current_step})",
                self.current_step
            )));
        }
        if current_step > self.total_steps {
            return Err(Error::validation(format!(
                "currentStep {current_step} exceeds totalSteps {}",
                self.total_steps
            )));
        }

        self.progress = progress;
        self.current_step = current_step;
        Ok(())
    }

    /// Finish the trip.
    ///
    /// Forces progress to 100 and records feedback when given.
    ///
    /// # Errors
    ///
    /// Returns an invalid-transition error if the trip is already terminal.
    pub fn complete(&mut self, was_comfortable: Option<bool>, now: DateTime<Utc>) -> Result<()> {
        self.status = self.next_status(TripAction::Complete)?;
        self.end_time = Some(now);
        self.progress = MAX_PROGRESS;
        if self.was_comfortable.is_none() {
            self.was_comfortable = was_comfortable;
        }
        Ok(())
    }

    /// Abandon the trip, keeping progress where it was.
    ///
    /// # Errors
    ///
    /// Returns an invalid-transition error if the trip is already terminal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.next_status(TripAction::Cancel)?;
        self.end_time = Some(now);
        Ok(())
    }

    fn next_status(&self, action: TripAction) -> Result<TripStatus> {
        self.status
            .transition(action)
            .ok_or_else(|| Error::InvalidTransition {
                id: self.id.clone(),
                status: self.status,
                action: action.verb(),
            })
    }
}
