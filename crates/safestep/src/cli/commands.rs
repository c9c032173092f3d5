//! CLI command definitions.
//!
//! Every data command maps onto one boundary request through `to_request`, so
//! the CLI exercises exactly the same routes as a daemon client.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};

use crate::api::{ApiRequest, Method};
use crate::entities::{
    DestinationPatch, FamilyContactPatch, NewDestination, NewFamilyContact, PreferencesPatch,
    TextSize,
};
use crate::error::{Error, Result};
use crate::trip::{DestinationType, NewTrip};

/// Trip commands.
#[derive(Debug, Subcommand)]
pub enum TripCommand {
    /// Start a trip
    Start {
        /// Where you are going
        destination: String,

        /// Kind of place
        #[arg(short = 't', long = "type", value_enum, default_value = "other")]
        destination_type: DestinationTypeArg,

        /// Turn off safe-route mode for this trip
        #[arg(long)]
        no_safe_route: bool,

        /// Number of guidance steps
        #[arg(short, long)]
        steps: Option<u32>,
    },

    /// Show the trip in progress
    Active,

    /// Show finished trips, newest first
    History {
        /// Maximum number of trips
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one trip
    Show {
        /// Trip id
        id: String,
    },

    /// Show the guidance steps of a trip
    Steps {
        /// Trip id
        id: String,
    },

    /// Record progress explicitly
    Advance {
        /// Trip id
        id: String,

        /// Completion percentage (0-100)
        #[arg(short, long)]
        progress: u32,

        /// Current step index
        #[arg(short, long)]
        step: u32,
    },

    /// Move to the next guidance step
    Next {
        /// Trip id
        id: String,
    },

    /// Finish a trip
    Complete {
        /// Trip id
        id: String,

        /// How the trip felt
        #[arg(short, long, value_enum)]
        feeling: Option<FeelingArg>,
    },

    /// Cancel a trip
    Cancel {
        /// Trip id
        id: String,
    },

    /// Finish the active trip with feedback
    Feedback {
        /// How the trip felt
        #[arg(value_enum)]
        feeling: FeelingArg,
    },
}

/// Destination commands.
#[derive(Debug, Subcommand)]
pub enum DestinationCommand {
    /// List saved destinations
    List,

    /// Recently visited destinations
    Recent {
        /// Maximum number of destinations
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Favorite destinations
    Favorites,

    /// Save a destination
    Add {
        /// Display name
        name: String,

        /// Street address
        address: String,

        /// Kind of place
        #[arg(short = 't', long = "type", value_enum, default_value = "other")]
        destination_type: DestinationTypeArg,

        /// Mark as favorite
        #[arg(short, long)]
        favorite: bool,
    },

    /// Show one destination
    Show {
        /// Destination id
        id: String,
    },

    /// Change fields of a destination
    Update(DestinationUpdate),

    /// Toggle the favorite flag
    Favorite {
        /// Destination id
        id: String,
    },

    /// Delete a destination
    Remove {
        /// Destination id
        id: String,
    },
}

/// Fields to change on a destination.
#[derive(Debug, Args)]
pub struct DestinationUpdate {
    /// Destination id
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New address
    #[arg(long)]
    pub address: Option<String>,

    /// New kind of place
    #[arg(short = 't', long = "type", value_enum)]
    pub destination_type: Option<DestinationTypeArg>,

    /// Favorite flag
    #[arg(long)]
    pub favorite: Option<bool>,

    /// Visit count
    #[arg(long)]
    pub visits: Option<u32>,

    /// Record a visit now
    #[arg(long, conflicts_with = "clear_visited")]
    pub visited_now: bool,

    /// Forget the last visit
    #[arg(long)]
    pub clear_visited: bool,
}

/// Family contact commands.
#[derive(Debug, Subcommand)]
pub enum ContactCommand {
    /// List family contacts
    List,

    /// Add a family contact
    Add {
        /// Full name
        name: String,

        /// Phone number
        phone: String,

        /// Relationship to you
        #[arg(short, long, default_value = "")]
        relationship: String,

        /// Primary contact
        #[arg(long)]
        primary: bool,

        /// Share trips with this contact
        #[arg(long)]
        family_link: bool,
    },

    /// Show one contact
    Show {
        /// Contact id
        id: String,
    },

    /// Change fields of a contact
    Update(ContactUpdate),

    /// Delete a contact
    Remove {
        /// Contact id
        id: String,
    },
}

/// Fields to change on a contact.
#[derive(Debug, Args)]
pub struct ContactUpdate {
    /// Contact id
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// New relationship
    #[arg(long)]
    pub relationship: Option<String>,

    /// Primary flag
    #[arg(long)]
    pub primary: Option<bool>,

    /// Family link flag
    #[arg(long)]
    pub family_link: Option<bool>,
}

/// Preference commands.
#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show preferences
    Show,

    /// Change preferences
    Set {
        /// Safe-route mode
        #[arg(long)]
        safe_route: Option<bool>,

        /// Spoken guidance
        #[arg(long)]
        voice: Option<bool>,

        /// Text size
        #[arg(long, value_enum)]
        text_size: Option<TextSizeArg>,

        /// High-contrast display
        #[arg(long)]
        high_contrast: Option<bool>,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Raw request to a running daemon.
#[derive(Debug, Args)]
pub struct SendCommand {
    /// Request method (GET, POST, PATCH, DELETE)
    pub method: String,

    /// Request path, e.g. /api/trips/active
    pub path: String,

    /// JSON body
    pub body: Option<String>,
}

/// Daemon management commands.
#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Serve requests on the Unix socket until interrupted
    Start,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Destination type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DestinationTypeArg {
    /// Pharmacy
    Pharmacy,
    /// Hospital or clinic
    Hospital,
    /// Home
    Home,
    /// Grocery store
    Grocery,
    /// A friend's place
    Friend,
    /// Anything else
    Other,
}

impl From<DestinationTypeArg> for DestinationType {
    fn from(arg: DestinationTypeArg) -> Self {
        match arg {
            DestinationTypeArg::Pharmacy => Self::Pharmacy,
            DestinationTypeArg::Hospital => Self::Hospital,
            DestinationTypeArg::Home => Self::Home,
            DestinationTypeArg::Grocery => Self::Grocery,
            DestinationTypeArg::Friend => Self::Friend,
            DestinationTypeArg::Other => Self::Other,
        }
    }
}

/// Text size argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TextSizeArg {
    /// Standard text
    Medium,
    /// Large text
    Large,
    /// Largest text
    ExtraLarge,
}

impl From<TextSizeArg> for TextSize {
    fn from(arg: TextSizeArg) -> Self {
        match arg {
            TextSizeArg::Medium => Self::Medium,
            TextSizeArg::Large => Self::Large,
            TextSizeArg::ExtraLarge => Self::ExtraLarge,
        }
    }
}

/// Trip feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeelingArg {
    /// The trip felt fine
    Comfortable,
    /// The trip felt unsafe or stressful
    Uncomfortable,
}

impl FeelingArg {
    /// Feedback value sent with the request.
    #[must_use]
    pub fn was_comfortable(self) -> bool {
        self == Self::Comfortable
    }
}

fn with_limit(path: &str, limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("{path}?limit={limit}"),
        None => path.to_string(),
    }
}

impl TripCommand {
    /// The boundary request for this command.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn to_request(&self) -> Result<ApiRequest> {
        let request = match self {
            Self::Start {
                destination,
                destination_type,
                no_safe_route,
                steps,
            } => {
                let new = NewTrip {
                    safe_route_enabled: Some(!no_safe_route),
                    total_steps: *steps,
                    ..NewTrip::new(destination.clone(), (*destination_type).into())
                };
                ApiRequest::new(Method::Post, "/api/trips").with_body(serde_json::to_value(new)?)
            }
            Self::Active => ApiRequest::new(Method::Get, "/api/trips/active"),
            Self::History { limit } => {
                ApiRequest::new(Method::Get, with_limit("/api/trips/history", *limit))
            }
            Self::Show { id } => ApiRequest::new(Method::Get, format!("/api/trips/{id}")),
            Self::Steps { id } => ApiRequest::new(Method::Get, format!("/api/trips/{id}/steps")),
            Self::Advance { id, progress, step } => {
                ApiRequest::new(Method::Patch, format!("/api/trips/{id}/progress"))
                    .with_body(json!({ "progress": progress, "currentStep": step }))
            }
            Self::Next { id } => {
                ApiRequest::new(Method::Post, format!("/api/trips/{id}/next-step"))
            }
            Self::Complete { id, feeling } => {
                let body = match feeling {
                    Some(f) => json!({ "wasComfortable": f.was_comfortable() }),
                    None => json!({}),
                };
                ApiRequest::new(Method::Post, format!("/api/trips/{id}/complete")).with_body(body)
            }
            Self::Cancel { id } => ApiRequest::new(Method::Post, format!("/api/trips/{id}/cancel")),
            Self::Feedback { feeling } => ApiRequest::new(Method::Post, "/api/trips/feedback")
                .with_body(json!({ "wasComfortable": feeling.was_comfortable() })),
        };
        Ok(request)
    }
}

impl DestinationCommand {
    /// The boundary request for this command.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn to_request(&self) -> Result<ApiRequest> {
        let request = match self {
            Self::List => ApiRequest::new(Method::Get, "/api/destinations"),
            Self::Recent { limit } => {
                ApiRequest::new(Method::Get, with_limit("/api/destinations/recent", *limit))
            }
            Self::Favorites => ApiRequest::new(Method::Get, "/api/destinations/favorites"),
            Self::Add {
                name,
                address,
                destination_type,
                favorite,
            } => {
                let new = NewDestination {
                    name: name.clone(),
                    address: address.clone(),
                    destination_type: (*destination_type).into(),
                    is_favorite: Some(*favorite),
                };
                ApiRequest::new(Method::Post, "/api/destinations")
                    .with_body(serde_json::to_value(new)?)
            }
            Self::Show { id } => ApiRequest::new(Method::Get, format!("/api/destinations/{id}")),
            Self::Update(update) => {
                let last_visited = if update.visited_now {
                    Some(Some(Utc::now()))
                } else if update.clear_visited {
                    Some(None)
                } else {
                    None
                };
                let patch = DestinationPatch {
                    name: update.name.clone(),
                    address: update.address.clone(),
                    destination_type: update.destination_type.map(Into::into),
                    is_favorite: update.favorite,
                    visit_count: update.visits,
                    last_visited,
                };
                ApiRequest::new(Method::Patch, format!("/api/destinations/{}", update.id))
                    .with_body(serde_json::to_value(patch)?)
            }
            Self::Favorite { id } => ApiRequest::new(
                Method::Post,
                format!("/api/destinations/{id}/toggle-favorite"),
            ),
            Self::Remove { id } => {
                ApiRequest::new(Method::Delete, format!("/api/destinations/{id}"))
            }
        };
        Ok(request)
    }
}

impl ContactCommand {
    /// The boundary request for this command.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn to_request(&self) -> Result<ApiRequest> {
        let request = match self {
            Self::List => ApiRequest::new(Method::Get, "/api/family-contacts"),
            Self::Add {
                name,
                phone,
                relationship,
                primary,
                family_link,
            } => {
                let new = NewFamilyContact {
                    name: name.clone(),
                    phone_number: phone.clone(),
                    relationship: relationship.clone(),
                    is_primary: Some(*primary),
                    family_link_enabled: Some(*family_link),
                };
                ApiRequest::new(Method::Post, "/api/family-contacts")
                    .with_body(serde_json::to_value(new)?)
            }
            Self::Show { id } => ApiRequest::new(Method::Get, format!("/api/family-contacts/{id}")),
            Self::Update(update) => {
                let patch = FamilyContactPatch {
                    name: update.name.clone(),
                    phone_number: update.phone.clone(),
                    relationship: update.relationship.clone(),
                    is_primary: update.primary,
                    family_link_enabled: update.family_link,
                };
                ApiRequest::new(Method::Patch, format!("/api/family-contacts/{}", update.id))
                    .with_body(serde_json::to_value(patch)?)
            }
            Self::Remove { id } => {
                ApiRequest::new(Method::Delete, format!("/api/family-contacts/{id}"))
            }
        };
        Ok(request)
    }
}

impl PrefsCommand {
    /// The boundary request for this command.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `set` changes nothing, or an error if
    /// the body cannot be serialized.
    pub fn to_request(&self) -> Result<ApiRequest> {
        let request = match self {
            Self::Show => ApiRequest::new(Method::Get, "/api/preferences"),
            Self::Set {
                safe_route,
                voice,
                text_size,
                high_contrast,
            } => {
                let patch = PreferencesPatch {
                    safe_route_mode: *safe_route,
                    voice_guidance_enabled: *voice,
                    text_size: text_size.map(Into::into),
                    high_contrast_mode: *high_contrast,
                };
                if patch.is_empty() {
                    return Err(Error::validation("nothing to change; pass at least one option"));
                }
                ApiRequest::new(Method::Patch, "/api/preferences")
                    .with_body(serde_json::to_value(patch)?)
            }
        };
        Ok(request)
    }
}

impl SendCommand {
    /// The request described by the raw arguments.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown method or a body that is not
    /// valid JSON.
    pub fn to_request(&self) -> Result<ApiRequest> {
        let method = Method::parse(&self.method)
            .ok_or_else(|| Error::validation(format!("unknown method: {}", self.method)))?;
        let mut request = ApiRequest::new(method, self.path.clone());
        if let Some(body) = &self.body {
            let value: Value = serde_json::from_str(body)
                .map_err(|e| Error::validation(format!("body is not valid JSON: {e}")))?;
            request = request.with_body(value);
        }
        Ok(request)
    }
}
