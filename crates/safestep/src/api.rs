//! Request/response boundary.
//!
//! Requests are HTTP-shaped: a method, a path with an optional query string,
//! and an optional JSON body. [`Dispatcher::handle`] matches the route, decodes
//! the body into a typed payload, calls one service operation and turns the
//! outcome into an [`ApiResponse`]. Errors become a status code plus an
//! `{"error", "kind"}` body; nothing is written when decoding fails.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::TripConfig;
use crate::entities::{
    Destination, DestinationFilter, DestinationPatch, EntityStore, FamilyContact,
    FamilyContactPatch, NewDestination, NewFamilyContact, PreferencesPatch,
};
use crate::error::{Error, Result};
use crate::lifecycle::TripManager;
use crate::queries::TripQueries;
use crate::storage::StorageHandle;
use crate::trip::NewTrip;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read.
    Get,
    /// Create or act.
    Post,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
}

impl Method {
    /// Upper-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parse a method name, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Request method.
    pub method: Method,
    /// Path, optionally with a `?limit=N` query.
    pub path: String,
    /// JSON payload for creating and updating routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request without a body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The boundary's answer to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// The result, or `{"error", "kind"}` on failure.
    pub body: Value,
}

impl ApiResponse {
    /// A 200 response.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// The response for a failed operation.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        let category = err.category();
        Self {
            status: category.status_code(),
            body: json!({
                "error": err.to_string(),
                "kind": category.as_str(),
            }),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The error message of a failed response, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// The three services over one storage handle.
#[derive(Debug, Clone)]
pub struct Services {
    /// Trip lifecycle operations.
    pub trips: TripManager,
    /// Read-only trip views.
    pub queries: TripQueries,
    /// Destinations, contacts and preferences.
    pub entities: EntityStore,
}

impl Services {
    /// Build every service over the same storage.
    #[must_use]
    pub fn new(storage: StorageHandle, config: TripConfig) -> Self {
        Self {
            trips: TripManager::new(storage.clone(), config),
            queries: TripQueries::new(storage.clone()),
            entities: EntityStore::new(storage),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProgressBody {
    progress: u32,
    current_step: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CompleteBody {
    #[serde(default)]
    was_comfortable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FeedbackBody {
    was_comfortable: bool,
}

/// Routes requests to service operations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    services: Services,
    config: TripConfig,
}

impl Dispatcher {
    /// Create a dispatcher over shared storage.
    #[must_use]
    pub fn new(storage: StorageHandle, config: &TripConfig) -> Self {
        Self {
            services: Services::new(storage, config.clone()),
            config: config.clone(),
        }
    }

    /// The services this dispatcher calls.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Handle one request.
    #[must_use]
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let response = match self.route(request) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => {
                if e.status_code() >= 500 {
                    error!("{} {} failed: {}", request.method, request.path, e);
                }
                ApiResponse::from_error(&e)
            }
        };
        debug!("{} {} -> {}", request.method, request.path, response.status);
        response
    }

    fn route(&self, request: &ApiRequest) -> Result<Value> {
        let (path, query) = split_query(&request.path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let body = request.body.as_ref();
        let trips = &self.services.trips;
        let queries = &self.services.queries;
        let entities = &self.services.entities;

        match (request.method, segments.as_slice()) {
            // Trips
            (Method::Post, ["api", "trips"]) => {
                to_json(trips.start_trip(parse_body::<NewTrip>(body)?)?)
            }
            (Method::Get, ["api", "trips", "active"]) => to_json(queries.active_trip()?),
            (Method::Get, ["api", "trips", "history"]) => {
                let limit = query_limit(query)?.unwrap_or(self.config.history_limit);
                to_json(queries.history(limit)?)
            }
            (Method::Post, ["api", "trips", "feedback"]) => {
                let payload: FeedbackBody = parse_body(body)?;
                to_json(trips.submit_feedback_for_active(payload.was_comfortable)?)
            }
            (Method::Get, ["api", "trips", id]) => to_json(trips.get_trip(id)?),
            (Method::Get, ["api", "trips", id, "steps"]) => to_json(queries.route_steps(id)?),
            (Method::Patch, ["api", "trips", id, "progress"]) => {
                let payload: ProgressBody = parse_body(body)?;
                to_json(trips.advance_progress(id, payload.progress, payload.current_step)?)
            }
            (Method::Post, ["api", "trips", id, "next-step"]) => to_json(trips.next_step(id)?),
            (Method::Post, ["api", "trips", id, "complete"]) => {
                let payload: CompleteBody = parse_optional_body(body)?;
                to_json(trips.complete_trip(id, payload.was_comfortable)?)
            }
            (Method::Post, ["api", "trips", id, "cancel"]) => to_json(trips.cancel_trip(id)?),

            // Family contacts
            (Method::Get, ["api", "family-contacts"]) => to_json(entities.list::<FamilyContact>()?),
            (Method::Post, ["api", "family-contacts"]) => to_json(
                entities.create::<FamilyContact>(parse_body::<NewFamilyContact>(body)?)?,
            ),
            (Method::Get, ["api", "family-contacts", id]) => {
                to_json(entities.get::<FamilyContact>(id)?)
            }
            (Method::Patch, ["api", "family-contacts", id]) => to_json(
                entities.update::<FamilyContact>(id, parse_body::<FamilyContactPatch>(body)?)?,
            ),
            (Method::Delete, ["api", "family-contacts", id]) => {
                deleted::<FamilyContact>(entities, id)
            }

            // Destinations
            (Method::Get, ["api", "destinations"]) => {
                to_json(entities.list_destinations(DestinationFilter::All)?)
            }
            (Method::Post, ["api", "destinations"]) => to_json(
                entities.create::<Destination>(parse_body::<NewDestination>(body)?)?,
            ),
            (Method::Get, ["api", "destinations", "recent"]) => {
                let limit = query_limit(query)?.unwrap_or(self.config.recent_destinations_limit);
                to_json(entities.recent_destinations(limit)?)
            }
            (Method::Get, ["api", "destinations", "favorites"]) => {
                to_json(entities.favorite_destinations()?)
            }
            (Method::Get, ["api", "destinations", id]) => to_json(entities.get::<Destination>(id)?),
            (Method::Patch, ["api", "destinations", id]) => to_json(
                entities.update::<Destination>(id, parse_body::<DestinationPatch>(body)?)?,
            ),
            (Method::Delete, ["api", "destinations", id]) => deleted::<Destination>(entities, id),
            (Method::Post, ["api", "destinations", id, "toggle-favorite"]) => {
                to_json(entities.toggle_favorite(id)?)
            }

            // Preferences
            (Method::Get, ["api", "preferences"]) => to_json(entities.preferences()?),
            (Method::Patch, ["api", "preferences"]) => {
                to_json(entities.update_preferences(parse_body::<PreferencesPatch>(body)?)?)
            }

            _ => Err(Error::NotFound {
                message: format!("no route for {} {}", request.method, path),
            }),
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn deleted<E: crate::entities::Entity>(entities: &EntityStore, id: &str) -> Result<Value> {
    if entities.delete::<E>(id)? {
        Ok(json!({ "success": true }))
    } else {
        Err(Error::not_found(E::KIND.label(), id))
    }
}

/// Decode a required body. A missing body decodes like an empty object, so
/// the error names the first missing field.
fn parse_body<T: DeserializeOwned>(body: Option<&Value>) -> Result<T> {
    let value = body.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(value)
        .map_err(|e| Error::validation(format!("invalid request body: {e}")))
}

/// Decode a body that may be absent or null.
fn parse_optional_body<T: DeserializeOwned + Default>(body: Option<&Value>) -> Result<T> {
    match body {
        None | Some(Value::Null) => Ok(T::default()),
        Some(_) => parse_body(body),
    }
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

/// The `limit` query parameter, if present.
fn query_limit(query: Option<&str>) -> Result<Option<usize>> {
    let Some(query) = query else {
        return Ok(None);
    };
    for pair in query.split('&') {
        if let Some(("limit", value)) = pair.split_once('=') {
            return value
                .parse()
                .map(Some)
                .map_err(|_| {
                    Error::validation(format!(
                        "limit must be a non-negative integer, got {value:?}"
                    ))
                });
        }
    }
    Ok(None)
}
