//! `safestep` - trip lifecycle management for a step-by-step mobility assistant
//!
//! This library owns trips from start to finish (with a single active trip at
//! any time), the saved destinations and family contacts around them, and the
//! user's accessibility preferences. Everything is reachable through an
//! HTTP-shaped request boundary, served locally or over a Unix socket.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod guidance;
pub mod ipc;
pub mod lifecycle;
pub mod logging;
pub mod queries;
pub mod seed;
pub mod storage;
pub mod trip;

pub use api::{ApiRequest, ApiResponse, Dispatcher, Method, Services};
pub use config::Config;
pub use entities::EntityStore;
pub use error::{Error, Result};
pub use lifecycle::TripManager;
pub use logging::init_logging;
pub use queries::TripQueries;
pub use storage::{Storage, StorageHandle, StorageStats};
pub use trip::{DestinationType, NewTrip, Trip, TripStatus};
