//! Core domain logic for GoalTrack.
//! This crate is the single source of truth for goal history invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod observe;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::night::{GoalNight, NightId, NightValidationError, NOT_EVALUATED};
pub use observe::signal::Signal;
pub use repo::night_repo::{NightRepository, RepoError, RepoResult, SqliteNightRepository};
pub use service::tracker_service::{GoalTracker, TrackerError, TrackerResult, TrackerSnapshot};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
