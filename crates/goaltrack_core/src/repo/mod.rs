//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract consumed by the goal tracker.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `GoalNight::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod night_repo;
