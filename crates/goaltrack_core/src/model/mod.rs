//! Domain model for daily goal tracking.
//!
//! # Responsibility
//! - Define the canonical record persisted for each tracked day.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned `NightId`.
//! - `num_achieved` is either the not-evaluated sentinel or a real count.

pub mod night;
