//! Observable state holders for UI bindings.
//!
//! # Responsibility
//! - Publish in-memory state so UI layers can react to changes instead of
//!   polling.
//!
//! # Invariants
//! - Subscribers always observe the latest published value.
//! - Publishing never blocks and never fails when nobody is subscribed.

pub mod signal;
