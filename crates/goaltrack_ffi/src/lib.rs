//! Flutter-facing bindings for GoalTrack core.

pub mod api;
