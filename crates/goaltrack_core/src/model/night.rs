//! Goal night domain model.
//!
//! # Responsibility
//! - Define the record holding one tracked day: three goals plus the number
//!   of goals achieved.
//! - Provide defaults matching a freshly started, not yet evaluated day.
//!
//! # Invariants
//! - `night_id` is `0` until the store assigns one on insert.
//! - `created_at` is fixed at construction and never rewritten.
//! - `num_achieved` is `NOT_EVALUATED` (-1) or a non-negative count. Callers
//!   own that contract; no layer rejects other values.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned row identifier.
pub type NightId = i64;

/// Sentinel count meaning the day has not been evaluated yet.
pub const NOT_EVALUATED: i32 = -1;

/// Identifier carried by records that were never inserted.
pub const UNSAVED_NIGHT_ID: NightId = 0;

/// Validation errors for goal night records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightValidationError {
    /// Creation timestamp is negative.
    InvalidCreatedAt(i64),
}

impl Display for NightValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreatedAt(value) => {
                write!(f, "created_at must be non-negative epoch ms, got {value}")
            }
        }
    }
}

impl Error for NightValidationError {}

/// One tracked day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalNight {
    pub night_id: NightId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub goal_1: Option<String>,
    pub goal_2: Option<String>,
    pub goal_3: Option<String>,
    pub num_achieved: i32,
}

impl GoalNight {
    /// Creates an unsaved, not yet evaluated record stamped with the
    /// current wall-clock time.
    pub fn new() -> Self {
        Self::with_created_at(now_epoch_ms())
    }

    /// Creates an unsaved record with a caller-provided creation time.
    pub fn with_created_at(created_at: i64) -> Self {
        Self {
            night_id: UNSAVED_NIGHT_ID,
            created_at,
            goal_1: None,
            goal_2: None,
            goal_3: None,
            num_achieved: NOT_EVALUATED,
        }
    }

    /// Overwrites the three goals and the achieved count.
    ///
    /// Any count is accepted as-is.
    pub fn set_goals(
        &mut self,
        goal_1: impl Into<String>,
        goal_2: impl Into<String>,
        goal_3: impl Into<String>,
        num_achieved: i32,
    ) {
        self.goal_1 = Some(goal_1.into());
        self.goal_2 = Some(goal_2.into());
        self.goal_3 = Some(goal_3.into());
        self.num_achieved = num_achieved;
    }

    /// Returns whether an achieved count has been recorded.
    pub fn is_evaluated(&self) -> bool {
        self.num_achieved >= 0
    }

    /// Returns whether the store has assigned an identifier.
    pub fn is_saved(&self) -> bool {
        self.night_id != UNSAVED_NIGHT_ID
    }

    /// Validates record invariants.
    pub fn validate(&self) -> Result<(), NightValidationError> {
        if self.created_at < 0 {
            return Err(NightValidationError::InvalidCreatedAt(self.created_at));
        }
        Ok(())
    }
}

impl Default for GoalNight {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
