//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the goal tracker actions and observable state to Dart via FRB.
//! - Own the process-wide tracker instance and its database connection.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Tracker actions are serialized by one mutex; a second stop waits for
//!   the first to finish instead of racing it.
//! - The tracker is published only after it has loaded tonight from storage,
//!   whichever call happens to create it.

use goaltrack_core::db::open_db;
use goaltrack_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    GoalNight, GoalTracker, SqliteNightRepository, TrackerSnapshot,
};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

const TRACKER_DB_FILE_NAME: &str = "goaltrack.sqlite3";
static TRACKER_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static TRACKER: Mutex<Option<GoalTracker<SqliteNightRepository>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One history row for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightItem {
    pub night_id: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub goal_1: Option<String>,
    pub goal_2: Option<String>,
    pub goal_3: Option<String>,
    /// `-1` when not evaluated yet.
    pub num_achieved: i32,
}

impl From<GoalNight> for NightItem {
    fn from(night: GoalNight) -> Self {
        Self {
            night_id: night.night_id,
            created_at: night.created_at,
            goal_1: night.goal_1,
            goal_2: night.goal_2,
            goal_3: night.goal_3,
            num_achieved: night.num_achieved,
        }
    }
}

/// Observable tracker state for button visibility and snackbar handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStateResponse {
    pub ok: bool,
    pub tonight: Option<NightItem>,
    /// `None` when the state could not be read.
    pub start_visible: Option<bool>,
    /// `None` when the state could not be read.
    pub stop_visible: Option<bool>,
    /// `None` until the history has been loaded or when it could not be read.
    pub clear_visible: Option<bool>,
    pub show_snackbar: bool,
    /// Empty on success, error details otherwise.
    pub message: String,
}

impl TrackerStateResponse {
    fn from_snapshot(snapshot: TrackerSnapshot) -> Self {
        Self {
            ok: true,
            tonight: snapshot.tonight.map(NightItem::from),
            start_visible: Some(snapshot.start_visible),
            stop_visible: Some(snapshot.stop_visible),
            clear_visible: snapshot.clear_visible,
            show_snackbar: snapshot.show_snackbar,
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            tonight: None,
            start_visible: None,
            stop_visible: None,
            clear_visible: None,
            show_snackbar: false,
            message: message.into(),
        }
    }
}

/// Result envelope for mutating tracker actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerActionResponse {
    pub ok: bool,
    /// Affected record id, when the action targets one record.
    pub night_id: Option<i64>,
    pub message: String,
}

impl TrackerActionResponse {
    fn success(message: impl Into<String>, night_id: Option<i64>) -> Self {
        Self {
            ok: true,
            night_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            night_id: None,
            message: message.into(),
        }
    }
}

/// Opens storage and loads tonight plus history.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Idempotent: later calls re-read storage into the existing tracker.
/// - Optional: any other tracker call loads storage on first use too.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_init() -> TrackerStateResponse {
    match with_tracker(|tracker| {
        tracker.initialize().map_err(|err| err.to_string())?;
        Ok(tracker.snapshot())
    }) {
        Ok(snapshot) => TrackerStateResponse::from_snapshot(snapshot),
        Err(err) => TrackerStateResponse::failure(format!("tracker_init failed: {err}")),
    }
}

/// Returns the current observable state without touching storage.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_state() -> TrackerStateResponse {
    match with_tracker(|tracker| Ok(tracker.snapshot())) {
        Ok(snapshot) => TrackerStateResponse::from_snapshot(snapshot),
        Err(err) => TrackerStateResponse::failure(format!("tracker_state failed: {err}")),
    }
}

/// Records tonight's goals and achieved count.
///
/// # FFI contract
/// - Goals and count are stored as given.
/// - Returns the id of the inserted or updated record.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_stop(
    goal_1: String,
    goal_2: String,
    goal_3: String,
    num_achieved: i32,
) -> TrackerActionResponse {
    match with_tracker(|tracker| {
        tracker
            .on_stop_tracking(goal_1, goal_2, goal_3, num_achieved)
            .map_err(|err| err.to_string())
    }) {
        Ok(night) => TrackerActionResponse::success("Goals saved.", Some(night.night_id)),
        Err(err) => TrackerActionResponse::failure(format!("tracker_stop failed: {err}")),
    }
}

/// Deletes all history. The snackbar flag is raised even on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_clear() -> TrackerActionResponse {
    match with_tracker(|tracker| tracker.on_clear().map_err(|err| err.to_string())) {
        Ok(deleted) => TrackerActionResponse::success(format!("Cleared {deleted} night(s)."), None),
        Err(err) => TrackerActionResponse::failure(format!("tracker_clear failed: {err}")),
    }
}

/// Acknowledges the snackbar so it is not shown again (e.g. on rotation).
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_done_showing_snackbar() -> TrackerActionResponse {
    match with_tracker(|tracker| {
        tracker.done_showing_snackbar();
        Ok(())
    }) {
        Ok(()) => TrackerActionResponse::success("Snackbar dismissed.", None),
        Err(err) => TrackerActionResponse::failure(format!(
            "tracker_done_showing_snackbar failed: {err}"
        )),
    }
}

/// Returns the loaded goal history, newest first.
///
/// Empty before `tracker_init` has loaded anything.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_history() -> Vec<NightItem> {
    match with_tracker(|tracker| Ok(tracker.nights().unwrap_or_default())) {
        Ok(nights) => nights.into_iter().map(NightItem::from).collect(),
        Err(err) => {
            warn!("event=tracker_history module=ffi status=error error={err}");
            Vec::new()
        }
    }
}

fn resolve_tracker_db_path() -> PathBuf {
    TRACKER_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("GOALTRACK_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(TRACKER_DB_FILE_NAME)
        })
        .clone()
}

fn lock_tracker() -> MutexGuard<'static, Option<GoalTracker<SqliteNightRepository>>> {
    // A panic while holding the lock leaves plain data behind; keep serving.
    TRACKER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_tracker<T>(
    f: impl FnOnce(&mut GoalTracker<SqliteNightRepository>) -> Result<T, String>,
) -> Result<T, String> {
    let mut guard = lock_tracker();
    if guard.is_none() {
        *guard = Some(open_tracker(&resolve_tracker_db_path())?);
    }
    match guard.as_mut() {
        Some(tracker) => f(tracker),
        None => Err("tracker unavailable".to_string()),
    }
}

fn open_tracker(db_path: &Path) -> Result<GoalTracker<SqliteNightRepository>, String> {
    let conn = open_db(db_path).map_err(|err| format!("tracker DB open failed: {err}"))?;
    let repo = SqliteNightRepository::try_new(conn)
        .map_err(|err| format!("tracker repo init failed: {err}"))?;
    let mut tracker = GoalTracker::new(repo);
    tracker
        .initialize()
        .map_err(|err| format!("tracker load failed: {err}"))?;
    Ok(tracker)
}
