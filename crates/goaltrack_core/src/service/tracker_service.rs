//! Goal tracking use-case service.
//!
//! # Responsibility
//! - Hold the in-memory "tonight" record and the observed goal history.
//! - Derive UI visibility flags from that state and publish them as signals.
//! - Run the stop and clear actions against the repository.
//!
//! # Invariants
//! - `start_visible == tonight.is_none()` and `stop_visible == tonight.is_some()`
//!   after every publish; the two flags are always complementary.
//! - `clear_visible` is `None` until the history has been loaded once.
//! - `on_clear` always raises `show_snackbar`, even when storage fails.
//! - Mutating actions take `&mut self`; the owner serializes them, so two
//!   stops can never both take the insert path.
//! - Once a write commits, the action reports success and `tonight` reflects
//!   it. Read-back and history refresh failures after that point are logged,
//!   not returned.

use crate::model::night::GoalNight;
use crate::observe::signal::Signal;
use crate::repo::night_repo::{NightRepository, RepoError};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use tokio::sync::watch;

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors from goal tracker actions.
#[derive(Debug)]
pub enum TrackerError {
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Point-in-time copy of every observable tracker value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub tonight: Option<GoalNight>,
    /// `None` until the history has been loaded.
    pub nights: Option<Vec<GoalNight>>,
    pub start_visible: bool,
    pub stop_visible: bool,
    pub clear_visible: Option<bool>,
    pub show_snackbar: bool,
}

/// Coordinator between goal history storage and a UI layer.
pub struct GoalTracker<R: NightRepository> {
    repo: R,
    tonight: Signal<Option<GoalNight>>,
    nights: Signal<Option<Vec<GoalNight>>>,
    start_visible: Signal<bool>,
    stop_visible: Signal<bool>,
    clear_visible: Signal<Option<bool>>,
    show_snackbar: Signal<bool>,
}

impl<R: NightRepository> GoalTracker<R> {
    /// Creates an idle tracker. No storage I/O happens until `initialize`.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            tonight: Signal::new(None),
            nights: Signal::new(None),
            start_visible: Signal::new(true),
            stop_visible: Signal::new(false),
            clear_visible: Signal::new(None),
            show_snackbar: Signal::new(false),
        }
    }

    /// Loads the goal history and the most recent record as "tonight".
    ///
    /// Safe to call again; it re-reads storage and republishes.
    pub fn initialize(&mut self) -> TrackerResult<()> {
        let started_at = Instant::now();
        let result = self.load_from_storage();
        log_action("tracker_init", started_at, &result);
        result
    }

    /// Current in-memory record, if any.
    pub fn tonight(&self) -> Option<GoalNight> {
        self.tonight.get()
    }

    /// Last loaded goal history, newest first. `None` before first load.
    pub fn nights(&self) -> Option<Vec<GoalNight>> {
        self.nights.get()
    }

    pub fn start_visible(&self) -> bool {
        self.start_visible.get()
    }

    pub fn stop_visible(&self) -> bool {
        self.stop_visible.get()
    }

    pub fn clear_visible(&self) -> Option<bool> {
        self.clear_visible.get()
    }

    pub fn show_snackbar(&self) -> bool {
        self.show_snackbar.get()
    }

    /// Records goals for tonight.
    ///
    /// Updates the current record in place when one exists, otherwise
    /// inserts a new record and reads it back as the new current one.
    /// Inputs are stored as given; no range or content checks apply.
    pub fn on_stop_tracking(
        &mut self,
        goal_1: impl Into<String>,
        goal_2: impl Into<String>,
        goal_3: impl Into<String>,
        num_achieved: i32,
    ) -> TrackerResult<GoalNight> {
        let started_at = Instant::now();
        let result = self.stop_tracking(
            goal_1.into(),
            goal_2.into(),
            goal_3.into(),
            num_achieved,
        );
        log_action("tracker_stop", started_at, &result);
        result
    }

    /// Deletes all history and resets tonight, then requests a snackbar.
    ///
    /// Returns the number of deleted records.
    pub fn on_clear(&mut self) -> TrackerResult<usize> {
        let started_at = Instant::now();
        let result = self.clear_history();
        self.show_snackbar.set(true);
        log_action("tracker_clear", started_at, &result);
        result
    }

    /// Acknowledges the snackbar request so it does not fire again.
    pub fn done_showing_snackbar(&self) {
        self.show_snackbar.set(false);
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            tonight: self.tonight.get(),
            nights: self.nights.get(),
            start_visible: self.start_visible.get(),
            stop_visible: self.stop_visible.get(),
            clear_visible: self.clear_visible.get(),
            show_snackbar: self.show_snackbar.get(),
        }
    }

    pub fn watch_tonight(&self) -> watch::Receiver<Option<GoalNight>> {
        self.tonight.subscribe()
    }

    pub fn watch_nights(&self) -> watch::Receiver<Option<Vec<GoalNight>>> {
        self.nights.subscribe()
    }

    pub fn watch_start_visible(&self) -> watch::Receiver<bool> {
        self.start_visible.subscribe()
    }

    pub fn watch_stop_visible(&self) -> watch::Receiver<bool> {
        self.stop_visible.subscribe()
    }

    pub fn watch_clear_visible(&self) -> watch::Receiver<Option<bool>> {
        self.clear_visible.subscribe()
    }

    pub fn watch_show_snackbar(&self) -> watch::Receiver<bool> {
        self.show_snackbar.subscribe()
    }

    /// Storage backing this tracker.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn load_from_storage(&mut self) -> TrackerResult<()> {
        self.reload_nights()?;
        let tonight = self.repo.get_tonight()?;
        self.publish_tonight(tonight);
        Ok(())
    }

    fn stop_tracking(
        &mut self,
        goal_1: String,
        goal_2: String,
        goal_3: String,
        num_achieved: i32,
    ) -> TrackerResult<GoalNight> {
        let night = match self.tonight.get() {
            Some(mut night) => {
                night.set_goals(goal_1, goal_2, goal_3, num_achieved);
                self.repo.update_night(&night)?;
                night
            }
            None => {
                let mut night = GoalNight::new();
                night.set_goals(goal_1, goal_2, goal_3, num_achieved);
                night.night_id = self.repo.insert_night(&night)?;
                self.read_back_inserted(night)
            }
        };

        self.publish_tonight(Some(night.clone()));
        self.refresh_nights_after_write("tracker_stop");
        Ok(night)
    }

    /// Re-fetches tonight after an insert, falling back to the local copy
    /// (already carrying the assigned id) so a retried stop updates it.
    fn read_back_inserted(&self, inserted: GoalNight) -> GoalNight {
        match self.repo.get_tonight() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                warn!(
                    "event=tracker_stop module=service status=degraded night_id={} error_code=read_back_missing",
                    inserted.night_id
                );
                inserted
            }
            Err(err) => {
                warn!(
                    "event=tracker_stop module=service status=degraded night_id={} error_code=read_back_failed error={err}",
                    inserted.night_id
                );
                inserted
            }
        }
    }

    fn clear_history(&mut self) -> TrackerResult<usize> {
        let deleted = self.repo.clear()?;
        self.publish_tonight(None);
        self.refresh_nights_after_write("tracker_clear");
        Ok(deleted)
    }

    fn refresh_nights_after_write(&self, event: &str) {
        if let Err(err) = self.reload_nights() {
            warn!(
                "event={event} module=service status=degraded error_code=history_reload_failed error={err}"
            );
        }
    }

    fn reload_nights(&self) -> TrackerResult<()> {
        let nights = self.repo.list_nights()?;
        self.clear_visible.set_if_changed(Some(!nights.is_empty()));
        self.nights.set(Some(nights));
        Ok(())
    }

    fn publish_tonight(&self, tonight: Option<GoalNight>) {
        let has_tonight = tonight.is_some();
        self.tonight.set(tonight);
        self.start_visible.set_if_changed(!has_tonight);
        self.stop_visible.set_if_changed(has_tonight);
    }
}

fn log_action<T>(event: &str, started_at: Instant, result: &TrackerResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=service status=error duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{GoalTracker, TrackerError};
    use crate::db::open_db_in_memory;
    use crate::model::night::{GoalNight, NightId};
    use crate::repo::night_repo::{
        NightRepository, RepoError, RepoResult, SqliteNightRepository,
    };
    use std::cell::Cell;

    /// Repository whose every call fails, for error-path coverage.
    struct FailingRepo {
        calls: Cell<u32>,
    }

    impl FailingRepo {
        fn fail(&self) -> RepoError {
            self.calls.set(self.calls.get() + 1);
            RepoError::InvalidData("storage offline".to_string())
        }
    }

    impl NightRepository for FailingRepo {
        fn insert_night(&self, _night: &GoalNight) -> RepoResult<NightId> {
            Err(self.fail())
        }
        fn update_night(&self, _night: &GoalNight) -> RepoResult<()> {
            Err(self.fail())
        }
        fn get_night(&self, _id: NightId) -> RepoResult<Option<GoalNight>> {
            Err(self.fail())
        }
        fn get_tonight(&self) -> RepoResult<Option<GoalNight>> {
            Err(self.fail())
        }
        fn list_nights(&self) -> RepoResult<Vec<GoalNight>> {
            Err(self.fail())
        }
        fn clear(&self) -> RepoResult<usize> {
            Err(self.fail())
        }
    }

    /// SQLite repository whose reads can be switched off while writes keep
    /// committing.
    struct ReadOutageRepo {
        inner: SqliteNightRepository,
        reads_down: Cell<bool>,
    }

    impl ReadOutageRepo {
        fn read_guard(&self) -> RepoResult<()> {
            if self.reads_down.get() {
                return Err(RepoError::InvalidData("read path offline".to_string()));
            }
            Ok(())
        }
    }

    impl NightRepository for ReadOutageRepo {
        fn insert_night(&self, night: &GoalNight) -> RepoResult<NightId> {
            self.inner.insert_night(night)
        }
        fn update_night(&self, night: &GoalNight) -> RepoResult<()> {
            self.inner.update_night(night)
        }
        fn get_night(&self, id: NightId) -> RepoResult<Option<GoalNight>> {
            self.read_guard()?;
            self.inner.get_night(id)
        }
        fn get_tonight(&self) -> RepoResult<Option<GoalNight>> {
            self.read_guard()?;
            self.inner.get_tonight()
        }
        fn list_nights(&self) -> RepoResult<Vec<GoalNight>> {
            self.read_guard()?;
            self.inner.list_nights()
        }
        fn clear(&self) -> RepoResult<usize> {
            self.inner.clear()
        }
    }

    fn read_outage_tracker() -> GoalTracker<ReadOutageRepo> {
        let inner = SqliteNightRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        let mut tracker = GoalTracker::new(ReadOutageRepo {
            inner,
            reads_down: Cell::new(false),
        });
        tracker.initialize().unwrap();
        tracker
    }

    fn failing_tracker() -> GoalTracker<FailingRepo> {
        GoalTracker::new(FailingRepo {
            calls: Cell::new(0),
        })
    }

    #[test]
    fn new_tracker_is_idle_with_unknown_history() {
        let tracker = failing_tracker();
        let snapshot = tracker.snapshot();

        assert_eq!(snapshot.tonight, None);
        assert_eq!(snapshot.nights, None);
        assert!(snapshot.start_visible);
        assert!(!snapshot.stop_visible);
        assert_eq!(snapshot.clear_visible, None);
        assert!(!snapshot.show_snackbar);
        assert_eq!(tracker.repository().calls.get(), 0);
    }

    #[test]
    fn stop_failure_leaves_tracker_idle() {
        let mut tracker = failing_tracker();

        let err = tracker.on_stop_tracking("a", "b", "c", 1).unwrap_err();
        assert!(matches!(err, TrackerError::Repo(RepoError::InvalidData(_))));
        assert_eq!(tracker.tonight(), None);
        assert!(tracker.start_visible());
        assert!(!tracker.stop_visible());
    }

    #[test]
    fn clear_failure_still_requests_snackbar() {
        let mut tracker = failing_tracker();

        assert!(tracker.on_clear().is_err());
        assert!(tracker.show_snackbar());

        tracker.done_showing_snackbar();
        assert!(!tracker.show_snackbar());
    }

    #[test]
    fn committed_insert_is_kept_when_read_back_fails() {
        let mut tracker = read_outage_tracker();
        tracker.repository().reads_down.set(true);

        let night = tracker
            .on_stop_tracking("sleep", "read", "none", 2)
            .expect("committed insert should report success");
        assert!(night.night_id > 0);
        assert_eq!(night.goal_1.as_deref(), Some("sleep"));
        assert_eq!(tracker.tonight(), Some(night.clone()));
        assert!(tracker.stop_visible());

        // A retry updates the same row instead of inserting another one.
        let retried = tracker.on_stop_tracking("sleep", "read", "none", 3).unwrap();
        assert_eq!(retried.night_id, night.night_id);

        tracker.repository().reads_down.set(false);
        let stored = tracker.repository().list_nights().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].night_id, night.night_id);
        assert_eq!(stored[0].num_achieved, 3);
    }

    #[test]
    fn history_reload_failure_does_not_fail_committed_writes() {
        let mut tracker = read_outage_tracker();
        let night = tracker.on_stop_tracking("a", "b", "c", 1).unwrap();
        tracker.repository().reads_down.set(true);

        let updated = tracker.on_stop_tracking("d", "e", "f", 2).unwrap();
        assert_eq!(updated.night_id, night.night_id);
        assert_eq!(tracker.tonight(), Some(updated));

        assert_eq!(tracker.on_clear().unwrap(), 1);
        assert_eq!(tracker.tonight(), None);
        assert!(tracker.start_visible());
        assert!(tracker.show_snackbar());
    }
}
