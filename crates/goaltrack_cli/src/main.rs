//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `goaltrack_core` linkage without the Flutter/FFI runtime.
//! - Drive one stop/clear cycle against an in-memory DB and print the
//!   resulting state, keeping output deterministic.

use goaltrack_core::db::open_db_in_memory;
use goaltrack_core::{GoalTracker, SqliteNightRepository, TrackerSnapshot};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("goaltrack_core ping={}", goaltrack_core::ping());
    println!("goaltrack_core version={}", goaltrack_core::core_version());

    match run_cycle() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("goaltrack_cli smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_cycle() -> Result<(), Box<dyn Error>> {
    let repo = SqliteNightRepository::try_new(open_db_in_memory()?)?;
    let mut tracker = GoalTracker::new(repo);

    tracker.initialize()?;
    print_state("init", &tracker.snapshot());

    tracker.on_stop_tracking("sleep", "read", "none", 2)?;
    print_state("stop", &tracker.snapshot());

    let deleted = tracker.on_clear()?;
    println!("clear deleted={deleted}");
    print_state("clear", &tracker.snapshot());

    tracker.done_showing_snackbar();
    print_state("dismiss", &tracker.snapshot());
    Ok(())
}

fn print_state(step: &str, snapshot: &TrackerSnapshot) {
    println!(
        "{step} tonight={} nights={} start={} stop={} clear={} snackbar={}",
        snapshot
            .tonight
            .as_ref()
            .map_or_else(|| "none".to_string(), |night| night.night_id.to_string()),
        snapshot.nights.as_ref().map_or(0, Vec::len),
        snapshot.start_visible,
        snapshot.stop_visible,
        snapshot
            .clear_visible
            .map_or_else(|| "unknown".to_string(), |value| value.to_string()),
        snapshot.show_snackbar
    );
}
