//! Goal night repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the storage operations consumed by the tracker: fetch-all,
//!   fetch-tonight, insert, update and clear.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `GoalNight::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - "Tonight" is the most recently inserted row, finished or not.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::night::{GoalNight, NightId, NightValidationError};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NIGHT_TABLE: &str = "goal_history_table";
const NIGHT_COLUMNS: &[&str] = &[
    "day_id",
    "timestamp",
    "goal_1",
    "goal_2",
    "goal_3",
    "num_goals_achieved",
];

const NIGHT_SELECT_SQL: &str = "SELECT
    day_id,
    timestamp,
    goal_1,
    goal_2,
    goal_3,
    num_goals_achieved
FROM goal_history_table";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for goal history persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(NightValidationError),
    Db(DbError),
    NotFound(NightId),
    InvalidData(String),
    /// Connection schema version does not match this binary.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "goal night not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted goal night: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NightValidationError> for RepoError {
    fn from(value: NightValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage operations consumed by the goal tracker.
pub trait NightRepository {
    /// Inserts a record and returns the store-assigned id.
    ///
    /// The `night_id` carried by `night` is ignored.
    fn insert_night(&self, night: &GoalNight) -> RepoResult<NightId>;
    /// Rewrites goals and achieved count of an existing record.
    fn update_night(&self, night: &GoalNight) -> RepoResult<()>;
    fn get_night(&self, id: NightId) -> RepoResult<Option<GoalNight>>;
    /// Returns the most recent record, if any.
    fn get_tonight(&self) -> RepoResult<Option<GoalNight>>;
    /// Returns all records, newest first.
    fn list_nights(&self) -> RepoResult<Vec<GoalNight>>;
    /// Deletes every record and returns how many rows were removed.
    fn clear(&self) -> RepoResult<usize>;
}

/// SQLite-backed goal night repository.
///
/// Owns its connection so a tracker can hold it for the process lifetime.
pub struct SqliteNightRepository {
    conn: Connection,
}

impl SqliteNightRepository {
    /// Wraps a connection returned by `db::open_db` / `db::open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema is
    ///   not the shape this binary expects.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl NightRepository for SqliteNightRepository {
    fn insert_night(&self, night: &GoalNight) -> RepoResult<NightId> {
        night.validate()?;

        self.conn.execute(
            "INSERT INTO goal_history_table (
                timestamp,
                goal_1,
                goal_2,
                goal_3,
                num_goals_achieved
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                night.created_at,
                night.goal_1.as_deref(),
                night.goal_2.as_deref(),
                night.goal_3.as_deref(),
                night.num_achieved,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("event=night_insert module=repo status=ok night_id={id}");
        Ok(id)
    }

    fn update_night(&self, night: &GoalNight) -> RepoResult<()> {
        night.validate()?;

        // `timestamp` is never rewritten.
        let changed = self.conn.execute(
            "UPDATE goal_history_table
             SET
                goal_1 = ?1,
                goal_2 = ?2,
                goal_3 = ?3,
                num_goals_achieved = ?4
             WHERE day_id = ?5;",
            params![
                night.goal_1.as_deref(),
                night.goal_2.as_deref(),
                night.goal_3.as_deref(),
                night.num_achieved,
                night.night_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(night.night_id));
        }

        debug!(
            "event=night_update module=repo status=ok night_id={}",
            night.night_id
        );
        Ok(())
    }

    fn get_night(&self, id: NightId) -> RepoResult<Option<GoalNight>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NIGHT_SELECT_SQL} WHERE day_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_night_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_tonight(&self) -> RepoResult<Option<GoalNight>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NIGHT_SELECT_SQL} ORDER BY day_id DESC LIMIT 1;"))?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_night_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_nights(&self) -> RepoResult<Vec<GoalNight>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NIGHT_SELECT_SQL} ORDER BY day_id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut nights = Vec::new();
        while let Some(row) = rows.next()? {
            nights.push(parse_night_row(row)?);
        }
        Ok(nights)
    }

    fn clear(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM goal_history_table;", [])?;
        debug!("event=night_clear module=repo status=ok deleted={deleted}");
        Ok(deleted)
    }
}

fn parse_night_row(row: &Row<'_>) -> RepoResult<GoalNight> {
    let night = GoalNight {
        night_id: row.get("day_id")?,
        created_at: row.get("timestamp")?,
        goal_1: row.get("goal_1")?,
        goal_2: row.get("goal_2")?,
        goal_3: row.get("goal_3")?,
        num_achieved: row.get("num_goals_achieved")?,
    };
    night.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "row day_id={} in {NIGHT_TABLE}: {err}",
            night.night_id
        ))
    })?;
    Ok(night)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [NIGHT_TABLE],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(NIGHT_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({NIGHT_TABLE});"))?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(column) = NIGHT_COLUMNS
        .iter()
        .find(|column| !present.iter().any(|name| name == *column))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: NIGHT_TABLE,
            column: *column,
        });
    }

    Ok(())
}
