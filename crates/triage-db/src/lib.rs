//! triage-db: SQLite persistence for team state.
//!
//! Provides the `Db` handle with versioned migrations and the
//! `team_store` module implementing the engine's `TeamStore` trait over
//! batched queries.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;

pub mod team_store;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
}

impl Config {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Database errors.
#[derive(Debug)]
pub enum DbError {
    /// Opening the database file failed.
    Open(rusqlite::Error),
    /// A query failed.
    Query(rusqlite::Error),
    /// A migration step failed.
    Migration(String),
    /// Input failed validation before touching the database.
    Validation(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "open database: {err}"),
            Self::Query(err) => write!(f, "query failed: {err}"),
            Self::Migration(message) => write!(f, "migration failed: {message}"),
            Self::Validation(message) => write!(f, "validation failed: {message}"),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(err) | Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Query(err)
    }
}

/// Current RFC 3339 timestamp, the canonical stored form.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

struct Migration {
    version: i64,
    up: &'static str,
    down: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    up: "
        CREATE TABLE members (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            timezone TEXT NOT NULL DEFAULT 'UTC',
            role TEXT NOT NULL DEFAULT 'USER',
            skills_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX idx_members_role ON members(role);
        CREATE INDEX idx_members_email ON members(email);

        CREATE TABLE tickets (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            assignee_id TEXT,
            created_at TEXT NOT NULL,
            assigned_at TEXT
        );
        CREATE INDEX idx_tickets_assignee_status ON tickets(assignee_id, status);
        CREATE INDEX idx_tickets_assigned_at ON tickets(assigned_at);

        CREATE TABLE leaves (
            id TEXT PRIMARY KEY,
            member_id TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        );
        CREATE INDEX idx_leaves_member ON leaves(member_id);
        CREATE INDEX idx_leaves_window ON leaves(start_date, end_date);

        CREATE TABLE holidays (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            region TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX idx_holidays_date_region ON holidays(date, region);
    ",
    down: "
        DROP INDEX IF EXISTS idx_holidays_date_region;
        DROP TABLE IF EXISTS holidays;
        DROP INDEX IF EXISTS idx_leaves_window;
        DROP INDEX IF EXISTS idx_leaves_member;
        DROP TABLE IF EXISTS leaves;
        DROP INDEX IF EXISTS idx_tickets_assigned_at;
        DROP INDEX IF EXISTS idx_tickets_assignee_status;
        DROP TABLE IF EXISTS tickets;
        DROP INDEX IF EXISTS idx_members_email;
        DROP INDEX IF EXISTS idx_members_role;
        DROP TABLE IF EXISTS members;
    ",
}];

/// Database handle. One connection; callers needing concurrent access wrap
/// it behind `team_store::SqliteTeamStore`.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (or create) the database file. Enables foreign keys and WAL.
    pub fn open(config: Config) -> Result<Self, DbError> {
        let conn = Connection::open(&config.path).map_err(DbError::Open)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(DbError::Open)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version (PRAGMA user_version).
    pub fn schema_version(&self) -> Result<i64, DbError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Migrate to the latest schema version.
    pub fn migrate_up(&mut self) -> Result<(), DbError> {
        let latest = MIGRATIONS[MIGRATIONS.len() - 1].version;
        self.migrate_to(latest)
    }

    /// Migrate up or down to the given version.
    pub fn migrate_to(&mut self, target: i64) -> Result<(), DbError> {
        let current = self.schema_version()?;
        if target == current {
            return Ok(());
        }

        if target > current {
            for migration in MIGRATIONS.iter().filter(|m| m.version > current && m.version <= target) {
                self.apply(migration.up, migration.version)?;
            }
        } else {
            for migration in MIGRATIONS
                .iter()
                .rev()
                .filter(|m| m.version <= current && m.version > target)
            {
                self.apply(migration.down, migration.version - 1)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, sql: &str, resulting_version: i64) -> Result<(), DbError> {
        let tx = self.conn.transaction().map_err(DbError::Query)?;
        tx.execute_batch(sql)
            .map_err(|err| DbError::Migration(format!("version {resulting_version}: {err}")))?;
        tx.execute_batch(&format!("PRAGMA user_version = {resulting_version}"))
            .map_err(|err| DbError::Migration(format!("set version {resulting_version}: {err}")))?;
        tx.commit().map_err(DbError::Query)?;
        Ok(())
    }
}

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "triage-db"
}
