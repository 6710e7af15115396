//! SQLite-based state storage

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::{StateKind, StateStore};
use crate::models::Watermark;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- One row per (record kind, mailbox)
            CREATE TABLE mailbox_state (
                kind TEXT NOT NULL,
                identity TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (kind, identity)
            );

            -- Per-mailbox cycle lease
            CREATE TABLE leases (
                identity TEXT PRIMARY KEY,
                holder TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        ),
    ])
}

/// SQLite-based state storage
///
/// A single connection behind a mutex; cycles are short and touch only a
/// handful of rows.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// How long a statement waits on a locked database before failing
    const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (or create) a state database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        // WAL lets a reader (e.g. `show`) run while a cycle writes; the busy
        // timeout covers two processes racing on the lease row.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        conn.busy_timeout(Self::BUSY_TIMEOUT)?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, kind: StateKind, identity: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM mailbox_state WHERE kind = ?1 AND identity = ?2",
                params![kind.as_str(), identity],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read {} for {}", kind.as_str(), identity))?;
        Ok(value)
    }

    fn put(&self, kind: StateKind, identity: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO mailbox_state (kind, identity, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(kind, identity) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![kind.as_str(), identity, value, Utc::now().timestamp_millis()],
        )
        .with_context(|| format!("Failed to write {} for {}", kind.as_str(), identity))?;
        Ok(())
    }

    fn delete(&self, kind: StateKind, identity: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM mailbox_state WHERE kind = ?1 AND identity = ?2",
            params![kind.as_str(), identity],
        )
        .with_context(|| format!("Failed to delete {} for {}", kind.as_str(), identity))?;
        Ok(())
    }

    fn put_watermark_if_greater(&self, identity: &str, watermark: Watermark) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                r#"
                INSERT INTO mailbox_state (kind, identity, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(kind, identity) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                WHERE CAST(mailbox_state.value AS INTEGER) < CAST(excluded.value AS INTEGER)
                "#,
                params![
                    StateKind::Watermark.as_str(),
                    identity,
                    watermark.millis().to_string(),
                    Utc::now().timestamp_millis()
                ],
            )
            .with_context(|| format!("Failed to advance watermark for {}", identity))?;
        Ok(changed == 1)
    }

    fn try_acquire_lease(&self, identity: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));

        let conn = self.conn.lock().unwrap();
        // The conditional upsert only touches a row that is free, expired, or
        // ours, so the change count says whether we own the lease.
        let changed = conn
            .execute(
                r#"
                INSERT INTO leases (identity, holder, expires_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(identity) DO UPDATE SET
                    holder = excluded.holder,
                    expires_at = excluded.expires_at
                WHERE leases.expires_at <= ?4 OR leases.holder = excluded.holder
                "#,
                params![identity, holder, expires_at, now],
            )
            .with_context(|| format!("Failed to acquire lease for {}", identity))?;
        Ok(changed == 1)
    }

    fn release_lease(&self, identity: &str, holder: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM leases WHERE identity = ?1 AND holder = ?2",
            params![identity, holder],
        )
        .with_context(|| format!("Failed to release lease for {}", identity))?;
        Ok(())
    }
}
