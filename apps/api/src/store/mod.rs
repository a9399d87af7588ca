//! Persistence seam.
//!
//! `AppState` holds an `Arc<dyn CellarStore>`: `PgStore` in production,
//! `MemoryStore` in tests. Every write is a single atomic upsert keyed by
//! `(user_id, event_id)` or `user_id`, so callers never coordinate locking.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::bottle::Bottle;
use crate::models::event::{UserEventState, WineEvent};
use crate::models::flags::{FlagChange, FlagUpdate, UserFlagsRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Timeout, closed pool or connection failure. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row that cannot be mapped back into a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Postgres SQLSTATEs that signal a timeout, an outage or a retryable conflict.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "57014", // query_canceled (statement_timeout)
    "57P01", // admin_shutdown
    "57P02", // crash_shutdown
    "57P03", // cannot_connect_now
    "53300", // too_many_connections
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

pub fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code) || code.starts_with("08")
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => true,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .is_some_and(|code| is_transient_sqlstate(&code)),
            _ => false,
        };
        if transient {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CellarStore: Send + Sync {
    // ── events ────────────────────────────────────────────────────────────

    /// Events whose date lies in `[start, end]` (inclusive).
    async fn events_between(&self, start: NaiveDate, end: NaiveDate)
        -> StoreResult<Vec<WineEvent>>;

    /// Inserts or replaces an event by id (administrative edits).
    async fn upsert_event(&self, event: &WineEvent) -> StoreResult<()>;

    // ── per-user event state ──────────────────────────────────────────────

    /// Subset of `event_ids` the user has dismissed.
    async fn dismissed_event_ids(
        &self,
        user_id: Uuid,
        event_ids: &[String],
    ) -> StoreResult<HashSet<String>>;

    async fn user_event_state(
        &self,
        user_id: Uuid,
        event_id: &str,
    ) -> StoreResult<Option<UserEventState>>;

    /// Sets `dismissed_at` unless it is already set. Returns the resulting row,
    /// or `None` when `event_id` does not reference an existing event. The
    /// existence check and the upsert are one statement.
    async fn record_dismissal(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>>;

    /// Sets `last_shown_at` for one event. Same contract as `record_dismissal`.
    async fn record_seen(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>>;

    /// Sets `last_shown_at` for each event, never touching `dismissed_at`.
    async fn record_shown(
        &self,
        user_id: Uuid,
        event_ids: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    // ── inventory ─────────────────────────────────────────────────────────

    /// Bottles with `quantity > 0`.
    async fn in_stock_bottles(&self, user_id: Uuid) -> StoreResult<Vec<Bottle>>;

    /// Canonical cellar size: sum of in-stock quantities.
    async fn cellar_size(&self, user_id: Uuid) -> StoreResult<i64>;

    // ── feature flags ─────────────────────────────────────────────────────

    async fn user_flags(&self, user_id: Uuid) -> StoreResult<Option<UserFlagsRecord>>;

    /// Applies one flag change atomically. A change to the current effective
    /// value is a no-op: no version bump, no audit entry.
    async fn apply_flag_change(&self, change: FlagChange<'_>) -> StoreResult<FlagUpdate>;
}
