//! Durable state over embedded SQLite.
//!
//! Every operation is a single SQL statement against the pool; the store
//! assumes it is the only writer process. Multi-writer coordination is not
//! implemented.

mod approvals;
mod calendar;
mod costs;
mod memories;
mod schema;
mod stats;
mod tasks;
mod timeline;
pub mod types;

pub(crate) use costs::date_key;
pub use types::{
    Approval, ApprovalRequest, ApprovalStatus, CalendarEvent, CalendarEventInput,
    CalendarStatus, CostRecord, Memory, MemoryKind, NewMemory, SystemStats, Task, TaskStatus,
    TimelineEvent, TimelineEventType,
};

use crate::error::StoreError;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file and ensure the schema exists.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create database directory")?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .with_context(|| format!("open SQLite database at {}", path.display()))?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> anyhow::Result<Self> {
        // A second connection to `:memory:` would see a different database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory SQLite")?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query("PRAGMA journal_mode = WAL;")
            .execute(&pool)
            .await
            .context("enable WAL")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width UTC timestamp; lexical order equals chronological order.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[allow(clippy::cast_possible_wrap)]
pub(crate) fn limit_i64(limit: usize) -> i64 {
    limit.min(i64::MAX as usize) as i64
}
