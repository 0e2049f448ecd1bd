//! SQLite session history.
//!
//! Every finished session is appended to the `vc_sessions` table.
//! Participant totals are stored as a JSON object keyed by member id so
//! the row shape does not depend on the participant count.

use crate::collaborators::{CollaboratorError, HistoryArchive};
use crate::session::{ParticipantSummary, SessionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{GuildId, MemberId, RoomId};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Default number of rows returned by [`SqliteHistoryArchive::recent_sessions`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Upper bound on rows returned by one history query.
pub const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A stored value does not fit the domain type (id sign, bad JSON).
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<sqlx::Error> for HistoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

/// One archived session with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSession {
    pub id: i64,
    #[serde(flatten)]
    pub record: SessionRecord,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    guild_id: i64,
    vc_id: i64,
    vc_name: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_sec: i64,
    participants_json: String,
}

impl SessionRow {
    fn into_stored(self) -> Result<StoredSession, HistoryError> {
        let participants: BTreeMap<MemberId, ParticipantSummary> =
            serde_json::from_str(&self.participants_json)
                .map_err(|e| HistoryError::Encoding(format!("participants_json: {e}")))?;

        Ok(StoredSession {
            id: self.id,
            record: SessionRecord {
                guild_id: GuildId(from_column(self.guild_id, "guild_id")?),
                room_id: RoomId(from_column(self.vc_id, "vc_id")?),
                room_name: self.vc_name,
                started_at: self.started_at,
                ended_at: self.ended_at,
                duration_seconds: self.duration_sec,
                participants,
            },
        })
    }
}

/// Session history stored in SQLite.
#[derive(Clone)]
pub struct SqliteHistoryArchive {
    pool: Pool<Sqlite>,
}

impl SqliteHistoryArchive {
    /// Open (or create) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| HistoryError::Connection(e.to_string()))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Connection(e.to_string()))?;

        let archive = Self { pool };
        archive.migrate().await?;

        info!(target: "vc.history", "Session history database opened");
        Ok(archive)
    }

    /// In-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| HistoryError::Connection(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Connection(e.to_string()))?;

        let archive = Self { pool };
        archive.migrate().await?;
        Ok(archive)
    }

    async fn migrate(&self) -> Result<(), HistoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HistoryError::Migration(e.to_string()))
    }

    /// Append a finished session. Returns the new row id.
    #[instrument(skip_all, fields(room = %record.room_id))]
    pub async fn insert(&self, record: &SessionRecord) -> Result<i64, HistoryError> {
        let participants_json = serde_json::to_string(&record.participants)
            .map_err(|e| HistoryError::Encoding(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO vc_sessions (
                guild_id, vc_id, vc_name, started_at, ended_at,
                duration_sec, participants_json
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_column(record.guild_id.get(), "guild_id")?)
        .bind(to_column(record.room_id.get(), "vc_id")?)
        .bind(&record.room_name)
        .bind(record.started_at)
        .bind(record.ended_at)
        .bind(record.duration_seconds)
        .bind(participants_json)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            target: "vc.history",
            id,
            room = %record.room_id,
            duration_seconds = record.duration_seconds,
            participants = record.participants.len(),
            "Session archived"
        );
        Ok(id)
    }

    /// Most recently ended sessions of a guild, newest first.
    ///
    /// `limit` is clamped to [`MAX_HISTORY_LIMIT`].
    pub async fn recent_sessions(
        &self,
        guild: GuildId,
        limit: u32,
    ) -> Result<Vec<StoredSession>, HistoryError> {
        let limit = limit.min(MAX_HISTORY_LIMIT);

        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, guild_id, vc_id, vc_name, started_at, ended_at,
                   duration_sec, participants_json
            FROM vc_sessions
            WHERE guild_id = ?
            ORDER BY ended_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(to_column(guild.get(), "guild_id")?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SessionRow::into_stored).collect()
    }
}

#[async_trait]
impl HistoryArchive for SqliteHistoryArchive {
    async fn record_session(&self, record: SessionRecord) -> Result<(), CollaboratorError> {
        self.insert(&record)
            .await
            .map(|_| ())
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))
    }
}

fn to_column(id: u64, column: &str) -> Result<i64, HistoryError> {
    i64::try_from(id).map_err(|_| HistoryError::Encoding(format!("{column} out of range: {id}")))
}

fn from_column(value: i64, column: &str) -> Result<u64, HistoryError> {
    u64::try_from(value)
        .map_err(|_| HistoryError::Encoding(format!("{column} is negative: {value}")))
}
