use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sqlite::configure_connection;

const LOG_SCHEMA: &str = include_str!("../../sql/comment_logs.sql");
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open log database {path}: {source}")]
    Open {
        source: rusqlite::Error,
        path: PathBuf,
    },
    #[error("failed to execute statement on log database: {0}")]
    Execute(#[from] rusqlite::Error),
    #[error("log store path not configured")]
    MissingStore,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record of one processed post. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub author: String,
    pub content: String,
    pub generated_comment: String,
    pub posted: bool,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        author: impl Into<String>,
        content: impl Into<String>,
        generated_comment: impl Into<String>,
        posted: bool,
        liked: bool,
    ) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            generated_comment: generated_comment.into(),
            posted,
            liked,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredLogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: LogEntry,
}

impl StoredLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            entry: LogEntry {
                author: row.get("post_author")?,
                content: row.get("post_content")?,
                generated_comment: row.get("generated_comment")?,
                posted: row.get("posted_to_linkedin")?,
                liked: row.get("liked_post")?,
                created_at: row.get("created_at")?,
            },
        })
    }
}

/// Append-only sink for processed-post records.
#[async_trait]
pub trait LogWriter: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteLogStoreBuilder {
    path: Option<PathBuf>,
    read_only: bool,
    create_if_missing: bool,
    busy_timeout: Duration,
}

impl Default for SqliteLogStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create_if_missing: true,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl SqliteLogStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn busy_timeout(mut self, value: Duration) -> Self {
        self.busy_timeout = value;
        self
    }

    pub fn build(self) -> StoreResult<SqliteLogStore> {
        let path = self.path.ok_or(StoreError::MissingStore)?;
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if !self.read_only && self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(SqliteLogStore {
            path,
            flags,
            busy_timeout: self.busy_timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    path: PathBuf,
    flags: OpenFlags,
    busy_timeout: Duration,
}

impl SqliteLogStore {
    pub fn builder() -> SqliteLogStoreBuilder {
        SqliteLogStoreBuilder::new()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
            StoreError::Open {
                source,
                path: self.path.clone(),
            }
        })?;
        let writable = !self.flags.contains(OpenFlags::SQLITE_OPEN_READ_ONLY);
        configure_connection(&conn, self.busy_timeout, writable).map_err(|source| {
            StoreError::Open {
                source,
                path: self.path.clone(),
            }
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute_batch(LOG_SCHEMA)?;
        Ok(())
    }

    pub fn insert(&self, entry: &LogEntry) -> StoreResult<i64> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO comment_logs (
                post_author, post_content, generated_comment, posted_to_linkedin,
                liked_post, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &entry.author,
                &entry.content,
                &entry.generated_comment,
                entry.posted,
                entry.liked,
                entry.created_at
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest entries first.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<StoredLogEntry>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM comment_logs ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], StoredLogEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl LogWriter for SqliteLogStore {
    async fn append(&self, entry: &LogEntry) -> StoreResult<()> {
        let store = self.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || store.insert(&entry)).await??;
        Ok(())
    }
}
