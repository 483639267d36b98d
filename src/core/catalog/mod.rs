mod query;
mod schema;
pub mod seed;

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

pub use query::{QueryResult, Row, normalize_sql};
pub use schema::{ColumnDescriptor, TableDescriptor};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("database connection not established")]
    StoreUnavailable,
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),
}

/// A single cell of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<ValueRef<'_>> for Scalar {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Scalar::Null,
            ValueRef::Integer(i) => Scalar::Integer(i),
            ValueRef::Real(f) => Scalar::Real(f),
            ValueRef::Text(t) => Scalar::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Scalar::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Real(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    ConnectionError,
    QueryError,
}

/// A user-visible message raised by the store that the UI should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Shared sink for notices. Cloning shares the same underlying queue.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeBoard {
    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) {
        let mut notices = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        notices.push(Notice {
            kind,
            message: message.into(),
        });
    }

    /// Take every pending notice, leaving the board empty.
    pub fn drain(&self) -> Vec<Notice> {
        let mut notices = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *notices)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide handle to the product catalog. Opened once at startup
/// and closed when dropped.
pub struct CatalogStore {
    conn: Option<Connection>,
    notices: NoticeBoard,
}

impl CatalogStore {
    /// Open the catalog database at `path`. A failed open is logged and
    /// reported as a notice; the store then behaves as disconnected.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let notices = NoticeBoard::default();
        info!("Trying to connect to the database at {}", path.display());
        let conn = match Connection::open(path) {
            Ok(conn) => {
                info!("Database connection established successfully");
                Some(conn)
            }
            Err(e) => {
                error!("Error connecting to the database: {}", e);
                notices.push(
                    NoticeKind::ConnectionError,
                    format!("Database connection error: {}", e),
                );
                None
            }
        };
        Self { conn, notices }
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Some(conn),
            notices: NoticeBoard::default(),
        }
    }

    /// A store with no connection. Every lookup degrades to an empty result.
    pub fn disconnected() -> Self {
        Self {
            conn: None,
            notices: NoticeBoard::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }
}

impl Drop for CatalogStore {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => info!("Database connection closed"),
                Err((_, e)) => error!("Error closing the database connection: {}", e),
            }
        }
    }
}
