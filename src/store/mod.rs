//! Event store adapter
//!
//! The analyses only see the [`EventStore`] trait: a column catalog and a
//! declarative query executor. [`JsonEventStore`] is the shipped
//! implementation, backed by line-delimited JSON logs held in memory.

mod memory;
mod source;

pub use memory::JsonEventStore;
pub use source::{discover, open, DEFAULT_EXTENSIONS};

use crate::models::Row;
use crate::query::Query;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures opening or reading the data source; fatal for a run
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no log file with extension [{extensions}] in {}", .dir.display())]
    NoSupportedFile { dir: PathBuf, extensions: String },

    #[error("unsupported log format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures binding or executing one query; fatal only to that analysis
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Read-only event store
pub trait EventStore {
    /// Data source the store was opened from
    fn source(&self) -> &Path;

    /// Top-level field names
    fn columns(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Execute one query
    fn query(&self, query: &Query) -> Result<Vec<Row>, QueryError>;

    /// Execute queries in order and concatenate their rows (`UNION ALL`)
    fn query_union(&self, queries: &[Query]) -> Result<Vec<Row>, QueryError> {
        let mut rows = Vec::new();
        for query in queries {
            rows.extend(self.query(query)?);
        }
        Ok(rows)
    }
}
