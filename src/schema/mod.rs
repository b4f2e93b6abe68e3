//! Schema prober
//!
//! Reads the store's column catalog once per run and records which optional
//! payload columns exist. Every analysis is gated on these flags.

use crate::models::fields;
use crate::store::{EventStore, StoreError};
use std::collections::BTreeSet;
use tracing::info;

/// Which optional payload columns the store exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaAvailability {
    pub has_http: bool,
    pub has_dns: bool,
    pub has_tls: bool,
}

impl SchemaAvailability {
    pub fn from_columns(columns: &BTreeSet<String>) -> Self {
        Self {
            has_http: columns.contains(fields::HTTP),
            has_dns: columns.contains(fields::DNS),
            has_tls: columns.contains(fields::TLS),
        }
    }

    /// True when none of the optional payloads exist
    pub fn is_bare(&self) -> bool {
        !(self.has_http || self.has_dns || self.has_tls)
    }
}

/// Probe the store catalog. An empty store is all-false, not an error.
pub fn probe(store: &dyn EventStore) -> Result<SchemaAvailability, StoreError> {
    let columns = store.columns()?;
    let schema = SchemaAvailability::from_columns(&columns);
    info!(
        http = schema.has_http,
        dns = schema.has_dns,
        tls = schema.has_tls,
        flow_only = schema.is_bare(),
        columns = columns.len(),
        "Schema check"
    );
    Ok(schema)
}
