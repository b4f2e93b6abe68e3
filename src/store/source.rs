//! Data source discovery and NDJSON ingestion.

use super::{JsonEventStore, StoreError};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions accepted when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["json", "ndjson", "jsonl"];

/// Resolve `path` to a single log file.
///
/// A file must carry a supported extension. A directory yields its
/// lexicographically last supported file (rotated logs sort by date).
pub fn discover<S: AsRef<str>>(path: &Path, extensions: &[S]) -> Result<PathBuf, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    if path.is_dir() {
        let entries = fs::read_dir(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_supported_extension(p, extensions))
            .collect();
        candidates.sort();

        return candidates
            .pop()
            .ok_or_else(|| StoreError::NoSupportedFile {
                dir: path.to_path_buf(),
                extensions: extensions
                    .iter()
                    .map(|e| e.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
    }

    if has_supported_extension(path, extensions) {
        Ok(path.to_path_buf())
    } else {
        Err(StoreError::UnsupportedFormat(path.to_path_buf()))
    }
}

fn has_supported_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)))
}

/// Discover the data file under `path` and load it
pub fn open<S: AsRef<str>>(path: &Path, extensions: &[S]) -> Result<JsonEventStore, StoreError> {
    let file = discover(path, extensions)?;
    info!(source = %file.display(), "Using data file");
    load(&file)
}

/// Parse a line-delimited JSON file. Lines that are not JSON objects are
/// skipped without being counted.
pub(super) fn load(path: &Path) -> Result<JsonEventStore, StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for line in reader.split(b'\n') {
        let line = line.map_err(io_err)?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if let Ok(event @ serde_json::Value::Object(_)) =
            serde_json::from_slice::<serde_json::Value>(&line)
        {
            events.push(event);
        }
    }

    debug!(source = %path.display(), events = events.len(), "Loaded events");
    Ok(JsonEventStore::from_events(path, events))
}
