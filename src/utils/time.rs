//! Time helpers.

use chrono::{DateTime, Local};

/// Timestamp used in the report title line.
pub fn report_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Short timestamp used in report file names.
pub fn report_file_stamp(now: &DateTime<Local>) -> String {
    now.format("%y-%m-%d-%H-%M").to_string()
}
