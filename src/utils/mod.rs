//! Utility modules for ndrhunt
//!
//! Provides address classification and report timestamp helpers.

pub mod address;
pub mod time;

pub use address::is_private;
pub use time::{report_file_stamp, report_timestamp};
