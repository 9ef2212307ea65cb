//! Engine log capture.
//!
//! Every line an engine produces while running a job is appended to a
//! [`LogStore`] under the job's [`LogChannelId`], so the text belonging to one
//! run can be pulled back out after it finishes.

mod level;
mod store;

pub use level::{LogLevel, ParseLogLevelError};
pub use store::{LogLine, LogStore, LogWriter, DEFAULT_MAX_LINES};

use chrono::{DateTime, Local};

/// Identifier of the log lines belonging to one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct LogChannelId(uuid::Uuid);

impl LogChannelId {
    /// Channel for lines that belong to no job (environment bootstrap).
    pub const GENERAL: LogChannelId = LogChannelId(uuid::Uuid::nil());

    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn is_general(&self) -> bool {
        *self == Self::GENERAL
    }

    pub fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }
}

impl Default for LogChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LogChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Formats a line the way Kettle's console appender does:
/// `yyyy/MM/dd HH:mm:ss - subject - message`.
pub fn kettle_line(at: DateTime<Local>, subject: &str, message: &str) -> String {
    format!("{} - {subject} - {message}", at.format("%Y/%m/%d %H:%M:%S"))
}
