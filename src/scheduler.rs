use std::error::Error;
use std::fmt;

use crate::domain::record::{AlarmRecord, Handle};
use crate::domain::registration::Registration;

mod spool;

pub use spool::{SpoolEntry, SpoolScheduler};

/// Exact wake-time capability provided by the host.
///
/// Registration carries the record's title and message inline, so whatever
/// fires the wake-up can render it without reading the alarm store.
pub trait Scheduler {
    /// Registers (or re-registers) `record.handle` to fire at `record.fire_time`.
    /// Returns `Registered` or `Denied`; never `Pending`.
    fn register_exact(&mut self, record: &AlarmRecord) -> Result<Registration, SchedulerError>;

    /// Best-effort. Unknown or already-fired handles are a no-op.
    fn cancel(&mut self, handle: Handle);
}

#[derive(Debug)]
pub enum SchedulerError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Io(err) => write!(f, "scheduler I/O error: {}", err),
            SchedulerError::Json(err) => write!(f, "scheduler entry encoding error: {}", err),
        }
    }
}

impl Error for SchedulerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchedulerError::Io(err) => Some(err),
            SchedulerError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(value: std::io::Error) -> Self {
        SchedulerError::Io(value)
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(value: serde_json::Error) -> Self {
        SchedulerError::Json(value)
    }
}
