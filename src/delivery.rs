use serde::Serialize;
use time::UtcOffset;

use crate::clock;
use crate::scheduler::{SchedulerError, SpoolEntry, SpoolScheduler};

const DEFAULT_TITLE: &str = "No Title";
const DEFAULT_MESSAGE: &str = "No Message";

/// A fired reminder, built only from what the wake-up carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub handle: i64,
    pub fire_time: i64,
    pub title: String,
    pub message: String,
}

impl From<SpoolEntry> for Notification {
    fn from(entry: SpoolEntry) -> Self {
        Self {
            handle: entry.handle,
            fire_time: entry.fire_time,
            title: entry.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            message: entry.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        }
    }
}

impl Notification {
    pub fn render(&self, offset: UtcOffset) -> String {
        format!(
            "[{}] {}: {}",
            clock::format_clock(self.fire_time, offset),
            self.title,
            self.message
        )
    }
}

/// Drains every spool entry due at `now_ms`. The alarm store is not consulted.
pub fn drain_due(spool: &SpoolScheduler, now_ms: i64) -> Result<Vec<Notification>, SchedulerError> {
    Ok(spool
        .take_due(now_ms)?
        .into_iter()
        .map(Notification::from)
        .collect())
}
