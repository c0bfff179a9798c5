use std::fmt;

use serde::Serialize;

/// Integer key shared by a stored record and its scheduler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Handle(pub i64);

impl Handle {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One scheduled reminder. `fire_time` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmRecord {
    pub fire_time: i64,
    pub title: String,
    pub message: String,
    pub handle: Handle,
}

impl AlarmRecord {
    pub fn new(
        fire_time: i64,
        title: impl Into<String>,
        message: impl Into<String>,
        handle: Handle,
    ) -> Self {
        Self {
            fire_time,
            title: title.into(),
            message: message.into(),
            handle,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.fire_time <= now_ms
    }
}
