//! Flat token form of an [`AlarmRecord`]:
//! `<fireTimeMillis>||<title>||<message>||<handle>`.
//!
//! The delimiter is not escaped. Text containing `||`, or with a `|` pressed
//! against a field boundary, does not survive a round trip; callers check
//! [`survives_round_trip`] before encoding.

use std::error::Error;
use std::fmt;

use crate::domain::record::{AlarmRecord, Handle};

pub const DELIMITER: &str = "||";
const FIELD_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedToken {
    FieldCount(usize),
    FireTime(String),
    Handle(String),
    /// Token handle disagrees with the key it is stored under.
    KeyMismatch { key: i64, token: i64 },
}

impl fmt::Display for MalformedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedToken::FieldCount(count) => {
                write!(f, "expected {} fields, found {}", FIELD_COUNT, count)
            }
            MalformedToken::FireTime(raw) => write!(f, "fire time '{}' is not an integer", raw),
            MalformedToken::Handle(raw) => write!(f, "handle '{}' is not an integer", raw),
            MalformedToken::KeyMismatch { key, token } => {
                write!(f, "token handle {} stored under key {}", token, key)
            }
        }
    }
}

impl Error for MalformedToken {}

pub fn encode(record: &AlarmRecord) -> String {
    format!(
        "{fire}{d}{title}{d}{message}{d}{handle}",
        fire = record.fire_time,
        title = record.title,
        message = record.message,
        handle = record.handle,
        d = DELIMITER,
    )
}

pub fn decode(token: &str) -> Result<AlarmRecord, MalformedToken> {
    let fields = token.split(DELIMITER).collect::<Vec<_>>();
    let [fire_time, title, message, handle] = fields.as_slice() else {
        return Err(MalformedToken::FieldCount(fields.len()));
    };

    let fire_time = fire_time
        .parse::<i64>()
        .map_err(|_| MalformedToken::FireTime(fire_time.to_string()))?;
    let handle = handle
        .parse::<i64>()
        .map_err(|_| MalformedToken::Handle(handle.to_string()))?;

    Ok(AlarmRecord {
        fire_time,
        title: title.to_string(),
        message: message.to_string(),
        handle: Handle(handle),
    })
}

/// Whether a record carrying `title` and `message` decodes back to the same
/// text.
pub fn survives_round_trip(title: &str, message: &str) -> bool {
    let candidate = AlarmRecord::new(0, title, message, Handle(0));
    decode(&encode(&candidate)).is_ok_and(|decoded| decoded == candidate)
}
