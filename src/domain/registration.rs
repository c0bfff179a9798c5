use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Outcome of the latest attempt to register a record with the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    Pending,
    Registered,
    Denied,
}

impl Registration {
    pub const ALL: [Registration; 3] = [
        Registration::Pending,
        Registration::Registered,
        Registration::Denied,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Registration::Pending => "pending",
            Registration::Registered => "registered",
            Registration::Denied => "denied",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Registration::Registered)
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Registration {
    type Err = ParseRegistrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let registration = match normalized.as_str() {
            "pending" => Registration::Pending,
            "registered" => Registration::Registered,
            "denied" => Registration::Denied,
            _ => {
                return Err(ParseRegistrationError {
                    value: value.to_string(),
                });
            }
        };

        Ok(registration)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRegistrationError {
    value: String,
}

impl fmt::Display for ParseRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid registration '{}': expected one of {}",
            self.value,
            Registration::ALL
                .iter()
                .map(|registration| registration.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseRegistrationError {}
