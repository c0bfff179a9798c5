use std::error::Error;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_MAX_WEEKS: u32 = 104;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Whether the host grants exact wake-time registration.
    pub exact_alarms_allowed: bool,
    pub spool_dir: Option<PathBuf>,
    pub max_weeks: u32,
    pub medication: MedicationConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MedicationConfig {
    pub enabled: bool,
    /// Case-insensitive substring of a title that triggers a medication reminder.
    pub trigger: String,
    pub title: String,
    pub offset_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exact_alarms_allowed: true,
            spool_dir: None,
            max_weeks: DEFAULT_MAX_WEEKS,
            medication: MedicationConfig::default(),
        }
    }
}

impl Default for MedicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: "class".to_string(),
            title: "Medication time".to_string(),
            offset_hours: 4,
        }
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn resolved_spool_dir(&self) -> PathBuf {
        if let Some(dir) = &self.spool_dir {
            return dir.clone();
        }
        match std::env::var_os("XDG_RUNTIME_DIR") {
            Some(runtime) if !runtime.is_empty() => PathBuf::from(runtime).join("remindme"),
            _ => std::env::temp_dir().join("remindme-spool"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O error: {}", err),
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config '{}': {}", path.display(), source)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
