use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Scheduler, SchedulerError};
use crate::db::now_utc_rfc3339;
use crate::domain::record::{AlarmRecord, Handle};
use crate::domain::registration::Registration;

const ENTRY_EXTENSION: &str = "json";

/// One pending wake-up. Title and message travel with the entry so delivery
/// never needs the alarm store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpoolEntry {
    pub handle: i64,
    pub fire_time: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub registered_at: String,
}

/// Timer facility backed by a directory of entry files, one per handle.
///
/// The default directory sits in volatile runtime storage, so registrations are
/// lost on restart the same way OS-level exact timers are.
#[derive(Debug, Clone)]
pub struct SpoolScheduler {
    dir: PathBuf,
    exact_allowed: bool,
}

impl SpoolScheduler {
    pub fn new(dir: impl Into<PathBuf>, exact_allowed: bool) -> Self {
        Self {
            dir: dir.into(),
            exact_allowed,
        }
    }

    fn entry_path(&self, handle: Handle) -> PathBuf {
        self.dir.join(format!("{}.{}", handle, ENTRY_EXTENSION))
    }

    #[cfg(test)]
    pub fn entries(&self) -> Result<Vec<SpoolEntry>, SchedulerError> {
        let mut entries = self
            .read_entries()?
            .into_iter()
            .filter_map(|(_, entry)| entry)
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| (entry.fire_time, entry.handle));
        Ok(entries)
    }

    /// Removes and returns every entry due at `now_ms`. Unreadable entries are
    /// discarded.
    pub fn take_due(&self, now_ms: i64) -> Result<Vec<SpoolEntry>, SchedulerError> {
        let mut due = Vec::new();
        for (path, entry) in self.read_entries()? {
            match entry {
                Some(entry) if entry.fire_time <= now_ms => {
                    remove_if_present(&path)?;
                    due.push(entry);
                }
                Some(_) => {}
                None => {
                    if let Err(err) = remove_if_present(&path) {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "failed to discard spool entry"
                        );
                    }
                }
            }
        }
        due.sort_by_key(|entry| (entry.fire_time, entry.handle));
        Ok(due)
    }

    fn read_entries(&self) -> Result<Vec<(PathBuf, Option<SpoolEntry>)>, SchedulerError> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut result = Vec::new();
        for item in dir {
            let path = item?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let entry = fs::read(&path)
                .map_err(SchedulerError::from)
                .and_then(|raw| {
                    serde_json::from_slice::<SpoolEntry>(&raw).map_err(SchedulerError::from)
                });
            match entry {
                Ok(entry) => result.push((path, Some(entry))),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "discarding unreadable spool entry"
                    );
                    result.push((path, None));
                }
            }
        }
        Ok(result)
    }
}

impl Scheduler for SpoolScheduler {
    fn register_exact(&mut self, record: &AlarmRecord) -> Result<Registration, SchedulerError> {
        if !self.exact_allowed {
            debug!(handle = %record.handle, "exact alarm registration denied by config");
            return Ok(Registration::Denied);
        }

        fs::create_dir_all(&self.dir)?;
        let entry = SpoolEntry {
            handle: record.handle.get(),
            fire_time: record.fire_time,
            title: Some(record.title.clone()),
            message: Some(record.message.clone()),
            registered_at: now_utc_rfc3339(),
        };

        let path = self.entry_path(record.handle);
        let tmp_path = path.with_extension("json.tmp");
        if let Err(err) = write_then_rename(&tmp_path, &path, &entry) {
            if let Err(cleanup) = remove_if_present(&tmp_path) {
                warn!(path = %tmp_path.display(), error = %cleanup, "failed to remove temp entry");
            }
            return Err(err);
        }

        debug!(handle = %record.handle, fire_time = record.fire_time, "registered spool entry");
        Ok(Registration::Registered)
    }

    fn cancel(&mut self, handle: Handle) {
        if let Err(err) = remove_if_present(&self.entry_path(handle)) {
            warn!(%handle, error = %err, "failed to cancel spool entry");
        }
    }
}

fn write_then_rename(
    tmp_path: &Path,
    path: &Path,
    entry: &SpoolEntry,
) -> Result<(), SchedulerError> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(tmp_path)?;
    serde_json::to_writer_pretty(&mut file, entry)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), SchedulerError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
