use std::error::Error;
use std::fmt;
use std::str::FromStr;

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{self, MalformedToken};
use crate::db::{self, AlarmRow, UpsertAlarm, NEXT_HANDLE_KEY};
use crate::domain::record::{AlarmRecord, Handle};
use crate::domain::registration::Registration;
use crate::scheduler::Scheduler;

/// Durable set of alarm tokens keyed by handle.
pub struct AlarmStore {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAlarm {
    #[serde(flatten)]
    pub record: AlarmRecord,
    pub registration: Registration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidAlarms {
    pub alarms: Vec<StoredAlarm>,
    pub expired: usize,
    pub malformed: usize,
}

impl ValidAlarms {
    pub fn pruned(&self) -> usize {
        self.expired + self.malformed
    }
}

enum RowState {
    Valid(StoredAlarm),
    Malformed(MalformedToken),
}

impl AlarmStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = db::open_connection(path)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hands out the next handle from the persisted counter.
    pub fn allocate_handle(&mut self) -> Result<Handle, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raw = db::get_meta(&tx, NEXT_HANDLE_KEY)?.unwrap_or_else(|| "1".to_string());
        let next = raw
            .parse::<i64>()
            .map_err(|_| StoreError::CorruptCounter(raw.clone()))?;
        let following = next
            .checked_add(1)
            .ok_or_else(|| StoreError::CorruptCounter(raw.clone()))?;
        db::set_meta(&tx, NEXT_HANDLE_KEY, &following.to_string())?;
        tx.commit()?;
        Ok(Handle(next))
    }

    pub fn add(
        &mut self,
        record: &AlarmRecord,
        registration: Registration,
    ) -> Result<(), StoreError> {
        let token = codec::encode(record);
        db::upsert_alarm(
            &self.conn,
            &UpsertAlarm {
                handle: record.handle.get(),
                token: &token,
                registration: registration.as_str(),
                updated_at: &db::now_utc_rfc3339(),
            },
        )?;
        debug!(handle = %record.handle, %registration, "stored alarm");
        Ok(())
    }

    pub fn set_registration(
        &mut self,
        handle: Handle,
        registration: Registration,
    ) -> Result<bool, StoreError> {
        Ok(db::set_alarm_registration(
            &self.conn,
            handle.get(),
            registration.as_str(),
            &db::now_utc_rfc3339(),
        )?)
    }

    /// Returns every record firing after `now_ms`. Expired and malformed rows
    /// are deleted as a side effect.
    pub fn list_valid(&mut self, now_ms: i64) -> Result<ValidAlarms, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut result = ValidAlarms::default();

        for row in db::list_alarms(&tx)? {
            match decode_row(&row) {
                RowState::Valid(alarm) if !alarm.record.is_expired(now_ms) => {
                    result.alarms.push(alarm);
                }
                RowState::Valid(alarm) => {
                    debug!(handle = %alarm.record.handle, "pruning expired alarm");
                    db::delete_alarm(&tx, row.handle)?;
                    result.expired += 1;
                }
                RowState::Malformed(reason) => {
                    debug!(handle = row.handle, %reason, "pruning malformed alarm token");
                    db::delete_alarm(&tx, row.handle)?;
                    result.malformed += 1;
                }
            }
        }
        tx.commit()?;

        if result.pruned() > 0 {
            info!(
                expired = result.expired,
                malformed = result.malformed,
                "pruned stored alarms"
            );
        }
        result
            .alarms
            .sort_by_key(|alarm| (alarm.record.fire_time, alarm.record.handle));
        Ok(result)
    }

    /// Deletes every record satisfying `predicate`, then cancels their
    /// registrations once the deletion is committed. Malformed rows met along
    /// the way are deleted too.
    pub fn remove_matching<S, P>(
        &mut self,
        scheduler: &mut S,
        mut predicate: P,
    ) -> Result<Vec<AlarmRecord>, StoreError>
    where
        S: Scheduler + ?Sized,
        P: FnMut(&AlarmRecord) -> bool,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut removed = Vec::new();

        for row in db::list_alarms(&tx)? {
            match decode_row(&row) {
                RowState::Valid(alarm) if predicate(&alarm.record) => {
                    db::delete_alarm(&tx, row.handle)?;
                    removed.push(alarm.record);
                }
                RowState::Valid(_) => {}
                RowState::Malformed(reason) => {
                    debug!(handle = row.handle, %reason, "dropping malformed alarm token");
                    db::delete_alarm(&tx, row.handle)?;
                }
            }
        }
        tx.commit()?;

        for record in &removed {
            scheduler.cancel(record.handle);
        }
        Ok(removed)
    }

    /// Cancels and deletes the record stored under `handle`, if any.
    pub fn remove<S>(
        &mut self,
        scheduler: &mut S,
        handle: Handle,
    ) -> Result<Option<AlarmRecord>, StoreError>
    where
        S: Scheduler + ?Sized,
    {
        let Some(row) = db::get_alarm(&self.conn, handle.get())? else {
            return Ok(None);
        };

        db::delete_alarm(&self.conn, handle.get())?;
        scheduler.cancel(handle);
        match decode_row(&row) {
            RowState::Valid(alarm) => Ok(Some(alarm.record)),
            RowState::Malformed(reason) => {
                warn!(%handle, %reason, "removed alarm had a malformed token");
                Ok(None)
            }
        }
    }

    /// Raw tokens as stored, without decoding or pruning.
    pub fn tokens(&self) -> Result<Vec<String>, StoreError> {
        Ok(db::list_alarms(&self.conn)?
            .into_iter()
            .map(|row| row.token)
            .collect())
    }
}

fn decode_row(row: &AlarmRow) -> RowState {
    let record = match codec::decode(&row.token) {
        Ok(record) => record,
        Err(reason) => return RowState::Malformed(reason),
    };
    if record.handle.get() != row.handle {
        return RowState::Malformed(MalformedToken::KeyMismatch {
            key: row.handle,
            token: record.handle.get(),
        });
    }

    let registration = Registration::from_str(&row.registration).unwrap_or_else(|err| {
        warn!(handle = row.handle, error = %err, "treating unknown registration as pending");
        Registration::Pending
    });
    RowState::Valid(StoredAlarm {
        record,
        registration,
    })
}

#[derive(Debug)]
pub enum StoreError {
    Db(rusqlite::Error),
    CorruptCounter(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::CorruptCounter(value) => {
                write!(f, "stored handle counter '{}' is not a usable integer", value)
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Db(err) => Some(err),
            StoreError::CorruptCounter(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}
