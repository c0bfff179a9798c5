use serde::Serialize;
use tracing::info;

use crate::domain::record::{AlarmRecord, Handle};
use crate::scheduler::Scheduler;
use crate::store::{AlarmStore, StoreError};

/// Content tuple a user picks from the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelCriteria {
    pub fire_time: i64,
    pub title: String,
    pub message: String,
}

impl CancelCriteria {
    pub fn matches(&self, record: &AlarmRecord) -> bool {
        record.fire_time == self.fire_time
            && record.title == self.title
            && record.message == self.message
    }
}

impl From<&AlarmRecord> for CancelCriteria {
    fn from(record: &AlarmRecord) -> Self {
        Self {
            fire_time: record.fire_time,
            title: record.title.clone(),
            message: record.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub cancelled: Vec<AlarmRecord>,
    pub not_found: Vec<Handle>,
}

pub struct CancellationMatcher<'a, S: Scheduler + ?Sized> {
    store: &'a mut AlarmStore,
    scheduler: &'a mut S,
}

impl<'a, S: Scheduler + ?Sized> CancellationMatcher<'a, S> {
    pub fn new(store: &'a mut AlarmStore, scheduler: &'a mut S) -> Self {
        Self { store, scheduler }
    }

    /// Matches on content, so every record sharing a tuple is cancelled, even
    /// when the user selected only one of them.
    pub fn cancel_matching(
        &mut self,
        criteria: &[CancelCriteria],
    ) -> Result<CancelOutcome, StoreError> {
        let mut outcome = CancelOutcome::default();
        for tuple in criteria {
            let removed = self
                .store
                .remove_matching(&mut *self.scheduler, |record| tuple.matches(record))?;
            outcome.cancelled.extend(removed);
        }
        info!(cancelled = outcome.cancelled.len(), "cancelled alarms by content");
        Ok(outcome)
    }

    pub fn cancel_handles(&mut self, handles: &[Handle]) -> Result<CancelOutcome, StoreError> {
        let mut outcome = CancelOutcome::default();
        for handle in handles {
            match self.store.remove(&mut *self.scheduler, *handle)? {
                Some(record) => outcome.cancelled.push(record),
                None => outcome.not_found.push(*handle),
            }
        }
        info!(
            cancelled = outcome.cancelled.len(),
            not_found = outcome.not_found.len(),
            "cancelled alarms by handle"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::{CancelCriteria, CancellationMatcher};
    use crate::domain::record::{AlarmRecord, Handle};
    use crate::domain::registration::Registration;
    use crate::scheduler::testing::RecordingScheduler;
    use crate::store::AlarmStore;

    const T: i64 = 1_792_000_000_000;

    fn store_with(records: &[AlarmRecord]) -> (PathBuf, AlarmStore) {
        let path = std::env::temp_dir().join(format!("remindme-cancel-{}.sqlite", Uuid::now_v7()));
        let mut store =
            AlarmStore::open(path.to_str().expect("utf8 path")).expect("store should open");
        for record in records {
            store
                .add(record, Registration::Registered)
                .expect("seed should store");
        }
        (path, store)
    }

    fn cleanup(path: &PathBuf) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[test]
    fn one_tuple_cancels_both_duplicates() {
        let duplicate_a = AlarmRecord::new(T + 10, "Meeting", "Standup", Handle(1));
        let duplicate_b = AlarmRecord::new(T + 10, "Meeting", "Standup", Handle(2));
        let other = AlarmRecord::new(T + 20, "Meeting", "Standup", Handle(3));
        let (path, mut store) = store_with(&[duplicate_a.clone(), duplicate_b, other]);
        let mut scheduler = RecordingScheduler::default();

        let outcome = CancellationMatcher::new(&mut store, &mut scheduler)
            .cancel_matching(&[CancelCriteria::from(&duplicate_a)])
            .expect("cancel should succeed");

        assert_eq!(outcome.cancelled.len(), 2);
        assert_eq!(scheduler.cancelled, vec![Handle(1), Handle(2)]);
        let remaining = store.list_valid(T).expect("list should succeed");
        assert_eq!(remaining.alarms.len(), 1);
        assert_eq!(remaining.alarms[0].record.handle, Handle(3));

        cleanup(&path);
    }

    #[test]
    fn tuple_requires_every_field_to_match() {
        let record = AlarmRecord::new(T + 10, "Meeting", "Standup", Handle(1));
        let (path, mut store) = store_with(&[record]);
        let mut scheduler = RecordingScheduler::default();

        let near_misses = [
            CancelCriteria {
                fire_time: T + 11,
                title: "Meeting".to_string(),
                message: "Standup".to_string(),
            },
            CancelCriteria {
                fire_time: T + 10,
                title: "meeting".to_string(),
                message: "Standup".to_string(),
            },
            CancelCriteria {
                fire_time: T + 10,
                title: "Meeting".to_string(),
                message: "Standup ".to_string(),
            },
        ];
        let outcome = CancellationMatcher::new(&mut store, &mut scheduler)
            .cancel_matching(&near_misses)
            .expect("cancel should succeed");

        assert!(outcome.cancelled.is_empty());
        assert!(scheduler.cancelled.is_empty());
        assert_eq!(store.tokens().expect("tokens should read").len(), 1);

        cleanup(&path);
    }

    #[test]
    fn handle_cancellation_spares_duplicates_and_reports_unknown() {
        let (path, mut store) = store_with(&[
            AlarmRecord::new(T + 10, "Meeting", "Standup", Handle(1)),
            AlarmRecord::new(T + 10, "Meeting", "Standup", Handle(2)),
        ]);
        let mut scheduler = RecordingScheduler::default();

        let outcome = CancellationMatcher::new(&mut store, &mut scheduler)
            .cancel_handles(&[Handle(1), Handle(9)])
            .expect("cancel should succeed");

        assert_eq!(outcome.cancelled.len(), 1);
        assert_eq!(outcome.cancelled[0].handle, Handle(1));
        assert_eq!(outcome.not_found, vec![Handle(9)]);
        assert_eq!(scheduler.cancelled, vec![Handle(1)]);
        assert_eq!(store.list_valid(T).expect("list should succeed").alarms.len(), 1);

        cleanup(&path);
    }
}
