use serde::Serialize;
use tracing::{info, warn};

use crate::domain::registration::Registration;
use crate::scheduler::Scheduler;
use crate::store::{AlarmStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub registered: usize,
    pub denied: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Replays scheduler registration for every still-future stored record.
pub struct ReconciliationService<'a, S: Scheduler + ?Sized> {
    store: &'a mut AlarmStore,
    scheduler: &'a mut S,
}

impl<'a, S: Scheduler + ?Sized> ReconciliationService<'a, S> {
    pub fn new(store: &'a mut AlarmStore, scheduler: &'a mut S) -> Self {
        Self { store, scheduler }
    }

    /// Safe to repeat: registration is idempotent per handle and nothing new
    /// is stored.
    pub fn reconcile_all(&mut self, now_ms: i64) -> Result<ReconcileSummary, StoreError> {
        let listing = self.store.list_valid(now_ms)?;
        let mut summary = ReconcileSummary {
            pruned: listing.pruned(),
            ..ReconcileSummary::default()
        };

        for alarm in listing.alarms {
            let handle = alarm.record.handle;
            let outcome = match self.scheduler.register_exact(&alarm.record) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%handle, error = %err, "re-registration failed; leaving alarm pending");
                    Registration::Pending
                }
            };

            match outcome {
                Registration::Registered => summary.registered += 1,
                Registration::Denied => summary.denied += 1,
                Registration::Pending => summary.failed += 1,
            }
            if outcome != alarm.registration {
                self.store.set_registration(handle, outcome)?;
            }
        }

        info!(
            registered = summary.registered,
            denied = summary.denied,
            failed = summary.failed,
            pruned = summary.pruned,
            "reconciled stored alarms"
        );
        Ok(summary)
    }
}
