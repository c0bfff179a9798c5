use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::cancel::{CancelCriteria, CancelOutcome, CancellationMatcher};
use crate::config::{Config, ConfigError};
use crate::domain::record::{AlarmRecord, Handle};
use crate::domain::registration::Registration;
use crate::plan::{self, AlarmKind, PlanError, ScheduleRequest};
use crate::reconcile::{ReconcileSummary, ReconciliationService};
use crate::scheduler::{Scheduler, SchedulerError, SpoolScheduler};
use crate::store::{AlarmStore, StoreError, StoredAlarm};

pub struct App<S: Scheduler = SpoolScheduler> {
    store: AlarmStore,
    scheduler: S,
    config: Config,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduledAlarm {
    #[serde(flatten)]
    pub record: AlarmRecord,
    pub kind: AlarmKind,
    pub registration: Registration,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub alarms: Vec<ScheduledAlarm>,
}

impl ScheduleSummary {
    pub fn count(&self, registration: Registration) -> usize {
        self.alarms
            .iter()
            .filter(|alarm| alarm.registration == registration)
            .count()
    }
}

impl App<SpoolScheduler> {
    pub fn open(db_path: &str, config: Config) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let store = AlarmStore::open(db_path)?;
        let scheduler =
            SpoolScheduler::new(config.resolved_spool_dir(), config.exact_alarms_allowed);
        Ok(Self::with_parts(store, scheduler, config))
    }
}

impl<S: Scheduler> App<S> {
    pub fn with_parts(store: AlarmStore, scheduler: S, config: Config) -> Self {
        Self {
            store,
            scheduler,
            config,
        }
    }

    /// Registers and stores every reminder the request expands to. A denied or
    /// failed registration still stores the record, marked accordingly.
    pub fn schedule(
        &mut self,
        request: &ScheduleRequest,
        now_ms: i64,
    ) -> Result<ScheduleSummary, AppError> {
        let planned = plan::plan(request, &self.config, now_ms)?;
        let mut summary = ScheduleSummary::default();

        for alarm in planned {
            let handle = self.store.allocate_handle()?;
            let record = AlarmRecord::new(alarm.fire_time, alarm.title, alarm.message, handle);
            let registration = match self.scheduler.register_exact(&record) {
                Ok(registration) => registration,
                Err(err) => {
                    warn!(%handle, error = %err, "registration failed; storing alarm as pending");
                    Registration::Pending
                }
            };
            self.store.add(&record, registration)?;
            summary.alarms.push(ScheduledAlarm {
                record,
                kind: alarm.kind,
                registration,
            });
        }

        Ok(summary)
    }

    pub fn list(&mut self, now_ms: i64) -> Result<Vec<StoredAlarm>, AppError> {
        Ok(self.store.list_valid(now_ms)?.alarms)
    }

    pub fn tokens(&self) -> Result<Vec<String>, AppError> {
        Ok(self.store.tokens()?)
    }

    /// Cancels the selected entries by their content, which also cancels any
    /// other entry sharing the same time, title and message.
    pub fn cancel_selected(
        &mut self,
        handles: &[Handle],
        now_ms: i64,
    ) -> Result<CancelOutcome, AppError> {
        require_selection(handles)?;
        let listed = self.store.list_valid(now_ms)?.alarms;

        let mut criteria = Vec::new();
        let mut not_found = Vec::new();
        for handle in unique(handles) {
            match listed.iter().find(|alarm| alarm.record.handle == handle) {
                Some(alarm) => criteria.push(CancelCriteria::from(&alarm.record)),
                None => not_found.push(handle),
            }
        }

        let mut outcome = CancellationMatcher::new(&mut self.store, &mut self.scheduler)
            .cancel_matching(&criteria)?;
        outcome.not_found = not_found;
        Ok(outcome)
    }

    pub fn cancel_exact(&mut self, handles: &[Handle]) -> Result<CancelOutcome, AppError> {
        require_selection(handles)?;
        Ok(CancellationMatcher::new(&mut self.store, &mut self.scheduler)
            .cancel_handles(&unique(handles))?)
    }

    pub fn reconcile(&mut self, now_ms: i64) -> Result<ReconcileSummary, AppError> {
        Ok(ReconciliationService::new(&mut self.store, &mut self.scheduler).reconcile_all(now_ms)?)
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

fn require_selection(handles: &[Handle]) -> Result<(), AppError> {
    if handles.is_empty() {
        return Err(AppError::InvalidArgument(
            "select at least one alarm handle to cancel".to_string(),
        ));
    }
    Ok(())
}

fn unique(handles: &[Handle]) -> Vec<Handle> {
    let mut seen = HashSet::new();
    handles
        .iter()
        .copied()
        .filter(|handle| seen.insert(*handle))
        .collect()
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Store(StoreError),
    Scheduler(SchedulerError),
    Config(ConfigError),
    Plan(PlanError),
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Scheduler(err) => write!(f, "{}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Plan(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Scheduler(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Plan(err) => Some(err),
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<SchedulerError> for AppError {
    fn from(value: SchedulerError) -> Self {
        AppError::Scheduler(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<PlanError> for AppError {
    fn from(value: PlanError) -> Self {
        AppError::Plan(value)
    }
}
