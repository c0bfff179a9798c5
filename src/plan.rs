//! Expands one schedule request into the batch of reminders it stands for.

use std::error::Error;
use std::fmt;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::clock;
use crate::codec;
use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub title: String,
    pub message: String,
    pub first: OffsetDateTime,
    pub weeks: u32,
    pub medication: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    Primary,
    Medication,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAlarm {
    pub kind: AlarmKind,
    pub fire_time: i64,
    pub title: String,
    pub message: String,
}

pub fn plan(
    request: &ScheduleRequest,
    config: &Config,
    now_ms: i64,
) -> Result<Vec<PlannedAlarm>, PlanError> {
    if request.weeks > config.max_weeks {
        return Err(PlanError::TooManyWeeks {
            requested: request.weeks,
            max: config.max_weeks,
        });
    }
    reject_unstorable(&request.title, &request.message, ("title", "message"))?;

    let first_ms = clock::to_ms(request.first);
    if first_ms <= now_ms {
        return Err(PlanError::NotInFuture(first_ms));
    }

    let medication = medication_text(request, config)?;
    let offset = Duration::hours(i64::from(config.medication.offset_hours));
    let mut planned = Vec::new();

    for week in 0..request.weeks.max(1) {
        let occurrence = request
            .first
            .checked_add(Duration::weeks(i64::from(week)))
            .ok_or(PlanError::OutOfRange(week))?;
        planned.push(PlannedAlarm {
            kind: AlarmKind::Primary,
            fire_time: clock::to_ms(occurrence),
            title: request.title.clone(),
            message: request.message.clone(),
        });

        if let Some((title, message)) = &medication {
            let fire_time = occurrence
                .checked_sub(offset)
                .map(clock::to_ms)
                .ok_or(PlanError::OutOfRange(week))?;
            if fire_time <= now_ms {
                debug!(week, fire_time, "skipping medication reminder already in the past");
                continue;
            }
            planned.push(PlannedAlarm {
                kind: AlarmKind::Medication,
                fire_time,
                title: title.clone(),
                message: message.clone(),
            });
        }
    }

    Ok(planned)
}

fn medication_text(
    request: &ScheduleRequest,
    config: &Config,
) -> Result<Option<(String, String)>, PlanError> {
    let settings = &config.medication;
    let trigger = settings.trigger.trim().to_lowercase();
    let triggered = request.medication
        && settings.enabled
        && !trigger.is_empty()
        && request.title.to_lowercase().contains(&trigger);
    if !triggered {
        return Ok(None);
    }

    let message = format!("For: {}", request.title);
    reject_unstorable(&settings.title, &message, ("medication title", "title"))?;
    Ok(Some((settings.title.clone(), message)))
}

/// Rejects text the flat token form would split in the wrong place, naming
/// the title field when it fails on its own.
fn reject_unstorable(
    title: &str,
    message: &str,
    (title_field, message_field): (&'static str, &'static str),
) -> Result<(), PlanError> {
    if codec::survives_round_trip(title, message) {
        return Ok(());
    }
    let field = if codec::survives_round_trip(title, "") {
        message_field
    } else {
        title_field
    };
    Err(PlanError::Unstorable(field))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    Unstorable(&'static str),
    NotInFuture(i64),
    /// The occurrence at this week index lies outside the representable dates.
    OutOfRange(u32),
    TooManyWeeks { requested: u32, max: u32 },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Unstorable(field) => write!(
                f,
                "{} cannot be stored: it contains '{}' or ends with '|'",
                field,
                codec::DELIMITER
            ),
            PlanError::NotInFuture(ms) => write!(
                f,
                "reminder time {} is not in the future",
                clock::format_label(*ms, time::UtcOffset::UTC)
            ),
            PlanError::OutOfRange(week) => {
                write!(f, "occurrence {} falls outside the supported date range", week + 1)
            }
            PlanError::TooManyWeeks { requested, max } => {
                write!(f, "cannot repeat for {} weeks (max {})", requested, max)
            }
        }
    }
}

impl Error for PlanError {}
