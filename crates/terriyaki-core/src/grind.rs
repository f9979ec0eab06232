//! Grinds: fixed-duration, fixed-budget challenges shared by participants.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::participation::ParticipantStanding;
use crate::task::{ProgressEntry, Task};

/// Longest grind accepted, in days.
pub const MAX_DURATION_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grind {
    pub id: String,
    /// Length in days.
    pub duration: i64,
    pub budget: i64,
    pub start_date: DateTime<Utc>,
    /// User ids in join order.
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grind {
    /// Start plus duration, or an error when the sum leaves chrono's range.
    pub fn end_date(&self) -> Result<DateTime<Utc>, ValidationError> {
        self.offset(self.duration)
    }

    pub fn is_ongoing_at(&self, now: DateTime<Utc>) -> Result<bool, ValidationError> {
        Ok(self.end_date()? > now)
    }

    /// The date of every task a participant gets, one per day.
    pub fn task_dates(&self) -> Result<Vec<DateTime<Utc>>, ValidationError> {
        self.end_date()?;
        (0..self.duration.max(0)).map(|day| self.offset(day)).collect()
    }

    fn offset(&self, days: i64) -> Result<DateTime<Utc>, ValidationError> {
        Duration::try_days(days)
            .and_then(|delta| self.start_date.checked_add_signed(delta))
            .ok_or_else(|| {
                ValidationError::invalid(
                    "duration",
                    format!("{days} days from {} is out of range", self.start_date),
                )
            })
    }
}

/// Request to create a grind. Participants are emails or user ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrindRequest {
    pub duration: i64,
    pub budget: i64,
    pub participants: Vec<String>,
    pub start_date: DateTime<Utc>,
}

impl CreateGrindRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_duration(self.duration)?;
        validate_budget(self.budget)?;
        if self.participants.iter().all(|p| p.trim().is_empty()) {
            return Err(ValidationError::EmptyCollection(
                "participants".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update; only duration and budget are mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrindUpdate {
    pub duration: Option<i64>,
    pub budget: Option<i64>,
}

impl GrindUpdate {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none() && self.budget.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        if let Some(budget) = self.budget {
            validate_budget(budget)?;
        }
        Ok(())
    }
}

fn validate_duration(duration: i64) -> Result<(), ValidationError> {
    if duration <= 0 {
        return Err(ValidationError::invalid(
            "duration",
            format!("must be at least one day, got {duration}"),
        ));
    }
    if duration > MAX_DURATION_DAYS {
        return Err(ValidationError::invalid(
            "duration",
            format!("must be at most {MAX_DURATION_DAYS} days, got {duration}"),
        ));
    }
    Ok(())
}

fn validate_budget(budget: i64) -> Result<(), ValidationError> {
    if budget < 0 {
        return Err(ValidationError::invalid(
            "budget",
            format!("must not be negative, got {budget}"),
        ));
    }
    Ok(())
}

/// Everything a participant sees when opening a grind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrindOverview {
    pub grind: Grind,
    pub participants: Vec<ParticipantStanding>,
    /// Whether the viewer has quit.
    pub quitted: bool,
    pub today_task: Option<Task>,
    pub progress: Vec<ProgressEntry>,
}

/// What a cascading delete removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrindDeletion {
    pub grind_id: String,
    pub deleted_tasks: usize,
    pub deleted_records: usize,
}
