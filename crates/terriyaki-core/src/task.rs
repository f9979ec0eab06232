//! Daily tasks and their problem payloads.
//!
//! A task is one participant's assignment for one calendar day of a grind.
//! Tasks of the same grind on the same UTC day are siblings and share the
//! same problem once any of them has one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{day_key, start_of_day};

/// The problem attached to a task, as shown to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemPayload {
    pub title: String,
    pub description: String,
    pub url: String,
    pub difficulty: String,
    #[serde(default)]
    pub topic_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub grind_id: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub finished_time: Option<DateTime<Utc>>,
    pub code: Option<String>,
    pub code_language: Option<String>,
    pub problem: Option<ProblemPayload>,
}

impl Task {
    pub fn new(user_id: &str, grind_id: &str, date: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            grind_id: grind_id.to_string(),
            date,
            completed: false,
            finished_time: None,
            code: None,
            code_language: None,
            problem: None,
        }
    }

    /// Sibling grouping key.
    pub fn day(&self) -> String {
        day_key(self.date)
    }

    pub fn has_problem(&self) -> bool {
        self.problem.is_some()
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.date < start_of_day(now) {
            TaskStatus::Missed
        } else {
            TaskStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Missed,
}

/// One line of a participant's progress through a grind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub task_id: String,
    pub date: DateTime<Utc>,
    pub status: TaskStatus,
    pub finished_time: Option<DateTime<Utc>>,
    pub problem_title: Option<String>,
}

impl ProgressEntry {
    pub fn from_task(task: &Task, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id.clone(),
            date: task.date,
            status: task.status_at(now),
            finished_time: task.finished_time,
            problem_title: task.problem.as_ref().map(|p| p.title.clone()),
        }
    }
}
