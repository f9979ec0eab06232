use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::lifecycle::load_grind;
use super::GrindEngine;
use crate::clock::today_window;
use crate::error::{CoreError, Result};
use crate::grind::Grind;
use crate::problems::{Problem, ProblemSelector, ProblemSource};
use crate::storage::{tasks, users};
use crate::task::{ProgressEntry, Task};

/// One unassigned task per day of the grind. Days that already have a task
/// are skipped. Returns how many tasks were created.
pub(super) fn schedule_tasks(conn: &Connection, grind: &Grind, user_id: &str) -> Result<usize> {
    let mut created = 0;
    for date in grind.task_dates()? {
        if tasks::insert_task_if_absent(conn, &Task::new(user_id, &grind.id, date))? {
            created += 1;
        }
    }
    Ok(created)
}

/// Copy a problem some sibling already has onto every sibling without one.
fn copy_sibling_problem(conn: &Connection, grind_id: &str, day: &str) -> Result<bool> {
    match tasks::sibling_problem(conn, grind_id, day)? {
        Some(problem) => {
            let filled = tasks::fill_problem(conn, grind_id, day, &problem)?;
            if filled > 0 {
                debug!(grind_id, day, filled, "copied sibling problem");
            }
            Ok(true)
        }
        None => Ok(false),
    }
}

impl<P> GrindEngine<P> {
    /// Create the participant's tasks for every day of the grind. Running it
    /// again creates nothing new.
    pub fn generate_tasks_for_participant(&self, grind_id: &str, user_id: &str) -> Result<usize> {
        self.db.transaction(|conn| {
            let grind = load_grind(conn, grind_id)?;
            users::get_user(conn, user_id)?.ok_or_else(|| CoreError::UserNotFound(user_id.to_string()))?;
            schedule_tasks(conn, &grind, user_id)
        })
    }

    /// Mark a task done with the submitted code. Finishing twice overwrites.
    pub fn finish_task(&self, task_id: &str, code: &str, language: &str) -> Result<Task> {
        let now = self.now();
        let task = self.db.transaction(|conn| {
            if tasks::finish_task(conn, task_id, &now, code, language)? == 0 {
                return Err(CoreError::TaskNotFound(task_id.to_string()));
            }
            tasks::get_task(conn, task_id)?.ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))
        })?;
        info!(task_id, user_id = %task.user_id, grind_id = %task.grind_id, "task finished");
        Ok(task)
    }

    /// Every task of the participant, oldest first, with its status.
    pub fn progress(&self, user_id: &str, grind_id: &str) -> Result<Vec<ProgressEntry>> {
        let now = self.now();
        let tasks = self
            .db
            .with_conn(|conn| tasks::tasks_for_participant(conn, user_id, grind_id))?;
        Ok(tasks.iter().map(|t| ProgressEntry::from_task(t, now)).collect())
    }
}

impl<P: ProblemSource> GrindEngine<P> {
    /// The participant's task for today, with a problem attached.
    ///
    /// "Today" runs from one hour before UTC midnight to 23:00 UTC.
    pub async fn get_today_task(&self, user_id: &str, grind_id: &str) -> Result<Task> {
        let (from, to) = today_window(self.now());
        let task = self
            .db
            .with_conn(|conn| tasks::task_in_window(conn, user_id, grind_id, &from, &to))?
            .ok_or_else(|| CoreError::NoTaskToday {
                user_id: user_id.to_string(),
                grind_id: grind_id.to_string(),
            })?;
        self.assign_problem_if_needed(task).await
    }

    pub async fn get_task(&self, task_id: &str, assign_if_needed: bool) -> Result<Task> {
        let task = self
            .db
            .with_conn(|conn| tasks::get_task(conn, task_id))?
            .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;
        if assign_if_needed {
            self.assign_problem_if_needed(task).await
        } else {
            Ok(task)
        }
    }

    /// Finish today's task of the user's ongoing grind.
    pub async fn finish_today_task(&self, user_id: &str, code: &str, language: &str) -> Result<Task> {
        let grind = self.ongoing_grind_for_user(user_id)?;
        let task = self.get_today_task(user_id, &grind.id).await?;
        self.finish_task(&task.id, code, language)
    }

    /// Make sure `task` and all of its siblings carry the same problem.
    ///
    /// An existing sibling problem wins. Otherwise one problem is fetched
    /// and written to every sibling still without one. Concurrent callers
    /// may each fetch, but only the first write lands.
    pub async fn assign_problem_if_needed(&self, task: Task) -> Result<Task> {
        if task.has_problem() {
            return Ok(task);
        }
        let day = task.day();
        let grind_id = task.grind_id.clone();

        let copied = self
            .db
            .transaction(|conn| copy_sibling_problem(conn, &grind_id, &day))?;

        if !copied {
            let problem = self.fetch_problem(ProblemSelector::Random).await?;
            let payload = problem.to_payload();
            self.db.transaction(|conn| {
                // Someone else may have assigned while we were fetching.
                if copy_sibling_problem(conn, &grind_id, &day)? {
                    return Ok(());
                }
                let filled = tasks::fill_problem(conn, &grind_id, &day, &payload)?;
                info!(grind_id = %grind_id, day = %day, title = %payload.title, filled, "problem assigned");
                Ok(())
            })?;
        }

        self.db
            .with_conn(|conn| tasks::get_task(conn, &task.id))?
            .ok_or_else(|| CoreError::TaskNotFound(task.id.clone()))
    }

    async fn fetch_problem(&self, selector: ProblemSelector) -> Result<Problem> {
        match tokio::time::timeout(self.fetch_timeout, self.problems.fetch(selector)).await {
            Ok(Ok(problem)) => Ok(problem),
            Ok(Err(e)) => {
                warn!(error = %e, "problem source failed");
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = self.fetch_timeout.as_millis() as u64, "problem source timed out");
                Err(CoreError::ProblemSourceUnavailable(format!(
                    "no answer within {} ms",
                    self.fetch_timeout.as_millis()
                )))
            }
        }
    }
}
