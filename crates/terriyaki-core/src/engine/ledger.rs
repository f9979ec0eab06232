use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use super::lifecycle::load_grind;
use super::scheduler::schedule_tasks;
use super::GrindEngine;
use crate::clock::start_of_day;
use crate::error::{CoreError, Result};
use crate::grind::Grind;
use crate::participation::{penalty_for, Accounting, ParticipantStanding, ParticipateRecord};
use crate::storage::{records, tasks, users};

fn record_not_found(user_id: &str, grind_id: &str) -> CoreError {
    CoreError::RecordNotFound {
        user_id: user_id.to_string(),
        grind_id: grind_id.to_string(),
    }
}

/// Record plus one task per day for `user_id`. Safe to repeat.
pub(super) fn enroll(conn: &Connection, grind: &Grind, user_id: &str, now: DateTime<Utc>) -> Result<bool> {
    let created = records::insert_record_if_absent(conn, user_id, &grind.id, &now)?;
    schedule_tasks(conn, grind, user_id)?;
    Ok(created)
}

/// Recompute and store accounting for one record. Quitted records keep what
/// was frozen when they quit.
fn settle(
    conn: &Connection,
    grind: &Grind,
    record: &ParticipateRecord,
    now: DateTime<Utc>,
) -> Result<Accounting> {
    if record.quitted {
        return Ok(Accounting::of(record));
    }
    let counted = tasks::count_missed(conn, &record.user_id, &grind.id, &start_of_day(now))?;
    let missed_days = counted.max(record.missed_days);
    let total_penalty = penalty_for(missed_days, grind.budget, grind.duration);
    records::store_accounting(conn, &record.user_id, &grind.id, missed_days, total_penalty)?;
    Ok(Accounting {
        missed_days,
        total_penalty,
    })
}

impl<P> GrindEngine<P> {
    /// Get-or-create the record for (user, grind).
    pub fn create_participate_record(&self, user_id: &str, grind_id: &str) -> Result<ParticipateRecord> {
        let now = self.now();
        self.db.transaction(|conn| {
            load_grind(conn, grind_id)?;
            users::get_user(conn, user_id)?
                .ok_or_else(|| CoreError::UserNotFound(user_id.to_string()))?;
            records::insert_record_if_absent(conn, user_id, grind_id, &now)?;
            records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))
        })
    }

    pub fn get_participate_record(&self, user_id: &str, grind_id: &str) -> Result<ParticipateRecord> {
        self.db.with_conn(|conn| {
            records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))
        })
    }

    /// Missed days so far and the penalty they cost.
    ///
    /// A day counts as missed once its task date is at or before the start
    /// of today (UTC) and the task is unfinished. The stored counter never
    /// decreases.
    pub fn compute_accounting(&self, user_id: &str, grind_id: &str) -> Result<Accounting> {
        let now = self.now();
        self.db.transaction(|conn| {
            let grind = load_grind(conn, grind_id)?;
            let record = records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))?;
            settle(conn, &grind, &record, now)
        })
    }

    /// Standing of every participant, in join order.
    pub fn standings(&self, grind_id: &str) -> Result<Vec<ParticipantStanding>> {
        let now = self.now();
        self.db.transaction(|conn| {
            let grind = load_grind(conn, grind_id)?;
            records::list_records(conn, grind_id)?
                .iter()
                .map(|record| {
                    let accounting = settle(conn, &grind, record, now)?;
                    Ok(ParticipantStanding {
                        user_id: record.user_id.clone(),
                        missed_days: accounting.missed_days,
                        total_penalty: accounting.total_penalty,
                        quitted: record.quitted,
                        quitted_at: record.quitted_at,
                    })
                })
                .collect()
        })
    }

    /// Leave a grind for good. The penalty becomes the whole budget.
    pub fn quit(&self, user_id: &str, grind_id: &str) -> Result<ParticipateRecord> {
        let now = self.now();
        let record = self.db.transaction(|conn| {
            let grind = load_grind(conn, grind_id)?;
            let record = records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))?;
            let already_quitted = || CoreError::AlreadyQuitted {
                user_id: user_id.to_string(),
                grind_id: grind_id.to_string(),
            };
            if record.quitted {
                return Err(already_quitted());
            }

            let missed_days = tasks::count_missed(conn, user_id, grind_id, &start_of_day(now))?
                .max(record.missed_days);
            if records::mark_quitted(conn, user_id, grind_id, missed_days, grind.budget, &now)? == 0 {
                return Err(already_quitted());
            }
            records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))
        })?;
        info!(
            user_id,
            grind_id,
            missed_days = record.missed_days,
            total_penalty = record.total_penalty,
            "participant quit"
        );
        Ok(record)
    }

    /// Enroll an existing user in an existing grind.
    pub fn add_participant(&self, grind_id: &str, user_id: &str) -> Result<ParticipateRecord> {
        let now = self.now();
        let record = self.db.transaction(|conn| {
            let grind = load_grind(conn, grind_id)?;
            users::get_user(conn, user_id)?
                .ok_or_else(|| CoreError::UserNotFound(user_id.to_string()))?;
            if !enroll(conn, &grind, user_id, now)? {
                return Err(CoreError::ParticipantAlreadyExists {
                    user_id: user_id.to_string(),
                    grind_id: grind_id.to_string(),
                });
            }
            records::get_record(conn, user_id, grind_id)?
                .ok_or_else(|| record_not_found(user_id, grind_id))
        })?;
        info!(user_id, grind_id, "participant added");
        Ok(record)
    }

    /// Drop a participant's record. Their tasks stay.
    pub fn remove_participant(&self, grind_id: &str, user_id: &str) -> Result<()> {
        let removed = self
            .db
            .with_conn(|conn| records::delete_record(conn, user_id, grind_id))?;
        if removed == 0 {
            return Err(CoreError::ParticipantNotFound(user_id.to_string()));
        }
        info!(user_id, grind_id, "participant removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::engine::testing::{fixture, request};
    use crate::error::{CoreError, ErrorCode};
    use crate::storage::tasks;

    #[test]
    fn record_creation_is_idempotent() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();
        let first = fx.engine.create_participate_record(&fx.bob.id, &grind.id).unwrap();
        let second = fx.engine.create_participate_record(&fx.bob.id, &grind.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.engine.get_grind(&grind.id).unwrap().participants.len(), 2);
    }

    #[test]
    fn missed_days_grow_with_time_and_never_shrink() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(4, 100, &[&fx.alice.id], fx.now - Duration::days(1)))
            .unwrap();

        let day1 = fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap();
        assert_eq!((day1.missed_days, day1.total_penalty), (1, 25));

        fx.clock.advance(Duration::days(1));
        let day2 = fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap();
        assert_eq!((day2.missed_days, day2.total_penalty), (2, 50));

        // Finishing an old task afterwards does not lower the counter.
        let tasks = fx
            .engine
            .database()
            .with_conn(|conn| tasks::tasks_for_participant(conn, &fx.alice.id, &grind.id))
            .unwrap();
        fx.engine.finish_task(&tasks[0].id, "x", "rust").unwrap();
        let later = fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap();
        assert_eq!(later.missed_days, 2);
    }

    #[test]
    fn completed_tasks_are_not_missed() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now - Duration::days(1)))
            .unwrap();
        let tasks = fx
            .engine
            .database()
            .with_conn(|conn| tasks::tasks_for_participant(conn, &fx.alice.id, &grind.id))
            .unwrap();
        fx.engine.finish_task(&tasks[0].id, "x", "rust").unwrap();
        let acc = fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap();
        assert_eq!(acc.missed_days, 0);
        assert_eq!(acc.total_penalty, 0);
    }

    #[test]
    fn quit_freezes_full_budget() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id, &fx.bob.id], fx.now - Duration::days(1)))
            .unwrap();
        assert_eq!(
            fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap().total_penalty,
            30
        );

        let record = fx.engine.quit(&fx.alice.id, &grind.id).unwrap();
        assert!(record.quitted);
        assert_eq!(record.quitted_at, Some(fx.now));
        assert_eq!(record.total_penalty, 90);
        assert_eq!(record.missed_days, 1);

        fx.clock.advance(Duration::days(1));
        let acc = fx.engine.compute_accounting(&fx.alice.id, &grind.id).unwrap();
        assert_eq!(acc.total_penalty, 90);
        assert_eq!(acc.missed_days, 1);

        let err = fx.engine.quit(&fx.alice.id, &grind.id).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyQuitted { .. }));
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn quit_without_joining_is_not_found() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();
        let err = fx.engine.quit(&fx.carol.id, &grind.id).unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));
    }

    #[test]
    fn add_and_remove_participants() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();

        fx.engine.add_participant(&grind.id, &fx.bob.id).unwrap();
        let err = fx.engine.add_participant(&grind.id, &fx.bob.id).unwrap_err();
        assert!(matches!(err, CoreError::ParticipantAlreadyExists { .. }));
        let progress = fx.engine.progress(&fx.bob.id, &grind.id).unwrap();
        assert_eq!(progress.len(), 3);

        fx.engine.remove_participant(&grind.id, &fx.bob.id).unwrap();
        assert_eq!(fx.engine.get_grind(&grind.id).unwrap().participants, vec![fx.alice.id.clone()]);
        // tasks stay behind
        assert_eq!(fx.engine.progress(&fx.bob.id, &grind.id).unwrap().len(), 3);

        let err = fx.engine.remove_participant(&grind.id, &fx.bob.id).unwrap_err();
        assert!(matches!(err, CoreError::ParticipantNotFound(_)));
    }

    #[test]
    fn standings_cover_everyone() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id, &fx.bob.id], fx.now - Duration::days(1)))
            .unwrap();
        fx.engine.quit(&fx.bob.id, &grind.id).unwrap();
        let standings = fx.engine.standings(&grind.id).unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].total_penalty, 30);
        assert!(standings[1].quitted);
        assert_eq!(standings[1].total_penalty, 90);
    }
}
