use rusqlite::Connection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ledger::enroll;
use super::GrindEngine;
use crate::error::{CoreError, Result};
use crate::grind::{CreateGrindRequest, Grind, GrindDeletion, GrindOverview, GrindUpdate};
use crate::problems::ProblemSource;
use crate::storage::{grinds, records, tasks};
use crate::user::{User, UserDirectory};

/// Load a grind or fail with `GrindNotFound`.
pub(super) fn load_grind(conn: &Connection, id: &str) -> Result<Grind> {
    grinds::get_grind(conn, id)?.ok_or_else(|| CoreError::GrindNotFound(id.to_string()))
}

impl<P> GrindEngine<P> {
    /// Create a grind with every listed participant enrolled.
    ///
    /// Identifiers are emails or user ids; duplicates collapse to one
    /// participant. Nothing is written unless every identifier resolves.
    pub fn create_grind(&self, request: CreateGrindRequest) -> Result<Grind> {
        request.validate()?;
        let members = self.resolve_participants(&request.participants)?;
        let participants = members.into_iter().map(|u| u.id).collect();
        self.insert_grind(&request, participants)
    }

    /// Create a grind as `creator_id`, who becomes its only participant.
    /// Everybody else listed in the request gets an invitation instead.
    pub fn start_grind(&self, creator_id: &str, request: CreateGrindRequest) -> Result<Grind> {
        let creator = self.resolve_user(creator_id)?;
        let solo = CreateGrindRequest {
            duration: request.duration,
            budget: request.budget,
            start_date: request.start_date,
            participants: vec![creator.id.clone()],
        };
        solo.validate()?;

        let invitees: Vec<User> = self
            .resolve_participants(&request.participants)?
            .into_iter()
            .filter(|u| u.id != creator.id)
            .collect();
        let grind = self.insert_grind(&solo, vec![creator.id.clone()])?;

        for invitee in &invitees {
            if let Err(e) = self.invite(&creator, invitee, &grind.id) {
                warn!(grind_id = %grind.id, invitee = %invitee.id, error = %e, "skipping invitation");
            }
        }
        Ok(grind)
    }

    fn resolve_participants(&self, identifiers: &[String]) -> Result<Vec<User>> {
        let mut users: Vec<User> = Vec::new();
        for identifier in identifiers.iter().map(|i| i.trim()).filter(|i| !i.is_empty()) {
            let user = self.db.resolve(identifier).map_err(|e| match e {
                CoreError::UserNotFound(_) => CoreError::ParticipantNotFound(identifier.to_string()),
                other => other,
            })?;
            if !users.iter().any(|u| u.id == user.id) {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn insert_grind(&self, request: &CreateGrindRequest, participants: Vec<String>) -> Result<Grind> {
        let now = self.now();
        let grind = Grind {
            id: Uuid::new_v4().to_string(),
            duration: request.duration,
            budget: request.budget,
            start_date: request.start_date,
            participants,
            created_at: now,
            updated_at: now,
        };

        self.db.transaction(|conn| {
            grinds::insert_grind(conn, &grind)?;
            for user_id in &grind.participants {
                enroll(conn, &grind, user_id, now)?;
            }
            Ok(())
        })?;

        info!(
            grind_id = %grind.id,
            participants = grind.participants.len(),
            duration = grind.duration,
            budget = grind.budget,
            "grind created"
        );
        Ok(grind)
    }

    pub fn get_grind(&self, id: &str) -> Result<Grind> {
        self.db.with_conn(|conn| load_grind(conn, id))
    }

    /// Every grind the user ever joined, newest first.
    pub fn list_user_grinds(&self, user_id: &str) -> Result<Vec<Grind>> {
        self.db.with_conn(|conn| grinds::grinds_for_user(conn, user_id))
    }

    /// The most recently created grind the user has not quit and that has
    /// not ended yet.
    pub fn ongoing_grind_for_user(&self, user_id: &str) -> Result<Grind> {
        let now = self.now();
        let candidates = self
            .db
            .with_conn(|conn| grinds::active_grinds_for_user(conn, user_id))?;
        debug!(user_id, candidates = candidates.len(), "ongoing grind lookup");
        for grind in candidates {
            if grind.is_ongoing_at(now)? {
                return Ok(grind);
            }
        }
        Err(CoreError::NoOngoingGrind(user_id.to_string()))
    }

    /// Change duration and/or budget. Existing tasks are left as they are.
    pub fn update_grind(&self, id: &str, update: GrindUpdate) -> Result<Grind> {
        update.validate()?;
        let now = self.now();
        let grind = self.db.transaction(|conn| {
            let current = load_grind(conn, id)?;
            if update.is_empty() {
                return Ok(current);
            }
            let duration = update.duration.unwrap_or(current.duration);
            let budget = update.budget.unwrap_or(current.budget);
            grinds::update_grind(conn, id, duration, budget, &now)?;
            load_grind(conn, id)
        })?;
        info!(grind_id = %id, duration = grind.duration, budget = grind.budget, "grind updated");
        Ok(grind)
    }

    /// Delete a grind with all of its tasks and participation records.
    /// Invitations pointing at it are kept.
    pub fn delete_grind(&self, id: &str) -> Result<GrindDeletion> {
        let deletion = self.db.transaction(|conn| {
            load_grind(conn, id)?;
            let deleted_tasks = tasks::delete_tasks_for_grind(conn, id)?;
            let deleted_records = records::delete_records_for_grind(conn, id)?;
            grinds::delete_grind(conn, id)?;
            Ok(GrindDeletion {
                grind_id: id.to_string(),
                deleted_tasks,
                deleted_records,
            })
        })?;
        info!(
            grind_id = %id,
            tasks = deletion.deleted_tasks,
            records = deletion.deleted_records,
            "grind deleted"
        );
        Ok(deletion)
    }
}

impl<P: ProblemSource> GrindEngine<P> {
    /// The grind as seen by `viewer_id`: every participant's standing plus
    /// the viewer's own task for today and progress.
    pub async fn grind_overview(&self, viewer_id: &str, grind_id: &str) -> Result<GrindOverview> {
        let grind = self.get_grind(grind_id)?;
        let participants = self.standings(grind_id)?;
        let viewer = participants.iter().find(|p| p.user_id == viewer_id);
        let quitted = viewer.is_some_and(|p| p.quitted);

        let (today_task, progress) = if viewer.is_some() {
            let today = match self.get_today_task(viewer_id, grind_id).await {
                Ok(task) => Some(task),
                Err(CoreError::NoTaskToday { .. }) => None,
                Err(e) => return Err(e),
            };
            (today, self.progress(viewer_id, grind_id)?)
        } else {
            (None, Vec::new())
        };

        Ok(GrindOverview {
            grind,
            participants,
            quitted,
            today_task,
            progress,
        })
    }
}
