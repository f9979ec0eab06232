//! Grind management commands for CLI.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use terriyaki_core::{CoreError, CreateGrindRequest, GrindUpdate, ValidationError};

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum GrindAction {
    /// Create a grind with every listed participant enrolled
    Create {
        /// Number of days
        #[arg(long)]
        duration: i64,
        /// Money at stake per participant
        #[arg(long)]
        budget: i64,
        /// Participant email or id (repeatable)
        #[arg(long = "participant", required = true)]
        participants: Vec<String>,
        /// First day, as RFC 3339 or YYYY-MM-DD (defaults to now)
        #[arg(long)]
        start: Option<String>,
    },
    /// Start a grind yourself and invite others to it
    Start {
        #[arg(long)]
        duration: i64,
        #[arg(long)]
        budget: i64,
        /// Invitee email or id (repeatable)
        #[arg(long = "invite")]
        invitees: Vec<String>,
        #[arg(long)]
        start: Option<String>,
    },
    /// Show a grind with standings and your own progress
    Show { id: String },
    /// Show your ongoing grind
    Current,
    /// List grinds you take part in
    List,
    /// Change duration or budget
    Update {
        id: String,
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long)]
        budget: Option<i64>,
    },
    /// Delete a grind with its tasks and records
    Delete { id: String },
    /// Quit a grind (defaults to your ongoing one)
    Quit { id: Option<String> },
    /// Enroll a user directly
    AddParticipant {
        id: String,
        /// Email or id
        user: String,
    },
    /// Remove a participant's record
    RemoveParticipant { id: String, user: String },
    /// Missed days and penalties of every participant
    Standing { id: String },
}

fn parse_start(value: Option<String>, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
    let Some(value) = value else {
        return Ok(now);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| {
            ValidationError::invalid("start", format!("'{value}' is neither RFC 3339 nor YYYY-MM-DD")).into()
        })
}

pub async fn run(ctx: &Context, action: GrindAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        GrindAction::Create {
            duration,
            budget,
            participants,
            start,
        } => {
            let grind = ctx.engine.create_grind(CreateGrindRequest {
                duration,
                budget,
                participants,
                start_date: parse_start(start, ctx.engine.now())?,
            })?;
            print_json(&grind)?;
        }
        GrindAction::Start {
            duration,
            budget,
            invitees,
            start,
        } => {
            let actor = ctx.actor()?;
            let grind = ctx.engine.start_grind(
                &actor.id,
                CreateGrindRequest {
                    duration,
                    budget,
                    participants: invitees,
                    start_date: parse_start(start, ctx.engine.now())?,
                },
            )?;
            print_json(&grind)?;
        }
        GrindAction::Show { id } => {
            let actor = ctx.actor()?;
            print_json(&ctx.engine.grind_overview(&actor.id, &id).await?)?;
        }
        GrindAction::Current => {
            let actor = ctx.actor()?;
            let grind = ctx.engine.ongoing_grind_for_user(&actor.id)?;
            print_json(&ctx.engine.grind_overview(&actor.id, &grind.id).await?)?;
        }
        GrindAction::List => {
            let actor = ctx.actor()?;
            print_json(&ctx.engine.list_user_grinds(&actor.id)?)?;
        }
        GrindAction::Update {
            id,
            duration,
            budget,
        } => {
            let grind = ctx.engine.update_grind(&id, GrindUpdate { duration, budget })?;
            print_json(&grind)?;
        }
        GrindAction::Delete { id } => print_json(&ctx.engine.delete_grind(&id)?)?,
        GrindAction::Quit { id } => {
            let actor = ctx.actor()?;
            let grind_id = ctx.grind_or_current(id)?;
            print_json(&ctx.engine.quit(&actor.id, &grind_id)?)?;
        }
        GrindAction::AddParticipant { id, user } => {
            let user = ctx.engine.resolve_user(&user)?;
            print_json(&ctx.engine.add_participant(&id, &user.id)?)?;
        }
        GrindAction::RemoveParticipant { id, user } => {
            let user = ctx.engine.resolve_user(&user)?;
            ctx.engine.remove_participant(&id, &user.id)?;
            println!("removed {} from {id}", user.id);
        }
        GrindAction::Standing { id } => print_json(&ctx.engine.standings(&id)?)?,
    }
    Ok(())
}
