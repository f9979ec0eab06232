//! Daily task commands for CLI.

use std::path::PathBuf;

use clap::Subcommand;
use terriyaki_core::CoreError;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Today's task, assigning the day's problem if needed
    Today {
        /// Grind id (defaults to your ongoing grind)
        #[arg(long)]
        grind: Option<String>,
    },
    /// Show a task by id
    Show {
        id: String,
        /// Do not assign a problem if the task has none yet
        #[arg(long)]
        no_assign: bool,
    },
    /// Submit code for a task (defaults to today's task)
    Finish {
        id: Option<String>,
        /// Submitted code
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,
        /// Read the submitted code from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Language of the submission
        #[arg(long, default_value = "python")]
        language: String,
    },
    /// Status of every task in a grind
    Progress {
        #[arg(long)]
        grind: Option<String>,
    },
}

pub async fn run(ctx: &Context, action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TaskAction::Today { grind } => {
            let actor = ctx.actor()?;
            let grind_id = ctx.grind_or_current(grind)?;
            print_json(&ctx.engine.get_today_task(&actor.id, &grind_id).await?)?;
        }
        TaskAction::Show { id, no_assign } => {
            print_json(&ctx.engine.get_task(&id, !no_assign).await?)?;
        }
        TaskAction::Finish {
            id,
            code,
            file,
            language,
        } => {
            let actor = ctx.actor()?;
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(CoreError::from)?,
                (None, None) => String::new(),
            };
            let task = match id {
                Some(id) => {
                    let task = ctx.engine.get_task(&id, false).await?;
                    if task.user_id != actor.id {
                        return Err(CoreError::Forbidden {
                            actor: actor.id,
                            action: "finish another user's task".into(),
                        }
                        .into());
                    }
                    ctx.engine.finish_task(&id, &code, &language)?
                }
                None => ctx.engine.finish_today_task(&actor.id, &code, &language).await?,
            };
            print_json(&task)?;
        }
        TaskAction::Progress { grind } => {
            let actor = ctx.actor()?;
            let grind_id = ctx.grind_or_current(grind)?;
            print_json(&ctx.engine.progress(&actor.id, &grind_id)?)?;
        }
    }
    Ok(())
}
