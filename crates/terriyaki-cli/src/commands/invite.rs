use clap::Subcommand;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum InviteAction {
    /// Invite a user into a grind
    Create {
        /// Grind id
        grind: String,
        /// Invitee email or id
        to: String,
    },
    /// Accept an invitation you received
    Accept { id: String },
    /// Reject an invitation you received
    Reject { id: String },
}

pub fn run(ctx: &Context, action: InviteAction) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor()?;
    let message = match action {
        InviteAction::Create { grind, to } => ctx.engine.create_invitation(&actor.id, &to, &grind)?,
        InviteAction::Accept { id } => ctx.engine.accept(&id, &actor.id)?,
        InviteAction::Reject { id } => ctx.engine.reject(&id, &actor.id)?,
    };
    print_json(&message)
}
