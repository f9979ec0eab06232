use clap::Subcommand;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum MessageAction {
    /// Send a message to another user
    Send {
        /// Receiver email or id
        to: String,
        content: String,
    },
    /// Messages you received, newest first
    Inbox {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Messages you sent, newest first
    Sent {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Mark a received message as read
    Read { id: String },
}

pub fn run(ctx: &Context, action: MessageAction) -> Result<(), Box<dyn std::error::Error>> {
    let actor = ctx.actor()?;
    match action {
        MessageAction::Send { to, content } => {
            print_json(&ctx.engine.send_message(&actor.id, &to, &content)?)?;
        }
        MessageAction::Inbox { offset, limit } => {
            print_json(&ctx.engine.inbox(&actor.id, offset, limit)?)?;
        }
        MessageAction::Sent { offset, limit } => {
            print_json(&ctx.engine.sent(&actor.id, offset, limit)?)?;
        }
        MessageAction::Read { id } => print_json(&ctx.engine.mark_read(&id, &actor.id)?)?,
    }
    Ok(())
}
