use clap::Subcommand;
use terriyaki_core::RegisterUser;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a new user
    Register {
        /// Display name
        username: String,
        /// Email address (must be unique)
        email: String,
        /// Avatar URL
        #[arg(long, default_value = "")]
        avatar: String,
    },
    /// List all users
    List,
    /// Show a user by email or id (defaults to yourself)
    Show { who: Option<String> },
}

pub fn run(ctx: &Context, action: UserAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Register {
            username,
            email,
            avatar,
        } => {
            let user = ctx.engine.register_user(RegisterUser {
                username,
                email,
                avatar,
            })?;
            print_json(&user)?;
        }
        UserAction::List => print_json(&ctx.engine.list_users()?)?,
        UserAction::Show { who } => {
            let user = match who {
                Some(who) => ctx.engine.resolve_user(&who)?,
                None => ctx.actor()?,
            };
            print_json(&user)?;
        }
    }
    Ok(())
}
