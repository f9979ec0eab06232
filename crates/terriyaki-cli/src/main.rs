use clap::{Args, Parser, Subcommand};
use terriyaki_core::{CoreError, ErrorCode};
use tracing::debug;

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "terriyaki", version, about = "Terriyaki grind tracker")]
struct Cli {
    #[command(flatten)]
    identity: Identity,

    #[command(subcommand)]
    command: Commands,
}

/// Who is running the command.
#[derive(Args)]
pub struct Identity {
    /// Act as this user (email or id)
    #[arg(long = "as", global = true, env = "TERRIYAKI_USER", conflicts_with = "token")]
    pub as_user: Option<String>,
    /// Access token from the `[auth.tokens]` table
    #[arg(long, global = true, env = "TERRIYAKI_TOKEN")]
    pub token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// User registration and lookup
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Grind management
    Grind {
        #[command(subcommand)]
        action: commands::grind::GrindAction,
    },
    /// Daily tasks
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Messages between users
    Message {
        #[command(subcommand)]
        action: commands::message::MessageAction,
    },
    /// Grind invitations
    Invite {
        #[command(subcommand)]
        action: commands::invite::InviteAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli { identity, command } = cli;
    let open = move || context::Context::open(identity);
    match command {
        Commands::User { action } => commands::user::run(&open()?, action),
        Commands::Grind { action } => commands::grind::run(&open()?, action).await,
        Commands::Task { action } => commands::task::run(&open()?, action).await,
        Commands::Message { action } => commands::message::run(&open()?, action),
        Commands::Invite { action } => commands::invite::run(&open()?, action),
        // Config commands never touch the database.
        Commands::Config { action } => commands::config::run(action),
    }
}

fn exit_status(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::Internal => 1,
        ErrorCode::ValidationError => 2,
        ErrorCode::NotFound => 3,
        ErrorCode::Forbidden => 4,
        ErrorCode::Conflict => 5,
        ErrorCode::Unauthorized => 6,
        ErrorCode::UpstreamUnavailable => 7,
    }
}

/// One stderr line per failure. Storage and IO detail stays in the debug log;
/// configuration problems are shown since the user has to fix them.
fn render(core: &CoreError) -> String {
    match core {
        CoreError::Config(_) => format!("error[{}]: {core}", core.code()),
        _ if core.code() == ErrorCode::Internal => {
            debug!(error = %core, "internal error");
            format!("error[{}]: internal error (set RUST_LOG=debug for details)", core.code())
        }
        _ => format!("error[{}]: {core}", core.code()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<CoreError>() {
            Some(core) => {
                eprintln!("{}", render(core));
                std::process::exit(exit_status(core.code()));
            }
            None => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terriyaki_core::{ConfigError, DatabaseError};

    #[test]
    fn storage_detail_is_not_printed() {
        let err = CoreError::Database(DatabaseError::QueryFailed(
            "no such column: tasks.problem_json".into(),
        ));
        let line = render(&err);
        assert!(line.starts_with("error[INTERNAL]: internal error"));
        assert!(!line.contains("problem_json"));
    }

    #[test]
    fn other_errors_keep_their_message() {
        let err = CoreError::GrindNotFound("g1".into());
        assert_eq!(render(&err), "error[NOT_FOUND]: Grind not found: g1");

        let err = CoreError::Config(ConfigError::UnknownKey("no.such.key".into()));
        assert!(render(&err).contains("no.such.key"));
    }

    #[test]
    fn exit_status_per_code() {
        assert_eq!(exit_status(ErrorCode::Internal), 1);
        assert_eq!(exit_status(ErrorCode::NotFound), 3);
        assert_eq!(exit_status(ErrorCode::UpstreamUnavailable), 7);
    }
}
