//! Shared state for commands that need the engine.

use std::path::PathBuf;

use serde::Serialize;
use terriyaki_core::error::Result;
use terriyaki_core::storage::data_dir;
use terriyaki_core::{
    AuthProvider, Config, ConfiguredSource, CoreError, Database, GrindEngine, ProblemListCache, User,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::Identity;

pub struct Context {
    pub engine: GrindEngine<ConfiguredSource>,
    config: Config,
    identity: Identity,
}

impl Context {
    /// Load configuration, start logging and open the database.
    pub fn open(identity: Identity) -> Result<Self> {
        let (dir, config) = load_config()?;
        init_tracing(&config.log.level);

        let db_path = dir.join(&config.database.file);
        debug!(path = %db_path.display(), source = ?config.problems.source, "opening database");
        let db = Database::open(&db_path)?;
        let cache = ProblemListCache::default();
        let source = ConfiguredSource::from_config(&config.problems, &cache)?;
        let engine = GrindEngine::new(db, source).with_fetch_timeout(config.problems.fetch_timeout());
        Ok(Self {
            engine,
            config,
            identity,
        })
    }

    /// The user this invocation acts for, from `--token` or `--as`.
    pub fn actor(&self) -> Result<User> {
        if let Some(token) = &self.identity.token {
            let user_id = self.config.token_table().verify_access(token)?;
            return self.engine.resolve_user(&user_id);
        }
        match &self.identity.as_user {
            Some(who) => self.engine.resolve_user(who),
            None => Err(CoreError::Unauthorized),
        }
    }

    /// The grind named on the command line, else the actor's ongoing one.
    pub fn grind_or_current(&self, grind_id: Option<String>) -> Result<String> {
        match grind_id {
            Some(id) => Ok(id),
            None => Ok(self.engine.ongoing_grind_for_user(&self.actor()?.id)?.id),
        }
    }
}

pub fn load_config() -> Result<(PathBuf, Config)> {
    let dir = data_dir()?;
    let config = Config::load_from(&dir)?;
    Ok((dir, config))
}

/// Logs go to stderr; stdout carries JSON only.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_json<T: Serialize>(value: &T) -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
