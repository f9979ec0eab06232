use clap::Subcommand;
use terriyaki_core::{Config, ConfigError, CoreError};

use crate::context::{load_config, print_json};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole configuration
    Show,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "problems.source", "log.level")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut config) = load_config()?;
    match action {
        ConfigAction::Show => print_json(&config)?,
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(CoreError::from(ConfigError::UnknownKey(key)).into()),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save_to(&dir)?;
            println!("ok");
        }
        ConfigAction::Path => println!("{}", Config::path_in(&dir).display()),
    }
    Ok(())
}
