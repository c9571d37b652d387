//! Config file commands.

use clap::Subcommand;

use super::failed;
use crate::config::{self, Config};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dotted key, e.g. `capture.queue_limit`
        key: String,
    },
    /// Change one setting and save the file
    Set { key: String, value: String },
    /// Print every setting
    List,
    /// Print the config file location
    Path,
}

/// Read or change configuration
pub fn cmd_config(action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let value = config::load().get(key).map_err(|e| failed(e.into()))?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut current = config::load();
            current.set(key, value).map_err(|e| failed(e.into()))?;
            config::save(&current).map_err(|e| failed(e.into()))?;
            println!("{} = {}", key, current.get(key).map_err(|e| failed(e.into()))?);
        }
        ConfigAction::List => {
            let current = config::load();
            for key in Config::KEYS {
                let value = current.get(key).map_err(|e| failed(e.into()))?;
                println!("{:<34} {}", key, value);
            }
        }
        ConfigAction::Path => match config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine config directory"),
        },
    }
    Ok(())
}
