//! `reportgen config init|show|path`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use reportgen_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default config file if none exists.
    Init,

    /// Print the effective configuration (API key masked).
    Show,

    /// Print the config file location.
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let (path, _) = config::init().context("failed to initialise config")?;
            println!("{} Config ready at {}", "✓".green(), path.display());
        }
        ConfigCommand::Show => {
            let mut settings = config::load().context("failed to load config")?;
            if settings.service.api_key.is_some() {
                settings.service.api_key = Some("********".to_string());
            }
            print!("{}", serde_yaml::to_string(&settings)?);
        }
        ConfigCommand::Path => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            println!("{}", config::config_path_at(&home).display());
        }
    }
    Ok(())
}
