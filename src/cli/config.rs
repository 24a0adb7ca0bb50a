use anyhow::Result;
use clap::{Args, Subcommand};

use nutrify::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved configuration
    Show,
    /// Print the config file path
    Path,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load(config_path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            let path = match config_path {
                Some(p) => p.to_string(),
                None => Config::config_path()?.display().to_string(),
            };
            println!("{}", path);
        }
    }
    Ok(())
}
