pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nutrify")]
#[command(author, version, about = "Nutritional insights from food photos, powered by Gemini")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "NUTRIFY_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web UI server
    Serve(serve::ServeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}
