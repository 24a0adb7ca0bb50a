use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use nutrify::config::Config;
use nutrify::gemini::GeminiClient;
use nutrify::server::Server;

#[derive(Args)]
pub struct ServeArgs {
    /// Override the bind address from the config
    #[arg(long)]
    pub bind: Option<String>,

    /// Override the port from the config
    #[arg(long, short)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> Result<()> {
    let mut config = Config::load(config_path)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let client = GeminiClient::new(&config.gemini)?;

    Server::new(&config, Arc::new(client)).run().await
}
