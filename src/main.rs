mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use proclink::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(mut args) => {
            let mut config = Config::from_sources(args.config.take())?;
            args.apply(&mut config);
            config.validate()?;

            proclink::api::run(config).await?
        }
    }

    Ok(())
}
