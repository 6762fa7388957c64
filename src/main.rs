use anyhow::Context;
use clap::Parser;

use roost::Settings;
use roost::cli::commands::{cache, init, resolve, serve, worker};
use roost::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    let config = match &cli.command {
        // Init must work even when an existing roost.toml is broken
        Commands::Init { .. } => {
            let mut settings = Settings::default();
            settings.apply(&overrides);
            settings
        }
        Commands::Worker => match Settings::from_worker_env() {
            Some(settings) => settings.context("invalid worker settings from supervisor")?,
            None => load_settings(&cli, &overrides)?,
        },
        _ => load_settings(&cli, &overrides)?,
    };

    roost::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(&config.home, force),
        Commands::Config => init::run_config(&config),
        Commands::Serve {
            single, no_watch, ..
        } => serve::run(serve::ServeArgs { single, no_watch }, config).await?,
        Commands::Worker => {
            worker::run(config).await?;
            // The stdin reader thread would otherwise hold up runtime shutdown
            std::process::exit(0);
        }
        Commands::Resolve {
            component,
            subcomponent,
        } => resolve::run(&config, &component, subcomponent.as_deref()).await,
        Commands::Cache { action } => cache::run(action, &config).await?,
    }

    Ok(())
}

fn load_settings(cli: &Cli, overrides: &roost::config::Overrides) -> anyhow::Result<Settings> {
    Settings::load(cli.config.as_deref(), overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))
}
