mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod executor;
mod output;
mod setup;

use anyhow::{Result, anyhow};
use clap::Parser;
use cli::{Cli, Commands};
use commands::check::CheckOptions;
use config::CliConfig;
use keypool_core::history::HistoryStore;
use keypool_core::models::Provider;
use keypool_core::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let _guard = init_logging(cli.verbose)?;
    let config = CliConfig::load();
    let format = cli.format;

    if let Commands::History { command } = cli.command {
        let store = HistoryStore::new(paths::history_path()?);
        return commands::history::run(&store, command, format);
    }

    let server = config.server_url(cli.server);
    let token = config.admin_token(cli.token);
    let executor = executor::create(server, token, cli.db_path).await?;

    match cli.command {
        Commands::Check {
            provider,
            keys,
            file,
            save,
            yes,
            copy_valid,
        } => {
            let provider = match provider {
                Some(provider) => provider,
                None => default_provider(&config)?,
            };
            let options = CheckOptions {
                provider,
                raw_keys: commands::utils::read_key_input(&keys, file.as_deref())?,
                save,
                yes,
                copy_valid,
            };
            let history = HistoryStore::new(paths::history_path()?);
            commands::check::run(executor, &history, options, format).await
        }
        Commands::Keys { command } => commands::keys::run(executor, command, format).await,
        Commands::Admin { command } => commands::admin::run(executor, command, format).await,
        Commands::History { .. } | Commands::Completions { .. } => Ok(()),
    }
}

fn default_provider(config: &CliConfig) -> Result<Provider> {
    let provider = config
        .default
        .provider
        .as_deref()
        .ok_or_else(|| anyhow!("A provider is required: pass --provider"))?;
    Ok(provider.parse()?)
}

/// Log to a daily file so command output stays clean.
fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(paths::logs_dir()?, "keypool.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}
