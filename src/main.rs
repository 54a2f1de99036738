use clap::Parser;
use database::Database;
use responder::{Responder, ResponderService};
use responder_core::{AppConfig, CoreError, ErrorReporter, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use twitter_client::TwitterClient;

const DEFAULT_LOG_FILTER: &str =
    "hashtag_responder=info,responder=info,twitter_client=info,database=info";

/// Reply to new posts matching a hashtag search.
#[derive(Debug, Parser)]
#[command(name = "hashtag-responder", version, about)]
struct Cli {
    /// Record replies without sending them
    #[arg(long)]
    dry_run: bool,

    /// Path to the JSON or TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Keep polling at the configured interval until Ctrl-C
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting hashtag-responder");

    let reporter = ErrorReporter::new();
    run(cli).await.map_err(|e| {
        reporter.report_error(&e);
        e
    })
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = AppConfig::load(&cli.config).await?;
    config.validate()?;

    let run_config = config.run_config(cli.dry_run);
    if run_config.dry_run {
        tracing::info!("Dry run: replies are recorded but not sent");
    }

    let store = Database::open(config.database_url.clone()).await?;
    let client = TwitterClient::new(&config.credentials)?;
    let responder = Responder::new(client, store, config.key_prefix.clone());
    let service = ResponderService::new(responder, run_config, config.poll_interval());

    let result = if cli.watch {
        service.run_forever().await.map(|runs| {
            tracing::info!("Stopped after {} runs", runs);
        })
    } else {
        service.run_once().await.map(|_| ())
    };

    service.responder().store().close().await;
    result
}
