mod cli;
mod commands;

use checkout::RecurringCache;
use clap::Parser;
use locksmith::{
    http::LocksmithClient,
    mock::{MockIndexer, MockLockReader, MockLocksmith},
    rpc::RpcLockReader,
    subgraph::SubgraphClient,
    IndexerApi, LockReader, LocksmithApi,
};
use receipts::{PollingConfig, ReceiptService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Remote clients shared by the commands.
pub struct Services {
    pub receipts: ReceiptService,
    pub indexer: Arc<dyn IndexerApi>,
    pub recurring: Arc<RecurringCache>,
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn create_services(cfg: &config::AppConfig) -> anyhow::Result<Services> {
    let (locksmith, indexer, lock_reader): (
        Arc<dyn LocksmithApi>,
        Arc<dyn IndexerApi>,
        Arc<dyn LockReader>,
    ) = match cfg.locksmith.kind.as_str() {
        "http" => {
            if cfg.locksmith.host.is_empty() {
                anyhow::bail!("Locksmith host not configured");
            }
            let token = config::locksmith_token();
            if token.is_none() {
                tracing::info!("No locksmith access token, requests are unauthenticated");
            }
            tracing::info!(host = %cfg.locksmith.host, "Using locksmith API");
            let locksmith: Arc<dyn LocksmithApi> = LocksmithClient::new(&cfg.locksmith.host, token);
            let indexer: Arc<dyn IndexerApi> = SubgraphClient::new(cfg.subgraphs());
            let lock_reader: Arc<dyn LockReader> = RpcLockReader::new(cfg.providers());
            (locksmith, indexer, lock_reader)
        }
        "mock" => {
            tracing::info!("Using mock locksmith");
            let locksmith: Arc<dyn LocksmithApi> = MockLocksmith::new();
            let indexer: Arc<dyn IndexerApi> = MockIndexer::new();
            let lock_reader: Arc<dyn LockReader> = MockLockReader::new();
            (locksmith, indexer, lock_reader)
        }
        other => anyhow::bail!("Unknown locksmith kind `{other}`"),
    };

    let polling = PollingConfig {
        interval: cfg.polling.interval(),
        timeout: cfg.polling.timeout(),
    };
    Ok(Services {
        receipts: ReceiptService::new(locksmith, Arc::clone(&indexer), Arc::clone(&lock_reader))
            .with_polling(polling),
        indexer,
        recurring: RecurringCache::new(lock_reader),
    })
}

fn load_config(cli: &cli::Cli) -> anyhow::Result<config::AppConfig> {
    match &cli.config {
        Some(path) => config::load_path(path),
        None => Ok(config::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to default config");
            config::AppConfig::default()
        })),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = cli::Cli::parse();
    let cfg = load_config(&cli)?;
    commands::run(cli, cfg).await
}
