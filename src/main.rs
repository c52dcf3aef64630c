use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pi_relay::application::relay::PaymentRelay;
use pi_relay::config::Config;
use pi_relay::domain::ports::{PaymentAuthorityBox, PaymentStoreBox};
use pi_relay::infrastructure::in_memory::InMemoryPaymentStore;
use pi_relay::infrastructure::pi_api::PiApiClient;
#[cfg(feature = "storage-rocksdb")]
use pi_relay::infrastructure::rocksdb::RocksDBPaymentStore;
use pi_relay::interfaces::http;
use std::io::IsTerminal;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = Config::parse();

    // Fail fast on bad configuration before touching storage or the network
    let pi_api = config.pi_api().into_diagnostic()?;
    let address = config.listen_addr().into_diagnostic()?;
    let policy = config.claim_policy().into_diagnostic()?;

    let store = open_store(&config)?;

    let authority: PaymentAuthorityBox = Box::new(PiApiClient::new(pi_api).into_diagnostic()?);
    let relay = PaymentRelay::new(store, authority, policy);

    let listener = TcpListener::bind(address).await.into_diagnostic()?;
    http::serve(listener, http::router(relay))
        .await
        .into_diagnostic()?;

    Ok(())
}

fn open_store(config: &Config) -> Result<PaymentStoreBox> {
    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            info!("Using RocksDB payment store at {}", path.display());
            let store = RocksDBPaymentStore::open(path).into_diagnostic()?;
            if let Some(estimate) = store.estimated_records().into_diagnostic()? {
                info!("~{estimate} payment records on disk");
            }
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryPaymentStore::new()))
        }
        None => {
            info!("Using in-memory payment store");
            Ok(Box::new(InMemoryPaymentStore::new()))
        }
    }
}
