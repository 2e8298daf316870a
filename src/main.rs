use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use telemeter_forward::app::AppState;
use telemeter_forward::cli::Cli;
use telemeter_forward::config::ForwarderCfg;
use telemeter_forward::metrics::{FORWARD_METRICS, REGISTRY};
use telemeter_forward::readiness::Readiness;
use telemeter_forward::store::{self, MemStore};
use telemeter_forward::{http, ForwardStore, Forwarder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = ForwarderCfg::load(&cli.overrides())?;

    if cli.print_bind {
        println!("{}", cfg.http.bind);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    cfg.validate()?;
    let url = cfg.forward_url()?;

    let memstore = Arc::new(MemStore::new(cfg.store.ttl()));
    store::start_cleanup(memstore.clone(), cfg.store.cleanup_interval());

    let forwarder = Arc::new(Forwarder::new(url, FORWARD_METRICS.clone())?);
    tracing::info!(url = %forwarder.url(), "forwarding uploads to receive endpoint");

    let state = AppState {
        cfg: Arc::new(cfg),
        ready: Arc::new(Readiness::new()),
        store: Arc::new(ForwardStore::new(memstore, forwarder)),
        registry: REGISTRY.clone(),
    };

    http::serve(state).await?;
    tracing::info!("shut down");
    Ok(())
}
