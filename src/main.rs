use std::sync::Arc;

use rebalancer::chain::RpcBalanceSource;
use rebalancer::config::RebalancerConfig;
use rebalancer::execution::swap::SwapExecutor;
use rebalancer::pricefeed::CryptoComparePrices;
use rebalancer::services::run_rebalancer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RebalancerConfig::from_env()?;

    if let Some(addr) = config.metrics_addr {
        rebalancer::metrics::init_metrics(addr)?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let balances = RpcBalanceSource::new(config.rpc_url.clone(), config.request_timeout)?;
    let prices = CryptoComparePrices::new(config.price_api_base.clone(), config.request_timeout)?;

    // On-chain execution (approval + router swap + broadcast) plugs in here.
    let executor: Option<Arc<dyn SwapExecutor>> = None;

    tracing::info!(
        holder = %config.holder,
        tokens = config.tokens.len(),
        interval_secs = config.interval_secs,
        dry_run = config.dry_run,
        "Starting portfolio rebalancer"
    );
    if !config.dry_run && executor.is_none() {
        tracing::warn!("DRY_RUN=false but no swap executor is wired — plans will not be executed");
    }

    run_rebalancer(config, balances, prices, executor).await;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
