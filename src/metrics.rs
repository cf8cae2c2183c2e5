use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own HTTP listener and pre-register
/// all application metrics so they appear even before the first increment.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    counter!("rebalance_cycles_total").absolute(0);
    counter!("rebalance_cycles_failed").absolute(0);
    counter!("plans_skipped_total").absolute(0);
    counter!("swaps_executed_total").absolute(0);

    gauge!("portfolio_total_value_usd").set(0.0);

    Ok(())
}
