use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{anyhow, bail};
use rust_decimal::Decimal;

use crate::models::{GasPrice, RebalanceConditions, SpikeOverride, StrategyEntry, Token};
use crate::pricefeed::CRYPTOCOMPARE_API_BASE;

#[derive(Debug, Clone)]
pub struct RebalancerConfig {
    pub rpc_url: String,
    /// Wallet whose portfolio is kept on target.
    pub holder: Address,
    pub price_api_base: String,

    pub tokens: Vec<Token>,
    pub strategy: Vec<StrategyEntry>,
    pub conditions: RebalanceConditions,

    pub interval_secs: u64,
    pub dry_run: bool,
    /// Reject cycles whose strategy weights do not sum to 100 instead of
    /// planning against the unnormalized targets.
    pub strict_weights: bool,
    pub request_timeout: Duration,
    pub metrics_addr: Option<SocketAddr>,
}

impl RebalancerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let rpc_url = env::var("RPC_URL").map_err(|_| anyhow!("RPC_URL must be set"))?;

        let holder: Address = env::var("HOLDER_ADDRESS")
            .map_err(|_| anyhow!("HOLDER_ADDRESS must be set"))?
            .parse()
            .map_err(|e| anyhow!("HOLDER_ADDRESS is not a valid address: {e}"))?;

        let tokens_raw =
            env::var("TOKENS").map_err(|_| anyhow!("TOKENS must be set (JSON array)"))?;
        let tokens: Vec<Token> = serde_json::from_str(&tokens_raw)
            .map_err(|e| anyhow!("TOKENS is not a valid token list: {e}"))?;

        let strategy =
            parse_strategy(&env::var("STRATEGY").map_err(|_| anyhow!("STRATEGY must be set"))?)?;

        let conditions = RebalanceConditions {
            max_gas_price: GasPrice {
                value: env_decimal("MAX_GAS_PRICE", Decimal::from(75))?,
                unit: env::var("GAS_PRICE_UNIT").unwrap_or_else(|_| "gwei".into()),
            },
            min_exceed_percentage: env_decimal("MIN_EXCEED_PERCENTAGE", Decimal::ONE)?,
            spike_override: SpikeOverride {
                spike_percentage: env_decimal("SPIKE_PERCENTAGE", Decimal::from(15))?,
                adjust_gas_price: env_decimal("SPIKE_ADJUST_GAS_PRICE", Decimal::from(500))?,
            },
        };

        Ok(Self {
            rpc_url,
            holder,
            price_api_base: env::var("PRICE_API_URL")
                .unwrap_or_else(|_| CRYPTOCOMPARE_API_BASE.into()),
            tokens,
            strategy,
            conditions,
            interval_secs: env::var("REBALANCE_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()?,
            dry_run: env::var("DRY_RUN")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            strict_weights: env::var("STRICT_WEIGHTS")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".into())
                    .parse()?,
            ),
            metrics_addr: match env::var("METRICS_ADDR") {
                Err(_) => None,
                Ok(raw) => Some(
                    raw.parse()
                        .map_err(|e| anyhow!("METRICS_ADDR is not a valid address: {e}"))?,
                ),
            },
        })
    }
}

/// Parse a strategy definition like `"WMATIC:48,USDC:52"`.
fn parse_strategy(raw: &str) -> anyhow::Result<Vec<StrategyEntry>> {
    let entries: Vec<StrategyEntry> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (token, pct) = pair
                .split_once(':')
                .ok_or_else(|| anyhow!("strategy entry {pair:?} must be SYMBOL:PERCENTAGE"))?;
            let percentage: Decimal = pct
                .trim()
                .parse()
                .map_err(|e| anyhow!("bad percentage in {pair:?}: {e}"))?;
            if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
                bail!("percentage in {pair:?} must be within 0..=100");
            }
            Ok(StrategyEntry {
                token: token.trim().to_string(),
                percentage,
            })
        })
        .collect::<anyhow::Result<_>>()?;

    if entries.is_empty() {
        bail!("STRATEGY must list at least one SYMBOL:PERCENTAGE entry");
    }
    Ok(entries)
}

fn env_decimal(key: &str, default: Decimal) -> anyhow::Result<Decimal> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{key} is not a number: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
