//! One measurement of the active tab

use thiserror::Error;
use tracing::debug;

use super::strategy::{LayoutStrategies, LayoutStrategy};
use super::{LayoutStrategyId, PageMeasurement};
use crate::host::{ActiveTab, HostError, PageHost};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Probe returned no result")]
    NoResult,

    #[error("Malformed probe result: {0}")]
    Malformed(String),
}

/// Measure whatever tab is active
///
/// `Ok(None)` when no tab is active; that is a transient condition, not a failure.
pub async fn probe_active_tab(
    host: &dyn PageHost,
    strategies: &LayoutStrategies,
) -> Result<Option<PageMeasurement>, ProbeError> {
    let Some(tab) = host.active_tab().await? else {
        return Ok(None);
    };
    measure_tab(host, strategies, &tab).await.map(Some)
}

/// Measure `tab` with the strategy its address selects
///
/// A site-specific strategy that cannot measure this tick (element absent,
/// zero-height viewport) falls back to the generic strategy.
pub async fn measure_tab(
    host: &dyn PageHost,
    strategies: &LayoutStrategies,
    tab: &ActiveTab,
) -> Result<PageMeasurement, ProbeError> {
    let strategy = strategies.select(&tab.url);

    if strategy.id() != LayoutStrategyId::Generic {
        if let Some(measurement) = run_strategy(host, strategy, tab).await? {
            return Ok(measurement);
        }
        debug!(tab_id = %tab.id, url = %tab.url, "container layout unavailable, using generic probe");
    }

    run_strategy(host, strategies.fallback(), tab)
        .await?
        .ok_or(ProbeError::NoResult)
}

async fn run_strategy(
    host: &dyn PageHost,
    strategy: &dyn LayoutStrategy,
    tab: &ActiveTab,
) -> Result<Option<PageMeasurement>, ProbeError> {
    match host.execute(&tab.id, &strategy.measure_script()).await? {
        Some(raw) => strategy.decode(raw),
        None => Ok(None),
    }
}
