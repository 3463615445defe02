//! Page-up / page-down in the inspected tab

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::probe::ProbeError;
use super::strategy::LayoutStrategies;
use super::LayoutStrategyId;
use crate::host::PageHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Up,
    Down,
}

impl PageDirection {
    pub fn sign(self) -> i32 {
        match self {
            PageDirection::Up => -1,
            PageDirection::Down => 1,
        }
    }
}

/// Scroll the active tab by one viewport
///
/// Uses the same strategy selection as measurement, so container sites scroll
/// their container. Returns `Ok(false)` when there is no active tab.
pub async fn scroll_page(
    host: &dyn PageHost,
    strategies: &LayoutStrategies,
    direction: PageDirection,
) -> Result<bool, ProbeError> {
    let Some(tab) = host.active_tab().await? else {
        debug!(?direction, "no active tab to scroll");
        return Ok(false);
    };

    let strategy = strategies.select(&tab.url);
    if strategy.id() != LayoutStrategyId::Generic {
        let scrolled = host
            .execute(&tab.id, &strategy.scroll_script(direction))
            .await
            .inspect_err(|e| warn!(tab_id = %tab.id, "container scroll failed: {}", e))?;
        if scrolled.and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(true);
        }
        debug!(tab_id = %tab.id, "scroll container missing, scrolling window");
    }

    host.execute(&tab.id, &strategies.fallback().scroll_script(direction))
        .await
        .inspect_err(|e| warn!(tab_id = %tab.id, "window scroll failed: {}", e))?;
    Ok(true)
}
