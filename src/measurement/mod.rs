//! Page measurement and pagination
//!
//! A probe reads scroll offset and content height from the inspected page and
//! turns them into a `{current_page, total_pages}` pair, one viewport per page.
//! How the numbers are read depends on the host page's layout; see [`strategy`].

mod navigation;
mod poller;
mod probe;
pub mod strategy;

pub use navigation::{PageDirection, scroll_page};
pub use poller::{PagePoller, Subscription};
pub use probe::{ProbeError, measure_tab, probe_active_tab};
pub use strategy::{
    ContainerLayout, ContainerStrategy, GenericStrategy, LayoutStrategies, LayoutStrategy,
};

use serde::{Deserialize, Serialize};

/// Which DOM-reading approach produced a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategyId {
    /// Window/document fallback chain
    Generic,
    /// A named scrollable element inside the page
    Container,
}

/// Raw numbers sampled from the page on one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeasurement {
    pub document_height: f64,
    pub viewport_height: f64,
    pub scroll_top: f64,
    pub strategy: LayoutStrategyId,
}

/// Position within the document, counted in viewports
///
/// Always satisfies `total_pages >= 1` and `1 <= current_page <= total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pagination {
    /// Published when nothing better is known
    pub const DEFAULT: Pagination = Pagination {
        current_page: 1,
        total_pages: 1,
    };

    pub fn from_measurement(measurement: &PageMeasurement) -> Self {
        let viewport = measurement.viewport_height;
        if !viewport.is_finite() || viewport <= 0.0 {
            return Self::DEFAULT;
        }

        let document = finite_or_zero(measurement.document_height);
        let scroll = finite_or_zero(measurement.scroll_top);

        let total = (document / viewport).ceil().max(1.0);
        let current = ((scroll / viewport).floor() + 1.0).clamp(1.0, total);

        // Float-to-int casts saturate, so absurd heights cannot wrap.
        Self {
            current_page: current as u32,
            total_pages: total as u32,
        }
    }

    /// Completion ratio for progress bars, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        f64::from(self.current_page) / f64::from(self.total_pages)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for Pagination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current_page, self.total_pages)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
