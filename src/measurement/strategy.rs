//! Layout strategies
//!
//! Most pages scroll the window. Some sites virtualize scrolling inside a
//! sub-container, and reading the window there always reports the top of a
//! one-page document. Each [`LayoutStrategy`] knows how to recognise its pages by
//! address, which script reads the numbers, and how to decode the result.
//! [`LayoutStrategies`] is an ordered list; the first match wins and the generic
//! strategy is always the last resort.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::navigation::PageDirection;
use super::probe::ProbeError;
use super::{LayoutStrategyId, PageMeasurement};
use crate::host::PageScript;

pub trait LayoutStrategy: Send + Sync {
    fn id(&self) -> LayoutStrategyId;

    /// Whether this strategy applies to a page at `url`
    fn matches(&self, url: &str) -> bool;

    /// Script returning this strategy's raw readings
    fn measure_script(&self) -> PageScript;

    /// Decode the script's result
    ///
    /// `Ok(None)` means the layout is not usable on this page right now (element
    /// missing, zero-height viewport); the caller falls back to the generic
    /// strategy.
    fn decode(&self, raw: serde_json::Value) -> Result<Option<PageMeasurement>, ProbeError>;

    /// Script scrolling one viewport in `direction`; returns `true` when it scrolled
    fn scroll_script(&self, direction: PageDirection) -> PageScript;
}

const GENERIC_MEASURE_JS: &str = r#"() => {
  const doc = document.documentElement;
  const body = document.body;
  return {
    documentScrollHeight: doc ? doc.scrollHeight : 0,
    documentOffsetHeight: doc ? doc.offsetHeight : 0,
    bodyScrollHeight: body ? body.scrollHeight : 0,
    bodyOffsetHeight: body ? body.offsetHeight : 0,
    innerHeight: window.innerHeight,
    documentClientHeight: doc ? doc.clientHeight : 0,
    bodyClientHeight: body ? body.clientHeight : 0,
    pageYOffset: window.pageYOffset,
    documentScrollTop: doc ? doc.scrollTop : 0,
    bodyScrollTop: body ? body.scrollTop : 0,
  };
}"#;

const GENERIC_SCROLL_JS: &str = r#"(direction) => {
  window.scrollBy({ top: direction * window.innerHeight, behavior: 'smooth' });
  return true;
}"#;

const CONTAINER_MEASURE_JS: &str = r#"(selector) => {
  const el = document.querySelector(selector);
  if (!el) return null;
  return {
    scrollTop: el.scrollTop,
    clientHeight: el.clientHeight,
    scrollHeight: el.scrollHeight,
  };
}"#;

const CONTAINER_SCROLL_JS: &str = r#"(selector, direction) => {
  const el = document.querySelector(selector);
  if (!el || !el.clientHeight) return false;
  el.scrollBy({ top: direction * el.clientHeight, behavior: 'smooth' });
  return true;
}"#;

/// Every height/offset source the generic probe reads
///
/// Browsers disagree on which of these is populated depending on doctype and
/// box model, so all of them are collected and reduced here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenericReadings {
    document_scroll_height: Option<f64>,
    document_offset_height: Option<f64>,
    body_scroll_height: Option<f64>,
    body_offset_height: Option<f64>,
    inner_height: Option<f64>,
    document_client_height: Option<f64>,
    body_client_height: Option<f64>,
    page_y_offset: Option<f64>,
    document_scroll_top: Option<f64>,
    body_scroll_top: Option<f64>,
}

/// First value that is present, finite and non-zero (JavaScript truthiness)
fn first_truthy(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .find(|v| v.is_finite() && *v != 0.0)
}

/// Window/document fallback chain, valid for any page
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

impl LayoutStrategy for GenericStrategy {
    fn id(&self) -> LayoutStrategyId {
        LayoutStrategyId::Generic
    }

    fn matches(&self, _url: &str) -> bool {
        true
    }

    fn measure_script(&self) -> PageScript {
        PageScript::new(GENERIC_MEASURE_JS)
    }

    fn decode(&self, raw: serde_json::Value) -> Result<Option<PageMeasurement>, ProbeError> {
        let r: GenericReadings =
            serde_json::from_value(raw).map_err(|e| ProbeError::Malformed(e.to_string()))?;

        let document_height = [
            r.document_scroll_height,
            r.body_scroll_height,
            r.document_offset_height,
            r.body_offset_height,
        ]
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);

        let viewport_height =
            first_truthy(&[r.inner_height, r.document_client_height, r.body_client_height])
                .unwrap_or(0.0);

        let scroll_top =
            first_truthy(&[r.page_y_offset, r.document_scroll_top, r.body_scroll_top])
                .unwrap_or(0.0);

        Ok(Some(PageMeasurement {
            document_height,
            viewport_height,
            scroll_top,
            strategy: LayoutStrategyId::Generic,
        }))
    }

    fn scroll_script(&self, direction: PageDirection) -> PageScript {
        PageScript::new(GENERIC_SCROLL_JS).arg(direction.sign().into())
    }
}

/// A site that scrolls inside a named element rather than the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLayout {
    /// Substring of the page address identifying the site
    pub url_pattern: String,

    /// CSS selector of the scrolling element
    pub selector: String,
}

impl ContainerLayout {
    /// Lark/Feishu wiki documents scroll inside `.bear-web-x-container`
    pub fn lark_wiki() -> Self {
        Self {
            url_pattern: "https://bytedance.larkoffice.com/wiki".to_string(),
            selector: ".bear-web-x-container".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerReadings {
    #[serde(default)]
    scroll_top: f64,
    #[serde(default)]
    client_height: f64,
    #[serde(default)]
    scroll_height: f64,
}

#[derive(Debug, Clone)]
pub struct ContainerStrategy {
    layout: ContainerLayout,
}

impl ContainerStrategy {
    pub fn new(layout: ContainerLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }
}

impl LayoutStrategy for ContainerStrategy {
    fn id(&self) -> LayoutStrategyId {
        LayoutStrategyId::Container
    }

    fn matches(&self, url: &str) -> bool {
        !self.layout.url_pattern.is_empty() && url.contains(&self.layout.url_pattern)
    }

    fn measure_script(&self) -> PageScript {
        PageScript::new(CONTAINER_MEASURE_JS).arg(self.layout.selector.clone().into())
    }

    fn decode(&self, raw: serde_json::Value) -> Result<Option<PageMeasurement>, ProbeError> {
        let r: ContainerReadings =
            serde_json::from_value(raw).map_err(|e| ProbeError::Malformed(e.to_string()))?;

        if !r.client_height.is_finite() || r.client_height <= 0.0 {
            return Ok(None);
        }

        Ok(Some(PageMeasurement {
            document_height: r.scroll_height,
            viewport_height: r.client_height,
            scroll_top: r.scroll_top,
            strategy: LayoutStrategyId::Container,
        }))
    }

    fn scroll_script(&self, direction: PageDirection) -> PageScript {
        PageScript::new(CONTAINER_SCROLL_JS)
            .arg(self.layout.selector.clone().into())
            .arg(direction.sign().into())
    }
}

/// Ordered strategy list with the generic strategy as the final fallback
#[derive(Clone)]
pub struct LayoutStrategies {
    strategies: Vec<Arc<dyn LayoutStrategy>>,
    fallback: Arc<GenericStrategy>,
}

impl LayoutStrategies {
    /// Only the generic strategy
    pub fn generic_only() -> Self {
        Self {
            strategies: Vec::new(),
            fallback: Arc::new(GenericStrategy),
        }
    }

    /// One container strategy per layout, in order
    pub fn from_layouts(layouts: &[ContainerLayout]) -> Self {
        layouts.iter().cloned().fold(Self::generic_only(), |set, layout| {
            set.with(Arc::new(ContainerStrategy::new(layout)))
        })
    }

    /// Append a strategy; it is tried after the ones already registered
    pub fn with(mut self, strategy: Arc<dyn LayoutStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// First strategy matching `url`, else the generic one
    pub fn select(&self, url: &str) -> &dyn LayoutStrategy {
        self.strategies
            .iter()
            .find(|s| s.matches(url))
            .map(|s| s.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn fallback(&self) -> &dyn LayoutStrategy {
        self.fallback.as_ref()
    }

    /// Number of strategies tried before the fallback
    pub fn site_specific_count(&self) -> usize {
        self.strategies.len()
    }
}

impl Default for LayoutStrategies {
    fn default() -> Self {
        Self::from_layouts(&[ContainerLayout::lark_wiki()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generic_takes_tallest_height_source() {
        let m = GenericStrategy
            .decode(json!({
                "documentScrollHeight": 1800,
                "documentOffsetHeight": 1750,
                "bodyScrollHeight": 2400,
                "bodyOffsetHeight": 900,
                "innerHeight": 600,
                "pageYOffset": 1200
            }))
            .unwrap()
            .unwrap();
        assert_eq!(m.document_height, 2400.0);
        assert_eq!(m.viewport_height, 600.0);
        assert_eq!(m.scroll_top, 1200.0);
        assert_eq!(m.strategy, LayoutStrategyId::Generic);
    }

    #[test]
    fn generic_skips_falsy_viewport_and_scroll_sources() {
        let m = GenericStrategy
            .decode(json!({
                "documentScrollHeight": 3000,
                "innerHeight": 0,
                "documentClientHeight": 0,
                "bodyClientHeight": 750,
                "pageYOffset": 0,
                "documentScrollTop": 0,
                "bodyScrollTop": 1500
            }))
            .unwrap()
            .unwrap();
        assert_eq!(m.viewport_height, 750.0);
        assert_eq!(m.scroll_top, 1500.0);
    }

    #[test]
    fn generic_defaults_scroll_to_zero() {
        let m = GenericStrategy
            .decode(json!({ "documentScrollHeight": 1000, "innerHeight": 500 }))
            .unwrap()
            .unwrap();
        assert_eq!(m.scroll_top, 0.0);
    }

    #[test]
    fn generic_rejects_non_object() {
        assert!(matches!(
            GenericStrategy.decode(json!("nope")),
            Err(ProbeError::Malformed(_))
        ));
    }

    #[test]
    fn container_with_zero_viewport_is_unusable() {
        let strategy = ContainerStrategy::new(ContainerLayout::lark_wiki());
        let decoded = strategy
            .decode(json!({ "scrollTop": 10, "clientHeight": 0, "scrollHeight": 4000 }))
            .unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn container_reads_element_metrics() {
        let strategy = ContainerStrategy::new(ContainerLayout::lark_wiki());
        let m = strategy
            .decode(json!({ "scrollTop": 900, "clientHeight": 450, "scrollHeight": 4000 }))
            .unwrap()
            .unwrap();
        assert_eq!(m.strategy, LayoutStrategyId::Container);
        assert_eq!(m.document_height, 4000.0);
        assert_eq!(m.viewport_height, 450.0);
    }

    #[test]
    fn selection_prefers_first_matching_container() {
        let strategies = LayoutStrategies::from_layouts(&[
            ContainerLayout {
                url_pattern: "https://docs.example.com/".into(),
                selector: "#first".into(),
            },
            ContainerLayout {
                url_pattern: "https://docs.example.com/wiki".into(),
                selector: "#second".into(),
            },
        ]);
        assert_eq!(strategies.site_specific_count(), 2);

        let chosen = strategies.select("https://docs.example.com/wiki/page");
        assert_eq!(chosen.id(), LayoutStrategyId::Container);
        assert_eq!(chosen.measure_script().args, vec![json!("#first")]);

        let other = strategies.select("https://example.org/");
        assert_eq!(other.id(), LayoutStrategyId::Generic);
    }

    #[test]
    fn default_recognises_lark_wiki() {
        let strategies = LayoutStrategies::default();
        assert_eq!(
            strategies
                .select("https://bytedance.larkoffice.com/wiki/AbCdEf")
                .id(),
            LayoutStrategyId::Container
        );
        assert_eq!(
            strategies.select("https://bytedance.larkoffice.com/docx/x").id(),
            LayoutStrategyId::Generic
        );
    }

    #[test]
    fn scroll_scripts_carry_direction() {
        let container = ContainerStrategy::new(ContainerLayout::lark_wiki());
        let script = container.scroll_script(PageDirection::Up);
        assert_eq!(script.args, vec![json!(".bear-web-x-container"), json!(-1)]);

        let script = GenericStrategy.scroll_script(PageDirection::Down);
        assert_eq!(script.args, vec![json!(1)]);
    }
}
