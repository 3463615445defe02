//! Active-tab and script-injection primitive
//!
//! Every measurement and scroll reaches from the controller's context into the
//! inspected page through [`PageHost`]. The trait is deliberately narrow: find the
//! active tab, run a function in it. Both calls are fallible on every invocation
//! and callers must treat them that way.

mod cdp;

pub use cdp::CdpPageHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The tab currently focused in the inspected browser window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTab {
    /// Opaque tab identifier (CDP target id for the chromium host)
    pub id: String,

    /// Address of the document loaded in the tab
    pub url: String,
}

/// A function executed inside the page context
///
/// `function_declaration` is a JavaScript function expression; `args` are passed
/// to it by value. The return value comes back as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScript {
    pub function_declaration: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

impl PageScript {
    pub fn new(function_declaration: impl Into<String>) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: serde_json::Value) -> Self {
        self.args.push(value);
        self
    }
}

/// Failures crossing into the host page
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Reach into the browser hosting the inspected page
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Currently active tab, or `None` when no tab is focused
    async fn active_tab(&self) -> HostResult<Option<ActiveTab>>;

    /// Run `script` inside the tab's page context
    ///
    /// Returns `Ok(None)` when the script produced no value (e.g. `undefined`).
    async fn execute(&self, tab_id: &str, script: &PageScript)
        -> HostResult<Option<serde_json::Value>>;
}
