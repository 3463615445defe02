//! Contracts for the external agent
//!
//! The agent plans and executes instructions against the inspected page; this
//! crate only drives it. Optional capabilities have default bodies so a minimal
//! agent implements just the three invocations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::{AgentError, AgentResult};

/// Receives progress tips while an invocation runs
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertOptions {
    pub keep_raw_response: bool,
}

#[async_trait]
pub trait PlaygroundAgent: Send + Sync {
    async fn ai_action(
        &self,
        prompt: &str,
        on_progress: ProgressCallback,
    ) -> AgentResult<serde_json::Value>;

    async fn ai_query(
        &self,
        prompt: &str,
        on_progress: ProgressCallback,
    ) -> AgentResult<serde_json::Value>;

    async fn ai_assert(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: AssertOptions,
        on_progress: ProgressCallback,
    ) -> AgentResult<serde_json::Value>;

    /// Clear the execution dump before a new run
    fn reset_dump(&self) {}

    /// Execution dump of the last invocation, passed through untouched
    fn dump(&self) -> Option<serde_json::Value> {
        None
    }

    /// Rendered report of the last invocation, passed through untouched
    fn report_html(&self) -> Option<String> {
        None
    }

    /// Describe the page as the agent perceives it (screenshot, element tree)
    async fn ui_context(&self) -> AgentResult<serde_json::Value> {
        Err(AgentError::Unsupported("getUIContext"))
    }

    /// Tear down the whole agent; used to interrupt a run
    async fn destroy(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Release the page resource after a run completes
    async fn destroy_page(&self) -> AgentResult<()> {
        Ok(())
    }
}

/// Supplies an agent bound to the current tab
pub trait AgentProvider: Send + Sync {
    fn get_agent(&self, force_same_tab_navigation: bool) -> Option<Arc<dyn PlaygroundAgent>>;
}

impl<F> AgentProvider for F
where
    F: Fn(bool) -> Option<Arc<dyn PlaygroundAgent>> + Send + Sync,
{
    fn get_agent(&self, force_same_tab_navigation: bool) -> Option<Arc<dyn PlaygroundAgent>> {
        self(force_same_tab_navigation)
    }
}
