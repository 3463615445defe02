//! Chromium-backed page host
//!
//! Resolves the active tab through [`BrowserManager`] and runs page scripts with
//! `Runtime.callFunctionOn`, passing arguments by value so nothing is spliced into
//! script text.

use async_trait::async_trait;
use chromiumoxide_cdp::cdp::js_protocol::runtime::{CallArgument, CallFunctionOnParams};
use std::sync::Arc;
use tracing::debug;

use super::{ActiveTab, HostError, HostResult, PageHost, PageScript};
use crate::manager::BrowserManager;

#[derive(Clone)]
pub struct CdpPageHost {
    manager: Arc<BrowserManager>,
}

impl CdpPageHost {
    pub fn new(manager: Arc<BrowserManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl PageHost for CdpPageHost {
    async fn active_tab(&self) -> HostResult<Option<ActiveTab>> {
        // Never launches a browser: a poll tick with nothing open is a no-op.
        let Some(page) = self
            .manager
            .active_page()
            .await
            .map_err(|e| HostError::Browser(e.to_string()))?
        else {
            return Ok(None);
        };

        let url = page
            .url()
            .await
            .map_err(|e| HostError::Browser(format!("Failed to read page url: {e}")))?
            .unwrap_or_default();

        Ok(Some(ActiveTab {
            id: page.target_id().inner().clone(),
            url,
        }))
    }

    async fn execute(
        &self,
        tab_id: &str,
        script: &PageScript,
    ) -> HostResult<Option<serde_json::Value>> {
        let page = self
            .manager
            .find_page(tab_id)
            .await
            .map_err(|e| HostError::Browser(e.to_string()))?
            .ok_or_else(|| HostError::TabNotFound(tab_id.to_string()))?;

        let mut builder = CallFunctionOnParams::builder()
            .function_declaration(script.function_declaration.clone())
            .return_by_value(true);
        for arg in &script.args {
            builder = builder.argument(CallArgument::builder().value(arg.clone()).build());
        }
        let call = builder
            .build()
            .map_err(|e| HostError::Evaluation(format!("Failed to build call params: {e}")))?;

        let result = page
            .evaluate_function(call)
            .await
            .map_err(|e| HostError::Evaluation(e.to_string()))?;

        let value = result.value().cloned().filter(|v| !v.is_null());
        debug!(tab_id, has_value = value.is_some(), "page script evaluated");
        Ok(value)
    }
}
