//! One launched Chrome process and everything that must die with it

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserResult};
use crate::BrowserConfig;

/// Chrome, the task pumping its CDP handler, and its profile directory
///
/// `close()` is the only clean exit. Dropping aborts the handler but leaves the
/// process and profile behind.
pub struct ManagedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: Option<PathBuf>,
}

impl ManagedBrowser {
    /// Launch with a profile directory unique to this process
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let profile_dir =
            std::env::temp_dir().join(format!("browser_playground_{}", std::process::id()));
        let (browser, handler) =
            crate::browser_setup::launch_browser(config, profile_dir.clone()).await?;

        Ok(Self {
            browser,
            handler,
            profile_dir: Some(profile_dir),
        })
    }

    /// Round-trips a `Browser.getVersion` command
    pub async fn is_healthy(&self) -> bool {
        match self.browser.version().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Browser health check failed: {}", e);
                false
            }
        }
    }

    pub async fn pages(&self) -> BrowserResult<Vec<Page>> {
        self.browser
            .pages()
            .await
            .map_err(|e| BrowserError::PageQueryFailed(e.to_string()))
    }

    /// Open `url` in a new tab and wait for it to load
    pub async fn new_page(&self, url: &str) -> BrowserResult<Page> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("{url}: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("{url} did not load: {e}")))?;
        Ok(page)
    }

    /// Close Chrome, wait for the process to exit, then remove the profile
    ///
    /// Failures are logged; the profile is removed regardless.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        if let Some(path) = self.profile_dir.take() {
            info!("Removing profile directory {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!("Failed to remove profile directory {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for ManagedBrowser {
    fn drop(&mut self) {
        self.handler.abort();
        match &self.profile_dir {
            Some(path) => warn!(
                "Browser dropped without close(); profile directory left at {}",
                path.display()
            ),
            None => debug!("Browser handler task aborted"),
        }
    }
}
