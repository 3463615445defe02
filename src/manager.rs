//! Browser instance manager
//!
//! Owns the single Chrome instance the playground inspects. The browser is
//! launched lazily, health-checked before reuse and relaunched after a crash.
//!
//! # Async Lock Requirements
//!
//! Browser operations await CDP round trips while the lock is held, so the locks
//! are `tokio::sync::Mutex`, never a blocking lock.

use anyhow::Result;
use chromiumoxide::page::Page;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::BrowserConfig;
use crate::browser::ManagedBrowser;

pub struct BrowserManager {
    config: BrowserConfig,
    browser: Mutex<Option<ManagedBrowser>>,
    current_page: Mutex<Option<Page>>,
}

impl BrowserManager {
    /// Create a manager; nothing is launched until `open()`
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
            current_page: Mutex::new(None),
        }
    }

    /// Lock the browser slot, launching Chrome if it is empty or unhealthy
    async fn ensure_browser(&self) -> Result<MutexGuard<'_, Option<ManagedBrowser>>> {
        let mut guard = self.browser.lock().await;

        if let Some(browser) = guard.as_ref() {
            if browser.is_healthy().await {
                return Ok(guard);
            }
            info!("Relaunching crashed browser");
            if let Some(crashed) = guard.take() {
                crashed.close().await;
            }
            // The cached page belonged to the crashed browser.
            self.current_page.lock().await.take();
        }

        info!("Launching browser");
        *guard = Some(ManagedBrowser::launch(&self.config).await?);
        Ok(guard)
    }

    /// Open `url` in a new tab and make it the active page
    pub async fn open(&self, url: &str) -> Result<Page> {
        let guard = self.ensure_browser().await?;
        let browser = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Browser not available after launch"))?;
        let page = browser.new_page(url).await?;
        drop(guard);

        *self.current_page.lock().await = Some(page.clone());
        Ok(page)
    }

    /// The page the user is looking at, without launching anything
    ///
    /// Prefers the page set by `open()`; otherwise the browser's first page.
    /// Returns `None` when no browser is running or it has no pages.
    pub async fn active_page(&self) -> Result<Option<Page>> {
        if let Some(page) = self.current_page.lock().await.clone() {
            return Ok(Some(page));
        }

        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            return Ok(None);
        };
        Ok(browser.pages().await?.into_iter().next())
    }

    /// Look up an open page by its CDP target id
    pub async fn find_page(&self, target_id: &str) -> Result<Option<Page>> {
        if let Some(page) = self.current_page.lock().await.clone()
            && page.target_id().inner() == target_id
        {
            return Ok(Some(page));
        }

        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            return Ok(None);
        };
        Ok(browser
            .pages()
            .await?
            .into_iter()
            .find(|page| page.target_id().inner() == target_id))
    }

    /// Close Chrome and remove its profile directory
    ///
    /// Safe to call multiple times.
    pub async fn shutdown(&self) -> Result<()> {
        self.current_page.lock().await.take();

        if let Some(browser) = self.browser.lock().await.take() {
            info!("Shutting down browser");
            browser.close().await;
        }
        Ok(())
    }
}

impl Drop for BrowserManager {
    fn drop(&mut self) {
        debug!("BrowserManager dropped; shutdown() is the clean exit");
    }
}
