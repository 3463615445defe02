//! Launching and owning the inspected Chrome instance

mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use wrapper::ManagedBrowser;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to find browser executable: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Failed to list pages: {0}")]
    PageQueryFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
