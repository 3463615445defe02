use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

use crate::BrowserConfig;
use crate::browser::BrowserError;

/// Removes a freshly created profile directory unless the launch succeeds
struct ProfileDirGuard {
    path: PathBuf,
    keep: bool,
}

impl ProfileDirGuard {
    fn create(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path).context("Failed to create user data directory")?;
        Ok(Self { path, keep: false })
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for ProfileDirGuard {
    fn drop(&mut self) {
        if !self.keep && let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to clean up profile dir {}: {}", self.path.display(), e);
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let fixed: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    let mut paths: Vec<PathBuf> = fixed.iter().map(PathBuf::from).collect();

    if let Some(local) = dirs::data_local_dir()
        && cfg!(target_os = "windows")
    {
        paths.push(local.join(r"Google\Chrome\Application\chrome.exe"));
    }
    if let Some(home) = dirs::home_dir()
        && cfg!(target_os = "macos")
    {
        paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
    }

    paths
}

/// Find a Chrome/Chromium executable
///
/// `CHROMIUM_PATH` overrides the platform search list.
pub async fn find_browser_executable() -> Result<PathBuf, BrowserError> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!("CHROMIUM_PATH points to a missing file: {}", path.display());
    }

    candidate_paths()
        .into_iter()
        .find(|path| path.exists())
        .inspect(|path| info!("Found browser at: {}", path.display()))
        .ok_or_else(|| BrowserError::NotFound("no Chrome/Chromium in standard locations".into()))
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir().join(".cache"))
        .join("browser-playground/chromium");
    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    info!("Downloading managed Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;

    Ok(revision.executable_path)
}

fn running_in_container() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var("container").is_ok()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}

/// Launch Chrome with the given profile directory
///
/// Returns the browser and the task pumping its CDP handler. The profile
/// directory is removed again if the launch fails.
pub async fn launch_browser(
    config: &BrowserConfig,
    user_data_dir: PathBuf,
) -> Result<(Browser, JoinHandle<()>)> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; falling back to a managed download", e);
            download_managed_browser().await?
        }
    };

    let profile = ProfileDirGuard::create(user_data_dir)?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(profile.path.clone())
        .chrome_executable(chrome_path)
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-notifications")
        .arg("--mute-audio");

    builder = if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    if config.disable_security {
        info!("WARNING: browser security features disabled by configuration");
        builder = builder
            .arg("--disable-web-security")
            .arg("--ignore-certificate-errors");
    }

    if running_in_container() || config.disable_security {
        builder = builder.arg("--no-sandbox").arg("--disable-setuid-sandbox");
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let msg = e.to_string();
                // chromiumoxide cannot decode every CDP event Chrome emits
                if msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response")
                {
                    trace!("Ignoring undecodable CDP event: {}", msg);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        info!("Browser handler task completed");
    });

    profile.keep();
    Ok((browser, handler_task))
}
