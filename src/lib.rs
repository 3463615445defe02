//! In-browser agent playground core
//!
//! Run/cancel orchestration for an external AI agent, plus a poller that reads
//! scroll position and pagination out of the inspected page via chromiumoxide.

mod browser;
pub mod browser_setup;
pub mod host;
mod manager;
pub mod measurement;
pub mod playground;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::measurement::ContainerLayout;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Page measurement polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Ask the agent provider to keep navigation in the current tab
    #[serde(default)]
    pub force_same_tab_navigation: bool,

    /// Playback rate for spoken query results
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,

    #[serde(default)]
    pub interruption: InterruptionConfig,

    /// Sites that scroll inside a container element, tried in order
    #[serde(default = "default_layouts")]
    pub layouts: Vec<ContainerLayout>,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Limits for the run interruption table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionConfig {
    #[serde(default = "default_interruption_capacity")]
    pub capacity: usize,

    #[serde(default = "default_interruption_ttl_secs")]
    pub ttl_secs: u64,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default)]
    pub disable_security: bool,

    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_poll_interval_ms() -> u64 {
    200
}
fn default_speech_rate() -> f32 {
    1.5
}
fn default_layouts() -> Vec<ContainerLayout> {
    vec![ContainerLayout::lark_wiki()]
}
fn default_interruption_capacity() -> usize {
    256
}
fn default_interruption_ttl_secs() -> u64 {
    600
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            force_same_tab_navigation: false,
            speech_rate: default_speech_rate(),
            interruption: InterruptionConfig::default(),
            layouts: default_layouts(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            capacity: default_interruption_capacity(),
            ttl_secs: default_interruption_ttl_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: false,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    pub fn layout_strategies(&self) -> measurement::LayoutStrategies {
        measurement::LayoutStrategies::from_layouts(&self.layouts)
    }
}

/// Load config from config.yaml in package root
pub fn load_yaml_config() -> anyhow::Result<Config> {
    load_yaml_config_from(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml"))
}

/// Load config from `path`, falling back to defaults when it does not exist
pub fn load_yaml_config_from(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use browser::{
    BrowserError, BrowserResult, ManagedBrowser, download_managed_browser,
    find_browser_executable,
};
pub use host::{ActiveTab, CdpPageHost, HostError, PageHost, PageScript};
pub use manager::BrowserManager;
pub use measurement::{
    LayoutStrategies, LayoutStrategyId, PageDirection, PageMeasurement, PagePoller, Pagination,
    Subscription,
};
pub use playground::{
    AgentProvider, PlaygroundAgent, PlaygroundState, RunController, RunOutcome, RunResult,
    TaskType,
};
