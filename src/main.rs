// Opens a page in a managed browser and reports its pagination as it changes.

use anyhow::{Context, Result};
use browser_playground::measurement::scroll_page;
use browser_playground::{BrowserManager, CdpPageHost, PageDirection, PagePoller, PageHost};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "browser-playground",
    version,
    about = "Track scroll position and pagination of a page in a managed browser"
)]
struct Cli {
    /// Page to open
    url: String,

    /// YAML config file (defaults to config.yaml in the package root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the polling interval
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many seconds (Ctrl-C also stops)
    #[arg(long, default_value_t = 30)]
    duration_secs: u64,

    /// Page down this many times, one per second, after the page loads
    #[arg(long, default_value_t = 0)]
    page_down: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => browser_playground::load_yaml_config_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => browser_playground::load_yaml_config()?,
    };
    if let Some(ms) = cli.interval_ms {
        config.poll_interval_ms = ms;
    }

    let manager = Arc::new(BrowserManager::new(config.browser.clone()));
    let result = run(&cli, &config, manager.clone()).await;
    manager.shutdown().await?;
    result
}

async fn run(
    cli: &Cli,
    config: &browser_playground::Config,
    manager: Arc<BrowserManager>,
) -> Result<()> {
    manager.open(&cli.url).await?;
    info!("Opened {}", cli.url);

    let host: Arc<dyn PageHost> = Arc::new(CdpPageHost::new(manager));
    let strategies = config.layout_strategies();
    let poller = PagePoller::new(host.clone(), strategies.clone());
    let subscription = poller.start(config.poll_interval());
    let mut pages = subscription.subscribe();

    let paging = {
        let host = host.clone();
        let count = cli.page_down;
        tokio::spawn(async move {
            for _ in 0..count {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if let Err(e) = scroll_page(host.as_ref(), &strategies, PageDirection::Down).await {
                    warn!("Page down failed: {}", e);
                }
            }
        })
    };

    let deadline = tokio::time::sleep(Duration::from_secs(cli.duration_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = pages.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *pages.borrow_and_update();
                println!("page {} ({:.0}%)", current, current.progress() * 100.0);
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    paging.abort();
    subscription.shutdown().await;
    Ok(())
}
