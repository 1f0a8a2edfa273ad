//! treecrawl CLI
//!
//! Attaches to a Chrome instance (launched or remote), navigates to the page
//! hosting the tree widget, runs discovery to its fixed point, and prints the
//! report as JSON.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use headless_chrome::{Browser, LaunchOptions};
use treecrawl::{ChromeTreeUi, DiscoveryConfig, TreeSelectors, discover_hierarchy};

#[derive(Parser, Debug)]
#[command(name = "treecrawl", version, about = "Discover a virtualized tree widget and print its full hierarchy")]
struct Args {
    /// Page hosting the tree widget
    url: String,

    /// Connect to an existing browser over WebSocket instead of launching one
    #[arg(long)]
    ws_url: Option<String>,

    /// Launch the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// CSS selector of the scrollable tree container
    #[arg(long, default_value = ".location-tree")]
    container: String,

    /// CSS selector of a rendered tree row
    #[arg(long, default_value = ".tree-row")]
    row: String,

    /// Attribute carrying the stable row id
    #[arg(long, default_value = "data-id")]
    id_attr: String,

    /// Maximum outer expand/scroll iterations
    #[arg(long, default_value_t = 25)]
    max_iterations: u32,

    /// Seconds to wait for the tree container to appear
    #[arg(long, default_value_t = 15)]
    load_timeout: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let browser = match &args.ws_url {
        Some(ws_url) => Browser::connect(ws_url.clone())
            .with_context(|| format!("failed to connect to browser at {}", ws_url))?,
        None => {
            let options = LaunchOptions::default_builder()
                .headless(!args.headed)
                .build()
                .map_err(|e| anyhow::anyhow!("failed to assemble browser launch options: {}", e))?;
            Browser::new(options).context("failed to launch browser")?
        }
    };

    let tab = browser.new_tab().context("failed to open tab")?;

    let selectors = TreeSelectors::new()
        .container(args.container)
        .row(args.row)
        .id_attr(args.id_attr);
    let ui = ChromeTreeUi::with_selectors(tab, selectors);

    ui.navigate(&args.url)
        .with_context(|| format!("failed to open {}", args.url))?;

    let config = DiscoveryConfig::new()
        .max_iterations(args.max_iterations)
        .initial_load_wait(Duration::from_secs(args.load_timeout));

    let report = discover_hierarchy(&ui, config).context("discovery failed")?;

    if !report.converged {
        eprintln!(
            "warning: discovery stopped at the iteration cap ({}); results may be partial",
            report.iterations
        );
    }

    println!("{}", report.to_json()?);
    Ok(())
}
