use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use campscrape::scraping::listing::LISTING_URL;
use campscrape::{ics, reconcile, scraping, store};

#[derive(Parser)]
#[command(name = "campscrape")]
#[command(about = "Scrape the MeasureCamp calendar and publish an ICS feed")]
struct Cli {
    /// Listing page to scrape
    #[arg(long, default_value = LISTING_URL)]
    listing_url: String,

    /// Path of the persisted event store
    #[arg(long, default_value = "events.json")]
    store: PathBuf,

    /// Path of the generated calendar feed
    #[arg(long, default_value = "measurecamp-events.ics")]
    out: PathBuf,

    /// Drop events whose date has passed before saving
    #[arg(long)]
    prune_past: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campscrape=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    let scraped = scraping::scrape_all(&cli.listing_url)?;
    if scraped.is_empty() {
        anyhow::bail!("no events scraped");
    }
    info!("scraped {} events", scraped.len());

    let mut events = store::load(&cli.store);
    let changed = reconcile::reconcile(&mut events, &scraped);
    if cli.prune_past {
        for id in reconcile::prune_past(&mut events, today) {
            info!("removed past event {id}");
        }
    }
    store::save(&cli.store, &events)?;

    if changed.is_empty() {
        info!("no changes detected");
    } else {
        info!("{} new or updated events", changed.len());
    }

    ics::write_feed(&cli.out, &events)?;
    info!("wrote calendar feed to {}", cli.out.display());

    info!(
        "done: {} events in store, {} upcoming, {} changed",
        events.len(),
        reconcile::future_events(&events, today).len(),
        changed.len()
    );

    Ok(())
}
