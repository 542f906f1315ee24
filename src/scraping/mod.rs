pub mod base;
pub mod event_page;
pub mod listing;

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::ScrapedEvent;

// Self-throttling between event-page fetches; the subdomains share one host.
const FETCH_DELAY: Duration = Duration::from_secs(1);

/// Runs the whole scrape: listing page, then every discovered event page in
/// order, one at a time. A failed or dateless event page costs only that
/// event; a failed listing fetch fails the run.
pub fn scrape_all(listing_url: &str) -> Result<Vec<ScrapedEvent>> {
    info!("fetching listing page {listing_url}");
    let html = base::fetch_html(listing_url)
        .with_context(|| format!("listing page fetch failed for {listing_url}"))?;
    let links = listing::discover_links(&html);
    info!("found {} event links", links.len());

    let mut events = Vec::new();
    for (index, link) in links.iter().enumerate() {
        info!(
            "scraping {}/{}: {} ({})",
            index + 1,
            links.len(),
            link.city,
            link.url
        );
        match event_page::extract(&link.url) {
            Ok(details) => match details.date {
                Some(date) => events.push(ScrapedEvent {
                    city: link.city.clone(),
                    url: details.url,
                    date,
                    time: details.time,
                    venue: details.venue,
                    address: details.address,
                }),
                None => warn!("no parseable date on {}, dropping {}", link.url, link.city),
            },
            Err(err) => warn!("skipping {}: {err}", link.city),
        }
        thread::sleep(FETCH_DELAY);
    }

    Ok(events)
}
