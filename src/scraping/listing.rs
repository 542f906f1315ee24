use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::base;
use crate::models::EventLink;

/// Canonical listing page for upcoming MeasureCamps.
pub const LISTING_URL: &str = "https://www.measurecamp.org/measurecamp-calendar/";

const DOMAIN_TOKEN: &str = "measurecamp.org";
const WWW_ROOT: &str = "https://www.measurecamp.org";

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));

// Listing rows read like "17th Jan – Malmo" or "17th Jan – Malmo (sold out)";
// the city sits between the en-dash and any trailing parenthetical.
static CITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"–\s*(.+?)(?:\s*\(|$)").expect("city regex"));

/// Pulls candidate event links off the listing page: anchors pointing at an
/// event subdomain, with a city name recoverable from the anchor text.
/// Anchors that fail either test produce nothing. Duplicates are kept; the
/// id scheme collapses them downstream.
pub fn discover_links(html: &str) -> Vec<EventLink> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = match anchor.value().attr("href") {
            Some(href) => href,
            None => continue,
        };
        // Subdomain event pages only; links back to the www root are
        // navigation, not events.
        if !href.contains(DOMAIN_TOKEN) || href.starts_with(WWW_ROOT) {
            continue;
        }

        let text = base::inner_text(anchor);
        let city = match CITY_RE.captures(&text) {
            Some(caps) => caps[1].trim().to_string(),
            None => continue,
        };

        links.push(EventLink {
            city,
            url: base::absolute_url(href),
            raw_text: text,
        });
    }

    links
}
