use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;

use crate::models::{Event, ScrapedEvent};

/// Scheduled start used when a page never stated one.
pub const DEFAULT_START_TIME: &str = "09:00";

/// Stable per-event identifier: lowercased city with spaces hyphenated and
/// apostrophes dropped, plus the event year. One event per city per year;
/// a second event in the same city and year collides into the same record.
pub fn generate_id(city: &str, date: NaiveDate) -> String {
    let slug = city.to_lowercase().replace(' ', "-").replace('\'', "");
    format!("{slug}-{}", date.year())
}

/// Merges freshly scraped records into the store. Existing records are
/// overwritten (and their `last_updated` bumped) only when a tracked field
/// actually differs; unknown ids are appended in first-seen order; records
/// absent from the scrape are left alone. Returns the changed ids in
/// first-encountered order.
pub fn reconcile(store: &mut Vec<Event>, scraped: &[ScrapedEvent]) -> Vec<String> {
    let mut changed = Vec::new();

    for item in scraped {
        let id = generate_id(&item.city, item.date);
        let candidate = Event {
            id: id.clone(),
            city: item.city.clone(),
            url: item.url.clone(),
            date: item.date.format("%Y-%m-%d").to_string(),
            time: item
                .time
                .clone()
                .unwrap_or_else(|| DEFAULT_START_TIME.to_string()),
            venue: item.venue.clone(),
            address: item.address.clone(),
            last_updated: Utc::now().to_rfc3339(),
        };

        match store.iter().position(|event| event.id == id) {
            Some(index) => {
                if differs(&store[index], &candidate) {
                    info!("updating event {id}");
                    store[index] = candidate;
                    if !changed.contains(&id) {
                        changed.push(id);
                    }
                }
            }
            None => {
                info!("adding new event {id}");
                store.push(candidate);
                changed.push(id);
            }
        }
    }

    changed
}

fn differs(existing: &Event, candidate: &Event) -> bool {
    existing.date != candidate.date
        || existing.time != candidate.time
        || existing.venue != candidate.venue
        || existing.address != candidate.address
        || existing.url != candidate.url
}

/// Whether an event's date lies strictly before `today`. Unparseable dates
/// count as upcoming so they are never pruned by accident.
pub fn is_past(event: &Event, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(&event.date, "%Y-%m-%d") {
        Ok(date) => date < today,
        Err(_) => false,
    }
}

/// Opt-in cleanup: drops events whose date has passed and returns their ids.
/// Off by default; past events otherwise stay in the store indefinitely.
pub fn prune_past(store: &mut Vec<Event>, today: NaiveDate) -> Vec<String> {
    let removed: Vec<String> = store
        .iter()
        .filter(|event| is_past(event, today))
        .map(|event| event.id.clone())
        .collect();
    store.retain(|event| !is_past(event, today));
    removed
}

pub fn future_events<'a>(store: &'a [Event], today: NaiveDate) -> Vec<&'a Event> {
    store
        .iter()
        .filter(|event| !is_past(event, today))
        .collect()
}
