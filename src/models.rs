use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted calendar event. Ids collide per city per year, so a second
/// event in the same city and year takes over the same record.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Event {
    pub id: String, // city slug + event year, e.g. "amsterdam-2026"
    pub city: String,
    pub url: String,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM
    pub venue: Option<String>,
    pub address: Option<String>,
    pub last_updated: String,
}

/// Candidate event link pulled off the listing page.
#[derive(Clone, Debug)]
pub struct EventLink {
    pub city: String,
    pub url: String,
    pub raw_text: String,
}

/// Fields recovered from a single event page. `date` stays `None` when no
/// parseable date pattern was found anywhere on the page; such pages are
/// dropped before reconciliation.
#[derive(Clone, Debug)]
pub struct EventDetails {
    pub url: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub address: Option<String>,
}

/// A fully scraped event, ready for reconciliation against the store.
#[derive(Clone, Debug)]
pub struct ScrapedEvent {
    pub city: String,
    pub url: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub address: Option<String>,
}
