use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property};
use tracing::warn;

use crate::models::Event;

const UID_DOMAIN: &str = "measurecamp.org";
const CATEGORIES: &str = "conference,unconference,analytics,webanalytics,measurecamp";
// MeasureCamp brand red.
const CALENDAR_COLOR: &str = "#A32638";

/// Builds the published calendar: one entry per stored event, eight hours
/// long, date+time interpreted as UTC.
pub fn build_calendar(events: &[Event]) -> Calendar {
    let mut calendar = Calendar::new();
    calendar
        .name("MeasureCamp Events")
        .description("MeasureCamp unconference events worldwide")
        .timezone("UTC");
    calendar.append_property(Property::new("METHOD", "PUBLISH"));
    calendar.append_property(Property::new("COLOR", CALENDAR_COLOR));
    let mut refresh = Property::new("REFRESH-INTERVAL", "P1D");
    refresh.add_parameter("VALUE", "DURATION");
    calendar.append_property(refresh);

    for event in events {
        match build_entry(event) {
            Some(entry) => {
                calendar.push(entry);
            }
            None => warn!("feed entry skipped for {}: unparseable date or time", event.id),
        }
    }

    calendar.done()
}

fn build_entry(event: &Event) -> Option<icalendar::Event> {
    let start = parse_start(&event.date, &event.time)?;
    let venue = event.venue.as_deref().unwrap_or("TBD");
    let address = event.address.as_deref().unwrap_or("TBD");

    let mut entry = icalendar::Event::new();
    entry
        .uid(&format!("{}@{UID_DOMAIN}", event.id))
        .summary(&format!("MeasureCamp {}", event.city))
        .description(&format!(
            "MeasureCamp unconference in {}\n\nVenue: {venue}\nAddress: {address}\n\nMore info: {}",
            event.city, event.url
        ))
        .location(&format!("{venue}, {address}"));
    entry.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    entry.add_property("DTSTART", start.format("%Y%m%dT%H%M%SZ").to_string());
    entry.add_property("DURATION", "PT8H");
    entry.add_property("URL", event.url.clone());
    entry.add_property("CATEGORIES", CATEGORIES);
    entry.add_property("TRANSP", "OPAQUE");

    Some(entry.done())
}

fn parse_start(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
    Some(date.and_time(time))
}

/// Writes the feed through a sibling temp file so a failed write never
/// leaves a partial feed in place.
pub fn write_feed(path: &Path, events: &[Event]) -> Result<()> {
    let calendar = build_calendar(events);
    let tmp = path.with_extension("ics.tmp");
    fs::write(&tmp, calendar.to_string())
        .with_context(|| format!("unable to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("unable to move feed into place at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            id: "amsterdam-2026".to_string(),
            city: "Amsterdam".to_string(),
            url: "https://amsterdam.measurecamp.org".to_string(),
            date: "2026-04-18".to_string(),
            time: "09:00".to_string(),
            venue: Some("House of Watt".to_string()),
            address: Some("James Wattstraat 73".to_string()),
            last_updated: "2025-12-11T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn entry_carries_uid_start_and_duration() {
        let ics = build_calendar(&[sample_event()]).to_string();
        assert!(ics.contains("UID:amsterdam-2026@measurecamp.org"), "{ics}");
        assert!(ics.contains("SUMMARY:MeasureCamp Amsterdam"), "{ics}");
        assert!(ics.contains("DTSTART:20260418T090000Z"), "{ics}");
        assert!(ics.contains("DURATION:PT8H"), "{ics}");
        assert!(ics.contains("TRANSP:OPAQUE"), "{ics}");
    }

    #[test]
    fn missing_venue_and_address_render_as_tbd() {
        let mut event = sample_event();
        event.venue = None;
        event.address = None;
        let ics = build_calendar(&[event]).to_string();
        assert!(ics.contains("LOCATION:TBD"), "{ics}");
    }

    #[test]
    fn unparseable_date_is_skipped_not_fatal() {
        let mut event = sample_event();
        event.date = "soon".to_string();
        let ics = build_calendar(&[event, sample_event()]).to_string();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }

    #[test]
    fn calendar_carries_publish_metadata() {
        let ics = build_calendar(&[]).to_string();
        assert!(ics.contains("METHOD:PUBLISH"), "{ics}");
        assert!(ics.contains("X-WR-CALNAME:MeasureCamp Events"), "{ics}");
    }

    #[test]
    fn short_hours_parse_unpadded() {
        assert_eq!(
            parse_start("2026-01-17", "9:30"),
            Some(
                NaiveDate::from_ymd_opt(2026, 1, 17)
                    .unwrap()
                    .and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
            )
        );
    }
}
