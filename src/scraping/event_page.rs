use chrono::{Datelike, Month, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::base::{self, FetchError};
use crate::models::EventDetails;

// Address candidates in the whole-page scan are capped so a page-wide
// container cannot win over the block actually holding the street address.
const MAX_ADDRESS_LEN: usize = 200;
const MAX_VENUE_LEN: usize = 100;

static DATE_BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headerdetails.datey").expect("date block selector"));
static HEADER_DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headerdate").expect("header date selector"));
static LOC_BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headerdetails.locy").expect("location block selector"));
static HEADER_LOC_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headerloc").expect("header loc selector"));
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("h3 selector"));
static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("span selector"));
static ANY_DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, span").expect("fallback date selector")
});
static ANY_BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, div").expect("fallback block selector")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\s+(\d{1,2})\s+(\w+),?\s*(\d{4})?",
    )
    .expect("date regex")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("time regex"));
static STARTING_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)starting at\s+(\d{1,2}):(\d{2})").expect("starting-at regex"));
// Map-link captions the sites append after the street address.
static ADDRESS_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(?(?:Localisation|Localiser|View the venue|Maps?|Localizer).*$")
        .expect("address suffix regex")
});
static STREET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\d+.*\b(street|avenue|road|lane|square|plaza|drive|court|building|floor|suite)\b",
    )
    .expect("street regex")
});

/// Fetches one event page and recovers date, time, venue and address.
/// A missing date is reported as `None`; the caller drops the event.
pub fn extract(url: &str) -> Result<EventDetails, FetchError> {
    let html = base::fetch_html(url)?;
    Ok(parse_document(url, &html, Utc::now().date_naive()))
}

/// Layered parse: the structured header blocks first, then a whole-page
/// heuristic scan for each field still missing. Start time stays `None`
/// when never found; the reconciler fills in the 09:00 default.
pub(crate) fn parse_document(url: &str, html: &str, today: NaiveDate) -> EventDetails {
    let document = Html::parse_document(html);

    let mut date = None;
    let mut time = None;
    let mut venue = None;
    let mut address = None;

    if let Some(block) = document.select(&DATE_BLOCK_SELECTOR).next() {
        if let Some(header) = block.select(&HEADER_DATE_SELECTOR).next() {
            if let Some(heading) = base::first_text(&header, &HEADING_SELECTOR) {
                date = parse_event_date(&heading, today);
            }
            if let Some(span) = base::first_text(&header, &SPAN_SELECTOR) {
                time = find_time(&span);
            }
        }
    }

    if let Some(block) = document.select(&LOC_BLOCK_SELECTOR).next() {
        if let Some(header) = block.select(&HEADER_LOC_SELECTOR).next() {
            venue = base::first_text(&header, &HEADING_SELECTOR);
            address = base::first_text(&header, &SPAN_SELECTOR)
                .map(|text| strip_address_suffix(&text))
                .filter(|text| !text.is_empty());
        }
    }

    if date.is_none() {
        date = scan_for_date(&document, today);
    }
    if time.is_none() {
        time = scan_for_time(&document);
    }
    if venue.is_none() && address.is_none() {
        (venue, address) = scan_for_location(&document);
    }

    EventDetails {
        url: url.to_string(),
        date,
        time,
        venue,
        address,
    }
}

/// Parses "Saturday 14 Jun, 2025" or "Saturday 17 Jan". Without a year, one
/// is inferred: a month earlier in the calendar than the current month means
/// next year. Events earlier in the current month therefore stay in the
/// current year even when already past.
pub(crate) fn parse_event_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let day: u32 = caps[2].parse().ok()?;
    let month = caps[3].parse::<Month>().ok()?.number_from_month();
    let year = match caps.get(4) {
        Some(year) => year.as_str().parse::<i32>().ok()?,
        None => infer_year(month, today),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn infer_year(month: u32, today: NaiveDate) -> i32 {
    if month < today.month() {
        today.year() + 1
    } else {
        today.year()
    }
}

fn find_time(text: &str) -> Option<String> {
    TIME_RE
        .captures(text)
        .map(|caps| format!("{}:{}", &caps[1], &caps[2]))
}

fn strip_address_suffix(text: &str) -> String {
    ADDRESS_SUFFIX_RE.replace(text, "").trim().to_string()
}

fn scan_for_date(document: &Html, today: NaiveDate) -> Option<NaiveDate> {
    document
        .select(&ANY_DATE_SELECTOR)
        .find_map(|element| parse_event_date(&base::inner_text(element), today))
}

fn scan_for_time(document: &Html) -> Option<String> {
    let text = base::inner_text(document.root_element());
    STARTING_AT_RE
        .captures(&text)
        .map(|caps| format!("{}:{}", &caps[1], &caps[2]))
}

/// Whole-page venue/address heuristic: the first block whose text holds
/// digits followed by a street-type keyword is the address; the nearest
/// preceding short, comma-free block is the venue.
fn scan_for_location(document: &Html) -> (Option<String>, Option<String>) {
    let blocks: Vec<(ElementRef<'_>, String)> = document
        .select(&ANY_BLOCK_SELECTOR)
        .map(|element| (element, base::inner_text(element)))
        .collect();

    let mut address_index = None;
    for (index, (element, text)) in blocks.iter().enumerate() {
        if text.len() >= MAX_ADDRESS_LEN || !STREET_RE.is_match(text) {
            continue;
        }
        // Wrappers match through their children; keep descending to the
        // block that actually holds the address.
        let matches_via_child = element
            .select(&ANY_BLOCK_SELECTOR)
            .any(|child| STREET_RE.is_match(&base::inner_text(child)));
        if !matches_via_child {
            address_index = Some(index);
            break;
        }
    }

    let Some(address_index) = address_index else {
        return (None, None);
    };
    let address = blocks[address_index].1.clone();

    let venue = blocks[..address_index]
        .iter()
        .rev()
        .map(|(_, text)| text)
        .find(|text| {
            !text.is_empty()
                && text.len() < MAX_VENUE_LEN
                && !text.contains(',')
                && !STREET_RE.is_match(text)
                && !text.contains(address.as_str())
        })
        .cloned();

    (venue, Some(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    const STRUCTURED_HTML: &str = r#"
    <div class="headerwrap">
        <div class="headerdetails datey">
            <div class="headerdate">
                <h3><i class="fa fa-calendar"></i> Saturday 14 Jun, 2025</h3>
                <span>- Doors 08:45 - 17h00 + after</span>
            </div>
        </div>
        <div class="headerdetails locy">
            <div class="headerloc">
                <h3><i class="fa fa-map-marker"></i> House of Watt</h3>
                <span>James Wattstraat 73, 1097 DL Amsterdam (Localisation)</span>
            </div>
        </div>
    </div>
    "#;

    #[test]
    fn parses_structured_header_blocks() {
        let details = parse_document(
            "https://amsterdam.measurecamp.org",
            STRUCTURED_HTML,
            date(2025, 1, 10),
        );
        assert_eq!(details.date, Some(date(2025, 6, 14)));
        assert_eq!(details.time.as_deref(), Some("08:45"));
        assert_eq!(details.venue.as_deref(), Some("House of Watt"));
        assert_eq!(
            details.address.as_deref(),
            Some("James Wattstraat 73, 1097 DL Amsterdam")
        );
    }

    #[test]
    fn all_day_header_leaves_time_unset() {
        let html = STRUCTURED_HTML.replace("- Doors 08:45 - 17h00 + after", "- 8h30 + afterparty");
        let details = parse_document("https://amsterdam.measurecamp.org", &html, date(2025, 1, 10));
        assert_eq!(details.time, None);
        assert!(details.date.is_some());
    }

    const HEURISTIC_HTML: &str = r#"
    <h1>MeasureCamp Malmo</h1>
    <h2>Saturday 17 Jan</h2>
    <p>A free unconference for the analytics community. Starting at 10:30 sharp.</p>
    <h4>Media Evolution City</h4>
    <p>20 Castle Square</p>
    <p>Doors close once the opening session begins.</p>
    "#;

    #[test]
    fn falls_back_to_whole_page_scan() {
        let details = parse_document(
            "https://malmo.measurecamp.org",
            HEURISTIC_HTML,
            date(2025, 12, 11),
        );
        assert_eq!(details.date, Some(date(2026, 1, 17)));
        assert_eq!(details.time.as_deref(), Some("10:30"));
        assert_eq!(details.venue.as_deref(), Some("Media Evolution City"));
        assert_eq!(details.address.as_deref(), Some("20 Castle Square"));
    }

    #[test]
    fn structured_block_wins_over_page_scan() {
        let html = format!("{STRUCTURED_HTML}\n<h2>Sunday 1 Feb, 2026</h2>");
        let details =
            parse_document("https://amsterdam.measurecamp.org", &html, date(2025, 1, 10));
        assert_eq!(details.date, Some(date(2025, 6, 14)));
    }

    #[test]
    fn page_without_date_yields_none() {
        let html = r#"
        <h1>MeasureCamp Paris</h1>
        <h4>Le Loft</h4>
        <p>12 Rue de la Victoire Building B</p>
        "#;
        let details = parse_document("https://paris.measurecamp.org", html, date(2025, 12, 11));
        assert_eq!(details.date, None);
        assert_eq!(details.venue.as_deref(), Some("Le Loft"));
        assert!(details.address.is_some());
    }

    #[test]
    fn infers_next_year_for_earlier_month() {
        let today = date(2025, 12, 11);
        assert_eq!(
            parse_event_date("Saturday 17 Jan", today),
            Some(date(2026, 1, 17))
        );
        // November sits before December, so the rule pushes it a year out
        // even though the announcement almost certainly meant last month.
        assert_eq!(
            parse_event_date("Saturday 15 Nov", today),
            Some(date(2026, 11, 15))
        );
    }

    #[test]
    fn keeps_current_year_for_same_month() {
        let today = date(2025, 12, 11);
        assert_eq!(
            parse_event_date("Saturday 13 Dec", today),
            Some(date(2025, 12, 13))
        );
        // Days earlier in the current month are not bumped either; they
        // resolve to a date already past.
        assert_eq!(
            parse_event_date("Saturday 6 Dec", today),
            Some(date(2025, 12, 6))
        );
    }

    #[test]
    fn explicit_year_is_taken_verbatim() {
        let today = date(2025, 12, 11);
        assert_eq!(
            parse_event_date("Saturday 14 Jun, 2025", today),
            Some(date(2025, 6, 14))
        );
        assert_eq!(
            parse_event_date("Saturday 18 April 2026", today),
            Some(date(2026, 4, 18))
        );
    }

    #[test]
    fn rejects_unparseable_text() {
        let today = date(2025, 12, 11);
        assert_eq!(parse_event_date("Sometime next spring", today), None);
        assert_eq!(parse_event_date("Saturday 31 Feb", today), None);
    }
}
