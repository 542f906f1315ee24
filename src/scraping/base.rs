use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, DNT, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::StatusCode;
use scraper::{ElementRef, Selector};
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// Some event subdomains reject requests that do not look like a browser.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static CLIENT: Lazy<Client> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .expect("http client")
});

/// Failure fetching a single page. Scoped to one URL; callers skip and
/// continue.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
}

pub fn fetch_html(url: &str) -> Result<String, FetchError> {
    let response = CLIENT
        .get(url)
        .send()
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }
    response.text().map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })
}

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

/// Normalizes an href from the listing page to an absolute URL: absolute
/// URLs pass through, protocol-relative ones gain `https:`, bare hosts gain
/// `https://`.
pub fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        format!("https://{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text("  House \n of\t Watt "), "House of Watt");
    }

    #[test]
    fn normalizes_hrefs() {
        assert_eq!(
            absolute_url("https://amsterdam.measurecamp.org"),
            "https://amsterdam.measurecamp.org"
        );
        assert_eq!(
            absolute_url("//malmo.measurecamp.org"),
            "https://malmo.measurecamp.org"
        );
        assert_eq!(
            absolute_url("paris.measurecamp.org"),
            "https://paris.measurecamp.org"
        );
    }
}
