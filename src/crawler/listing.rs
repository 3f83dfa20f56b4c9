//! Listing page link extraction
//!
//! Profile links sit in anchors directly under the result grid container.
//! The container's class name is generated by the site's CSS-in-JS build,
//! so it is matched by the stable `Grid` substring.

use crate::crawler::fetcher::PageResponse;
use crate::HarvestError;
use scraper::{Html, Selector};
use url::Url;

/// Anchors under the result grid
pub const PROFILE_LINK_SELECTOR: &str = r#"div[class*="Grid"] > a[href]"#;

/// Span that advertises the total number of results
pub const RESULT_COUNT_SELECTOR: &str = r#"span[class*="jTpxxT"]"#;

/// Extracts profile detail links from a listing page, in page order
///
/// Relative links are resolved against the page URL. The advertised result
/// count is only logged.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Absolute profile URLs; empty when the grid has none
/// * `Err(HarvestError::Parse)` - The page could not be processed
pub fn extract_links(page: &PageResponse) -> Result<Vec<String>, HarvestError> {
    let base_url = Url::parse(&page.url)
        .map_err(|e| HarvestError::parse("listing page url", format!("{}: {}", page.url, e)))?;
    let link_selector = selector(PROFILE_LINK_SELECTOR)?;
    let count_selector = selector(RESULT_COUNT_SELECTOR)?;

    let document = Html::parse_document(&page.body);

    match advertised_total(&document, &count_selector) {
        Some(total) => tracing::info!("Total agents found for this search: {}", total),
        None => tracing::debug!("No result count on listing page {}", page.url),
    }

    let links: Vec<String> = document
        .select(&link_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(href, &base_url))
        .collect();

    if links.is_empty() {
        tracing::warn!("No agent links found on {}", page.url);
    } else {
        tracing::info!("Found {} agent links on {}", links.len(), page.url);
    }

    Ok(links)
}

pub(crate) fn selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css).map_err(|e| HarvestError::parse("selector", format!("{}: {}", css, e)))
}

/// First text node of the first count span
fn advertised_total(document: &Html, count_selector: &Selector) -> Option<String> {
    document
        .select(count_selector)
        .next()?
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url.to_string()),
        _ => None,
    }
}
