//! Rendered markup strategy
//!
//! Reads the fields the profile page renders on screen. Class names on the
//! site are generated, so nodes are matched by stable class substrings and
//! statistics are located through their visible labels.

use crate::crawler::selector;
use crate::extract::DetailParser;
use crate::record::{Field, RawAgentRecord, RawValue};
use crate::HarvestError;
use scraper::{ElementRef, Html};
use url::Url;

const NAME_SELECTOR: &str = r#"div[class*="ProfileFooter"] h1[class*="StyledHeading"]"#;
const PHONE_SELECTOR: &str = r#"a[href^="tel:"]"#;
const EMAIL_SELECTOR: &str = r#"a[href^="mailto:"]"#;
const MAPS_LINK_SELECTOR: &str = r#"a[href*="maps.google.com"]"#;
const COMPANY_SELECTOR: &str = r#"span[class*="Text-c11n-8-107-0"][class*="hJOiOT"]"#;

const SALES_LAST_YEAR_LABEL: &str = "sales last 12 months";
const TOTAL_SALES_LABEL: &str = "total sales";
const PRICE_RANGE_LABEL: &str = "price range";
const AVERAGE_PRICE_LABEL: &str = "average price";

/// Reads the agent from rendered page nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupParser;

impl DetailParser for MarkupParser {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn parse(&self, html: &str) -> Result<RawAgentRecord, HarvestError> {
        let document = Html::parse_document(html);
        let mut record = RawAgentRecord::new();

        // Without the name heading this is not a rendered profile
        let name = first_text(&document, NAME_SELECTOR, 0)?
            .ok_or_else(|| HarvestError::parse("detail page", "no agent name node"))?;
        record.set(Field::AgentName, Some(name));
        record.set(Field::AgentEmail, first_text(&document, EMAIL_SELECTOR, 0)?);
        record.set(Field::BusinessName, first_text(&document, COMPANY_SELECTOR, 0)?);
        record.set(Field::AgentPhone, first_text(&document, PHONE_SELECTOR, 0)?);
        record.set(Field::BrokeragePhone, first_text(&document, PHONE_SELECTOR, 1)?);
        record.set(Field::Address1, maps_address(&document)?);

        record.set(
            Field::TotalSalesLast12Months,
            stat(&document, SALES_LAST_YEAR_LABEL)?.map(|v| RawValue::Text(v.replace(',', ""))),
        );
        record.set(
            Field::TotalSales,
            stat(&document, TOTAL_SALES_LABEL)?.map(|v| RawValue::Text(v.replace(',', ""))),
        );

        if let Some(range) = stat(&document, PRICE_RANGE_LABEL)? {
            let (min, max) = split_price_range(&range);
            record.set(Field::MinimumPriceRange, min.map(RawValue::Text));
            record.set(Field::MaximumPriceRange, max.map(RawValue::Text));
        }
        record.set(
            Field::AveragePriceRange,
            stat(&document, AVERAGE_PRICE_LABEL)?
                .and_then(|v| expand_amount(&v))
                .map(RawValue::Text),
        );

        Ok(record)
    }
}

/// Own text of the `index`-th match, trimmed; blank counts as absent
fn first_text(
    document: &Html,
    css: &str,
    index: usize,
) -> Result<Option<RawValue>, HarvestError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .nth(index)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .map(RawValue::Text))
}

/// Street address from the `q` parameter of the first maps link
fn maps_address(document: &Html) -> Result<Option<RawValue>, HarvestError> {
    let sel = selector(MAPS_LINK_SELECTOR)?;
    let href = match document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
    {
        Some(href) => href,
        None => return Ok(None),
    };

    let url = match Url::parse(href.trim()) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Ignoring malformed maps link {}: {}", href, e);
            return Ok(None);
        }
    };

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(RawValue::Text))
}

/// Direct text children of an element
fn own_text(element: &ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// Value shown next to a statistic label
///
/// The value is the `strong` inside the nearest `span` sibling before the
/// `span` carrying the label.
fn stat(document: &Html, label: &str) -> Result<Option<String>, HarvestError> {
    let span_selector = selector("span")?;

    for span in document.select(&span_selector) {
        if !own_text(&span).to_lowercase().contains(label) {
            continue;
        }

        let value = span
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == "span")
            .find_map(|sibling| {
                sibling
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|child| child.value().name() == "strong")
            })
            .map(|strong| strong.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        if value.is_some() {
            return Ok(value);
        }
    }

    Ok(None)
}

/// Splits `$100K - $1.2M` into expanded lower and upper bounds
///
/// A single amount is used as both bounds.
fn split_price_range(range: &str) -> (Option<String>, Option<String>) {
    let mut bounds = range.split(|c: char| c == '-' || c == '\u{2013}' || c == '\u{2014}');
    let low = bounds.next().and_then(expand_amount);
    match bounds.next() {
        Some(high) => (low, expand_amount(high)),
        None => (low.clone(), low),
    }
}

/// Expands `K`, `M` and `B` magnitude suffixes: `$1.2M` becomes `$1200000`
///
/// Text without a suffix is returned trimmed and otherwise unchanged.
fn expand_amount(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let places = match text.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => 3,
        Some('M') => 6,
        Some('B') => 9,
        _ => return Some(text.to_string()),
    };

    let mantissa: String = text[..text.len() - 1]
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    let valid = !mantissa.is_empty()
        && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
        && mantissa.matches('.').count() <= 1;
    if !valid {
        return Some(text.to_string());
    }

    Some(format!("${}", shift_decimal(&mantissa, places)))
}

/// Moves the decimal point right by `places` without floating point error
fn shift_decimal(digits: &str, places: usize) -> String {
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let mut fraction = fraction.to_string();
    while fraction.len() < places {
        fraction.push('0');
    }
    let (moved, rest) = fraction.split_at(places);

    let whole = format!("{}{}", whole, moved);
    let whole = match whole.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let rest = rest.trim_end_matches('0');

    if rest.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, rest)
    }
}
