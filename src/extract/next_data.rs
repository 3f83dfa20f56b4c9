//! Embedded JSON strategy
//!
//! Profile pages ship their server-side props in `script#__NEXT_DATA__`.
//! The agent lives under `props.pageProps.displayUser`; licenses and sales
//! statistics are siblings of `displayUser` inside `pageProps`.

use crate::crawler::selector;
use crate::extract::DetailParser;
use crate::record::{Field, RawAgentRecord, RawValue};
use crate::HarvestError;
use scraper::Html;
use serde_json::Value;

/// Script element holding the page props
pub const NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";

/// Reads the agent from the embedded page props
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedJsonParser;

impl DetailParser for EmbeddedJsonParser {
    fn name(&self) -> &'static str {
        "embedded-json"
    }

    fn parse(&self, html: &str) -> Result<RawAgentRecord, HarvestError> {
        let data = next_data(html)?;
        record_from_props(&data)
    }
}

fn next_data(html: &str) -> Result<Value, HarvestError> {
    let script_selector = selector(NEXT_DATA_SELECTOR)?;
    let document = Html::parse_document(html);

    let script = document
        .select(&script_selector)
        .next()
        .ok_or_else(|| HarvestError::parse("detail page", "no __NEXT_DATA__ script tag found"))?;
    let text: String = script.text().collect();

    serde_json::from_str(&text)
        .map_err(|e| HarvestError::parse("detail page", format!("invalid __NEXT_DATA__ JSON: {}", e)))
}

/// Looks up a required object member; null and `{}` count as missing
fn required<'a>(parent: &'a Value, key: &str, context: &str) -> Result<&'a Value, HarvestError> {
    match parent.get(key) {
        Some(value @ Value::Object(members)) if !members.is_empty() => Ok(value),
        _ => Err(HarvestError::parse(context, format!("missing '{}'", key))),
    }
}

fn leaf(parent: Option<&Value>, key: &str) -> Option<RawValue> {
    parent.and_then(|p| p.get(key)).and_then(RawValue::from_json)
}

/// Dollar-prefixed amount, or absent for null, zero and empty values
fn currency(parent: Option<&Value>, key: &str) -> Option<RawValue> {
    let amount = match parent.and_then(|p| p.get(key))? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) if n.as_f64().map_or(false, |v| v != 0.0) => n.to_string(),
        _ => return None,
    };
    Some(RawValue::Text(format!("${}", amount)))
}

fn record_from_props(data: &Value) -> Result<RawAgentRecord, HarvestError> {
    let props = required(data, "props", "__NEXT_DATA__")?;
    let page_props = required(props, "pageProps", "props")?;
    let user = required(page_props, "displayUser", "pageProps")?;

    let address = user.get("businessAddress");
    let phones = user.get("phoneNumbers");
    let license = page_props
        .get("agentLicenses")
        .and_then(Value::as_array)
        .and_then(|licenses| licenses.first());
    let stats = page_props.get("agentSalesStats");

    let mut record = RawAgentRecord::new();
    record.set(Field::AgentName, leaf(Some(user), "name"));
    record.set(Field::AgentEmail, leaf(Some(user), "email"));
    record.set(Field::BusinessName, leaf(Some(user), "businessName"));
    record.set(Field::AgentPhone, leaf(phones, "cell"));
    record.set(Field::BrokeragePhone, leaf(phones, "brokerage"));

    record.set(Field::AgentLicense, leaf(license, "text"));
    record.set(Field::LicenseStatus, leaf(license, "status"));
    record.set(Field::LicenseType, leaf(license, "license_type"));
    record.set(Field::LicenseExpirationDate, leaf(license, "expiration"));

    record.set(Field::Address1, leaf(address, "address1"));
    record.set(Field::Address2, leaf(address, "address2"));
    record.set(Field::City, leaf(address, "city"));
    record.set(Field::State, leaf(address, "state"));
    record.set(Field::PostalCode, leaf(address, "postalCode"));

    record.set(Field::TotalSales, leaf(stats, "countAllTime"));
    record.set(Field::TotalSalesLast12Months, leaf(stats, "countLastYear"));
    record.set(Field::MinimumPriceRange, currency(stats, "priceRangeThreeYearMin"));
    record.set(Field::MaximumPriceRange, currency(stats, "priceRangeThreeYearMax"));
    record.set(Field::AveragePriceRange, currency(stats, "averageValueThreeYear"));

    Ok(record)
}
