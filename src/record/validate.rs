//! Record validation
//!
//! Coerces a [`RawAgentRecord`] into a typed [`ValidatedAgentRecord`]. A
//! single failing field rejects the whole record.

use crate::record::{Field, RawAgentRecord, RawValue};
use crate::HarvestError;

/// A fully coerced agent record, the unit every sink persists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedAgentRecord {
    pub agent_name: Option<String>,
    pub agent_email: Option<String>,
    pub business_name: Option<String>,
    pub agent_phone: Option<String>,
    pub brokerage_phone: Option<String>,
    pub agent_license: Option<String>,
    pub license_status: Option<String>,
    pub license_type: Option<String>,
    pub license_expiration_date: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub total_sales: Option<i64>,
    pub total_sales_last_12_months: Option<i64>,
    pub minimum_price_range: Option<f64>,
    pub maximum_price_range: Option<f64>,
    pub average_price_range: Option<f64>,
}

/// Borrowed view of one typed column value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Text(Option<&'a str>),
    Count(Option<i64>),
    Currency(Option<f64>),
}

impl CellValue<'_> {
    /// String rendering used by text-only destinations; absent stays absent
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(v) => v.map(str::to_string),
            Self::Count(v) => v.map(|n| n.to_string()),
            Self::Currency(v) => v.map(|n| n.to_string()),
        }
    }
}

impl ValidatedAgentRecord {
    /// Returns the typed value of a column
    pub fn value(&self, field: Field) -> CellValue<'_> {
        match field {
            Field::AgentName => CellValue::Text(self.agent_name.as_deref()),
            Field::AgentEmail => CellValue::Text(self.agent_email.as_deref()),
            Field::BusinessName => CellValue::Text(self.business_name.as_deref()),
            Field::AgentPhone => CellValue::Text(self.agent_phone.as_deref()),
            Field::BrokeragePhone => CellValue::Text(self.brokerage_phone.as_deref()),
            Field::AgentLicense => CellValue::Text(self.agent_license.as_deref()),
            Field::LicenseStatus => CellValue::Text(self.license_status.as_deref()),
            Field::LicenseType => CellValue::Text(self.license_type.as_deref()),
            Field::LicenseExpirationDate => {
                CellValue::Text(self.license_expiration_date.as_deref())
            }
            Field::Address1 => CellValue::Text(self.address_1.as_deref()),
            Field::Address2 => CellValue::Text(self.address_2.as_deref()),
            Field::City => CellValue::Text(self.city.as_deref()),
            Field::State => CellValue::Text(self.state.as_deref()),
            Field::PostalCode => CellValue::Text(self.postal_code.as_deref()),
            Field::TotalSales => CellValue::Count(self.total_sales),
            Field::TotalSalesLast12Months => CellValue::Count(self.total_sales_last_12_months),
            Field::MinimumPriceRange => CellValue::Currency(self.minimum_price_range),
            Field::MaximumPriceRange => CellValue::Currency(self.maximum_price_range),
            Field::AveragePriceRange => CellValue::Currency(self.average_price_range),
        }
    }

    /// All columns in schema order
    pub fn cells(&self) -> impl Iterator<Item = (Field, CellValue<'_>)> + '_ {
        Field::ALL.iter().map(move |&field| (field, self.value(field)))
    }
}

/// Validates a raw record against the agent schema
///
/// Currency fields drop every character that is not a digit or `.` before
/// parsing; count fields must be whole numbers; text passes through.
///
/// # Example
///
/// ```
/// use agent_harvest::record::{validate, Field, RawAgentRecord};
///
/// let raw = RawAgentRecord::new()
///     .with(Field::AgentName, "Jane Doe")
///     .with(Field::MinimumPriceRange, "$250,000");
/// let record = validate(&raw).unwrap();
/// assert_eq!(record.minimum_price_range, Some(250000.0));
/// ```
pub fn validate(raw: &RawAgentRecord) -> Result<ValidatedAgentRecord, HarvestError> {
    Ok(ValidatedAgentRecord {
        agent_name: text(raw, Field::AgentName),
        agent_email: text(raw, Field::AgentEmail),
        business_name: text(raw, Field::BusinessName),
        agent_phone: text(raw, Field::AgentPhone),
        brokerage_phone: text(raw, Field::BrokeragePhone),
        agent_license: text(raw, Field::AgentLicense),
        license_status: text(raw, Field::LicenseStatus),
        license_type: text(raw, Field::LicenseType),
        license_expiration_date: text(raw, Field::LicenseExpirationDate),
        address_1: text(raw, Field::Address1),
        address_2: text(raw, Field::Address2),
        city: text(raw, Field::City),
        state: text(raw, Field::State),
        postal_code: text(raw, Field::PostalCode),
        total_sales: count(raw, Field::TotalSales)?,
        total_sales_last_12_months: count(raw, Field::TotalSalesLast12Months)?,
        minimum_price_range: currency(raw, Field::MinimumPriceRange)?,
        maximum_price_range: currency(raw, Field::MaximumPriceRange)?,
        average_price_range: currency(raw, Field::AveragePriceRange)?,
    })
}

fn text(raw: &RawAgentRecord, field: Field) -> Option<String> {
    raw.get(field).map(RawValue::to_string)
}

fn count(raw: &RawAgentRecord, field: Field) -> Result<Option<i64>, HarvestError> {
    let Some(value) = raw.get(field) else {
        return Ok(None);
    };

    let parsed = match value {
        RawValue::Text(s) => s.trim().parse::<i64>().ok(),
        RawValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
    };

    parsed
        .map(Some)
        .ok_or_else(|| invalid(field, value, "expected a whole number"))
}

fn currency(raw: &RawAgentRecord, field: Field) -> Result<Option<f64>, HarvestError> {
    let Some(value) = raw.get(field) else {
        return Ok(None);
    };

    match value {
        RawValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if cleaned.is_empty() {
                return Err(invalid(field, value, "no digits in amount"));
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|e| invalid(field, value, &e.to_string()))
        }
        RawValue::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(field, value, "amount out of range")),
    }
}

fn invalid(field: Field, value: &RawValue, reason: &str) -> HarvestError {
    HarvestError::Validation {
        field: field.column_name(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn complete_raw() -> RawAgentRecord {
        RawAgentRecord::new()
            .with(Field::AgentName, "Jane Doe")
            .with(Field::AgentEmail, "jane@example.com")
            .with(Field::BusinessName, "Doe Realty")
            .with(Field::AgentPhone, "(919) 555-0101")
            .with(Field::BrokeragePhone, "(919) 555-0199")
            .with(Field::AgentLicense, "NC 123456")
            .with(Field::LicenseStatus, "Active")
            .with(Field::LicenseType, "Broker")
            .with(Field::LicenseExpirationDate, "2026-06-30")
            .with(Field::Address1, "100 Main St")
            .with(Field::City, "Raleigh")
            .with(Field::State, "NC")
            .with(Field::PostalCode, "27601")
            .with(Field::TotalSales, "142")
            .with(Field::TotalSalesLast12Months, "17")
            .with(Field::MinimumPriceRange, "$250,000")
            .with(Field::MaximumPriceRange, "$1,200,000")
            .with(Field::AveragePriceRange, "$415,500.50")
    }

    #[test]
    fn test_well_formed_record() {
        let record = validate(&complete_raw()).unwrap();

        assert_eq!(record.agent_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.postal_code.as_deref(), Some("27601"));
        assert_eq!(record.address_2, None);
        assert_eq!(record.total_sales, Some(142));
        assert_eq!(record.total_sales_last_12_months, Some(17));
        assert_eq!(record.minimum_price_range, Some(250000.0));
        assert_eq!(record.maximum_price_range, Some(1200000.0));
        assert_eq!(record.average_price_range, Some(415500.5));
    }

    #[test]
    fn test_garbage_price_rejects_whole_record() {
        let raw = complete_raw().with(Field::MaximumPriceRange, "abc");
        let err = validate(&raw).unwrap_err();

        match err {
            HarvestError::Validation { field, value, .. } => {
                assert_eq!(field, "maximum_price_range");
                assert_eq!(value, "abc");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_price_digits() {
        let raw = complete_raw().with(Field::MinimumPriceRange, "1.2.3");
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn test_non_numeric_count_fails() {
        let raw = complete_raw().with(Field::TotalSales, "many");
        assert!(matches!(
            validate(&raw),
            Err(HarvestError::Validation { field: "total_sales", .. })
        ));
    }

    #[test]
    fn test_count_with_separator_fails() {
        let raw = complete_raw().with(Field::TotalSales, "1,204");
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn test_count_trims_whitespace() {
        let raw = complete_raw().with(Field::TotalSales, " 12 ");
        assert_eq!(validate(&raw).unwrap().total_sales, Some(12));
    }

    #[test]
    fn test_json_numbers() {
        let mut raw = complete_raw();
        raw.set(Field::TotalSales, Some(RawValue::Number(Number::from(88))));
        raw.set(
            Field::TotalSalesLast12Months,
            Number::from_f64(9.0).map(RawValue::Number),
        );
        raw.set(
            Field::AveragePriceRange,
            Number::from_f64(350000.25).map(RawValue::Number),
        );
        raw.set(Field::PostalCode, Some(RawValue::Number(Number::from(27601))));

        let record = validate(&raw).unwrap();
        assert_eq!(record.total_sales, Some(88));
        assert_eq!(record.total_sales_last_12_months, Some(9));
        assert_eq!(record.average_price_range, Some(350000.25));
        assert_eq!(record.postal_code.as_deref(), Some("27601"));
    }

    #[test]
    fn test_fractional_count_fails() {
        let mut raw = complete_raw();
        raw.set(
            Field::TotalSales,
            Number::from_f64(3.5).map(RawValue::Number),
        );
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn test_empty_record_is_all_none() {
        let record = validate(&RawAgentRecord::new()).unwrap();
        assert_eq!(record, ValidatedAgentRecord::default());
        assert!(record.cells().all(|(_, cell)| cell.to_text().is_none()));
    }

    #[test]
    fn test_cells_follow_schema_order() {
        let record = validate(&complete_raw()).unwrap();
        let fields: Vec<Field> = record.cells().map(|(f, _)| f).collect();
        assert_eq!(fields, Field::ALL.to_vec());

        assert_eq!(
            record.value(Field::TotalSales).to_text().as_deref(),
            Some("142")
        );
        assert_eq!(
            record.value(Field::MinimumPriceRange).to_text().as_deref(),
            Some("250000")
        );
        assert_eq!(record.value(Field::Address2).to_text(), None);
    }
}
