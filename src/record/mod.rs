//! Agent record definitions
//!
//! A detail page yields a [`RawAgentRecord`]: a fixed-schema mapping from
//! [`Field`] to an optional [`RawValue`]. The validator turns it into a
//! [`ValidatedAgentRecord`] or rejects it as a whole.

mod validate;

pub use validate::{validate, CellValue, ValidatedAgentRecord};

use std::collections::BTreeMap;
use std::fmt;

/// How a field is coerced during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Passed through as text
    Text,
    /// Whole number of sales
    Count,
    /// Dollar amount, `$` and separators stripped
    Currency,
}

/// Every column of the canonical agent schema, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    AgentName,
    AgentEmail,
    BusinessName,
    AgentPhone,
    BrokeragePhone,
    AgentLicense,
    LicenseStatus,
    LicenseType,
    LicenseExpirationDate,
    Address1,
    Address2,
    City,
    State,
    PostalCode,
    TotalSales,
    TotalSalesLast12Months,
    MinimumPriceRange,
    MaximumPriceRange,
    AveragePriceRange,
}

impl Field {
    /// All fields in column order
    pub const ALL: [Field; 19] = [
        Field::AgentName,
        Field::AgentEmail,
        Field::BusinessName,
        Field::AgentPhone,
        Field::BrokeragePhone,
        Field::AgentLicense,
        Field::LicenseStatus,
        Field::LicenseType,
        Field::LicenseExpirationDate,
        Field::Address1,
        Field::Address2,
        Field::City,
        Field::State,
        Field::PostalCode,
        Field::TotalSales,
        Field::TotalSalesLast12Months,
        Field::MinimumPriceRange,
        Field::MaximumPriceRange,
        Field::AveragePriceRange,
    ];

    /// Column name used by every sink
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::AgentName => "agent_name",
            Self::AgentEmail => "agent_email",
            Self::BusinessName => "business_name",
            Self::AgentPhone => "agent_phone",
            Self::BrokeragePhone => "brokerage_phone",
            Self::AgentLicense => "agent_license",
            Self::LicenseStatus => "license_status",
            Self::LicenseType => "license_type",
            Self::LicenseExpirationDate => "license_expiration_date",
            Self::Address1 => "address_1",
            Self::Address2 => "address_2",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postal_code",
            Self::TotalSales => "total_sales",
            Self::TotalSalesLast12Months => "total_sales_last_12_months",
            Self::MinimumPriceRange => "minimum_price_range",
            Self::MaximumPriceRange => "maximum_price_range",
            Self::AveragePriceRange => "average_price_range",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::TotalSales | Self::TotalSalesLast12Months => FieldKind::Count,
            Self::MinimumPriceRange | Self::MaximumPriceRange | Self::AveragePriceRange => {
                FieldKind::Currency
            }
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A value as found on the page, before coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(serde_json::Number),
}

impl RawValue {
    /// Converts a JSON leaf into a raw value
    ///
    /// Strings and numbers are kept, booleans become text, null and
    /// containers are treated as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Number(n) => Some(Self::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(Self::Text(b.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field mapping as extracted from a detail page
///
/// Fields that were never set read back as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAgentRecord {
    values: BTreeMap<Field, RawValue>,
}

impl RawAgentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears a field
    pub fn set(&mut self, field: Field, value: Option<RawValue>) {
        match value {
            Some(v) => {
                self.values.insert(field, v);
            }
            None => {
                self.values.remove(&field);
            }
        }
    }

    /// Builder-style [`set`](Self::set) for a present value
    pub fn with(mut self, field: Field, value: impl Into<RawValue>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    pub fn get(&self, field: Field) -> Option<&RawValue> {
        self.values.get(&field)
    }

    /// Number of present fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
