use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use kore_core::{Entity, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Calendar month an invoice bills for, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Rent falls due on the 5th.
    pub fn due_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 5).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid billing period {s:?}, expected YYYY-MM");
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for BillingPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingPeriod> for String {
    fn from(period: BillingPeriod) -> Self {
        period.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

/// Rent invoice for one unit and one billing period. `amount` is in minor
/// units of `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub unit_id: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub renter_id: String,
    pub period: BillingPeriod,
    #[validate(range(
        min = 0,
        max = 1_000_000_000_000_i64,
        message = "must be between 0 and 1000000000000"
    ))]
    pub amount: i64,
    #[validate(length(equal = 3, message = "must be a 3-letter ISO code"))]
    pub currency: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub due_on: NaiveDate,
}

impl Entity for Invoice {
    const COLLECTION: &'static str = "invoices";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_parse_and_print_as_year_month() {
        let period: BillingPeriod = "2026-03".parse().unwrap();
        assert_eq!(period.to_string(), "2026-03");
        assert_eq!(period.due_date(), NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(period.next().to_string(), "2026-04");
        assert_eq!(BillingPeriod::new(2026, 12).unwrap().next().to_string(), "2027-01");
    }

    #[test]
    fn malformed_periods_are_rejected() {
        for bad in ["2026-13", "2026-3", "26-03", "march", ""] {
            assert!(bad.parse::<BillingPeriod>().is_err(), "{bad}");
        }
        assert!(serde_json::from_value::<BillingPeriod>(serde_json::json!("2026-00")).is_err());
    }
}
