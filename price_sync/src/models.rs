//! Price record types shared by the parser, the store and the HTTP layer

use crate::error::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Date format used in CSV files, filter parameters and the database
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar date written exactly as zero-padded `YYYY-MM-DD`.
///
/// Anything else, including surrounding whitespace or unpadded fields, is
/// rejected even where chrono alone would accept it.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let shaped = raw.len() == 10
        && raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// A single price record
///
/// Deduplication uses [`PriceRecord::dedup_key`], not `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    /// Held at two decimal places
    pub price: Decimal,
    pub created_at: NaiveDate,
}

impl PriceRecord {
    /// The tuple the store enforces uniqueness on
    pub fn dedup_key(&self) -> (&str, &str, Decimal, NaiveDate) {
        (&self.name, &self.category, self.price, self.created_at)
    }
}

/// Optional inclusive bounds for an export query
///
/// A `None` bound leaves that side of the axis unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl FilterCriteria {
    /// Build criteria from raw query parameters.
    ///
    /// Missing or empty parameters are treated as absent. Dates must be
    /// `YYYY-MM-DD`; price bounds must be non-negative decimals.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        min: Option<&str>,
        max: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            start: parse_date_bound("start", start)?,
            end: parse_date_bound("end", end)?,
            min: parse_price_bound("min", min)?,
            max: parse_price_bound("max", max)?,
        })
    }

    /// True when no bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.min.is_none() && self.max.is_none()
    }
}

/// A blank parameter counts as absent. Non-blank values are kept verbatim.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_date_bound(label: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    present(value)
        .map(|v| {
            parse_date(v)
                .ok_or_else(|| Error::InvalidFilter(format!("invalid {} date: {}", label, v)))
        })
        .transpose()
}

fn parse_price_bound(label: &str, value: Option<&str>) -> Result<Option<Decimal>> {
    present(value)
        .map(|v| match Decimal::from_str(v) {
            Ok(d) if d >= Decimal::ZERO => Ok(d),
            _ => Err(Error::InvalidFilter(format!("invalid {} value: {}", label, v))),
        })
        .transpose()
}

/// Counts returned by a committed batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Store-wide aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreTotals {
    pub total_items: i64,
    pub total_categories: i64,
    pub total_price: Decimal,
}

/// Summary of one ingest run
///
/// Every data line is counted in exactly one of `inserted`, `duplicates`
/// or `malformed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    /// Store aggregates observed after the batch committed
    pub totals: StoreTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_criteria_all_absent() {
        let criteria = FilterCriteria::parse(None, None, None, None).unwrap();
        assert!(criteria.is_unbounded());
    }

    #[test]
    fn parse_criteria_treats_empty_as_absent() {
        let criteria = FilterCriteria::parse(Some(""), Some("  "), Some(""), None).unwrap();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn parse_criteria_all_present() {
        let criteria = FilterCriteria::parse(
            Some("2024-01-01"),
            Some("2024-01-31"),
            Some("10"),
            Some("99.5"),
        )
        .unwrap();

        assert_eq!(criteria.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(criteria.end, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(criteria.min, Some(Decimal::new(10, 0)));
        assert_eq!(criteria.max, Some(Decimal::new(995, 1)));
    }

    #[test]
    fn parse_criteria_keeps_zero_as_a_bound() {
        let criteria = FilterCriteria::parse(None, None, Some("0"), None).unwrap();
        assert_eq!(criteria.min, Some(Decimal::ZERO));
        assert!(!criteria.is_unbounded());
    }

    #[test]
    fn parse_criteria_rejects_bad_date() {
        let err = FilterCriteria::parse(Some("01/02/2024"), None, None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn parse_criteria_rejects_loose_dates() {
        for raw in ["2024-1-5", " 2024-01-05", "2024-01-05 "] {
            let err = FilterCriteria::parse(None, Some(raw), None, None).unwrap_err();
            assert!(err.to_string().contains("end"), "{:?} accepted", raw);
        }
    }

    #[test]
    fn parse_date_requires_padded_iso_form() {
        assert_eq!(parse_date("2024-01-05"), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parse_date("2024-1-5"), None);
        assert_eq!(parse_date("2024-01-5"), None);
        assert_eq!(parse_date(" 2024-01-05"), None);
        assert_eq!(parse_date("2024-01-05 "), None);
        assert_eq!(parse_date("+202-01-05"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("2024/01/05"), None);
    }

    #[test]
    fn parse_criteria_rejects_negative_price() {
        let err = FilterCriteria::parse(None, None, None, Some("-1")).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
        assert!(err.to_string().contains("max"));
    }

    #[test]
    fn parse_criteria_rejects_non_numeric_price() {
        assert!(FilterCriteria::parse(None, None, Some("ten"), None).is_err());
    }

    #[test]
    fn dedup_key_ignores_id() {
        let a = PriceRecord {
            id: 1,
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            price: Decimal::new(999, 2),
            created_at: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        let b = PriceRecord { id: 2, ..a.clone() };

        assert_ne!(a, b);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
