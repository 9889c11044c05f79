//! Raw rows read from the `visits` and `medicines` tables.
//!
//! Rows are accepted as loosely as the store hands them out: dates and fees may
//! be missing, null or of the wrong type. Dates are checked when a row is
//! aggregated (bad date: row skipped), fees when they are summed (bad fee:
//! whole report fails).

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// A fee value that cannot be read as a number
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value for {field}: {value}")]
pub struct CoercionError {
    pub field: &'static str,
    pub value: String,
}

/// Why an amount could not be produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("{0} is outside the supported decimal range")]
    Overflow(&'static str),
}

/// Fee cell exactly as stored. Null, missing, `0`, `false` and `""` all count as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Fee(Option<Value>);

impl Fee {
    pub fn new(value: Value) -> Self {
        Fee(Some(value))
    }

    /// Numbers too small for 28 decimal places round to zero; numbers too
    /// large for `Decimal` are an [`AmountError::Overflow`].
    pub fn amount(&self, field: &'static str) -> Result<Decimal, AmountError> {
        let invalid = |value: &Value| AmountError::from(CoercionError { field, value: value.to_string() });

        match &self.0 {
            None | Some(Value::Null) => Ok(Decimal::ZERO),
            Some(Value::Bool(b)) => Ok(if *b { Decimal::ONE } else { Decimal::ZERO }),
            Some(v @ Value::Number(n)) => match parse_decimal(&n.to_string()) {
                Some(amount) => Ok(amount),
                None => n.as_f64().ok_or_else(|| invalid(v)).and_then(|f| decimal_from_f64(f, field)),
            },
            Some(Value::String(s)) if s.is_empty() => Ok(Decimal::ZERO),
            Some(v @ Value::String(s)) => match parse_decimal(s.trim()) {
                Some(amount) => Ok(amount),
                None => match s.trim().parse::<f64>() {
                    Ok(f) if f.is_finite() => decimal_from_f64(f, field),
                    _ => Err(invalid(v)),
                },
            },
            Some(Value::Array(items)) if items.is_empty() => Ok(Decimal::ZERO),
            Some(Value::Object(map)) if map.is_empty() => Ok(Decimal::ZERO),
            Some(other) => Err(invalid(other)),
        }
    }
}

impl From<Decimal> for Fee {
    fn from(value: Decimal) -> Self {
        Fee(Some(Value::String(value.to_string())))
    }
}

impl From<i64> for Fee {
    fn from(value: i64) -> Self {
        Fee(Some(Value::from(value)))
    }
}

/// Numeric value past what `Decimal` parses directly: written out with 28
/// fractional digits, which `Decimal` rounds on parse.
fn decimal_from_f64(value: f64, field: &'static str) -> Result<Decimal, AmountError> {
    Decimal::from_str(&format!("{:.28}", value)).map_err(|_| AmountError::Overflow(field))
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    if unsigned.is_empty() {
        return None;
    }
    Decimal::from_str(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .ok()
}

/// Keep strings, drop anything else
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VisitRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default)]
    pub consultation_fee: Fee,
    #[serde(default)]
    pub drug_fee: Fee,
    #[serde(default, rename = "Procedure_Fee", alias = "procedure_fee")]
    pub procedure_fee: Fee,
    #[serde(default, deserialize_with = "lenient_string")]
    pub new_old: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub referral: Option<String>,
}

impl VisitRecord {
    /// Consultation, drug and procedure fees together
    pub fn revenue(&self) -> Result<Decimal, AmountError> {
        let consultation = self.consultation_fee.amount("consultation_fee")?;
        let drug = self.drug_fee.amount("drug_fee")?;
        let procedure = self.procedure_fee.amount("Procedure_Fee")?;

        consultation
            .checked_add(drug)
            .and_then(|sum| sum.checked_add(procedure))
            .ok_or(AmountError::Overflow("visit revenue"))
    }

    pub fn is_new_patient(&self) -> bool {
        self.new_old
            .as_deref()
            .map(|flag| flag.trim().eq_ignore_ascii_case("n"))
            .unwrap_or(false)
    }

    pub fn is_google_referral(&self) -> bool {
        self.referral
            .as_deref()
            .map(|source| source.to_lowercase().contains("google"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MedicineRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default)]
    pub drug_fee: Fee,
}

impl MedicineRecord {
    pub fn revenue(&self) -> Result<Decimal, AmountError> {
        self.drug_fee.amount("drug_fee")
    }
}

/// Calendar date of a stored date or timestamp.
///
/// Accepts `YYYY-MM-DD`, or a timestamp with a `T` separator. `Z` and `+00:00`
/// are removed before the timestamp is read as a naive date-time; any other
/// offset is kept and the wall-clock date is used.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    if raw.contains('T') {
        let cleaned = raw.replace('Z', "").replace("+00:00", "");
        parse_timestamp(&cleaned)
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local().date()))
        .or_else(|| {
            DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z")
                .ok()
                .map(|dt| dt.naive_local().date())
        })
}
