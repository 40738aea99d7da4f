//! Field-level validation shared by the registration saga and the wizard.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::utils::AppError;

/// Earliest accepted year for a date of birth.
const MIN_BIRTH_YEAR: i32 = 1900;

/// Accepts a JSON string, number or null and yields the textual form.
///
/// Form payloads send numeric fields either way (`"1000000"` or `1000000`).
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Trimmed, non-empty view of an optional field.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Collects required fields in declaration order and fails with every missing one.
#[derive(Debug, Default)]
pub struct RequiredFields {
    missing: Vec<String>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed value, recording `name` when absent or blank.
    pub fn take(&mut self, name: &str, value: &Option<String>) -> String {
        match present(value) {
            Some(v) => v.to_string(),
            None => {
                self.missing.push(name.to_string());
                String::new()
            }
        }
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::missing_fields(self.missing))
        }
    }
}

/// Date of birth policy: `YYYY-MM-DD`, a real date, not before 1900, not in the future.
pub fn parse_date_of_birth(value: &str) -> Result<NaiveDate, AppError> {
    let invalid = || AppError::Validation {
        message: "Invalid DOB entered".to_string(),
        fields: vec!["dateOfBirth".to_string()],
    };

    if !DATE.is_match(value) {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    if date.year() < MIN_BIRTH_YEAR || date > Utc::now().date_naive() {
        return Err(invalid());
    }

    Ok(date)
}

/// Non-negative decimal amount.
pub fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Compiles one of the fixed validator patterns below.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|error| panic!("validator pattern {pattern} failed to compile: {error}"))
}

lazy_static::lazy_static! {
    static ref DATE: Regex = compile(r"^\d{4}-\d{2}-\d{2}$");
    static ref EMAIL: Regex = compile(r"^[^\s@]+@[^\s@]+\.[^\s@]+$");
    static ref PHONE: Regex = compile(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$");
    static ref WEBSITE: Regex = compile(r"^(https?://)?([A-Za-z0-9-]+\.)+[A-Za-z]{2,}(/\S*)?$");
    static ref IFSC: Regex = compile(r"^[A-Z]{4}0[A-Z0-9]{6}$");
    static ref SWIFT: Regex = compile(r"^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$");
    static ref ACCOUNT_NUMBER: Regex = compile(r"^[0-9]{6,20}$");
}

/// Wizard field check. Returns an error message for a non-empty value that
/// fails its format; unknown field names are accepted as free text.
pub fn check_field(name: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let ok = match name {
        "email" => EMAIL.is_match(value),
        "phoneNumber" => PHONE.is_match(value),
        "dateOfBirth" => parse_date_of_birth(value).is_ok(),
        "website" => WEBSITE.is_match(value),
        "ifscCode" => IFSC.is_match(value),
        "swiftCode" => SWIFT.is_match(value),
        "accountNumber" => ACCOUNT_NUMBER.is_match(value),
        "revenue" | "fundingReceived" | "valuation" => parse_amount(value).is_some(),
        "profitMargin" => value.parse::<f64>().map(f64::is_finite).unwrap_or(false),
        _ => true,
    };

    if ok {
        None
    } else {
        Some(format!("Invalid {}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_collects_every_missing_field() {
        let mut required = RequiredFields::new();
        let a = required.take("taxId", &Some("  T1 ".into()));
        required.take("swiftCode", &None);
        required.take("bankName", &Some("   ".into()));

        assert_eq!(a, "T1");
        assert_eq!(required.missing(), ["swiftCode".to_string(), "bankName".to_string()]);
        match required.finish() {
            Err(AppError::Validation { fields, .. }) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_date_of_birth_policy() {
        assert!(parse_date_of_birth("1990-01-01").is_ok());
        assert!(parse_date_of_birth("1990-1-1").is_err());
        assert!(parse_date_of_birth("1990-02-30").is_err());
        assert!(parse_date_of_birth("1899-12-31").is_err());
        assert!(parse_date_of_birth("2999-01-01").is_err());
        assert!(parse_date_of_birth("01/01/1990").is_err());
    }

    #[test]
    fn test_lenient_string_accepts_numbers() {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(default, deserialize_with = "lenient_string")]
            revenue: Option<String>,
            #[serde(default, deserialize_with = "lenient_string")]
            net_worth: Option<String>,
        }

        let p: Payload = serde_json::from_str(r#"{"revenue": 1000000}"#).unwrap();
        assert_eq!(p.revenue.as_deref(), Some("1000000"));
        assert_eq!(p.net_worth, None);
    }

    #[test]
    fn test_field_checks() {
        assert_eq!(check_field("ifscCode", "SBIN0001234"), None);
        assert!(check_field("ifscCode", "IFSC1").is_some());
        assert_eq!(check_field("email", "a@b.io"), None);
        assert!(check_field("email", "not-an-email").is_some());
        assert_eq!(check_field("swiftCode", "DEUTDEFF500"), None);
        assert!(check_field("accountNumber", "12ab").is_some());
        assert_eq!(check_field("startupName", "anything"), None);
        assert_eq!(check_field("email", "   "), None);
    }

    #[test]
    fn test_every_validator_pattern_compiles() {
        for pattern in [&*DATE, &*EMAIL, &*PHONE, &*WEBSITE, &*IFSC, &*SWIFT, &*ACCOUNT_NUMBER] {
            assert!(!pattern.as_str().is_empty());
        }
        assert_eq!(check_field("phoneNumber", "+91 98765 43210"), None);
        assert_eq!(check_field("website", "https://acme.example/about"), None);
        assert!(check_field("website", "not a url").is_some());
    }
}
