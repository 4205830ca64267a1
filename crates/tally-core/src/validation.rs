//! # Validation Module
//!
//! Input validation for sale ingestion.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                          │
//! │  └── JSON shape (deserialization into serde_json::Value fields)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── amount: number or numeric string, finite, > 0, ≤ max              │
//! │  ├── mode:   cash | electronic | upi                                   │
//! │  └── date/time overrides: parsed, resolved locally, not in the future  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (mode IN ('cash','electronic'))                             │
//! │  └── Foreign key customer_visits → sale_events                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written when any check here fails.

use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::clock::BusinessClock;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{OccurredAt, PaymentMode};
use crate::MAX_SALE_AMOUNT;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accepted date override formats, tried in order.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Accepted time override formats, tried in order.
pub const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"];

// =============================================================================
// Amount
// =============================================================================

/// Parses a sale amount from a JSON value.
///
/// ## Rules
/// - JSON numbers and numeric strings are accepted
/// - Must be strictly positive
/// - Must not exceed [`MAX_SALE_AMOUNT`]
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use tally_core::validation::parse_amount;
///
/// assert!(parse_amount(&json!(150.5)).is_ok());
/// assert!(parse_amount(&json!("99.00")).is_ok());
/// assert!(parse_amount(&json!(0)).is_err());
/// assert!(parse_amount(&json!("abc")).is_err());
/// ```
pub fn parse_amount(value: &Value) -> ValidationResult<Money> {
    let text = match value {
        Value::Null => return Err(required("amount")),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => return Err(required("amount")),
        Value::String(s) => s.clone(),
        _ => {
            return Err(ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: "expected a number".to_string(),
            })
        }
    };

    let amount = Money::parse(&text).map_err(|e| ValidationError::InvalidFormat {
        field: "amount".to_string(),
        reason: e.to_string(),
    })?;
    validate_amount(amount)?;
    Ok(amount)
}

/// Checks an already-parsed amount.
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount.amount() > Decimal::from(MAX_SALE_AMOUNT) {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: MAX_SALE_AMOUNT,
        });
    }

    Ok(())
}

// =============================================================================
// Mode
// =============================================================================

/// Parses a payment mode. `"upi"` is an alias of electronic.
pub fn parse_mode(value: &str) -> ValidationResult<PaymentMode> {
    if value.trim().is_empty() {
        return Err(required("mode"));
    }
    value.parse()
}

// =============================================================================
// Date & Time Overrides
// =============================================================================

/// Parses a date override in any of [`DATE_FORMATS`].
pub fn parse_date(value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("'{value}' is not YYYY-MM-DD, DD-MM-YYYY or DD/MM/YYYY"),
        })
}

/// Parses a time override in any of [`TIME_FORMATS`].
pub fn parse_time(value: &str) -> ValidationResult<NaiveTime> {
    let value = value.trim().to_ascii_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&value, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "time".to_string(),
            reason: format!("'{value}' is not HH:MM:SS, HH:MM or h:MM AM/PM"),
        })
}

/// Works out when a sale happened from optional overrides.
///
/// | date | time | result                                   |
/// |------|------|------------------------------------------|
/// | -    | -    | now                                      |
/// | ✓    | -    | that date at the current local time      |
/// | -    | ✓    | today at that time                       |
/// | ✓    | ✓    | that date at that time                   |
///
/// Blank strings count as absent. The result may not lie in the future.
pub fn resolve_override(
    clock: &BusinessClock,
    date: Option<&str>,
    time: Option<&str>,
) -> ValidationResult<OccurredAt> {
    let date = date.filter(|s| !s.trim().is_empty());
    let time = time.filter(|s| !s.trim().is_empty());

    let now = clock.now();
    if date.is_none() && time.is_none() {
        return Ok(now);
    }

    let local_date = match date {
        Some(d) => parse_date(d)?,
        None => now.date(),
    };
    let local_time = match time {
        Some(t) => parse_time(t)?,
        None => now.time(),
    };

    let resolved = clock
        .resolve_local(local_date, local_time.with_nanosecond(0).unwrap_or(local_time))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "time".to_string(),
            reason: "does not exist in the business timezone".to_string(),
        })?;

    if resolved.instant() > now.instant() {
        let field = if time.is_some() { "time" } else { "date" };
        return Err(ValidationError::InFuture {
            field: field.to_string(),
        });
    }

    Ok(resolved)
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;
    use serde_json::json;
    use std::sync::Arc;

    /// 2024-06-01 15:00:00 in Kolkata.
    fn clock() -> BusinessClock {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        BusinessClock::new(Kolkata, Arc::new(FixedClock::new(now)))
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(150.50)).unwrap(), Money::from_cents(15050));
        assert_eq!(parse_amount(&json!("99")).unwrap(), Money::from_cents(9900));
        assert_eq!(parse_amount(&json!(" 12.5 ")).unwrap(), Money::from_cents(1250));

        assert!(matches!(
            parse_amount(&json!(0)),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            parse_amount(&json!(-5)),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            parse_amount(&json!("abc")),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_amount(&Value::Null),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_amount(&json!(true)),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_amount(&json!(1e12)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("cash").unwrap(), PaymentMode::Cash);
        assert_eq!(parse_mode("upi").unwrap(), PaymentMode::Electronic);
        assert!(matches!(parse_mode(""), Err(ValidationError::Required { .. })));
        assert!(matches!(
            parse_mode("bogus"),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(parse_date("2024-05-31").unwrap(), expected);
        assert_eq!(parse_date("31-05-2024").unwrap(), expected);
        assert_eq!(parse_date("31/05/2024").unwrap(), expected);
        assert!(parse_date("05/31/2024").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(parse_time("14:30").unwrap(), expected);
        assert_eq!(parse_time("14:30:00").unwrap(), expected);
        assert_eq!(parse_time("2:30 PM").unwrap(), expected);
        assert_eq!(parse_time("2:30 pm").unwrap(), expected);
        assert_eq!(parse_time("02:30PM").unwrap(), expected);
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_resolve_override_defaults_to_now() {
        let clock = clock();
        let at = resolve_override(&clock, None, Some("  ")).unwrap();
        assert_eq!(at, clock.now());
    }

    #[test]
    fn test_resolve_override_date_only_keeps_time_of_day() {
        let clock = clock();
        let at = resolve_override(&clock, Some("31-05-2024"), None).unwrap();
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert_eq!(at.time(), NaiveTime::from_hms_opt(15, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_override_time_only_uses_today() {
        let clock = clock();
        let at = resolve_override(&clock, None, Some("9:15 AM")).unwrap();
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(at.hour(), 9);
        assert_eq!(at.instant(), Utc.with_ymd_and_hms(2024, 6, 1, 3, 45, 0).unwrap());
    }

    #[test]
    fn test_resolve_override_rejects_future() {
        let clock = clock();
        assert!(matches!(
            resolve_override(&clock, None, Some("16:00")),
            Err(ValidationError::InFuture { .. })
        ));
        assert!(matches!(
            resolve_override(&clock, Some("2024-06-02"), None),
            Err(ValidationError::InFuture { .. })
        ));
    }
}
