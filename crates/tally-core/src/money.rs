//! # Money Module
//!
//! Provides the `Money` type for handling monetary values exactly.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Rounding every sale to 2 places before summing:                        │
//! │    1000 sales × 0.005 rounding drift → totals off by rupees             │
//! │                                                                         │
//! │  OUR SOLUTION: Exact decimals, rounded only when presented              │
//! │    Stored:  "150.505"  (as entered)                                    │
//! │    Summed:  exact Decimal addition                                     │
//! │    Shown:   150.51     (2 dp, at serialization time only)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let cash = Money::parse("150.50").unwrap();
//! let upi = Money::from_cents(9900);
//!
//! let total = cash + upi;
//! assert_eq!(total.to_string(), "249.50");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Decimal places used when presenting money.
pub const DISPLAY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// An exact monetary value in the business currency.
///
/// ## Design Decisions
/// - **Decimal (not f64)**: sums are exact regardless of how many sales
/// - **Full precision stored**: the value is never rounded on the way in
/// - **Rounded on the way out**: `Serialize` and `Display` round to 2 places
///
/// ## Where Money is Used
/// ```text
/// POST /api/sales {amount} ──► Money ──► sale_events.amount (TEXT)
///                                            │
///                      today() / close-out ◄─┘  exact Decimal sums
///                                            │
///                      JSON / CSV ◄──────────┘  rounded to 2 dp
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from minor units (paise, cents).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(15050).to_string(), "150.50");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Parses a plain or scientific decimal string.
    ///
    /// Accepts `"150.50"`, `"99"`, `"1.5e2"`. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, rust_decimal::Error> {
        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map(Money)
    }

    /// Returns the exact underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns the value rounded to [`DISPLAY_SCALE`] places, half away from zero.
    ///
    /// Presentation only. Never feed the result back into a sum.
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Rounded value as `f64`, for JSON numbers.
    pub fn to_display_f64(&self) -> f64 {
        self.rounded().to_f64().unwrap_or(0.0)
    }

    /// Exact, normalized text form used for storage (`"150.5"`, `"99"`).
    pub fn to_storage_string(&self) -> String {
        self.0.normalize().to_string()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders with exactly two decimals: `249.50`, `-3.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

/// Serializes as a JSON number rounded to two places.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_display_f64())
    }
}

/// Accepts JSON numbers and numeric strings.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        // Shortest round-trip text keeps 150.5 as 150.5, not 150.49999...
        Money::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse(v).map_err(E::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Money::parse("150.50").unwrap().to_string(), "150.50");
        assert_eq!(Money::parse(" 99 ").unwrap().to_string(), "99.00");
        assert_eq!(Money::parse("1.5e2").unwrap().to_string(), "150.00");
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("").is_err());
    }

    #[test]
    fn test_exact_sum_then_round() {
        // Three sales of 0.005 each: rounding first would show 0.03, exact shows 0.02
        let tiny = Money::parse("0.005").unwrap();
        let total: Money = [tiny, tiny, tiny].iter().sum();
        assert_eq!(total.amount(), Decimal::from_str("0.015").unwrap());
        assert_eq!(total.to_string(), "0.02");
    }

    #[test]
    fn test_float_artifacts_do_not_leak() {
        let total = Money::parse("0.1").unwrap() + Money::parse("0.2").unwrap();
        assert_eq!(total.amount(), Decimal::from_str("0.3").unwrap());
    }

    #[test]
    fn test_storage_string_keeps_precision() {
        let m = Money::parse("150.5050").unwrap();
        assert_eq!(m.to_storage_string(), "150.505");
        assert_eq!(Money::parse(&m.to_storage_string()).unwrap(), m);
    }

    #[test]
    fn test_serialize_rounds_to_two_places() {
        let m = Money::parse("249.505").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "249.51");
        assert_eq!(serde_json::to_string(&Money::zero()).unwrap(), "0.0");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Money = serde_json::from_str("150.5").unwrap();
        let from_string: Money = serde_json::from_str("\"150.50\"").unwrap();
        let from_int: Money = serde_json::from_str("99").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_int, Money::from_cents(9900));
        assert!(serde_json::from_str::<Money>("true").is_err());
    }

    #[test]
    fn test_zero_and_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_cents(1).is_positive());
        assert!(!Money::from_cents(-1).is_positive());
        assert_eq!((Money::from_cents(100) - Money::from_cents(400)).to_string(), "-3.00");
    }
}
