//! # Payment Text Classifier
//!
//! Turns free-form payment notification text (bank / UPI SMS) into a
//! [`SaleCandidate`], or nothing when the text isn't an incoming payment.
//!
//! ```text
//! "Rs.250.00 credited to A/c XX12 via UPI"  ──►  Some(250.00, electronic)
//! "INR 99 debited from A/c XX12"            ──►  None   (outgoing)
//! "Your OTP is 4411"                        ──►  None   (no amount)
//! ```

use regex::Regex;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{PaymentMode, SaleCandidate};

/// Something that can recognize a payment in text.
pub trait PaymentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Option<SaleCandidate>;
}

/// Keyword and currency-marker rules.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    amount: Regex,
    credit: Regex,
    debit: Regex,
    cash: Regex,
}

impl KeywordClassifier {
    pub fn new() -> CoreResult<Self> {
        Ok(KeywordClassifier {
            amount: Regex::new(r"(?i)(?:\brs\.?|\binr|₹)\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)")?,
            credit: Regex::new(r"(?i)\b(credited|received|paid to you|deposited)\b")?,
            debit: Regex::new(r"(?i)\b(debited|sent|withdrawn|spent)\b")?,
            cash: Regex::new(r"(?i)\bcash\b")?,
        })
    }
}

impl PaymentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Option<SaleCandidate> {
        if !self.credit.is_match(text) || self.debit.is_match(text) {
            return None;
        }

        let caps = self.amount.captures(text)?;
        let matched = caps.get(0)?.as_str().to_string();
        let digits = caps.get(1)?.as_str().replace(',', "");
        let amount = Money::parse(&digits).ok().filter(Money::is_positive)?;

        let mode = if self.cash.is_match(text) {
            PaymentMode::Cash
        } else {
            PaymentMode::Electronic
        };

        Some(SaleCandidate {
            amount,
            mode,
            matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new().unwrap()
    }

    #[test]
    fn test_credit_message_is_electronic_sale() {
        let c = classifier()
            .classify("Rs.250.00 credited to A/c XX1234 on 01-06-24 via UPI Ref 4412")
            .unwrap();
        assert_eq!(c.amount, Money::from_cents(25000));
        assert_eq!(c.mode, PaymentMode::Electronic);
        assert_eq!(c.matched, "Rs.250.00");
    }

    #[test]
    fn test_currency_markers() {
        let c = classifier();
        assert_eq!(
            c.classify("You have received INR 1,250.5 from ravi@upi").unwrap().amount,
            Money::from_cents(125050)
        );
        assert_eq!(
            c.classify("₹75 paid to you by Asha").unwrap().amount,
            Money::from_cents(7500)
        );
    }

    #[test]
    fn test_cash_keyword_sets_mode() {
        let c = classifier().classify("Cash deposited Rs 500").unwrap();
        assert_eq!(c.mode, PaymentMode::Cash);
    }

    #[test]
    fn test_rejects_debits_and_noise() {
        let c = classifier();
        assert!(c.classify("INR 99 debited from A/c XX12").is_none());
        assert!(c.classify("Rs 40 sent to shop, received confirmation").is_none());
        assert!(c.classify("Your OTP is 4411").is_none());
        assert!(c.classify("Payment received").is_none());
        assert!(c.classify("Rs 0 credited").is_none());
    }
}
