//! # CSV Export
//!
//! Renders sale events and daily reports as CSV into any [`Write`].
//! Amounts always carry two decimals; instants are RFC 3339 UTC.

use std::io::Write;

use crate::error::CoreResult;
use crate::types::{DailyReport, SaleEvent};

pub const SALES_HEADER: [&str; 6] = ["id", "date", "time", "mode", "amount", "occurred_at"];

pub const REPORTS_HEADER: [&str; 6] = [
    "date",
    "visit_count",
    "cash_total",
    "electronic_total",
    "combined_total",
    "generated_at",
];

/// Writes sale events in the order given.
pub fn write_sales_csv(events: &[SaleEvent], writer: impl Write) -> CoreResult<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(SALES_HEADER)?;
    for event in events {
        csv.write_record(&[
            event.id.to_string(),
            event.occurred_at.date().format("%Y-%m-%d").to_string(),
            event.occurred_at.time().format("%H:%M:%S").to_string(),
            event.mode.as_str().to_string(),
            event.amount.to_string(),
            event.occurred_at.instant().to_rfc3339(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Writes daily reports in the order given.
pub fn write_reports_csv(reports: &[DailyReport], writer: impl Write) -> CoreResult<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(REPORTS_HEADER)?;
    for report in reports {
        csv.write_record(&[
            report.business_date.format("%Y-%m-%d").to_string(),
            report.visit_count.to_string(),
            report.cash_total.to_string(),
            report.electronic_total.to_string(),
            report.combined_total.to_string(),
            report.generated_at.to_rfc3339(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{DayTotals, OccurredAt, PaymentMode};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;

    #[test]
    fn test_sales_csv() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 4, 30, 15).unwrap();
        let events = vec![SaleEvent {
            id: 3,
            amount: Money::parse("150.5").unwrap(),
            mode: PaymentMode::Electronic,
            occurred_at: OccurredAt::new(instant, Kolkata),
        }];

        let mut out = Vec::new();
        write_sales_csv(&events, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "id,date,time,mode,amount,occurred_at\n\
             3,2024-06-01,10:00:15,electronic,150.50,2024-06-01T04:30:15+00:00\n"
        );
    }

    #[test]
    fn test_reports_csv_header_only_when_empty() {
        let mut out = Vec::new();
        write_reports_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,visit_count,cash_total,electronic_total,combined_total,generated_at\n"
        );
    }

    #[test]
    fn test_reports_csv_row() {
        let totals = DayTotals {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            cash_total: Money::from_cents(15050),
            electronic_total: Money::from_cents(9900),
            visit_count: 2,
        };
        let generated = Utc.with_ymd_and_hms(2024, 6, 2, 17, 30, 0).unwrap();
        let report = DailyReport::from_totals(&totals, generated);

        let mut out = Vec::new();
        write_reports_csv(&[report], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("2024-06-01,2,150.50,99.00,249.50,2024-06-02T17:30:00+00:00\n"));
    }
}
