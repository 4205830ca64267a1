//! # Aggregation Folds
//!
//! Pure functions that turn loaded rows into dashboard figures. The database
//! layer decides *which* rows; this module decides *what they add up to*.
//!
//! ```text
//! [SaleEvent] ──► day_totals()      ──► DayTotals
//! [SaleEvent] ──► itemize()         ──► TodayItemized
//! [VisitRecord] ► peak_hours()      ──► [HourBucket]     (ascending hour)
//! [VisitRecord] ► weekday_distribution() ► [WeekdayBucket] (Monday first)
//! ```
//!
//! Sums are exact. Rows with zero or negative amounts are summed as stored.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{
    DayTotals, HourBucket, ItemizedSale, PaymentMode, SaleEvent, TodayItemized, VisitRecord,
    WeekdayBucket,
};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    visits: i64,
    cash: Money,
    electronic: Money,
}

impl Tally {
    fn add(&mut self, mode: PaymentMode, amount: Money) {
        self.visits += 1;
        match mode {
            PaymentMode::Cash => self.cash += amount,
            PaymentMode::Electronic => self.electronic += amount,
        }
    }
}

/// Totals for `date` from its sales and its visit count.
///
/// The visit count comes from the visit ledger, not from `sales.len()`.
pub fn day_totals(date: NaiveDate, sales: &[SaleEvent], visit_count: i64) -> DayTotals {
    let mut tally = Tally::default();
    for sale in sales {
        tally.add(sale.mode, sale.amount);
    }
    DayTotals {
        date,
        cash_total: tally.cash,
        electronic_total: tally.electronic,
        visit_count,
    }
}

/// Splits sales by mode, each side ascending by local time.
pub fn itemize(sales: &[SaleEvent]) -> TodayItemized {
    let mut sorted: Vec<&SaleEvent> = sales.iter().collect();
    sorted.sort_by_key(|s| (s.occurred_at.instant(), s.id));

    let mut out = TodayItemized::default();
    for sale in sorted {
        let item = ItemizedSale {
            time: sale.occurred_at.time(),
            amount: sale.amount,
        };
        match sale.mode {
            PaymentMode::Cash => out.cash.push(item),
            PaymentMode::Electronic => out.electronic.push(item),
        }
    }
    out
}

/// Groups visits by local hour of day. Only hours with visits appear.
pub fn peak_hours(visits: &[VisitRecord]) -> Vec<HourBucket> {
    let mut by_hour: BTreeMap<u32, Tally> = BTreeMap::new();
    for visit in visits {
        by_hour
            .entry(visit.occurred_at.hour())
            .or_default()
            .add(visit.mode, visit.amount);
    }

    by_hour
        .into_iter()
        .map(|(hour, t)| HourBucket {
            hour,
            visit_count: t.visits,
            cash_total: t.cash,
            electronic_total: t.electronic,
        })
        .collect()
}

/// Groups visits by local day of week, Monday first. Only days with visits
/// appear.
pub fn weekday_distribution(visits: &[VisitRecord]) -> Vec<WeekdayBucket> {
    let mut by_day: BTreeMap<u32, Tally> = BTreeMap::new();
    for visit in visits {
        by_day
            .entry(visit.occurred_at.weekday().num_days_from_monday())
            .or_default()
            .add(visit.mode, visit.amount);
    }

    by_day
        .into_iter()
        .map(|(idx, t)| WeekdayBucket {
            weekday: weekday_name(idx).to_string(),
            visit_count: t.visits,
            cash_total: t.cash,
            electronic_total: t.electronic,
            combined_total: t.cash + t.electronic,
        })
        .collect()
}

fn weekday_name(days_from_monday: u32) -> &'static str {
    match days_from_monday {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OccurredAt;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;

    /// Builds a sale at a Kolkata wall time on 2024-06-03 (a Monday) + `day` days.
    fn sale(id: i64, day: i64, hour: u32, min: u32, mode: PaymentMode, cents: i64) -> SaleEvent {
        let local = Kolkata
            .with_ymd_and_hms(2024, 6, 3, hour, min, 0)
            .unwrap()
            + chrono::Duration::days(day);
        SaleEvent {
            id,
            amount: Money::from_cents(cents),
            mode,
            occurred_at: OccurredAt::new(local.with_timezone(&Utc), Kolkata),
        }
    }

    fn visit_of(s: &SaleEvent) -> VisitRecord {
        VisitRecord {
            occurred_at: s.occurred_at,
            mode: s.mode,
            amount: s.amount,
        }
    }

    #[test]
    fn test_day_totals_example() {
        let sales = vec![
            sale(1, 0, 10, 0, PaymentMode::Cash, 15050),
            sale(2, 0, 11, 0, PaymentMode::Electronic, 9900),
        ];
        let date = sales[0].occurred_at.date();
        let totals = day_totals(date, &sales, 2);
        assert_eq!(totals.cash_total.to_string(), "150.50");
        assert_eq!(totals.electronic_total.to_string(), "99.00");
        assert_eq!(totals.combined_total().to_string(), "249.50");
        assert_eq!(totals.visit_count, 2);
    }

    #[test]
    fn test_day_totals_order_independent() {
        let mut sales: Vec<SaleEvent> = (0..50)
            .map(|i| {
                let mode = if i % 3 == 0 { PaymentMode::Cash } else { PaymentMode::Electronic };
                sale(i, 0, 9 + (i as u32 % 10), 0, mode, 101 + i * 7)
            })
            .collect();
        let date = sales[0].occurred_at.date();
        let forward = day_totals(date, &sales, 50);
        sales.reverse();
        let backward = day_totals(date, &sales, 50);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_day_totals_tolerates_non_positive_rows() {
        let sales = vec![
            sale(1, 0, 10, 0, PaymentMode::Cash, 1000),
            sale(2, 0, 10, 5, PaymentMode::Cash, -300),
            sale(3, 0, 10, 9, PaymentMode::Cash, 0),
        ];
        let totals = day_totals(sales[0].occurred_at.date(), &sales, 3);
        assert_eq!(totals.cash_total, Money::from_cents(700));
    }

    #[test]
    fn test_itemize_sorted_by_time() {
        let sales = vec![
            sale(1, 0, 14, 0, PaymentMode::Cash, 500),
            sale(2, 0, 9, 30, PaymentMode::Electronic, 200),
            sale(3, 0, 8, 15, PaymentMode::Cash, 100),
        ];
        let items = itemize(&sales);
        assert_eq!(items.cash.len(), 2);
        assert_eq!(items.cash[0].amount, Money::from_cents(100));
        assert_eq!(items.cash[1].amount, Money::from_cents(500));
        assert_eq!(items.electronic.len(), 1);
    }

    #[test]
    fn test_peak_hours_sum_to_total_visits() {
        let sales = vec![
            sale(1, 0, 9, 0, PaymentMode::Cash, 100),
            sale(2, 1, 9, 59, PaymentMode::Electronic, 200),
            sale(3, 2, 17, 10, PaymentMode::Cash, 300),
        ];
        let visits: Vec<VisitRecord> = sales.iter().map(visit_of).collect();
        let buckets = peak_hours(&visits);

        assert_eq!(buckets.iter().map(|b| b.hour).collect::<Vec<_>>(), vec![9, 17]);
        assert_eq!(buckets[0].visit_count, 2);
        assert_eq!(buckets[0].cash_total, Money::from_cents(100));
        assert_eq!(buckets[0].electronic_total, Money::from_cents(200));
        assert_eq!(buckets.iter().map(|b| b.visit_count).sum::<i64>(), 3);
        assert_eq!(peak_hours(&visits), buckets);
        assert!(peak_hours(&[]).is_empty());
    }

    #[test]
    fn test_weekday_distribution_monday_first() {
        // Sunday (day 6) listed after Monday (day 0)
        let sales = vec![
            sale(1, 6, 10, 0, PaymentMode::Cash, 100),
            sale(2, 0, 10, 0, PaymentMode::Electronic, 250),
            sale(3, 7, 10, 0, PaymentMode::Cash, 50),
        ];
        let visits: Vec<VisitRecord> = sales.iter().map(visit_of).collect();
        let days = weekday_distribution(&visits);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].weekday, "Monday");
        assert_eq!(days[0].visit_count, 2);
        assert_eq!(days[0].combined_total, Money::from_cents(300));
        assert_eq!(days[1].weekday, "Sunday");
    }
}
