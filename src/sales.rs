//! Sales reporting: monthly totals, goal progress and the recent-sales list.

use crate::models::{MonthlyBucket, SaleRecord, SalesSummary, TicketOrder};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use std::{cmp::Ordering, collections::BTreeMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SalesError {
    #[error("monthly goal must be positive, got {0}")]
    InvalidGoal(f64),
    #[error("invalid sale amount: {0}")]
    InvalidAmount(String),
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Sum of amounts in the same calendar month as `reference`.
pub fn current_period_total(records: &[SaleRecord], reference: DateTime<Utc>) -> f64 {
    records
        .iter()
        .filter(|record| {
            record.occurred_at.year() == reference.year()
                && record.occurred_at.month() == reference.month()
        })
        .map(|record| record.amount)
        .sum()
}

pub fn year_total(records: &[SaleRecord], reference: DateTime<Utc>) -> f64 {
    records
        .iter()
        .filter(|record| record.occurred_at.year() == reference.year())
        .map(|record| record.amount)
        .sum()
}

/// Percentage of `goal` reached, rounded and capped at 100.
pub fn goal_progress(total: f64, goal: f64) -> Result<u8, SalesError> {
    if goal.is_nan() || goal <= 0.0 {
        return Err(SalesError::InvalidGoal(goal));
    }
    let percent = (100.0 * total / goal).round().clamp(0.0, 100.0);
    Ok(percent as u8)
}

/// Monthly totals in chronological order, whatever the input order.
pub fn monthly_series(records: &[SaleRecord]) -> Vec<MonthlyBucket> {
    let mut totals: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in records {
        let key = (record.occurred_at.year(), record.occurred_at.month());
        *totals.entry(key).or_insert(0.0) += record.amount;
    }

    totals
        .into_iter()
        .map(|((year, month), total)| MonthlyBucket {
            year,
            month,
            label: format!("{month}/{year}"),
            total,
        })
        .collect()
}

/// The `n` newest records, newest first. Ties go to the smaller id.
pub fn recent_records(records: &[SaleRecord], n: usize) -> Vec<SaleRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(newest_first);
    sorted.truncate(n);
    sorted
}

fn newest_first(a: &SaleRecord, b: &SaleRecord) -> Ordering {
    b.occurred_at
        .cmp(&a.occurred_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn ticket_price(name: &str) -> f64 {
    if name.contains("Gratuito") {
        0.0
    } else if name.contains("Meia") {
        20.0
    } else {
        40.0
    }
}

/// One sale per ticket line, dated at midnight of the order date.
pub fn sales_from_orders(orders: &[TicketOrder]) -> Vec<SaleRecord> {
    orders
        .iter()
        .flat_map(|order| {
            let occurred_at = order.date.and_time(NaiveTime::MIN).and_utc();
            order.tickets.iter().map(move |ticket| SaleRecord {
                id: format!("{}-{}", order.id, ticket.id),
                description: format!("{} - {}", ticket.name, order.buyer),
                amount: ticket_price(&ticket.name),
                occurred_at,
            })
        })
        .collect()
}

/// Accepts either `,` or `.` as the decimal separator.
pub fn parse_amount(text: &str) -> Result<f64, SalesError> {
    let trimmed = text.trim();
    let amount: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| SalesError::InvalidAmount(trimmed.to_string()))?;
    validate_amount(amount)
}

pub fn validate_amount(amount: f64) -> Result<f64, SalesError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SalesError::InvalidAmount(amount.to_string()));
    }
    Ok(amount)
}

/// A manually entered sale, validated and stamped with `now`.
pub fn new_sale(
    description: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> Result<SaleRecord, SalesError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(SalesError::MissingField("description"));
    }
    let amount = validate_amount(amount)?;

    Ok(SaleRecord {
        id: format!("sale-{}", now.timestamp_micros()),
        description: description.to_string(),
        amount,
        occurred_at: now,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct SalesAggregator {
    goal: f64,
    recent_limit: usize,
}

impl SalesAggregator {
    pub fn new(goal: f64, recent_limit: usize) -> Result<Self, SalesError> {
        if goal.is_nan() || goal <= 0.0 {
            return Err(SalesError::InvalidGoal(goal));
        }
        Ok(Self { goal, recent_limit })
    }

    pub fn summary(&self, records: &[SaleRecord], reference: DateTime<Utc>) -> SalesSummary {
        let current_month_total = current_period_total(records, reference);
        SalesSummary {
            current_month_total,
            year_total: year_total(records, reference),
            goal: self.goal,
            // The goal is validated in `new`.
            goal_progress: goal_progress(current_month_total, self.goal).unwrap_or(0),
            monthly_series: monthly_series(records),
            recent: recent_records(records, self.recent_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::demo_orders;
    use chrono::TimeZone;

    fn sale(id: &str, amount: f64, year: i32, month: u32, day: u32) -> SaleRecord {
        SaleRecord {
            id: id.into(),
            description: format!("sale {id}"),
            amount,
            occurred_at: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn goal_progress_boundaries() {
        assert_eq!(goal_progress(0.0, 15000.0), Ok(0));
        assert_eq!(goal_progress(20000.0, 15000.0), Ok(100));
        assert_eq!(goal_progress(7500.0, 15000.0), Ok(50));
    }

    #[test]
    fn goal_progress_rejects_non_positive_goal() {
        assert_eq!(goal_progress(10.0, 0.0), Err(SalesError::InvalidGoal(0.0)));
        assert!(SalesAggregator::new(-1.0, 5).is_err());
    }

    #[test]
    fn monthly_series_is_chronological() {
        let records = vec![
            sale("1", 20.0, 2025, 1, 3),
            sale("2", 40.0, 2025, 2, 10),
            sale("3", 10.0, 2025, 1, 20),
        ];
        let series = monthly_series(&records);
        assert_eq!(series.len(), 2);
        assert_eq!((series[0].label.as_str(), series[0].total), ("1/2025", 30.0));
        assert_eq!((series[1].label.as_str(), series[1].total), ("2/2025", 40.0));

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(monthly_series(&reversed), series);
    }

    #[test]
    fn monthly_series_orders_across_years() {
        let records = vec![sale("1", 5.0, 2025, 1, 1), sale("2", 7.0, 2024, 12, 31)];
        let labels: Vec<_> = monthly_series(&records)
            .into_iter()
            .map(|bucket| bucket.label)
            .collect();
        assert_eq!(labels, ["12/2024", "1/2025"]);
    }

    #[test]
    fn current_period_total_matches_bucket() {
        let records = vec![
            sale("1", 20.0, 2025, 7, 15),
            sale("2", 40.0, 2025, 8, 10),
            sale("3", 15.5, 2025, 7, 20),
            sale("4", 99.0, 2024, 7, 20),
        ];
        let reference = Utc.with_ymd_and_hms(2025, 7, 31, 23, 0, 0).unwrap();
        let total = current_period_total(&records, reference);
        let bucket = monthly_series(&records)
            .into_iter()
            .find(|bucket| bucket.year == 2025 && bucket.month == 7)
            .unwrap();
        assert_eq!(total, 35.5);
        assert_eq!(bucket.total, total);
        assert_eq!(year_total(&records, reference), 75.5);
    }

    #[test]
    fn recent_records_newest_first_with_id_tiebreak() {
        let records = vec![
            sale("b", 1.0, 2025, 7, 15),
            sale("c", 1.0, 2025, 7, 20),
            sale("a", 1.0, 2025, 7, 15),
        ];
        let ids: Vec<_> = recent_records(&records, 5)
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(recent_records(&records, 1).len(), 1);
    }

    #[test]
    fn demo_orders_become_priced_sales() {
        let sales = sales_from_orders(&demo_orders());
        assert_eq!(sales.len(), 10);
        let first = &sales[0];
        assert_eq!(first.id, "7867-A1");
        assert_eq!(first.description, "Inteira - Ana Carolina Silva");
        assert_eq!(first.amount, 40.0);

        let free = sales.iter().find(|sale| sale.id == "1234-B1").unwrap();
        assert_eq!(free.amount, 0.0);
        let series = monthly_series(&sales);
        assert_eq!((series[0].label.as_str(), series[0].total), ("7/2025", 140.0));
        assert_eq!((series[1].label.as_str(), series[1].total), ("8/2025", 160.0));
    }

    #[test]
    fn parse_amount_accepts_comma_decimal() {
        assert_eq!(parse_amount("12,50"), Ok(12.5));
        assert_eq!(parse_amount(" 40.00 "), Ok(40.0));
        assert!(matches!(parse_amount("abc"), Err(SalesError::InvalidAmount(_))));
        assert!(matches!(parse_amount("0"), Err(SalesError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3"), Err(SalesError::InvalidAmount(_))));
    }

    #[test]
    fn new_sale_requires_description() {
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap();
        assert_eq!(
            new_sale("  ", 10.0, now),
            Err(SalesError::MissingField("description"))
        );
        let sale = new_sale("Inteira - Ana", 40.0, now).unwrap();
        assert_eq!(sale.occurred_at, now);
        assert_eq!(sale.amount, 40.0);
    }

    #[test]
    fn summary_bundles_every_view() {
        let aggregator = SalesAggregator::new(15000.0, 5).unwrap();
        let records = vec![
            sale("1", 7000.0, 2025, 7, 1),
            sale("2", 500.0, 2025, 7, 2),
            sale("3", 100.0, 2025, 6, 2),
        ];
        let reference = Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap();
        let summary = aggregator.summary(&records, reference);
        assert_eq!(summary.current_month_total, 7500.0);
        assert_eq!(summary.goal_progress, 50);
        assert_eq!(summary.monthly_series.len(), 2);
        assert_eq!(summary.recent.len(), 3);
        assert_eq!(summary.recent[0].id, "2");
    }
}
