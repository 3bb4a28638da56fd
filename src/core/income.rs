//! Forward dividend income estimates.

use crate::core::market::{DividendLedger, DividendPayment};
use crate::core::portfolio::Portfolio;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    pub horizon_years: u32,
    pub baseline_growth: f64,
    pub reinvested_growth: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        ProjectionSettings {
            horizon_years: 10,
            baseline_growth: 0.05,
            reinvested_growth: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedYear {
    pub offset: u32,
    pub year: i32,
    pub baseline: f64,
    pub reinvested: f64,
}

/// Expected dividend income per calendar month, January first. An estimate
/// built from recent payment months, not a schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyCalendar {
    pub amounts: [f64; 12],
}

impl MonthlyCalendar {
    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        MONTHS.iter().copied().zip(self.amounts.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeProjection {
    /// Trailing-year dividend income of the current holdings.
    pub annual_income: f64,
    pub years: Vec<ProjectedYear>,
    pub monthly: MonthlyCalendar,
}

/// Sum of per-share payments made during calendar `year`.
pub fn annual_dividend_per_share(history: &[DividendPayment], year: i32) -> f64 {
    history
        .iter()
        .filter(|d| d.year() == year)
        .map(|d| d.amount_per_share)
        .sum()
}

/// Projects dividend income from last calendar year's payments, compounded at
/// the baseline and the reinvested growth rates. Symbols with no payments in
/// that year contribute nothing.
pub fn project_income(
    portfolio: &Portfolio,
    dividends: &DividendLedger,
    settings: &ProjectionSettings,
    today: NaiveDate,
) -> IncomeProjection {
    let current_year = today.year();
    let trailing_year = current_year - 1;

    let mut per_symbol: HashMap<&str, f64> = HashMap::new();
    for holding in &portfolio.holdings {
        per_symbol.entry(holding.symbol.as_str()).or_insert_with(|| {
            dividends
                .get(&holding.symbol)
                .map_or(0.0, |history| annual_dividend_per_share(history, trailing_year))
        });
    }

    let annual_income: f64 = portfolio
        .holdings
        .iter()
        .map(|h| per_symbol.get(h.symbol.as_str()).copied().unwrap_or(0.0) * h.shares)
        .sum();

    let years = (0..settings.horizon_years)
        .map(|offset| {
            let exponent = offset as i32;
            ProjectedYear {
                offset,
                year: current_year + exponent,
                baseline: annual_income * (1.0 + settings.baseline_growth).powi(exponent),
                reinvested: annual_income * (1.0 + settings.reinvested_growth).powi(exponent),
            }
        })
        .collect();

    IncomeProjection {
        annual_income,
        years,
        monthly: monthly_calendar(portfolio, dividends, today),
    }
}

/// Buckets every payment from the previous and the current calendar year by
/// month. A month paid in both years is counted twice; the calendar is a rough
/// guide to when income arrives and does not track cadence changes.
pub fn monthly_calendar(
    portfolio: &Portfolio,
    dividends: &DividendLedger,
    today: NaiveDate,
) -> MonthlyCalendar {
    let first_year = today.year() - 1;
    let mut calendar = MonthlyCalendar::default();

    for holding in &portfolio.holdings {
        let Some(history) = dividends.get(&holding.symbol) else {
            continue;
        };
        for payment in history.iter().filter(|d| d.year() >= first_year) {
            calendar.amounts[payment.month_index()] += payment.amount_per_share * holding.shares;
        }
    }
    calendar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::portfolio::Holding;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn holding(symbol: &str, shares: f64) -> Holding {
        Holding {
            id: format!("{symbol}-{shares}"),
            symbol: symbol.to_string(),
            isin: None,
            purchase_date: date("2020-01-01"),
            shares,
            price: 50.0,
            fees: 0.0,
        }
    }

    fn portfolio(holdings: Vec<Holding>) -> Portfolio {
        Portfolio {
            id: "p".to_string(),
            name: "Income".to_string(),
            color: "#10B981".to_string(),
            holdings,
        }
    }

    fn quarterly(symbol: &str, year: i32, amount: f64) -> (String, Vec<DividendPayment>) {
        let payments = [3, 6, 9, 12]
            .iter()
            .map(|m| DividendPayment::new(NaiveDate::from_ymd_opt(year, *m, 15).unwrap(), amount))
            .collect();
        (symbol.to_string(), payments)
    }

    #[test]
    fn test_no_history_projects_zero() {
        let p = portfolio(vec![holding("KO", 10.0), holding("T", 3.0)]);
        let projection = project_income(
            &p,
            &DividendLedger::new(),
            &ProjectionSettings::default(),
            date("2024-05-01"),
        );

        assert_eq!(projection.annual_income, 0.0);
        assert_eq!(projection.years.len(), 10);
        assert!(
            projection
                .years
                .iter()
                .all(|y| y.baseline == 0.0 && y.reinvested == 0.0)
        );
        assert!(projection.monthly.amounts.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn test_projection_uses_trailing_calendar_year() {
        let p = portfolio(vec![holding("KO", 10.0)]);
        let mut ledger = DividendLedger::new();
        let (symbol, mut payments) = quarterly("KO", 2023, 0.5);
        // Partial current-year data and an older year must be ignored.
        payments.push(DividendPayment::new(date("2024-03-15"), 0.9));
        payments.push(DividendPayment::new(date("2022-03-15"), 0.1));
        ledger.insert(symbol, payments);

        let projection = project_income(
            &p,
            &ledger,
            &ProjectionSettings::default(),
            date("2024-05-01"),
        );

        assert_eq!(projection.annual_income, 20.0);
        let first = &projection.years[0];
        assert_eq!((first.offset, first.year), (0, 2024));
        assert_eq!(first.baseline, 20.0);
        assert_eq!(first.reinvested, 20.0);

        let second = &projection.years[1];
        assert_eq!(second.year, 2025);
        assert!((second.baseline - 21.0).abs() < 1e-9);
        assert!((second.reinvested - 21.6).abs() < 1e-9);

        let last = projection.years.last().unwrap();
        assert_eq!(last.year, 2033);
        assert!((last.baseline - 20.0 * 1.05f64.powi(9)).abs() < 1e-9);
    }

    #[test]
    fn test_projection_scales_by_shares_across_lots() {
        let p = portfolio(vec![holding("KO", 10.0), holding("KO", 5.0), holding("X", 4.0)]);
        let ledger: DividendLedger = [quarterly("KO", 2023, 0.25)].into_iter().collect();

        let settings = ProjectionSettings {
            horizon_years: 3,
            baseline_growth: 0.0,
            reinvested_growth: 0.1,
        };
        let projection = project_income(&p, &ledger, &settings, date("2024-01-10"));

        assert_eq!(projection.annual_income, 15.0);
        assert_eq!(projection.years.len(), 3);
        assert!(projection.years.iter().all(|y| y.baseline == 15.0));
    }

    #[test]
    fn test_monthly_calendar_buckets_recent_payments() {
        let p = portfolio(vec![holding("KO", 10.0)]);
        let mut ledger = DividendLedger::new();
        ledger.insert(
            "KO".to_string(),
            vec![
                DividendPayment::new(date("2023-04-01"), 0.46),
                DividendPayment::new(date("2024-04-01"), 0.485),
                DividendPayment::new(date("2024-07-01"), 0.485),
                DividendPayment::new(date("2022-10-01"), 0.44),
            ],
        );

        let calendar = monthly_calendar(&p, &ledger, date("2024-08-20"));

        // April appears in both years and is counted twice.
        assert!((calendar.amounts[3] - (0.46 + 0.485) * 10.0).abs() < 1e-9);
        assert!((calendar.amounts[6] - 4.85).abs() < 1e-9);
        assert_eq!(calendar.amounts[9], 0.0);
        assert!((calendar.total() - (0.46 + 0.485 + 0.485) * 10.0).abs() < 1e-9);

        let labels: Vec<&str> = calendar.iter().map(|(m, _)| m).collect();
        assert_eq!(labels.first(), Some(&"Jan"));
        assert_eq!(labels.len(), 12);
    }

    #[test]
    fn test_annual_dividend_per_share() {
        let (_, payments) = quarterly("KO", 2023, 0.5);
        assert_eq!(annual_dividend_per_share(&payments, 2023), 2.0);
        assert_eq!(annual_dividend_per_share(&payments, 2022), 0.0);
    }
}
