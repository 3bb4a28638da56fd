//! Portfolio-level totals and per-symbol allocation.

use crate::core::market::{DividendLedger, QuoteBook};
use crate::core::portfolio::Portfolio;
use crate::core::valuation::{Valuation, percent_of, valuate_holding};

/// Market value per symbol, in order of first occurrence. Lots of the same
/// symbol are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationBreakdown {
    entries: Vec<(String, f64)>,
}

impl AllocationBreakdown {
    fn add(&mut self, symbol: &str, value: f64) {
        match self.entries.iter_mut().find(|(s, _)| s == symbol) {
            Some((_, total)) => *total += value,
            None => self.entries.push((symbol.to_string(), value)),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(s, v)| (s.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entries, in breakdown order.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| *v).sum()
    }

    /// Share of the breakdown total held in `symbol`, as a percentage.
    pub fn weight(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .map_or(0.0, |value| percent_of(value, self.total()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioTotals {
    pub total_invested: f64,
    pub total_current_value: f64,
    pub total_capital_gain: f64,
    pub total_capital_gain_percent: f64,
    pub total_dividends: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub portfolio_id: String,
    pub name: String,
    /// One entry per holding, in holding order.
    pub valuations: Vec<Valuation>,
    pub totals: PortfolioTotals,
    pub allocation: AllocationBreakdown,
}

/// Folds every holding of `portfolio` into totals and an allocation breakdown.
///
/// Pure: the same portfolio and snapshots always give the same summary.
pub fn aggregate_portfolio(
    portfolio: &Portfolio,
    quotes: &QuoteBook,
    dividends: &DividendLedger,
) -> PortfolioSummary {
    let valuations: Vec<Valuation> = portfolio
        .holdings
        .iter()
        .map(|h| {
            let history = dividends.get(&h.symbol).map_or(&[][..], Vec::as_slice);
            valuate_holding(h, quotes.get(&h.symbol), history)
        })
        .collect();

    let mut allocation = AllocationBreakdown::default();
    for v in &valuations {
        allocation.add(&v.symbol, v.market_value);
    }

    let total_invested: f64 = valuations.iter().map(|v| v.cost_basis).sum();
    // Taken from the breakdown so the two always agree to the last bit.
    let total_current_value = allocation.total();
    let total_dividends: f64 = valuations.iter().map(|v| v.accrued_dividends).sum();
    let total_capital_gain = total_current_value - total_invested;
    let total_return = total_capital_gain + total_dividends;

    PortfolioSummary {
        portfolio_id: portfolio.id.clone(),
        name: portfolio.name.clone(),
        valuations,
        totals: PortfolioTotals {
            total_invested,
            total_current_value,
            total_capital_gain,
            total_capital_gain_percent: percent_of(total_capital_gain, total_invested),
            total_dividends,
            total_return,
            total_return_percent: percent_of(total_return, total_invested),
        },
        allocation,
    }
}
