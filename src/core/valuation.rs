//! Valuation of a single holding against the latest quote and its dividend history.

use crate::core::market::{DividendPayment, Quote};
use crate::core::portfolio::Holding;

/// Derived figures for one holding. Never stored; recomputed from inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub holding_id: String,
    pub symbol: String,
    pub shares: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub cost_basis: f64,
    pub capital_gain: f64,
    pub capital_gain_percent: f64,
    pub accrued_dividends: f64,
    pub dividend_yield_on_cost: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
    /// Whether `current_price` came from a live quote.
    pub quoted: bool,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub percent_change: Option<f64>,
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Dividends received by `holding`, counting payments from the purchase date on.
pub fn accrued_dividends(holding: &Holding, dividends: &[DividendPayment]) -> f64 {
    let per_share: f64 = dividends
        .iter()
        .filter(|d| d.date >= holding.purchase_date)
        .map(|d| d.amount_per_share)
        .sum();
    per_share * holding.shares
}

/// Values `holding` at the quoted price, or at its purchase price when no quote
/// is available. Missing market data never produces an error.
pub fn valuate_holding(
    holding: &Holding,
    quote: Option<&Quote>,
    dividends: &[DividendPayment],
) -> Valuation {
    let current_price = quote.map_or(holding.price, |q| q.price);
    let market_value = holding.shares * current_price;
    let cost_basis = holding.cost_basis();
    let capital_gain = market_value - cost_basis;
    let accrued = accrued_dividends(holding, dividends);
    let total_return = capital_gain + accrued;

    Valuation {
        holding_id: holding.id.clone(),
        symbol: holding.symbol.clone(),
        shares: holding.shares,
        current_price,
        market_value,
        cost_basis,
        capital_gain,
        capital_gain_percent: percent_of(capital_gain, cost_basis),
        accrued_dividends: accrued,
        dividend_yield_on_cost: percent_of(accrued, cost_basis),
        total_return,
        total_return_percent: percent_of(total_return, cost_basis),
        quoted: quote.is_some(),
        name: quote.map(|q| q.name.clone()),
        kind: quote.and_then(|q| q.kind.clone()),
        percent_change: quote.map(|q| q.percent_change),
    }
}
