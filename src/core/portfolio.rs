//! Portfolios, holdings and the in-memory book that owns them.

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Display colors handed out to new portfolios in creation order.
pub const PALETTE: [&str; 8] = [
    "#3B82F6", // blue
    "#10B981", // green
    "#EF4444", // red
    "#F59E0B", // yellow
    "#8B5CF6", // purple
    "#EC4899", // pink
    "#6366F1", // indigo
    "#6B7280", // gray
];

/// A single purchase lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    pub symbol: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub isin: Option<String>,
    #[serde(rename = "date", alias = "purchase_date")]
    pub purchase_date: NaiveDate,
    pub shares: f64,
    pub price: f64,
    #[serde(default)]
    pub fees: f64,
}

impl Holding {
    pub fn new(fields: HoldingFields) -> Self {
        Self {
            id: new_id(),
            symbol: fields.symbol,
            isin: fields.isin,
            purchase_date: fields.purchase_date,
            shares: fields.shares,
            price: fields.price,
            fees: fields.fees,
        }
    }

    /// Total capital committed to the lot, fees included.
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.price + self.fees
    }

    /// A zero-share lot only tracks the symbol.
    pub fn is_watch_only(&self) -> bool {
        self.shares == 0.0
    }

    fn apply(&mut self, fields: HoldingFields) {
        self.symbol = fields.symbol;
        self.isin = fields.isin;
        self.purchase_date = fields.purchase_date;
        self.shares = fields.shares;
        self.price = fields.price;
        self.fees = fields.fees;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            holdings: Vec::new(),
        }
    }

    pub fn holding(&self, holding_id: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.id == holding_id)
    }
}

/// Validated field values for creating or editing a holding.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingFields {
    pub symbol: String,
    pub isin: Option<String>,
    pub purchase_date: NaiveDate,
    pub shares: f64,
    pub price: f64,
    pub fees: f64,
}

/// Raw user input for a holding, as typed into a form or passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct HoldingDraft {
    pub symbol: String,
    pub isin: Option<String>,
    pub date: String,
    pub shares: String,
    pub price: String,
    pub fees: Option<String>,
}

impl HoldingDraft {
    /// Rejects input the valuation core must never see.
    pub fn validate(&self) -> Result<HoldingFields> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("Symbol must not be empty");
        }

        let purchase_date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid purchase date: {}", self.date))?;

        let shares = parse_amount("shares", &self.shares)?;
        let price = parse_amount("price", &self.price)?;
        let fees = match self.fees.as_deref().map(str::trim) {
            None | Some("") => 0.0,
            Some(raw) => parse_amount("fees", raw)?,
        };

        let isin = self
            .isin
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        Ok(HoldingFields {
            symbol,
            isin,
            purchase_date,
            shares,
            price,
            fees,
        })
    }

    /// Sets `shares` to the whole number of shares `amount` buys at the
    /// draft's price. Any remainder stays uninvested.
    pub fn with_amount(mut self, amount: &str) -> Result<Self> {
        let amount = parse_amount("amount", amount)?;
        let price = parse_amount("price", &self.price)?;
        if price == 0.0 {
            bail!("Cannot derive shares from an amount at a price of 0");
        }
        self.shares = (amount / price).floor().to_string();
        Ok(self)
    }

    /// Fills unset fields from an existing holding, used when editing.
    pub fn merged_with(self, holding: &Holding) -> Self {
        let or_keep = |value: String, current: String| {
            if value.trim().is_empty() { current } else { value }
        };
        Self {
            symbol: or_keep(self.symbol, holding.symbol.clone()),
            isin: self.isin.or_else(|| holding.isin.clone()),
            date: or_keep(self.date, holding.purchase_date.to_string()),
            shares: or_keep(self.shares, holding.shares.to_string()),
            price: or_keep(self.price, holding.price.to_string()),
            fees: self.fees.or_else(|| Some(holding.fees.to_string())),
        }
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {field}: '{raw}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Invalid {field}: must be a non-negative number, got {raw}");
    }
    Ok(value)
}

// Older saves store a missing ISIN as an empty string.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Outcome of toggling a watched symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchToggle {
    Added(String),
    Removed(usize),
}

/// Owns every portfolio of the session. The in-memory book is authoritative;
/// persistence only mirrors it.
#[derive(Debug, Clone, Default)]
pub struct PortfolioBook {
    portfolios: Vec<Portfolio>,
}

impl PortfolioBook {
    pub fn new(portfolios: Vec<Portfolio>) -> Self {
        Self { portfolios }
    }

    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    /// Looks a portfolio up by id, falling back to a case-insensitive name match.
    pub fn find(&self, id_or_name: &str) -> Option<&Portfolio> {
        self.portfolios
            .iter()
            .find(|p| p.id == id_or_name)
            .or_else(|| {
                self.portfolios
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(id_or_name.trim()))
            })
    }

    fn find_mut(&mut self, id_or_name: &str) -> Result<&mut Portfolio> {
        let id = self
            .find(id_or_name)
            .map(|p| p.id.clone())
            .ok_or_else(|| anyhow!("Portfolio not found: {id_or_name}"))?;
        self.portfolios
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("Portfolio not found: {id_or_name}"))
    }

    pub fn create_portfolio(&mut self, name: &str, color: Option<&str>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Portfolio name must not be empty");
        }
        let color = color.unwrap_or(PALETTE[self.portfolios.len() % PALETTE.len()]);
        let portfolio = Portfolio::new(name, color);
        let id = portfolio.id.clone();
        debug!(id = %id, name, "Created portfolio");
        self.portfolios.push(portfolio);
        Ok(id)
    }

    /// Removes a portfolio together with all of its holdings.
    pub fn delete_portfolio(&mut self, id_or_name: &str) -> Result<Portfolio> {
        let id = self.find_mut(id_or_name)?.id.clone();
        let index = self
            .portfolios
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| anyhow!("Portfolio not found: {id_or_name}"))?;
        Ok(self.portfolios.remove(index))
    }

    pub fn add_holding(&mut self, portfolio: &str, fields: HoldingFields) -> Result<String> {
        let portfolio = self.find_mut(portfolio)?;
        let holding = Holding::new(fields);
        let id = holding.id.clone();
        debug!(portfolio = %portfolio.name, symbol = %holding.symbol, "Added holding");
        portfolio.holdings.push(holding);
        Ok(id)
    }

    pub fn edit_holding(
        &mut self,
        portfolio: &str,
        holding_id: &str,
        fields: HoldingFields,
    ) -> Result<()> {
        let portfolio = self.find_mut(portfolio)?;
        let holding = portfolio
            .holdings
            .iter_mut()
            .find(|h| h.id == holding_id)
            .ok_or_else(|| anyhow!("Holding not found: {holding_id}"))?;
        holding.apply(fields);
        Ok(())
    }

    pub fn delete_holding(&mut self, portfolio: &str, holding_id: &str) -> Result<Holding> {
        let portfolio = self.find_mut(portfolio)?;
        let index = portfolio
            .holdings
            .iter()
            .position(|h| h.id == holding_id)
            .ok_or_else(|| anyhow!("Holding not found: {holding_id}"))?;
        Ok(portfolio.holdings.remove(index))
    }

    /// Adds a zero-share lot for `symbol`, or removes every lot of it if the
    /// portfolio already holds the symbol.
    pub fn toggle_watch(
        &mut self,
        portfolio: &str,
        symbol: &str,
        price: Option<f64>,
        today: NaiveDate,
    ) -> Result<WatchToggle> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("Symbol must not be empty");
        }
        let portfolio = self.find_mut(portfolio)?;

        let before = portfolio.holdings.len();
        portfolio.holdings.retain(|h| h.symbol != symbol);
        let removed = before - portfolio.holdings.len();
        if removed > 0 {
            return Ok(WatchToggle::Removed(removed));
        }

        let holding = Holding::new(HoldingFields {
            symbol,
            isin: None,
            purchase_date: today,
            shares: 0.0,
            price: price.filter(|p| p.is_finite() && *p >= 0.0).unwrap_or(0.0),
            fees: 0.0,
        });
        let id = holding.id.clone();
        portfolio.holdings.push(holding);
        Ok(WatchToggle::Added(id))
    }

    /// Distinct symbols to price, each with the first ISIN seen for it.
    pub fn quote_targets(&self, portfolio: Option<&Portfolio>) -> BTreeMap<String, Option<String>> {
        let scope: Vec<&Portfolio> = match portfolio {
            Some(p) => vec![p],
            None => self.portfolios.iter().collect(),
        };

        let mut targets: BTreeMap<String, Option<String>> = BTreeMap::new();
        for holding in scope.iter().flat_map(|p| p.holdings.iter()) {
            let isin = targets.entry(holding.symbol.clone()).or_default();
            if isin.is_none() {
                *isin = holding.isin.clone();
            }
        }
        targets
    }
}
