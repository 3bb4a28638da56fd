pub mod income;
pub mod manage;
pub mod setup;
pub mod summary;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::market::{HistoricalPriceProvider, Quote};
use crate::core::portfolio::{Portfolio, PortfolioBook};
use crate::core::{DividendCache, QuoteCache};
use crate::providers::twelvedata::TwelveDataProvider;
use crate::store::PortfolioRepository;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Everything a command needs: config, storage, the market data provider and
/// the session caches.
pub struct App {
    pub config: AppConfig,
    repository: PortfolioRepository,
    provider: TwelveDataProvider,
    pub quotes: QuoteCache,
    pub dividends: DividendCache,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let twelvedata = &config.providers.twelvedata;
        let api_key = twelvedata.resolved_api_key();
        if api_key.is_empty() {
            warn!("No Twelve Data API key configured, prices fall back to purchase prices");
        }
        let provider = TwelveDataProvider::new(&twelvedata.base_url, &api_key)?;
        let repository = PortfolioRepository::from_config(&config)?;

        Ok(Self {
            config,
            repository,
            provider,
            quotes: QuoteCache::new(),
            dividends: DividendCache::new(),
        })
    }

    pub async fn load_book(&self) -> Result<PortfolioBook> {
        Ok(PortfolioBook::new(self.repository.load().await?))
    }

    /// Saves the book. Failures are printed as notices and never abort the
    /// command, the in-memory book having already been updated.
    pub async fn persist(&self, book: &PortfolioBook) {
        let report = self.repository.save(book.portfolios()).await;
        if report.is_ok() {
            debug!("Saved {} portfolios", book.portfolios().len());
        }
        for notice in report.notices() {
            ui::print_notice(&notice);
        }
    }

    /// Refreshes quotes and fills in missing dividend histories, concurrently.
    pub async fn refresh_market_data(&self, targets: &BTreeMap<String, Option<String>>) {
        let symbols: Vec<String> = targets.keys().cloned().collect();
        let (quoted, fetched) = futures::join!(
            self.quotes.refresh(&self.provider, targets),
            self.dividends.ensure(&self.provider, &symbols)
        );
        debug!(
            "Refreshed {}/{} quotes, fetched {} dividend histories",
            quoted,
            symbols.len(),
            fetched
        );
    }

    pub async fn refresh_dividends(&self, symbols: &[String]) {
        let fetched = self.dividends.ensure(&self.provider, symbols).await;
        debug!("Fetched {} dividend histories", fetched);
    }

    /// Latest quote for one symbol, fetched on demand.
    pub async fn quote_for(&self, symbol: &str) -> Option<Quote> {
        let targets = BTreeMap::from([(symbol.to_string(), None)]);
        self.quotes.refresh(&self.provider, &targets).await;
        self.quotes.get(symbol).await
    }

    /// Closing price of `symbol` on `date` (YYYY-MM-DD), used to price a
    /// purchase entered without one.
    pub async fn close_on(&self, symbol: &str, date: &str) -> Result<f64> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("Symbol must not be empty");
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid purchase date: {date}"))?;

        let pb = ui::new_spinner(&format!("Fetching {symbol} close for {date}..."));
        let close = self.provider.fetch_close_on(&symbol, date).await;
        pb.finish_and_clear();

        close?.ok_or_else(|| {
            anyhow!("No closing price for {symbol} on {date}, pass --price instead")
        })
    }
}

/// The named portfolio, or every portfolio when no name is given.
pub fn select_portfolios<'a>(
    book: &'a PortfolioBook,
    portfolio: Option<&str>,
) -> Result<Vec<&'a Portfolio>> {
    match portfolio {
        Some(name) => {
            let found = book
                .find(name)
                .ok_or_else(|| anyhow!("Portfolio not found: {name}"))?;
            Ok(vec![found])
        }
        None => Ok(book.portfolios().iter().collect()),
    }
}

/// Distinct symbols to price for the selected portfolios.
pub fn targets_for(
    book: &PortfolioBook,
    selected: &[&Portfolio],
) -> BTreeMap<String, Option<String>> {
    let mut targets = BTreeMap::new();
    for portfolio in selected {
        for (symbol, isin) in book.quote_targets(Some(*portfolio)) {
            let entry: &mut Option<String> = targets.entry(symbol).or_default();
            if entry.is_none() {
                *entry = isin;
            }
        }
    }
    targets
}

pub fn print_empty_hint() {
    println!(
        "{}",
        ui::style_text(
            "No portfolios yet. Create one with `yieldfolio portfolio create NAME`.",
            ui::StyleType::Subtle
        )
    );
}
