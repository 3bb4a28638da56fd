//! Quotes and dividend history from the Twelve Data REST API.

use crate::core::market::{
    DividendPayment, DividendProvider, HistoricalPriceProvider, Quote, QuoteProvider,
};
use crate::providers::util::{lenient_f64, with_retry};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 500;

pub struct TwelveDataProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TwelveDataProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("yieldfolio/0.1")
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(TwelveDataProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn get_json(
        &self,
        endpoint: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let base = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {} for {}", base, symbol);
        let mut params = vec![("symbol", symbol), ("apikey", self.api_key.as_str())];
        params.extend_from_slice(extra);
        let url = reqwest::Url::parse_with_params(&base, &params)?;

        let response = with_retry(
            || self.client.get(url.clone()).send(),
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))
    }
}

#[derive(Debug, Deserialize)]
struct QuoteItem {
    name: Option<String>,
    currency: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    percent_change: Option<f64>,
    status: Option<String>,
    code: Option<i64>,
    message: Option<String>,
}

impl QuoteItem {
    /// `None` for error entries and for items without a usable price.
    fn into_quote(self, symbol: &str) -> Option<Quote> {
        if self.status.as_deref() == Some("error") || self.code.is_some() {
            debug!(
                "Quote error for {}: {}",
                symbol,
                self.message.as_deref().unwrap_or("unknown")
            );
            return None;
        }
        let price = self.close.or(self.price).filter(|p| *p > 0.0)?;
        Some(Quote {
            price,
            percent_change: self.percent_change.unwrap_or(0.0),
            name: self.name.unwrap_or_else(|| symbol.to_string()),
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            kind: self.kind,
        })
    }
}

/// A single-symbol request answers with one flat object; several symbols
/// answer with an object keyed by symbol.
fn parse_quotes(symbols: &[String], data: serde_json::Value) -> Result<HashMap<String, Quote>> {
    if symbols.len() == 1 {
        let item: QuoteItem = serde_json::from_value(data)?;
        let symbol = &symbols[0];
        return Ok(item
            .into_quote(symbol)
            .map(|q| HashMap::from([(symbol.clone(), q)]))
            .unwrap_or_default());
    }

    let serde_json::Value::Object(entries) = data else {
        return Err(anyhow!("Unexpected quote response shape"));
    };
    if entries.contains_key("code") && entries.contains_key("message") {
        return Err(anyhow!(
            "Twelve Data error: {}",
            entries["message"].as_str().unwrap_or("unknown")
        ));
    }

    let mut quotes = HashMap::new();
    for (symbol, value) in entries {
        match serde_json::from_value::<QuoteItem>(value) {
            Ok(item) => {
                if let Some(quote) = item.into_quote(&symbol) {
                    quotes.insert(symbol, quote);
                }
            }
            Err(e) => warn!("Skipping malformed quote for {}: {}", symbol, e),
        }
    }
    Ok(quotes)
}

#[derive(Debug, Deserialize)]
struct DividendsResponse {
    #[serde(default)]
    dividends: Vec<DividendItem>,
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DividendItem {
    payment_date: Option<String>,
    ex_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    amount: Option<f64>,
}

impl DividendItem {
    fn into_payment(self) -> Option<DividendPayment> {
        let raw_date = self.payment_date.filter(|d| !d.is_empty()).or(self.ex_date)?;
        let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").ok()?;
        Some(DividendPayment::new(date, self.amount?))
    }
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    values: Vec<TimeSeriesBar>,
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesBar {
    datetime: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    close: Option<f64>,
}

#[async_trait]
impl QuoteProvider for TwelveDataProvider {
    #[instrument(
        name = "TwelveDataQuoteFetch",
        skip(self, symbols),
        fields(count = symbols.len())
    )]
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = symbols.join(",");
        let data = self.get_json("quote", &joined, &[]).await?;
        let quotes = parse_quotes(symbols, data)?;
        debug!("Resolved {}/{} quotes", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

#[async_trait]
impl DividendProvider for TwelveDataProvider {
    #[instrument(name = "TwelveDataDividendFetch", skip(self))]
    async fn fetch_dividend_history(&self, symbol: &str) -> Result<Vec<DividendPayment>> {
        let data = self.get_json("dividends", symbol, &[]).await?;
        let response: DividendsResponse = serde_json::from_value(data)
            .map_err(|e| anyhow!("Failed to parse dividends for {}: {}", symbol, e))?;

        if let Some(code) = response.code {
            let msg = response
                .message
                .unwrap_or_else(|| format!("Error code {code}"));
            return Err(anyhow!("Twelve Data error: {}", msg));
        }

        let mut payments: Vec<DividendPayment> = response
            .dividends
            .into_iter()
            .filter_map(DividendItem::into_payment)
            .collect();
        payments.sort_by_key(|d| d.date);
        debug!("Fetched {} dividend payments for {}", payments.len(), symbol);
        Ok(payments)
    }
}

#[async_trait]
impl HistoricalPriceProvider for TwelveDataProvider {
    #[instrument(name = "TwelveDataCloseFetch", skip(self))]
    async fn fetch_close_on(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>> {
        // A one-week window so the bar for `date` is included however the
        // provider treats the end bound
        let start = date.format("%Y-%m-%d").to_string();
        let end = (date + chrono::Days::new(7)).format("%Y-%m-%d").to_string();
        let data = self
            .get_json(
                "time_series",
                symbol,
                &[
                    ("interval", "1day"),
                    ("start_date", start.as_str()),
                    ("end_date", end.as_str()),
                ],
            )
            .await?;
        let response: TimeSeriesResponse = serde_json::from_value(data)
            .map_err(|e| anyhow!("Failed to parse time series for {}: {}", symbol, e))?;

        if response.status.as_deref() == Some("error") {
            let msg = response.message.unwrap_or_else(|| "unknown".to_string());
            // No bars in the window, e.g. a weekend or a date before listing
            if msg.contains("No data") {
                debug!("No bars for {} around {}: {}", symbol, date, msg);
                return Ok(None);
            }
            return Err(anyhow!("Twelve Data error: {}", msg));
        }

        let close = response
            .values
            .into_iter()
            .find(|bar| bar.datetime.starts_with(&start))
            .and_then(|bar| bar.close)
            .filter(|close| *close > 0.0);
        debug!("Close for {} on {}: {:?}", symbol, date, close);
        Ok(close)
    }
}
