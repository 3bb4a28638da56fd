use crate::core::market::{
    DividendLedger, DividendPayment, DividendProvider, Quote, QuoteBook, QuoteProvider,
};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Shared key-value cache. Clones share the same entries; writes are
/// last-write-wins and every write bumps the version.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
    version: Arc<AtomicU64>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {:?}", key);
        } else {
            debug!("Cache MISS for key: {:?}", key);
        }
        value
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.inner.lock().await.contains_key(key)
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, value);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn remove(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        if cache.remove(key).is_some() {
            debug!("Cache REMOVE for key: {:?}", key);
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
        debug!("Cache CLEAR");
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Copies every entry out so callers can compute without holding the lock.
    pub async fn snapshot(&self) -> HashMap<K, V> {
        let cache = self.inner.lock().await;
        cache
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Latest quote per symbol.
#[derive(Clone, Default)]
pub struct QuoteCache {
    entries: Cache<String, Quote>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, symbol: &str) -> Option<Quote> {
        self.entries.get(&symbol.to_string()).await
    }

    /// Re-fetches quotes for `targets` (symbol with optional ISIN).
    ///
    /// Resolved symbols are replaced, unresolved ones are dropped so valuation
    /// falls back to the purchase price. A symbol that fails but carries an
    /// ISIN gets a second lookup by ISIN. Provider errors never escape.
    pub async fn refresh(
        &self,
        provider: &(dyn QuoteProvider + Send + Sync),
        targets: &BTreeMap<String, Option<String>>,
    ) -> usize {
        if targets.is_empty() {
            return 0;
        }

        let symbols: Vec<String> = targets.keys().cloned().collect();
        let mut resolved = match provider.fetch_quotes(&symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Quote refresh failed, using fallback prices: {}", e);
                HashMap::new()
            }
        };

        let by_isin: HashMap<String, String> = targets
            .iter()
            .filter(|(symbol, _)| !resolved.contains_key(*symbol))
            .filter_map(|(symbol, isin)| isin.clone().map(|isin| (isin, symbol.clone())))
            .collect();
        if !by_isin.is_empty() {
            let isins: Vec<String> = by_isin.keys().cloned().collect();
            debug!("Retrying {} unresolved symbols by ISIN", isins.len());
            match provider.fetch_quotes(&isins).await {
                Ok(quotes) => {
                    for (isin, quote) in quotes {
                        if let Some(symbol) = by_isin.get(&isin) {
                            resolved.insert(symbol.clone(), quote);
                        }
                    }
                }
                Err(e) => warn!("ISIN quote lookup failed: {}", e),
            }
        }

        let mut count = 0;
        for symbol in symbols {
            match resolved.remove(&symbol) {
                Some(quote) => {
                    self.entries.put(symbol, quote).await;
                    count += 1;
                }
                None => {
                    debug!("No quote for {}, falling back to purchase price", symbol);
                    self.entries.remove(&symbol).await;
                }
            }
        }
        count
    }

    pub async fn snapshot(&self) -> QuoteBook {
        self.entries.snapshot().await
    }

    pub fn version(&self) -> u64 {
        self.entries.version()
    }
}

/// Dividend history per symbol, fetched once per session.
#[derive(Clone, Default)]
pub struct DividendCache {
    entries: Cache<String, Vec<DividendPayment>>,
}

impl DividendCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches history for every symbol not cached yet. The presence check is
    /// not atomic with the fetch, so two callers may fetch the same symbol;
    /// the second write carries the same data.
    pub async fn ensure(
        &self,
        provider: &(dyn DividendProvider + Send + Sync),
        symbols: &[String],
    ) -> usize {
        let mut missing = Vec::new();
        for symbol in symbols {
            if !self.entries.contains(symbol).await && !missing.contains(symbol) {
                missing.push(symbol.clone());
            }
        }
        if missing.is_empty() {
            return 0;
        }

        let fetches = missing.iter().map(|symbol| async move {
            let history = match provider.fetch_dividend_history(symbol).await {
                Ok(history) => history,
                Err(e) => {
                    warn!("Dividend history for {} unavailable: {}", symbol, e);
                    Vec::new()
                }
            };
            (symbol.clone(), history)
        });

        let fetched = join_all(fetches).await;
        let count = fetched.len();
        for (symbol, history) in fetched {
            self.entries.put(symbol, history).await;
        }
        count
    }

    /// Forces the next `ensure` to refetch every symbol.
    pub async fn clear(&self) {
        self.entries.clear().await;
    }

    pub async fn snapshot(&self) -> DividendLedger {
        self.entries.snapshot().await
    }
}
