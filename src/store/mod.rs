//! Persistence of the portfolio book.
//!
//! A [`PortfolioRepository`] fronts a local store and an optional remote one.
//! The in-memory book stays authoritative; failed writes only produce notices.

pub mod disk;
pub mod memory;
pub mod remote;

use crate::core::config::AppConfig;
use crate::core::portfolio::Portfolio;
use anyhow::Result;
use async_trait::async_trait;
use disk::DiskStore;
use memory::MemoryStore;
use remote::RemoteStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Short label used in logs and notices.
    fn name(&self) -> &str;
    async fn load(&self) -> Result<Vec<Portfolio>>;
    async fn save(&self, portfolios: &[Portfolio]) -> Result<()>;

    /// Whether this store's data has already been copied to the remote store.
    async fn migrated(&self) -> Result<bool> {
        Ok(false)
    }

    async fn mark_migrated(&self) -> Result<()> {
        Ok(())
    }
}

/// Write failures of one save, one entry per backend that failed.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub failures: Vec<(String, String)>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn notices(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|(store, err)| format!("Could not save to {store} storage: {err}"))
            .collect()
    }
}

pub struct PortfolioRepository {
    local: Arc<dyn PortfolioStore>,
    remote: Option<Arc<dyn PortfolioStore>>,
}

impl PortfolioRepository {
    pub fn new(local: Arc<dyn PortfolioStore>, remote: Option<Arc<dyn PortfolioStore>>) -> Self {
        Self { local, remote }
    }

    /// Local disk store under the data dir (in-memory if it cannot be
    /// opened) plus the remote store when one is configured.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let local: Arc<dyn PortfolioStore> = match config
            .data_dir()
            .and_then(|dir| DiskStore::open(&dir))
        {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Local storage unavailable, keeping data in memory: {}", e);
                Arc::new(MemoryStore::new())
            }
        };

        let remote = match config.storage.remote_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                Some(Arc::new(RemoteStore::new(url)?) as Arc<dyn PortfolioStore>)
            }
            _ => None,
        };

        Ok(Self::new(local, remote))
    }

    /// Loads the book, preferring the remote copy. The first time the remote
    /// store answers empty while local data exists, the local data is copied
    /// up. Once that happened, or once the remote held data, an empty remote
    /// is taken as is.
    pub async fn load(&self) -> Result<Vec<Portfolio>> {
        let Some(remote) = &self.remote else {
            return self.local.load().await;
        };

        match remote.load().await {
            Ok(portfolios) if !portfolios.is_empty() => {
                debug!("Loaded {} portfolios from {}", portfolios.len(), remote.name());
                if matches!(self.local.migrated().await, Ok(false)) {
                    self.record_migration().await;
                }
                Ok(portfolios)
            }
            Ok(portfolios) => {
                if self.local.migrated().await? {
                    debug!("{} storage is empty", remote.name());
                    return Ok(portfolios);
                }
                let local = self.local.load().await?;
                if !local.is_empty() {
                    info!(
                        "Migrating {} portfolios from {} to {}",
                        local.len(),
                        self.local.name(),
                        remote.name()
                    );
                    match remote.save(&local).await {
                        Ok(()) => self.record_migration().await,
                        Err(e) => warn!("Migration to {} failed: {}", remote.name(), e),
                    }
                }
                Ok(local)
            }
            Err(e) => {
                warn!(
                    "{} storage unavailable, using {}: {}",
                    remote.name(),
                    self.local.name(),
                    e
                );
                self.local.load().await
            }
        }
    }

    async fn record_migration(&self) {
        if let Err(e) = self.local.mark_migrated().await {
            warn!("Could not record migration in {}: {}", self.local.name(), e);
        }
    }

    /// Writes to every backend. Never fails; failures land in the report.
    pub async fn save(&self, portfolios: &[Portfolio]) -> SaveReport {
        let mut report = SaveReport::default();
        let stores = self.remote.iter().chain(std::iter::once(&self.local));
        for store in stores {
            if let Err(e) = store.save(portfolios).await {
                warn!("Save to {} failed: {}", store.name(), e);
                report.failures.push((store.name().to_string(), e.to_string()));
            }
        }
        report
    }
}
