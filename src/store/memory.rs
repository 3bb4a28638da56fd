use crate::core::portfolio::Portfolio;
use crate::store::PortfolioStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// In-process store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<Portfolio>>>,
    migrated: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portfolios(portfolios: Vec<Portfolio>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(portfolios)),
            migrated: Arc::default(),
        }
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Vec<Portfolio>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, portfolios: &[Portfolio]) -> Result<()> {
        debug!("Memory store PUT {} portfolios", portfolios.len());
        *self.inner.lock().await = portfolios.to_vec();
        Ok(())
    }

    async fn migrated(&self) -> Result<bool> {
        Ok(self.migrated.load(Ordering::SeqCst))
    }

    async fn mark_migrated(&self) -> Result<()> {
        self.migrated.store(true, Ordering::SeqCst);
        Ok(())
    }
}
