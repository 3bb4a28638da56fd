use crate::core::portfolio::Portfolio;
use crate::store::PortfolioStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "portfolios";
const KEY: &str = "portfolios";
const MIGRATED_KEY: &str = "migrated";

/// Local store backed by a fjall keyspace under the data directory. The whole
/// book is kept as one JSON array.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("store");
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(&path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened disk store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl PortfolioStore for DiskStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn load(&self) -> Result<Vec<Portfolio>> {
        match self.partition.get(KEY)? {
            Some(bytes) => {
                let portfolios: Vec<Portfolio> = serde_json::from_slice(&bytes)
                    .context("Failed to parse stored portfolios")?;
                debug!("Disk store HIT: {} portfolios", portfolios.len());
                Ok(portfolios)
            }
            None => {
                debug!("Disk store MISS");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, portfolios: &[Portfolio]) -> Result<()> {
        let bytes = serde_json::to_vec(portfolios)?;
        self.partition.insert(KEY, bytes)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Disk store PUT {} portfolios", portfolios.len());
        Ok(())
    }

    async fn migrated(&self) -> Result<bool> {
        Ok(self.partition.contains_key(MIGRATED_KEY)?)
    }

    async fn mark_migrated(&self) -> Result<()> {
        self.partition.insert(MIGRATED_KEY, vec![1u8])?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Disk store marked as migrated");
        Ok(())
    }
}
