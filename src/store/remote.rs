use crate::core::portfolio::Portfolio;
use crate::providers::util::with_retry;
use crate::store::PortfolioStore;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct SaveRequest<'a> {
    portfolios: &'a [Portfolio],
}

#[derive(Deserialize)]
struct SaveResponse {
    status: Option<String>,
    message: Option<String>,
}

/// HTTP document store: `GET` returns the book, `POST` replaces it.
pub struct RemoteStore {
    url: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("yieldfolio/0.1")
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl PortfolioStore for RemoteStore {
    fn name(&self) -> &str {
        "remote"
    }

    #[instrument(name = "RemoteStoreLoad", skip(self), fields(url = %self.url))]
    async fn load(&self) -> Result<Vec<Portfolio>> {
        let response = with_retry(|| self.client.get(&self.url).send(), 2, 500).await?;
        if !response.status().is_success() {
            bail!("HTTP error: {} from {}", response.status(), self.url);
        }
        let portfolios: Vec<Portfolio> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse portfolios from {}: {}", self.url, e))?;
        debug!("Loaded {} portfolios", portfolios.len());
        Ok(portfolios)
    }

    #[instrument(name = "RemoteStoreSave", skip(self, portfolios), fields(url = %self.url))]
    async fn save(&self, portfolios: &[Portfolio]) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&SaveRequest { portfolios })
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("HTTP error: {} from {}", response.status(), self.url);
        }

        let body: SaveResponse = response.json().await?;
        match body.status.as_deref() {
            Some("success") => {
                debug!("Saved {} portfolios", portfolios.len());
                Ok(())
            }
            _ => Err(anyhow!(
                "Remote store rejected save: {}",
                body.message.unwrap_or_else(|| "unknown error".to_string())
            )),
        }
    }
}
