use crate::core::income::ProjectionSettings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_TWELVEDATA_URL: &str = "https://api.twelvedata.com";
pub const API_KEY_ENV: &str = "TWELVE_DATA_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TwelveDataProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for TwelveDataProviderConfig {
    fn default() -> Self {
        TwelveDataProviderConfig {
            base_url: DEFAULT_TWELVEDATA_URL.to_string(),
            api_key: None,
        }
    }
}

impl TwelveDataProviderConfig {
    /// Configured key, or the one from the environment.
    pub fn resolved_api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub twelvedata: TwelveDataProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    /// Endpoint of the remote portfolio store. Local storage only when unset.
    pub remote_url: Option<String>,
}

fn default_refresh_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub data_path: Option<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub income: ProjectionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            storage: StorageConfig::default(),
            data_path: None,
            refresh_interval_secs: default_refresh_interval(),
            income: ProjectionSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "yieldfolio", "yieldfolio")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  twelvedata:
    base_url: "http://example.com/td"
    api_key: "secret"
storage:
  remote_url: "http://example.com/.netlify/functions/portfolios"
data_path: "/tmp/yieldfolio"
refresh_interval_secs: 30
income:
  horizon_years: 5
  baseline_growth: 0.03
  reinvested_growth: 0.06
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.twelvedata.base_url, "http://example.com/td");
        assert_eq!(config.providers.twelvedata.resolved_api_key(), "secret");
        assert_eq!(
            config.storage.remote_url.as_deref(),
            Some("http://example.com/.netlify/functions/portfolios")
        );
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/yieldfolio"));
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.income.horizon_years, 5);
        assert_eq!(config.income.baseline_growth, 0.03);
        assert_eq!(config.income.reinvested_growth, 0.06);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: null\n").unwrap();
        assert_eq!(config.providers.twelvedata.base_url, DEFAULT_TWELVEDATA_URL);
        assert!(config.storage.remote_url.is_none());
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.income, ProjectionSettings::default());

        let partial: AppConfig = serde_yaml::from_str("income:\n  horizon_years: 3\n").unwrap();
        assert_eq!(partial.income.horizon_years, 3);
        assert_eq!(partial.income.baseline_growth, 0.05);
    }

    #[test]
    fn test_load_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from_path(dir.path().join("missing.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
