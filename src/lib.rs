pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::portfolio::HoldingDraft;
use anyhow::Result;
use tracing::{debug, info};

pub enum PortfolioAction {
    List,
    Create { name: String, color: Option<String> },
    Delete { portfolio: String },
}

pub enum HoldingAction {
    /// A blank price is looked up as the close on the purchase date. With
    /// `amount`, shares are the whole number that amount buys.
    Add {
        portfolio: String,
        draft: HoldingDraft,
        amount: Option<String>,
    },
    /// Blank draft fields keep the current values.
    Edit {
        portfolio: String,
        holding_id: String,
        draft: HoldingDraft,
    },
    Remove {
        portfolio: String,
        holding_id: String,
    },
}

pub enum AppCommand {
    Summary {
        portfolio: Option<String>,
        watch: bool,
    },
    Income {
        portfolio: Option<String>,
    },
    Portfolio(PortfolioAction),
    Holding(HoldingAction),
    Watch {
        portfolio: String,
        symbol: String,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("yieldfolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        "Loaded config: base_url={}, remote={:?}, data_path={:?}",
        config.providers.twelvedata.base_url, config.storage.remote_url, config.data_path
    );

    let app = cli::App::new(config)?;
    let today = chrono::Local::now().date_naive();

    match command {
        AppCommand::Summary { portfolio, watch } => {
            cli::summary::run(&app, portfolio.as_deref(), watch).await
        }
        AppCommand::Income { portfolio } => {
            cli::income::run(&app, portfolio.as_deref(), today).await
        }
        AppCommand::Portfolio(action) => cli::manage::portfolio(&app, action).await,
        AppCommand::Holding(action) => cli::manage::holding(&app, action).await,
        AppCommand::Watch { portfolio, symbol } => {
            cli::manage::watch(&app, &portfolio, &symbol, today).await
        }
    }
}
