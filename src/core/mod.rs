//! Valuation engine and the data it works on

pub mod allocation;
pub mod cache;
pub mod config;
pub mod income;
pub mod log;
pub mod market;
pub mod portfolio;
pub mod valuation;

// Re-export main types for cleaner imports
pub use allocation::{AllocationBreakdown, PortfolioSummary, PortfolioTotals, aggregate_portfolio};
pub use cache::{DividendCache, QuoteCache};
pub use income::{IncomeProjection, ProjectionSettings, project_income};
pub use market::{
    DividendLedger, DividendPayment, DividendProvider, HistoricalPriceProvider, Quote, QuoteBook,
    QuoteProvider,
};
pub use portfolio::{Holding, HoldingDraft, Portfolio, PortfolioBook};
pub use valuation::{Valuation, valuate_holding};
