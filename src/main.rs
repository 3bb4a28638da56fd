use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use yieldfolio::core::log::init_logging;
use yieldfolio::core::portfolio::HoldingDraft;
use yieldfolio::{AppCommand, HoldingAction, PortfolioAction};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio valuation, returns and allocation
    Summary {
        /// Portfolio name or id (all portfolios if omitted)
        #[arg(short, long)]
        portfolio: Option<String>,
        /// Keep refreshing quotes until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },
    /// Display dividend income projection and monthly calendar
    Income {
        /// Portfolio name or id (all portfolios if omitted)
        #[arg(short, long)]
        portfolio: Option<String>,
    },
    /// Manage portfolios
    #[command(subcommand)]
    Portfolio(PortfolioCommand),
    /// Manage holdings of a portfolio
    #[command(subcommand)]
    Holding(HoldingCommand),
    /// Toggle a watch-only entry for a symbol
    Watch { portfolio: String, symbol: String },
}

#[derive(Subcommand)]
enum PortfolioCommand {
    /// List portfolios
    List,
    /// Create a portfolio
    Create {
        name: String,
        /// Display color, e.g. "#3B82F6"
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a portfolio and all of its holdings
    Delete { portfolio: String },
}

#[derive(Args)]
struct HoldingFieldArgs {
    #[arg(long)]
    symbol: Option<String>,
    /// Purchase date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    shares: Option<String>,
    /// Purchase price per share
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    fees: Option<String>,
    #[arg(long)]
    isin: Option<String>,
}

impl From<HoldingFieldArgs> for HoldingDraft {
    fn from(args: HoldingFieldArgs) -> HoldingDraft {
        HoldingDraft {
            symbol: args.symbol.unwrap_or_default(),
            isin: args.isin,
            date: args.date.unwrap_or_default(),
            shares: args.shares.unwrap_or_default(),
            price: args.price.unwrap_or_default(),
            fees: args.fees,
        }
    }
}

#[derive(Subcommand)]
enum HoldingCommand {
    /// Add a purchase lot
    Add {
        portfolio: String,
        #[arg(long)]
        symbol: String,
        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long, required_unless_present = "amount")]
        shares: Option<String>,
        /// Total invested; buys the whole number of shares it covers
        #[arg(long, conflicts_with = "shares")]
        amount: Option<String>,
        /// Purchase price per share (the close on --date if omitted)
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        fees: Option<String>,
        #[arg(long)]
        isin: Option<String>,
    },
    /// Edit a lot; omitted fields keep their values
    Edit {
        portfolio: String,
        holding_id: String,
        #[command(flatten)]
        fields: HoldingFieldArgs,
    },
    /// Remove a lot
    Remove {
        portfolio: String,
        holding_id: String,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Summary { portfolio, watch } => AppCommand::Summary { portfolio, watch },
            Commands::Income { portfolio } => AppCommand::Income { portfolio },
            Commands::Portfolio(action) => AppCommand::Portfolio(match action {
                PortfolioCommand::List => PortfolioAction::List,
                PortfolioCommand::Create { name, color } => PortfolioAction::Create { name, color },
                PortfolioCommand::Delete { portfolio } => PortfolioAction::Delete { portfolio },
            }),
            Commands::Holding(action) => AppCommand::Holding(match action {
                HoldingCommand::Add {
                    portfolio,
                    symbol,
                    date,
                    shares,
                    amount,
                    price,
                    fees,
                    isin,
                } => HoldingAction::Add {
                    portfolio,
                    draft: HoldingDraft {
                        symbol,
                        isin,
                        date,
                        shares: shares.unwrap_or_default(),
                        price: price.unwrap_or_default(),
                        fees,
                    },
                    amount,
                },
                HoldingCommand::Edit {
                    portfolio,
                    holding_id,
                    fields,
                } => HoldingAction::Edit {
                    portfolio,
                    holding_id,
                    draft: fields.into(),
                },
                HoldingCommand::Remove {
                    portfolio,
                    holding_id,
                } => HoldingAction::Remove {
                    portfolio,
                    holding_id,
                },
            }),
            Commands::Watch { portfolio, symbol } => AppCommand::Watch { portfolio, symbol },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => yieldfolio::cli::setup::setup(cli.config_path.as_deref())
            .map(|path| println!("Created configuration at {}", path.display())),
        Some(cmd) => yieldfolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
