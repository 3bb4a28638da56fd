//! Commands that change the portfolio book. Each one loads the book, applies
//! the change in memory, prints the result and saves.

use super::{App, ui};
use crate::core::portfolio::{PortfolioBook, WatchToggle};
use crate::{HoldingAction, PortfolioAction};
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use tracing::info;

fn display_portfolios(book: &PortfolioBook) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Name"),
        ui::header_cell("Id"),
        ui::header_cell("Color"),
        ui::header_cell("Holdings"),
        ui::header_cell("Watching"),
    ]);
    for p in book.portfolios() {
        let watching = p.holdings.iter().filter(|h| h.is_watch_only()).count();
        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(&p.id),
            Cell::new(&p.color),
            Cell::new(p.holdings.len() - watching),
            Cell::new(watching),
        ]);
    }
    table.to_string()
}

pub async fn portfolio(app: &App, action: PortfolioAction) -> Result<()> {
    let mut book = app.load_book().await?;
    match action {
        PortfolioAction::List => {
            if book.is_empty() {
                super::print_empty_hint();
            } else {
                println!("{}", display_portfolios(&book));
            }
            return Ok(());
        }
        PortfolioAction::Create { name, color } => {
            let id = book.create_portfolio(&name, color.as_deref())?;
            info!("Created portfolio {} ({})", name, id);
            println!("Created portfolio {} ({id})", name.trim());
        }
        PortfolioAction::Delete { portfolio } => {
            let removed = book.delete_portfolio(&portfolio)?;
            println!(
                "Deleted portfolio {} and its {} holdings",
                removed.name,
                removed.holdings.len()
            );
        }
    }
    app.persist(&book).await;
    Ok(())
}

pub async fn holding(app: &App, action: HoldingAction) -> Result<()> {
    let mut book = app.load_book().await?;
    match action {
        HoldingAction::Add {
            portfolio,
            mut draft,
            amount,
        } => {
            if book.find(&portfolio).is_none() {
                bail!("Portfolio not found: {portfolio}");
            }
            if draft.price.trim().is_empty() {
                let close = app.close_on(&draft.symbol, &draft.date).await?;
                info!("Using {} close of {:.2}", draft.symbol, close);
                draft.price = format!("{close:.2}");
            }
            if let Some(amount) = amount.as_deref() {
                draft = draft.with_amount(amount)?;
            }
            let fields = draft.validate()?;
            let lot = format!(
                "{} shares of {} at {:.2}",
                fields.shares, fields.symbol, fields.price
            );
            let id = book.add_holding(&portfolio, fields)?;
            println!("Added {lot} to {portfolio} ({id})");
        }
        HoldingAction::Edit {
            portfolio,
            holding_id,
            draft,
        } => {
            let existing = book
                .find(&portfolio)
                .ok_or_else(|| anyhow!("Portfolio not found: {portfolio}"))?
                .holding(&holding_id)
                .ok_or_else(|| anyhow!("Holding not found: {holding_id}"))?;
            let fields = draft.merged_with(existing).validate()?;
            book.edit_holding(&portfolio, &holding_id, fields)?;
            println!("Updated holding {holding_id}");
        }
        HoldingAction::Remove {
            portfolio,
            holding_id,
        } => {
            let removed = book.delete_holding(&portfolio, &holding_id)?;
            println!(
                "Removed {} ({} shares) from {portfolio}",
                removed.symbol, removed.shares
            );
        }
    }
    app.persist(&book).await;
    Ok(())
}

/// Starts or stops watching `symbol` in a portfolio. A new watch entry is
/// priced at the live quote when one is available.
pub async fn watch(app: &App, portfolio: &str, symbol: &str, today: NaiveDate) -> Result<()> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        bail!("Symbol must not be empty");
    }
    let mut book = app.load_book().await?;
    let target = book
        .find(portfolio)
        .ok_or_else(|| anyhow!("Portfolio not found: {portfolio}"))?;

    let already_held = target.holdings.iter().any(|h| h.symbol == symbol);
    let price = if already_held {
        None
    } else {
        app.quote_for(&symbol).await.map(|q| q.price)
    };

    match book.toggle_watch(portfolio, &symbol, price, today)? {
        WatchToggle::Added(_) => match price {
            Some(price) => println!("Watching {symbol} at {price:.2}"),
            None => println!(
                "Watching {symbol} {}",
                ui::style_text("(no quote available)", ui::StyleType::Subtle)
            ),
        },
        WatchToggle::Removed(count) => {
            println!("Removed {symbol} from {portfolio} ({count} entries)")
        }
    }
    app.persist(&book).await;
    Ok(())
}
