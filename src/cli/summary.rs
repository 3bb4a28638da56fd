use super::{App, ui};
use crate::core::allocation::{PortfolioSummary, aggregate_portfolio};
use crate::core::portfolio::PortfolioBook;
use anyhow::Result;
use comfy_table::{Cell, Color};
use tracing::{debug, info};

impl PortfolioSummary {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Name"),
            ui::header_cell("Shares"),
            ui::header_cell("Price"),
            ui::header_cell("Day"),
            ui::header_cell("Value"),
            ui::header_cell("Cost"),
            ui::header_cell("Gain"),
            ui::header_cell("Gain (%)"),
            ui::header_cell("Dividends"),
            ui::header_cell("Yield on Cost (%)"),
            ui::header_cell("Total Return (%)"),
        ]);

        for v in &self.valuations {
            let name = match (&v.name, v.shares == 0.0) {
                (Some(name), false) => Cell::new(name),
                (Some(name), true) => Cell::new(format!("{name} (watch)")),
                (None, true) => Cell::new("(watch)").fg(Color::DarkGrey),
                (None, false) => Cell::new("N/A").fg(Color::DarkGrey),
            };
            // Unquoted rows are valued at the purchase price
            let price = if v.quoted {
                ui::amount_cell(v.current_price)
            } else {
                ui::amount_cell(v.current_price).fg(Color::DarkGrey)
            };

            table.add_row(vec![
                Cell::new(&v.symbol),
                name,
                ui::amount_cell(v.shares),
                price,
                ui::change_cell(v.percent_change),
                ui::amount_cell(v.market_value),
                ui::amount_cell(v.cost_basis),
                ui::signed_cell(v.capital_gain, ""),
                ui::signed_cell(v.capital_gain_percent, "%"),
                ui::amount_cell(v.accrued_dividends),
                ui::amount_cell(v.dividend_yield_on_cost),
                ui::signed_cell(v.total_return_percent, "%"),
            ]);
        }

        let mut output = format!(
            "Portfolio: {}\n\n",
            ui::style_text(&self.name, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let totals = &self.totals;
        output.push_str("\n\n");
        for line in [
            format!(
                "{}: {:.2}",
                ui::style_text("Invested", ui::StyleType::TotalLabel),
                totals.total_invested
            ),
            format!(
                "{}: {:.2}",
                ui::style_text("Current Value", ui::StyleType::TotalLabel),
                totals.total_current_value
            ),
            ui::total_line("Capital Gain", totals.total_capital_gain, ""),
            ui::total_line("Capital Gain (%)", totals.total_capital_gain_percent, "%"),
            ui::total_line("Dividends", totals.total_dividends, ""),
            ui::total_line("Total Return", totals.total_return, ""),
            ui::total_line("Total Return (%)", totals.total_return_percent, "%"),
        ] {
            output.push_str(&line);
            output.push('\n');
        }

        if !self.allocation.is_empty() && self.allocation.total() > 0.0 {
            let mut alloc = ui::new_styled_table();
            alloc.set_header(vec![
                ui::header_cell("Symbol"),
                ui::header_cell("Value"),
                ui::header_cell("Weight (%)"),
            ]);
            for (symbol, value) in self.allocation.iter() {
                alloc.add_row(vec![
                    Cell::new(symbol),
                    ui::amount_cell(value),
                    ui::amount_cell(self.allocation.weight(symbol)),
                ]);
            }
            output.push_str(&format!(
                "\n{}\n{}",
                ui::style_text("Allocation", ui::StyleType::TotalLabel),
                alloc
            ));
        }

        output
    }
}

async fn summarize(
    app: &App,
    book: &PortfolioBook,
    portfolio: Option<&str>,
) -> Result<Vec<PortfolioSummary>> {
    let selected = super::select_portfolios(book, portfolio)?;
    let targets = super::targets_for(book, &selected);

    let pb = ui::new_spinner("Fetching quotes and dividends...");
    app.refresh_market_data(&targets).await;
    pb.finish_and_clear();

    let quotes = app.quotes.snapshot().await;
    let dividends = app.dividends.snapshot().await;
    Ok(selected
        .into_iter()
        .map(|p| aggregate_portfolio(p, &quotes, &dividends))
        .collect())
}

/// Reloads the book first so edits made by other commands show up.
async fn current_summaries(app: &App, portfolio: Option<&str>) -> Result<Vec<PortfolioSummary>> {
    let book = app.load_book().await?;
    summarize(app, &book, portfolio).await
}

fn print_summaries(summaries: &[PortfolioSummary]) {
    for (i, summary) in summaries.iter().enumerate() {
        println!("{}", summary.display_as_table());
        if i + 1 < summaries.len() {
            ui::print_separator();
        }
    }

    if summaries.len() > 1 {
        let grand_total: f64 = summaries.iter().map(|s| s.totals.total_current_value).sum();
        let grand_return: f64 = summaries.iter().map(|s| s.totals.total_return).sum();
        ui::print_separator();
        println!("{}", ui::total_line("Grand Total Value", grand_total, ""));
        println!("{}", ui::total_line("Grand Total Return", grand_return, ""));
    }
}

/// Prints the valuation of one or all portfolios. With `watch`, keeps
/// refreshing on the configured interval until Ctrl-C, picking up changes
/// other commands made to the book.
pub async fn run(app: &App, portfolio: Option<&str>, watch: bool) -> Result<()> {
    let book = app.load_book().await?;
    if book.is_empty() {
        super::print_empty_hint();
        return Ok(());
    }

    let summaries = summarize(app, &book, portfolio).await?;
    print_summaries(&summaries);
    if !watch {
        return Ok(());
    }

    let period = app.config.refresh_interval();
    info!("Watching for changes every {}s", period.as_secs());
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;
    let mut day = chrono::Local::now().date_naive();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let today = chrono::Local::now().date_naive();
                if today != day {
                    debug!("Date changed to {}, refetching dividend histories", today);
                    app.dividends.clear().await;
                    day = today;
                }
                let summaries = current_summaries(app, portfolio).await?;
                if let Err(e) = console::Term::stdout().clear_screen() {
                    debug!("Could not clear the screen: {}", e);
                }
                print_summaries(&summaries);
                debug!("Quote cache version {}", app.quotes.version());
            }
            _ = &mut ctrl_c => {
                info!("Stopped watching");
                break;
            }
        }
    }
    Ok(())
}
