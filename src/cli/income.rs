use super::{App, ui};
use crate::core::income::{IncomeProjection, ProjectionSettings, project_income};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

impl IncomeProjection {
    pub fn display_as_table(&self, name: &str, settings: &ProjectionSettings) -> String {
        let mut output = format!(
            "Income: {}\n\n",
            ui::style_text(name, ui::StyleType::Title)
        );

        let trailing_year = self.years.first().map(|y| y.year - 1);
        let label = match trailing_year {
            Some(year) => format!("Annual Dividend Income ({year})"),
            None => "Annual Dividend Income".to_string(),
        };
        output.push_str(&ui::total_line(&label, self.annual_income, ""));
        output.push_str("\n\n");

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Year"),
            ui::header_cell(&format!("Baseline (+{:.0}%)", settings.baseline_growth * 100.0)),
            ui::header_cell(&format!(
                "Reinvested (+{:.0}%)",
                settings.reinvested_growth * 100.0
            )),
        ]);
        for year in &self.years {
            table.add_row(vec![
                Cell::new(year.year),
                ui::amount_cell(year.baseline),
                ui::amount_cell(year.reinvested),
            ]);
        }
        output.push_str(&table.to_string());

        let mut monthly = ui::new_styled_table();
        monthly.set_header(vec![ui::header_cell("Month"), ui::header_cell("Expected")]);
        for (month, amount) in self.monthly.iter() {
            monthly.add_row(vec![Cell::new(month), ui::amount_cell(amount)]);
        }
        output.push_str(&format!(
            "\n\n{}\n{}\n{}",
            ui::style_text("Monthly Calendar", ui::StyleType::TotalLabel),
            monthly,
            ui::style_text(
                "Estimated from last and current year payment months",
                ui::StyleType::Subtle
            )
        ));

        output
    }
}

/// Prints the dividend income projection of one or all portfolios.
pub async fn run(app: &App, portfolio: Option<&str>, today: NaiveDate) -> Result<()> {
    let book = app.load_book().await?;
    if book.is_empty() {
        super::print_empty_hint();
        return Ok(());
    }

    let selected = super::select_portfolios(&book, portfolio)?;
    let symbols: Vec<String> = super::targets_for(&book, &selected).into_keys().collect();

    let pb = ui::new_spinner("Fetching dividend history...");
    app.refresh_dividends(&symbols).await;
    pb.finish_and_clear();

    let dividends = app.dividends.snapshot().await;
    let settings = &app.config.income;
    for (i, p) in selected.iter().enumerate() {
        let projection = project_income(p, &dividends, settings, today);
        println!("{}", projection.display_as_table(&p.name, settings));
        if i + 1 < selected.len() {
            ui::print_separator();
        }
    }
    Ok(())
}
