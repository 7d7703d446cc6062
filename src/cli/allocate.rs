use super::ui;
use crate::core::config::Basket;
use crate::core::{AllocationOptions, AllocationResult, compute_weight_mode_allocation};
use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;
use tracing::{debug, info};

/// Allocation plan for one configured basket.
#[derive(Debug, Serialize)]
pub struct BasketPlan {
    pub basket: String,
    #[serde(flatten)]
    pub result: AllocationResult,
}

impl BasketPlan {
    pub fn compute(basket: &Basket, options: &AllocationOptions) -> Self {
        debug!("Planning basket {} with funds {}", basket.name, basket.funds);
        let result =
            compute_weight_mode_allocation(basket.funds, &basket.drafts(), &basket.prices(), options);
        BasketPlan {
            basket: basket.name.clone(),
            result,
        }
    }

    pub fn display_as_table(&self) -> String {
        let result = &self.result;
        let totals = &result.totals;

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Locked"),
            ui::header_cell("Target (%)"),
            ui::header_cell("Price"),
            ui::header_cell("Qty"),
            ui::header_cell("Cost"),
            ui::header_cell("Actual (%)"),
            ui::header_cell("Drift"),
        ]);

        for row in &result.rows {
            let symbol = match &row.draft.exchange {
                Some(exchange) => format!("{}:{}", exchange, row.draft.symbol),
                None => row.draft.symbol.clone(),
            };
            table.add_row(vec![
                Cell::new(symbol),
                Cell::new(if row.draft.locked { "🔒" } else { "" }),
                ui::number_cell(format!("{:.2}", row.draft.effective_weight())),
                ui::format_optional_cell(row.price, |p| format!("{p:.2}")),
                ui::number_cell(row.qty.to_string()),
                ui::number_cell(format!("{:.2}", row.planned_cost)),
                ui::number_cell(format!("{:.2}", row.actual_pct)),
                ui::drift_cell(row.drift_pct),
            ]);
        }

        let mut output = format!(
            "Basket: {}\n\n",
            ui::style_text(&self.basket, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\n{} {:.2}   {} {:.2}   {} {}",
            ui::style_text("Funds:", ui::StyleType::TotalLabel),
            totals.funds,
            ui::style_text("Total Cost:", ui::StyleType::TotalLabel),
            totals.total_cost,
            ui::style_text("Remaining:", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", totals.remaining), ui::StyleType::TotalValue),
        ));
        output.push_str(&format!(
            "\n{} {:.2}%   {} {:.2}%",
            ui::style_text("Weights:", ui::StyleType::TotalLabel),
            totals.weight_sum_pct,
            ui::style_text("Locked:", ui::StyleType::TotalLabel),
            totals.locked_weight_sum_pct,
        ));
        if let Some(deviation) = totals.max_abs_deviation_pct {
            output.push_str(&format!(
                "   {} {deviation:.2}%",
                ui::style_text("Max Drift:", ui::StyleType::TotalLabel)
            ));
        }
        if let Some(required) = totals.min_funds_required {
            output.push_str(&format!(
                "\n{} {required:.2}",
                ui::style_text("Min Funds Required:", ui::StyleType::TotalLabel)
            ));
            if let Some(additional) = totals.additional_funds_required {
                output.push_str(&ui::style_text(
                    &format!(" (add {additional:.2})"),
                    ui::StyleType::Error,
                ));
            }
        }

        let issues: Vec<_> = result.all_issues().collect();
        if !issues.is_empty() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text("Issues", ui::StyleType::TotalLabel)
            ));
            for issue in issues {
                output.push_str(&format!(
                    "\n  {} {} {}",
                    ui::issue_label(issue.level),
                    ui::style_text(issue.code.as_str(), ui::StyleType::Subtle),
                    issue.message
                ));
            }
        }

        let errors = result.blocking_issues().count();
        let status = if errors == 0 {
            ui::style_text("Ready to buy", ui::StyleType::TotalValue)
        } else {
            ui::style_text(
                &format!("Blocked by {errors} error(s)"),
                ui::StyleType::Error,
            )
        };
        output.push_str(&format!("\n\n{status}"));

        output
    }
}

pub fn run(baskets: &[&Basket], options: &AllocationOptions, json: bool) -> Result<()> {
    let plans: Vec<BasketPlan> = baskets
        .iter()
        .map(|b| BasketPlan::compute(b, options))
        .collect();
    info!("Computed {} basket plan(s)", plans.len());

    if json {
        let output =
            serde_json::to_string_pretty(&plans).context("Failed to serialize allocation plans")?;
        println!("{output}");
        return Ok(());
    }

    for plan in &plans {
        println!("\n{}", plan.display_as_table());
        ui::print_separator();
    }
    Ok(())
}
