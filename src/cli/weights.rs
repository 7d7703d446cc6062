use super::ui;
use crate::core::allocation::sum_weight_pct;
use crate::core::config::Basket;
use crate::core::{AllocationRowDraft, WeightAction};
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

pub fn display_weights_table(
    basket_name: &str,
    action: WeightAction,
    before: &[AllocationRowDraft],
    after: &[AllocationRowDraft],
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Locked"),
        ui::header_cell("Before (%)"),
        ui::header_cell("After (%)"),
    ]);

    for (old, new) in before.iter().zip(after) {
        table.add_row(vec![
            Cell::new(&new.symbol),
            Cell::new(if new.locked { "🔒" } else { "" }),
            ui::format_optional_cell(old.weight_pct, |w| format!("{w:.2}")),
            ui::format_optional_cell(new.weight_pct, |w| format!("{w:.2}")),
        ]);
    }

    let total = sum_weight_pct(after);
    let total_style = if (total - 100.0).abs() <= 0.05 {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };

    let mut output = format!(
        "Basket: {} ({action})\n\n",
        ui::style_text(basket_name, ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{} {}",
        ui::style_text("Total Weight:", ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}%"), total_style)
    ));
    output
}

pub fn run(baskets: &[&Basket], action: WeightAction) -> Result<()> {
    for basket in baskets {
        let before = basket.drafts();
        let after = action.apply(&before);
        debug!("Applied {action} to basket {}", basket.name);

        println!(
            "\n{}",
            display_weights_table(&basket.name, action, &before, &after)
        );
        ui::print_separator();
    }
    Ok(())
}
