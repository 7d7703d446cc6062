//! Weight-mode allocation: turns a cash budget and target weights into whole share counts.
//!
//! The calculator never fails. Every problem it can detect is reported as an
//! [`AllocationIssue`] on the result, either on the totals or on the offending row.
use crate::core::allocation::{
    AllocationIssue, AllocationResult, AllocationRowDraft, AllocationRowResult, AllocationTotals,
    IssueCode, locked_weight_pct, sum_weight_pct,
};
use crate::core::outliers::{OutlierConfig, detect_outliers};
use std::collections::HashMap;
use tracing::debug;

const LOCKED_TOLERANCE_PCT: f64 = 1e-6;
const WEIGHT_SUM_TOLERANCE_PCT: f64 = 0.05;
const BUDGET_EPSILON: f64 = 1e-6;
const MAX_OUTLIER_EXAMPLES: usize = 3;
/// Hard ceiling on leftover-spend iterations, whatever the budget.
const MAX_LEFTOVER_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOptions {
    pub require_weights_sum_to_100: bool,
    pub min_qty_per_row: u32,
    pub optimize_with_remaining_funds: bool,
    pub outliers: OutlierConfig,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        AllocationOptions {
            require_weights_sum_to_100: true,
            min_qty_per_row: 0,
            optimize_with_remaining_funds: true,
            outliers: OutlierConfig::default(),
        }
    }
}

/// Working state for one row while quantities are decided.
struct Slot {
    weight: f64,
    price: Option<f64>,
    qty: u64,
}

impl Slot {
    fn cost(&self) -> f64 {
        self.price.map_or(0.0, |p| p * self.qty as f64)
    }
}

fn valid_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Whole shares of `price` that fit in `value`, tolerating representation error such as
/// `0.1 * 3.0 / 0.3`.
fn whole_units(value: f64, price: f64) -> u64 {
    if value <= 0.0 {
        return 0;
    }
    // Float to int casts saturate, so huge budgets cap at u64::MAX shares
    let units = (value / price).floor().max(0.0) as u64;
    match units.checked_add(1) {
        Some(next) if next as f64 * price <= value + BUDGET_EPSILON => next,
        _ => units,
    }
}

/// Funds at which this row's share of the budget affords `min_qty` shares.
fn min_funds_for(slot: &Slot, min_qty: u64, weight_scale: f64) -> Option<f64> {
    let weight = slot.weight * weight_scale;
    if weight <= 0.0 {
        return None;
    }
    slot.price.map(|p| p * min_qty as f64 / (weight / 100.0))
}

/// Raises rows with a weight and price to `min_qty` while the budget allows.
/// Returns the number of shares added.
fn raise_to_minimum(slots: &mut [Slot], min_qty: u64, funds: f64) -> u64 {
    let mut spent: f64 = slots.iter().map(Slot::cost).sum();
    let mut added = 0;
    for slot in slots.iter_mut().filter(|s| s.weight > 0.0) {
        let Some(price) = slot.price else { continue };
        while slot.qty < min_qty && spent + price <= funds + BUDGET_EPSILON {
            slot.qty += 1;
            spent += price;
            added += 1;
        }
    }
    added
}

fn leftover_step_cap(leftover: f64, min_price: f64, row_count: usize) -> usize {
    ((leftover.max(0.0) / min_price).ceil() as usize)
        .saturating_add(row_count)
        .min(MAX_LEFTOVER_STEPS)
}

fn drift(slot: &Slot, total_cost: f64) -> f64 {
    let actual = if total_cost > 0.0 {
        slot.cost() / total_cost * 100.0
    } else {
        0.0
    };
    actual - slot.weight
}

/// Computes per-row share counts for a basket whose members carry target weights.
///
/// `prices` is keyed by row id; missing, non-finite or non-positive prices leave the row
/// unallocated with a `price_missing` warning.
pub fn compute_weight_mode_allocation(
    funds: f64,
    rows: &[AllocationRowDraft],
    prices: &HashMap<String, Option<f64>>,
    options: &AllocationOptions,
) -> AllocationResult {
    let mut issues = Vec::new();
    let mut row_issues: Vec<Vec<AllocationIssue>> = vec![Vec::new(); rows.len()];

    let weight_sum_pct = sum_weight_pct(rows);
    let locked_weight_sum_pct = locked_weight_pct(rows);
    debug!(
        funds,
        weight_sum_pct, locked_weight_sum_pct, "Starting weight-mode allocation"
    );

    if locked_weight_sum_pct > 100.0 + LOCKED_TOLERANCE_PCT {
        issues.push(AllocationIssue::error(
            IssueCode::LockedOver100,
            format!("Locked weights add up to {locked_weight_sum_pct:.2}%, more than 100%"),
        ));
    }
    if options.require_weights_sum_to_100
        && (weight_sum_pct - 100.0).abs() > WEIGHT_SUM_TOLERANCE_PCT
    {
        issues.push(AllocationIssue::error(
            IssueCode::WeightsNot100,
            format!("Weights add up to {weight_sum_pct:.2}%, expected 100%"),
        ));
    }
    for (row, row_issue) in rows.iter().zip(row_issues.iter_mut()) {
        if row.has_invalid_weight() {
            row_issue.push(
                AllocationIssue::error(
                    IssueCode::WeightInvalid,
                    format!("{}: weight must be a number of at least 0", row.symbol),
                )
                .for_row(&row.id),
            );
        }
    }

    let mut slots: Vec<Slot> = rows
        .iter()
        .map(|r| Slot {
            weight: r.effective_weight(),
            price: valid_price(prices.get(&r.id).copied().flatten()),
            qty: 0,
        })
        .collect();

    if !funds.is_finite() || funds < 0.0 {
        debug!("Funds are invalid, returning empty allocation");
        issues.push(AllocationIssue::error(
            IssueCode::FundsInvalid,
            "Funds must be a number of at least 0",
        ));
        let totals = AllocationTotals {
            funds: 0.0,
            weight_sum_pct,
            locked_weight_sum_pct,
            ..Default::default()
        };
        let rows = rows
            .iter()
            .zip(slots)
            .zip(row_issues)
            .map(|((draft, slot), issues)| AllocationRowResult {
                draft: draft.clone(),
                price: slot.price,
                qty: 0,
                planned_cost: 0.0,
                actual_pct: 0.0,
                drift_pct: 0.0,
                issues,
            })
            .collect();
        return AllocationResult {
            rows,
            totals,
            issues,
        };
    }

    // Weights above 100% in total are scaled down so the targets fit the budget
    let weight_scale = if weight_sum_pct > 100.0 {
        100.0 / weight_sum_pct
    } else {
        1.0
    };
    let mut spent = 0.0;
    for ((row, slot), row_issue) in rows.iter().zip(slots.iter_mut()).zip(row_issues.iter_mut()) {
        match slot.price {
            Some(price) => {
                let target_value = slot.weight * weight_scale / 100.0 * funds;
                slot.qty = whole_units(target_value, price).min(whole_units(funds - spent, price));
                spent += slot.cost();
            }
            None => row_issue.push(
                AllocationIssue::warning(
                    IssueCode::PriceMissing,
                    format!("{}: no price available, nothing allocated", row.symbol),
                )
                .for_row(&row.id),
            ),
        }
    }
    debug!("Base pass cost: {spent}");

    let mut min_funds_required = None;
    let mut additional_funds_required = None;
    let min_qty = u64::from(options.min_qty_per_row);
    if min_qty > 0 {
        min_funds_required = slots
            .iter()
            .filter_map(|s| min_funds_for(s, min_qty, weight_scale))
            .reduce(f64::max);

        match min_funds_required {
            Some(required) if funds + BUDGET_EPSILON < required => {
                let shortfall = required - funds;
                additional_funds_required = Some(shortfall);
                issues.push(AllocationIssue::error(
                    IssueCode::MinQtyFundsInsufficient,
                    format!(
                        "Buying at least {min_qty} of every symbol needs {required:.2}, add {shortfall:.2} more"
                    ),
                ));
            }
            Some(_) => {
                let added = raise_to_minimum(&mut slots, min_qty, funds);
                debug!("Raised rows to minimum quantity with {added} extra shares");
            }
            None => {}
        }

        // Rows without a price or weight are never expected to reach the minimum
        for ((row, slot), row_issue) in rows.iter().zip(&slots).zip(row_issues.iter_mut()) {
            if slot.price.is_some() && slot.weight > 0.0 && slot.qty < min_qty {
                row_issue.push(
                    AllocationIssue::error(
                        IssueCode::MinQtyUnmet,
                        format!(
                            "{}: allocation of {} is below the minimum of {min_qty}",
                            row.symbol, slot.qty
                        ),
                    )
                    .for_row(&row.id),
                );
            }
        }
    }

    if options.optimize_with_remaining_funds {
        let bought = spend_leftover(funds, &mut slots);
        debug!("Spent leftover funds on {bought} extra shares");
    }

    let total_cost: f64 = slots.iter().map(Slot::cost).sum();
    let mut results: Vec<AllocationRowResult> = rows
        .iter()
        .zip(&slots)
        .zip(row_issues)
        .map(|((draft, slot), issues)| {
            let planned_cost = slot.cost();
            let actual_pct = if total_cost > 0.0 {
                planned_cost / total_cost * 100.0
            } else {
                0.0
            };
            AllocationRowResult {
                draft: draft.clone(),
                price: slot.price,
                qty: slot.qty,
                planned_cost,
                actual_pct,
                drift_pct: actual_pct - slot.weight,
                issues,
            }
        })
        .collect();

    let max_abs_deviation_pct = results.iter().map(|r| r.drift_pct.abs()).reduce(f64::max);

    let samples: Vec<(String, f64)> = results
        .iter()
        .map(|r| (r.draft.id.clone(), r.drift_pct))
        .collect();
    let outliers = detect_outliers(&samples, &options.outliers);
    if !outliers.is_empty() {
        let mut symbols = Vec::new();
        for row in results.iter_mut().filter(|r| outliers.contains(&r.draft.id)) {
            row.issues.push(
                AllocationIssue::warning(
                    IssueCode::AllocationOutlier,
                    format!(
                        "{}: drift of {:.2}% is unusual for this basket",
                        row.draft.symbol, row.drift_pct
                    ),
                )
                .for_row(&row.draft.id),
            );
            symbols.push(row.draft.symbol.clone());
        }
        issues.push(AllocationIssue::warning(
            IssueCode::AllocationOutliers,
            outlier_summary(&symbols),
        ));
    }

    let totals = AllocationTotals {
        funds,
        weight_sum_pct,
        locked_weight_sum_pct,
        total_cost,
        remaining: funds - total_cost,
        min_funds_required,
        additional_funds_required,
        max_abs_deviation_pct,
    };
    debug!(?totals, "Allocation complete");

    AllocationResult {
        rows: results,
        totals,
        issues,
    }
}

/// Greedily buys one more share of the most underweight affordable row until no row is
/// both underweight and affordable. Returns the number of shares bought.
fn spend_leftover(funds: f64, slots: &mut [Slot]) -> usize {
    let mut total_cost: f64 = slots.iter().map(Slot::cost).sum();
    let mut leftover = funds - total_cost;

    let Some(min_price) = slots.iter().filter_map(|s| s.price).reduce(f64::min) else {
        return 0;
    };
    let cap = leftover_step_cap(leftover, min_price, slots.len());
    debug!("Spending leftover {leftover} with at most {cap} iterations");

    let mut steps = 0;
    while steps < cap {
        let candidate = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.qty < u64::MAX)
            .filter(|(_, s)| matches!(s.price, Some(p) if p <= leftover + BUDGET_EPSILON))
            .map(|(i, s)| (i, drift(s, total_cost)))
            .filter(|(_, d)| *d < 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((index, _)) = candidate else {
            break;
        };
        let slot = &mut slots[index];
        let Some(price) = slot.price else {
            break;
        };
        slot.qty += 1;
        leftover -= price;
        total_cost += price;
        steps += 1;
    }
    steps
}

fn outlier_summary(symbols: &[String]) -> String {
    let examples = symbols
        .iter()
        .take(MAX_OUTLIER_EXAMPLES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let more = symbols.len().saturating_sub(MAX_OUTLIER_EXAMPLES);
    let noun = if symbols.len() == 1 { "symbol" } else { "symbols" };
    if more > 0 {
        format!(
            "{} {noun} drift far from the rest of the basket: {examples} and {more} more",
            symbols.len()
        )
    } else {
        format!(
            "{} {noun} drift far from the rest of the basket: {examples}",
            symbols.len()
        )
    }
}
