//! One-click weight edits over draft rows. Locked rows are never touched.
use crate::core::allocation::{AllocationRowDraft, locked_weight_pct};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightAction {
    Equalize,
    Normalize,
    Clear,
}

impl WeightAction {
    pub fn apply(&self, rows: &[AllocationRowDraft]) -> Vec<AllocationRowDraft> {
        match self {
            WeightAction::Equalize => equalize_unlocked(rows),
            WeightAction::Normalize => normalize_unlocked(rows),
            WeightAction::Clear => clear_unlocked(rows),
        }
    }
}

impl Display for WeightAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WeightAction::Equalize => "equalize",
                WeightAction::Normalize => "normalize",
                WeightAction::Clear => "clear",
            }
        )
    }
}

impl FromStr for WeightAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equalize" | "equal" => Ok(WeightAction::Equalize),
            "normalize" | "norm" => Ok(WeightAction::Normalize),
            "clear" => Ok(WeightAction::Clear),
            _ => Err(anyhow::anyhow!("Invalid weight action: {}", s)),
        }
    }
}

/// Splits `100 - locked` evenly over the unlocked rows.
///
/// The share goes negative when locked rows already exceed 100%; the calculator reports that.
pub fn equalize_unlocked(rows: &[AllocationRowDraft]) -> Vec<AllocationRowDraft> {
    let unlocked = rows.iter().filter(|r| !r.locked).count();
    if unlocked == 0 {
        return rows.to_vec();
    }

    let share = (100.0 - locked_weight_pct(rows)) / unlocked as f64;
    debug!("Equalizing {unlocked} unlocked rows at {share}%");
    rows.iter()
        .map(|r| {
            let mut row = r.clone();
            if !row.locked {
                row.weight_pct = Some(share);
            }
            row
        })
        .collect()
}

/// Rescales unlocked weights so everything sums to 100 while keeping their ratios.
///
/// Falls back to [`equalize_unlocked`] when all unlocked weights are zero.
pub fn normalize_unlocked(rows: &[AllocationRowDraft]) -> Vec<AllocationRowDraft> {
    let target = 100.0 - locked_weight_pct(rows);
    let unlocked_sum: f64 = rows
        .iter()
        .filter(|r| !r.locked)
        .map(AllocationRowDraft::effective_weight)
        .sum();

    if unlocked_sum <= 0.0 {
        return equalize_unlocked(rows);
    }

    let factor = target / unlocked_sum;
    debug!("Normalizing unlocked weights by factor {factor}");
    rows.iter()
        .map(|r| {
            let mut row = r.clone();
            if !row.locked {
                row.weight_pct = Some(row.effective_weight() * factor);
            }
            row
        })
        .collect()
}

pub fn clear_unlocked(rows: &[AllocationRowDraft]) -> Vec<AllocationRowDraft> {
    rows.iter()
        .map(|r| {
            let mut row = r.clone();
            if !row.locked {
                row.weight_pct = Some(0.0);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocation::sum_weight_pct;

    const EPS: f64 = 1e-6;

    fn basket() -> Vec<AllocationRowDraft> {
        vec![
            AllocationRowDraft::new("a", "A", Some(25.0)).locked(),
            AllocationRowDraft::new("b", "B", Some(10.0)),
            AllocationRowDraft::new("c", "C", Some(30.0)),
            AllocationRowDraft::new("d", "D", None),
        ]
    }

    #[test]
    fn test_equalize_sums_to_100() {
        let rows = equalize_unlocked(&basket());
        assert!((sum_weight_pct(&rows) - 100.0).abs() < EPS);
        assert_eq!(rows[0].weight_pct, Some(25.0));
        for row in &rows[1..] {
            assert!((row.weight_pct.unwrap() - 25.0).abs() < EPS);
        }
    }

    #[test]
    fn test_equalize_all_locked_is_noop() {
        let rows = vec![
            AllocationRowDraft::new("a", "A", Some(40.0)).locked(),
            AllocationRowDraft::new("b", "B", Some(10.0)).locked(),
        ];
        assert_eq!(equalize_unlocked(&rows), rows);
    }

    #[test]
    fn test_equalize_over_locked_goes_negative() {
        let rows = vec![
            AllocationRowDraft::new("a", "A", Some(60.0)).locked(),
            AllocationRowDraft::new("b", "B", Some(50.0)).locked(),
            AllocationRowDraft::new("c", "C", Some(5.0)),
        ];
        let result = equalize_unlocked(&rows);
        assert!((result[2].weight_pct.unwrap() + 10.0).abs() < EPS);
    }

    #[test]
    fn test_normalize_preserves_ratios() {
        let input = basket();
        let rows = normalize_unlocked(&input);
        assert!((sum_weight_pct(&rows) - 100.0).abs() < EPS);
        assert_eq!(rows[0].weight_pct, Some(25.0));

        let b = rows[1].weight_pct.unwrap();
        let c = rows[2].weight_pct.unwrap();
        assert!((c / b - 3.0).abs() < EPS);
        assert!((b - 18.75).abs() < EPS);
        assert_eq!(rows[3].weight_pct, Some(0.0));

        // Input untouched
        assert_eq!(input[1].weight_pct, Some(10.0));
    }

    #[test]
    fn test_normalize_zero_unlocked_falls_back_to_equalize() {
        let rows = vec![
            AllocationRowDraft::new("a", "A", Some(20.0)).locked(),
            AllocationRowDraft::new("b", "B", Some(0.0)),
            AllocationRowDraft::new("c", "C", None),
        ];
        let result = normalize_unlocked(&rows);
        assert!((result[1].weight_pct.unwrap() - 40.0).abs() < EPS);
        assert!((result[2].weight_pct.unwrap() - 40.0).abs() < EPS);
    }

    #[test]
    fn test_clear_preserves_locked() {
        let rows = clear_unlocked(&basket());
        assert_eq!(rows[0].weight_pct, Some(25.0));
        assert!(rows[1..].iter().all(|r| r.weight_pct == Some(0.0)));
    }

    #[test]
    fn test_weight_action_parse_and_apply() {
        let action: WeightAction = "Normalize".parse().unwrap();
        assert_eq!(action, WeightAction::Normalize);
        assert_eq!(action.to_string(), "normalize");
        assert!("spread".parse::<WeightAction>().is_err());

        let rows = WeightAction::Clear.apply(&basket());
        assert!((sum_weight_pct(&rows) - 25.0).abs() < EPS);
    }
}
