//! Data model shared by the weight normalizer and the allocation calculator.
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One basket member as edited by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRowDraft {
    pub id: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default)]
    pub locked: bool,
    /// Target weight in percent, `[0, 100]`. Missing means 0.
    #[serde(default, alias = "weight")]
    pub weight_pct: Option<f64>,
}

impl AllocationRowDraft {
    pub fn new(id: &str, symbol: &str, weight_pct: Option<f64>) -> Self {
        AllocationRowDraft {
            id: id.to_string(),
            symbol: symbol.to_string(),
            exchange: None,
            locked: false,
            weight_pct,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Weight used for arithmetic. Missing, non-finite and negative weights count as 0.
    pub fn effective_weight(&self) -> f64 {
        match self.weight_pct {
            Some(w) if w.is_finite() && w >= 0.0 => w,
            _ => 0.0,
        }
    }

    /// True when a weight is present but unusable.
    pub fn has_invalid_weight(&self) -> bool {
        matches!(self.weight_pct, Some(w) if !w.is_finite() || w < 0.0)
    }
}

/// Sum of effective weights across all rows.
pub fn sum_weight_pct(rows: &[AllocationRowDraft]) -> f64 {
    rows.iter().map(AllocationRowDraft::effective_weight).sum()
}

/// Sum of effective weights across locked rows.
pub fn locked_weight_pct(rows: &[AllocationRowDraft]) -> f64 {
    rows.iter()
        .filter(|r| r.locked)
        .map(AllocationRowDraft::effective_weight)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
}

impl IssueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueLevel::Error => "error",
            IssueLevel::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    FundsInvalid,
    WeightInvalid,
    LockedOver100,
    WeightsNot100,
    MinQtyUnmet,
    MinQtyFundsInsufficient,
    PriceMissing,
    AllocationOutlier,
    AllocationOutliers,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::FundsInvalid => "funds_invalid",
            IssueCode::WeightInvalid => "weight_invalid",
            IssueCode::LockedOver100 => "locked_over_100",
            IssueCode::WeightsNot100 => "weights_not_100",
            IssueCode::MinQtyUnmet => "min_qty_unmet",
            IssueCode::MinQtyFundsInsufficient => "min_qty_funds_insufficient",
            IssueCode::PriceMissing => "price_missing",
            IssueCode::AllocationOutlier => "allocation_outlier",
            IssueCode::AllocationOutliers => "allocation_outliers",
        }
    }
}

impl Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validation or advisory finding. Error-level issues block buy/save actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationIssue {
    pub level: IssueLevel,
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
}

impl AllocationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        AllocationIssue {
            level: IssueLevel::Error,
            code,
            message: message.into(),
            row_id: None,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        AllocationIssue {
            level: IssueLevel::Warning,
            code,
            message: message.into(),
            row_id: None,
        }
    }

    pub fn for_row(mut self, row_id: &str) -> Self {
        self.row_id = Some(row_id.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == IssueLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRowResult {
    #[serde(flatten)]
    pub draft: AllocationRowDraft,
    pub price: Option<f64>,
    pub qty: u64,
    pub planned_cost: f64,
    /// Share of the total planned cost, in percent.
    pub actual_pct: f64,
    /// `actual_pct - weight_pct`.
    pub drift_pct: f64,
    pub issues: Vec<AllocationIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationTotals {
    pub funds: f64,
    pub weight_sum_pct: f64,
    pub locked_weight_sum_pct: f64,
    pub total_cost: f64,
    pub remaining: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_funds_required: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_funds_required: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_abs_deviation_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub rows: Vec<AllocationRowResult>,
    pub totals: AllocationTotals,
    /// Totals-level issues. Row issues live on each row.
    pub issues: Vec<AllocationIssue>,
}

impl AllocationResult {
    /// Every issue in the result, totals-level first.
    pub fn all_issues(&self) -> impl Iterator<Item = &AllocationIssue> {
        self.issues
            .iter()
            .chain(self.rows.iter().flat_map(|r| r.issues.iter()))
    }

    pub fn blocking_issues(&self) -> impl Iterator<Item = &AllocationIssue> {
        self.all_issues().filter(|i| i.is_error())
    }

    /// True if any error-level issue exists, which must block moving money.
    pub fn has_errors(&self) -> bool {
        self.blocking_issues().next().is_some()
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.all_issues().any(|i| i.code == code)
    }

    pub fn row(&self, id: &str) -> Option<&AllocationRowResult> {
        self.rows.iter().find(|r| r.draft.id == id)
    }
}

impl AllocationRowResult {
    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_weight() {
        assert_eq!(AllocationRowDraft::new("a", "A", None).effective_weight(), 0.0);
        assert_eq!(
            AllocationRowDraft::new("a", "A", Some(12.5)).effective_weight(),
            12.5
        );
        assert_eq!(
            AllocationRowDraft::new("a", "A", Some(-3.0)).effective_weight(),
            0.0
        );
        assert_eq!(
            AllocationRowDraft::new("a", "A", Some(f64::NAN)).effective_weight(),
            0.0
        );
        assert!(AllocationRowDraft::new("a", "A", Some(f64::INFINITY)).has_invalid_weight());
        assert!(!AllocationRowDraft::new("a", "A", None).has_invalid_weight());
    }

    #[test]
    fn test_weight_sums() {
        let rows = vec![
            AllocationRowDraft::new("a", "A", Some(30.0)).locked(),
            AllocationRowDraft::new("b", "B", Some(20.0)),
            AllocationRowDraft::new("c", "C", None).locked(),
        ];
        assert_eq!(sum_weight_pct(&rows), 50.0);
        assert_eq!(locked_weight_pct(&rows), 30.0);
    }

    #[test]
    fn test_issue_serialization() {
        let issue = AllocationIssue::warning(IssueCode::PriceMissing, "No price").for_row("a");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["code"], "price_missing");
        assert_eq!(json["row_id"], "a");
        assert_eq!(IssueCode::LockedOver100.to_string(), "locked_over_100");
    }

    #[test]
    fn test_draft_accepts_weight_alias() {
        let draft: AllocationRowDraft =
            serde_yaml::from_str("id: x\nsymbol: X\nweight: 25\n").unwrap();
        assert_eq!(draft.weight_pct, Some(25.0));
        assert!(!draft.locked);
        assert!(draft.exchange.is_none());
    }
}
