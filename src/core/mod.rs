//! Core business logic: basket allocation engine and configuration

pub mod allocation;
pub mod calculator;
pub mod config;
pub mod log;
pub mod outliers;
pub mod weights;

// Re-export main types for cleaner imports
pub use allocation::{
    AllocationIssue, AllocationResult, AllocationRowDraft, AllocationRowResult, AllocationTotals,
    IssueCode, IssueLevel,
};
pub use calculator::{AllocationOptions, compute_weight_mode_allocation};
pub use outliers::OutlierConfig;
pub use weights::{WeightAction, clear_unlocked, equalize_unlocked, normalize_unlocked};
