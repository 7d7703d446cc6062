//! Interquartile-range outlier fences.
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Absolute slack added to both fences so float noise between equal values is not flagged.
const FENCE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Samples below this size are never flagged.
    pub min_samples: usize,
    pub fence_multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        OutlierConfig {
            min_samples: 5,
            fence_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub low: f64,
    pub high: f64,
}

impl IqrFences {
    /// Computes fences from an ascending-sorted sample. Returns `None` for an empty sample.
    pub fn from_sorted(sorted: &[f64], multiplier: f64) -> Option<Self> {
        let q1 = quantile(sorted, 0.25)?;
        let q3 = quantile(sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(IqrFences {
            q1,
            q3,
            iqr,
            low: q1 - multiplier * iqr,
            high: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low - FENCE_TOLERANCE && value <= self.high + FENCE_TOLERANCE
    }
}

/// Quantile of an ascending-sorted sample, linearly interpolated between ranks.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Returns ids whose value falls outside the IQR fences, in input order.
pub fn detect_outliers(samples: &[(String, f64)], config: &OutlierConfig) -> Vec<String> {
    let finite: Vec<&(String, f64)> = samples.iter().filter(|(_, v)| v.is_finite()).collect();
    if finite.len() < config.min_samples.max(1) {
        debug!(
            "Skipping outlier detection: {} samples, need {}",
            finite.len(),
            config.min_samples
        );
        return Vec::new();
    }

    let mut sorted: Vec<f64> = finite.iter().map(|(_, v)| *v).collect();
    sorted.sort_by(f64::total_cmp);

    let Some(fences) = IqrFences::from_sorted(&sorted, config.fence_multiplier) else {
        return Vec::new();
    };
    debug!(?fences, "Computed IQR fences");

    finite
        .into_iter()
        .filter(|(_, v)| !fences.contains(*v))
        .map(|(id, _)| id.clone())
        .collect()
}
