use crate::core::allocation::AllocationRowDraft;
use crate::core::calculator::AllocationOptions;
use crate::core::outliers::OutlierConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BasketMember {
    pub symbol: String,
    pub id: Option<String>,
    pub exchange: Option<String>,
    pub weight: Option<f64>,
    #[serde(default)]
    pub locked: bool,
    pub price: Option<f64>,
}

impl BasketMember {
    pub fn row_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.symbol.clone())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Basket {
    pub name: String,
    pub funds: f64,
    pub members: Vec<BasketMember>,
}

impl Basket {
    pub fn drafts(&self) -> Vec<AllocationRowDraft> {
        self.members
            .iter()
            .map(|m| AllocationRowDraft {
                id: m.row_id(),
                symbol: m.symbol.clone(),
                exchange: m.exchange.clone(),
                locked: m.locked,
                weight_pct: m.weight,
            })
            .collect()
    }

    pub fn prices(&self) -> HashMap<String, Option<f64>> {
        self.members.iter().map(|m| (m.row_id(), m.price)).collect()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AllocationSettings {
    #[serde(default = "default_true")]
    pub require_weights_sum_to_100: bool,
    #[serde(default)]
    pub min_qty_per_row: u32,
    #[serde(default = "default_true")]
    pub optimize_with_remaining_funds: bool,
    pub outlier_min_samples: Option<usize>,
    pub outlier_fence_multiplier: Option<f64>,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        AllocationSettings {
            require_weights_sum_to_100: true,
            min_qty_per_row: 0,
            optimize_with_remaining_funds: true,
            outlier_min_samples: None,
            outlier_fence_multiplier: None,
        }
    }
}

impl AllocationSettings {
    pub fn to_options(&self) -> AllocationOptions {
        let defaults = OutlierConfig::default();
        AllocationOptions {
            require_weights_sum_to_100: self.require_weights_sum_to_100,
            min_qty_per_row: self.min_qty_per_row,
            optimize_with_remaining_funds: self.optimize_with_remaining_funds,
            outliers: OutlierConfig {
                min_samples: self.outlier_min_samples.unwrap_or(defaults.min_samples),
                fence_multiplier: self
                    .outlier_fence_multiplier
                    .unwrap_or(defaults.fence_multiplier),
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub baskets: Vec<Basket>,
    #[serde(default)]
    pub allocation: AllocationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "bskt")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Returns every basket, or only the one named `name` (case-insensitive).
    pub fn select_baskets(&self, name: Option<&str>) -> Result<Vec<&Basket>> {
        match name {
            None => Ok(self.baskets.iter().collect()),
            Some(name) => {
                let basket = self
                    .baskets
                    .iter()
                    .find(|b| b.name.eq_ignore_ascii_case(name))
                    .with_context(|| format!("No basket named '{name}' in config"))?;
                Ok(vec![basket])
            }
        }
    }
}
