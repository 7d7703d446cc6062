pub mod cli;
pub mod core;

use crate::core::WeightAction;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Allocate {
        basket: Option<String>,
        json: bool,
    },
    Weights {
        action: WeightAction,
        basket: Option<String>,
    },
}

pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Basket planner starting...");

    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Allocate { basket, json } => {
            let baskets = config.select_baskets(basket.as_deref())?;
            cli::allocate::run(&baskets, &config.allocation.to_options(), json)
        }
        AppCommand::Weights { action, basket } => {
            let baskets = config.select_baskets(basket.as_deref())?;
            cli::weights::run(&baskets, action)
        }
    }
}
