use anyhow::Result;
use bskt::core::WeightAction;
use bskt::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for bskt::AppCommand {
    fn from(cmd: Commands) -> bskt::AppCommand {
        match cmd {
            Commands::Allocate { basket, json } => bskt::AppCommand::Allocate { basket, json },
            Commands::Weights { action, basket } => bskt::AppCommand::Weights { action, basket },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Plan share quantities for each basket
    Allocate {
        /// Only plan the basket with this name
        #[arg(short, long)]
        basket: Option<String>,

        /// Print plans as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview an equalize, normalize or clear of unlocked weights
    Weights {
        /// One of: equalize, normalize, clear
        action: WeightAction,

        /// Only edit the basket with this name
        #[arg(short, long)]
        basket: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => bskt::cli::setup::setup(),
        Some(cmd) => bskt::run_command(cmd.into(), cli.config_path.as_deref()),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
