use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use foliocast::cli::OutputFormat;
use foliocast::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Portfolio to analyse (defaults to the first one configured)
    #[arg(short, long, global = true)]
    portfolio: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for foliocast::AppCommand {
    fn from(cmd: Commands) -> foliocast::AppCommand {
        match cmd {
            Commands::Stats => foliocast::AppCommand::Stats,
            Commands::Project {
                days,
                simulations,
                seed,
            } => foliocast::AppCommand::Project {
                horizon_days: days,
                simulations,
                seed,
            },
            Commands::Heatmap => foliocast::AppCommand::Heatmap,
            Commands::Groups => foliocast::AppCommand::Groups,
            Commands::Diversify => foliocast::AppCommand::Diversify,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create example configuration
    Setup,
    /// Show return statistics for each portfolio asset
    Stats,
    /// Project future prices with a Monte Carlo simulation
    Project {
        /// Trading days to project
        #[arg(short, long)]
        days: Option<usize>,
        /// Number of simulated paths
        #[arg(short, long)]
        simulations: Option<usize>,
        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Display the correlation matrix of the portfolio
    Heatmap,
    /// Score asset-type groups by correlation with the portfolio
    Groups,
    /// Recommend assets that would diversify the portfolio
    Diversify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = foliocast::CommandOptions {
        portfolio: cli.portfolio,
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        },
    };

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => foliocast::cli::setup::setup_at_path(path),
            None => foliocast::cli::setup::setup(),
        },
        Some(cmd) => {
            foliocast::run_command(cmd.into(), cli.config_path.as_deref(), &options).await
        }
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
