pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::OutputFormat;
use crate::core::asset::AssetMetadata;
use crate::core::config::AppConfig;
use crate::providers::CsvHistoryProvider;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Stats,
    Project {
        horizon_days: Option<usize>,
        simulations: Option<usize>,
        seed: Option<u64>,
    },
    Heatmap,
    Groups,
    Diversify,
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Portfolio to analyse; the first configured one when unset.
    pub portfolio: Option<String>,
    pub format: OutputFormat,
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    options: &CommandOptions,
) -> Result<()> {
    info!("foliocast starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.default_data_path()?;
    debug!("Reading price history from {}", data_path.display());
    let provider = CsvHistoryProvider::new(&data_path, config.lookback_days);

    let portfolio = config.portfolio(options.portfolio.as_deref())?;
    let held: Vec<&AssetMetadata> = portfolio
        .asset_ids
        .iter()
        .filter_map(|id| config.asset(id))
        .collect();
    let format = options.format;

    match command {
        AppCommand::Stats => {
            cli::stats::run(
                &held,
                &provider,
                config.risk_free_rate,
                config.simulation.horizon_days,
                &config.simulation.simulator(),
                format,
            )
            .await
        }
        AppCommand::Project {
            horizon_days,
            simulations,
            seed,
        } => {
            let mut simulation = config.simulation.clone();
            if let Some(simulations) = simulations {
                simulation.simulations = simulations;
            }
            if seed.is_some() {
                simulation.seed = seed;
            }
            let horizon_days = horizon_days.unwrap_or(simulation.horizon_days);
            cli::project::run(
                &held,
                &provider,
                horizon_days,
                &simulation.simulator(),
                format,
            )
            .await
        }
        AppCommand::Heatmap => cli::heatmap::run(&portfolio.name, &held, &provider, format).await,
        AppCommand::Groups => {
            cli::groups::run(
                &portfolio.name,
                &portfolio.asset_ids,
                &config.assets,
                &provider,
                format,
            )
            .await
        }
        AppCommand::Diversify => {
            cli::diversify::run(
                &portfolio.name,
                &portfolio.asset_ids,
                &config.assets,
                &provider,
                config.diversification.max_results,
                format,
            )
            .await
        }
    }
}
