use crate::core::asset::AssetMetadata;
use crate::core::diversification::DEFAULT_MAX_RESULTS;
use crate::core::simulation::{
    DEFAULT_LOWER_PERCENTILE, DEFAULT_SIMULATIONS, DEFAULT_UPPER_PERCENTILE, GbmSimulator,
};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Portfolio {
    pub name: String,
    pub asset_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub horizon_days: usize,
    pub simulations: usize,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizon_days: 30,
            simulations: DEFAULT_SIMULATIONS,
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn simulator(&self) -> GbmSimulator {
        GbmSimulator::new(self.simulations)
            .with_seed(self.seed)
            .with_confidence_band(self.lower_percentile, self.upper_percentile)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiversificationConfig {
    pub max_results: usize,
}

impl Default for DiversificationConfig {
    fn default() -> Self {
        DiversificationConfig {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub assets: Vec<AssetMetadata>,
    pub portfolios: Vec<Portfolio>,
    /// Directory holding one `<SYMBOL>.csv` price history per asset.
    pub data_path: Option<String>,
    /// Calendar days of history to use, counted back from the latest row.
    pub lookback_days: Option<i64>,
    /// Annual risk-free rate subtracted in Sharpe ratios, e.g. `0.04`.
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub diversification: DiversificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "foliocast", "foliocast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "foliocast", "foliocast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("prices"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Checks that every portfolio references known assets.
    pub fn validate(&self) -> Result<()> {
        for portfolio in &self.portfolios {
            for id in &portfolio.asset_ids {
                if self.asset(id).is_none() {
                    bail!(
                        "Portfolio '{}' references unknown asset id '{}'",
                        portfolio.name,
                        id
                    );
                }
            }
        }
        Ok(())
    }

    pub fn asset(&self, id: &str) -> Option<&AssetMetadata> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Named portfolio, or the first one when no name is given.
    pub fn portfolio(&self, name: Option<&str>) -> Result<&Portfolio> {
        match name {
            Some(name) => self
                .portfolios
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .with_context(|| format!("Portfolio not found: {name}")),
            None => self
                .portfolios
                .first()
                .context("No portfolios defined in configuration"),
        }
    }
}
