//! Monte Carlo price projection under Geometric Brownian Motion.
//!
//! Every simulated path evolves as
//! `S[t] = S[t-1] * exp((mu - sigma^2 / 2) + sigma * Z)` with an independent
//! standard normal `Z` per (path, day). Paths are generated in parallel, each
//! from its own ChaCha sub-stream of a single master seed, and collected in
//! path order, so a seeded run is bit-for-bit reproducible regardless of how
//! rayon schedules the work. Aggregation happens only once every path exists.

use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::returns::DistributionParameters;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_SIMULATIONS: usize = 1000;
pub const DEFAULT_LOWER_PERCENTILE: f64 = 5.0;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 95.0;

/// Distribution of simulated prices for a single future day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionBand {
    /// 1-based offset from the last observed price.
    pub day: usize,
    pub mean_price: f64,
    pub median_price: f64,
    pub std_dev: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbmSimulator {
    simulations: usize,
    lower_percentile: f64,
    upper_percentile: f64,
    seed: Option<u64>,
}

impl Default for GbmSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATIONS)
    }
}

impl GbmSimulator {
    pub fn new(simulations: usize) -> Self {
        Self {
            simulations,
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_confidence_band(mut self, lower_percentile: f64, upper_percentile: f64) -> Self {
        self.lower_percentile = lower_percentile;
        self.upper_percentile = upper_percentile;
        self
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Projects `horizon_days` bands starting from `start_price`.
    pub fn project(
        &self,
        start_price: f64,
        params: DistributionParameters,
        horizon_days: usize,
    ) -> AnalyticsResult<Vec<ProjectionBand>> {
        self.validate(start_price, params, horizon_days)?;

        let master_seed = self.seed.unwrap_or_else(rand::random);
        debug!(
            "Simulating {} paths over {} days (seed={}, explicit={})",
            self.simulations,
            horizon_days,
            master_seed,
            self.seed.is_some()
        );

        let paths = self.simulate_paths(start_price, params, horizon_days, master_seed);

        let bands = (0..horizon_days)
            .into_par_iter()
            .map(|t| {
                let column: Vec<f64> = paths.iter().map(|path| path[t]).collect();
                aggregate_day(t + 1, column, self.lower_percentile, self.upper_percentile)
            })
            .collect();
        Ok(bands)
    }

    /// Generates the `simulations x horizon_days` price matrix, one row per path.
    pub fn simulate_paths(
        &self,
        start_price: f64,
        params: DistributionParameters,
        horizon_days: usize,
        master_seed: u64,
    ) -> Vec<Vec<f64>> {
        (0..self.simulations)
            .into_par_iter()
            .map(|i| simulate_path(start_price, params, horizon_days, master_seed, i as u64))
            .collect()
    }

    fn validate(
        &self,
        start_price: f64,
        params: DistributionParameters,
        horizon_days: usize,
    ) -> AnalyticsResult<()> {
        if horizon_days < 1 || self.simulations < 1 {
            return Err(AnalyticsError::InvalidHorizon {
                horizon_days,
                simulations: self.simulations,
            });
        }
        if !start_price.is_finite() || start_price <= 0.0 {
            return Err(AnalyticsError::InvalidPrice {
                index: 0,
                price: start_price,
            });
        }
        if !params.drift.is_finite() || !params.volatility.is_finite() || params.volatility < 0.0
        {
            return Err(AnalyticsError::InvalidParameters {
                drift: params.drift,
                volatility: params.volatility,
            });
        }
        let (lower, upper) = (self.lower_percentile, self.upper_percentile);
        if !(0.0..=50.0).contains(&lower) || !(50.0..=100.0).contains(&upper) {
            return Err(AnalyticsError::InvalidConfidenceBand { lower, upper });
        }
        Ok(())
    }
}

fn simulate_path(
    start_price: f64,
    params: DistributionParameters,
    horizon_days: usize,
    master_seed: u64,
    stream: u64,
) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    rng.set_stream(stream);

    // Ito correction: the log-price drifts by mu - sigma^2/2 per step.
    let drift = params.drift - 0.5 * params.volatility * params.volatility;
    let mut log_price = start_price.ln();
    (0..horizon_days)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            log_price += drift + params.volatility * z;
            log_price.exp().clamp(f64::MIN_POSITIVE, f64::MAX)
        })
        .collect()
}

/// Reduces the prices of all paths on one day into a band.
pub fn aggregate_day(
    day: usize,
    mut column: Vec<f64>,
    lower_percentile: f64,
    upper_percentile: f64,
) -> ProjectionBand {
    column.sort_by(f64::total_cmp);
    let n = column.len();

    if n == 0 || column[0] == column[n - 1] {
        let value = column.first().copied().unwrap_or(f64::NAN);
        return ProjectionBand {
            day,
            mean_price: value,
            median_price: value,
            std_dev: 0.0,
            lower_bound: value,
            upper_bound: value,
        };
    }

    let mean = column.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        let ss: f64 = column.iter().map(|p| (p - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    ProjectionBand {
        day,
        mean_price: mean,
        median_price: percentile(&column, 50.0),
        std_dev,
        lower_bound: percentile(&column, lower_percentile),
        upper_bound: percentile(&column, upper_percentile),
    }
}

/// Percentile of already sorted data, interpolating linearly between order
/// statistics at rank `p / 100 * (n - 1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let (a, b) = (sorted[lo], sorted[hi]);
            let value = a + (b - a) * (rank - lo as f64);
            // Rounding must not push the estimate outside its bracketing pair.
            if value < a {
                a
            } else if value > b {
                b
            } else {
                value
            }
        }
    }
}
