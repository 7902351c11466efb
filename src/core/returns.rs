//! Log returns and the drift/volatility summary derived from them.

use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::price::PriceSeries;
use serde::Serialize;
use tracing::debug;

/// Trading days used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Log returns `ln(p[i] / p[i-1])` of a price series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    values: Vec<f64>,
}

/// Scalar summary of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionParameters {
    pub drift: f64,
    pub volatility: f64,
}

impl ReturnSeries {
    pub fn from_prices(series: &PriceSeries) -> AnalyticsResult<Self> {
        if series.len() < 2 {
            return Err(AnalyticsError::InsufficientData {
                required: 2,
                actual: series.len(),
            });
        }

        let values: Vec<f64> = series
            .points()
            .windows(2)
            .map(|pair| {
                debug_assert!(pair[0].price > 0.0 && pair[1].price > 0.0);
                (pair[1].price / pair[0].price).ln()
            })
            .collect();

        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> AnalyticsResult<f64> {
        if self.values.is_empty() {
            return Err(AnalyticsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(mean(&self.values))
    }

    /// Sample variance with the `n - 1` denominator.
    pub fn variance(&self) -> AnalyticsResult<f64> {
        if self.values.len() < 2 {
            return Err(AnalyticsError::InsufficientData {
                required: 2,
                actual: self.values.len(),
            });
        }
        let m = mean(&self.values);
        let ss: f64 = self.values.iter().map(|r| (r - m).powi(2)).sum();
        Ok(ss / (self.values.len() - 1) as f64)
    }

    pub fn distribution_parameters(&self) -> AnalyticsResult<DistributionParameters> {
        let volatility = self.variance()?.sqrt();
        let drift = mean(&self.values);
        debug!(
            "Estimated drift={drift:.6} volatility={volatility:.6} from {} returns",
            self.values.len()
        );
        Ok(DistributionParameters { drift, volatility })
    }
}

impl DistributionParameters {
    pub fn annualized_volatility(&self, periods_per_year: f64) -> f64 {
        self.volatility * periods_per_year.sqrt()
    }

    /// Mean log return scaled to a year.
    pub fn annualized_return(&self, periods_per_year: f64) -> f64 {
        self.drift * periods_per_year
    }
}

/// Excess return per unit of volatility, `(return - risk_free) / volatility`,
/// all three annualized.
pub fn sharpe_ratio(
    annual_return: f64,
    annual_volatility: f64,
    risk_free_rate: f64,
) -> AnalyticsResult<f64> {
    if annual_volatility == 0.0 {
        return Err(AnalyticsError::ZeroVolatility);
    }
    Ok((annual_return - risk_free_rate) / annual_volatility)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
