//! Entry points of the analytics core.
//!
//! Each function is a pure computation over its inputs: price histories are
//! loaded by the caller beforehand and nothing is cached between calls.
use crate::core::asset::AssetMetadata;
use crate::core::correlation::CorrelationMatrix;
use crate::core::diversification::{DEFAULT_MAX_RESULTS, RankedCandidate, rank_candidates};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::price::{PriceSeries, align_series};
use crate::core::returns::{ReturnSeries, TRADING_DAYS_PER_YEAR, mean, sharpe_ratio};
use crate::core::simulation::{GbmSimulator, ProjectionBand};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Summary statistics of one asset's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetStats {
    pub observations: usize,
    pub drift: f64,
    pub volatility: f64,
    pub annualized_volatility: f64,
    pub annualized_return: f64,
    /// `None` when the series never moved.
    pub sharpe_ratio: Option<f64>,
    pub percentage_change: f64,
}

pub fn compute_stats(prices: &PriceSeries) -> AnalyticsResult<AssetStats> {
    compute_stats_with(prices, 0.0)
}

pub fn compute_stats_with(prices: &PriceSeries, risk_free_rate: f64) -> AnalyticsResult<AssetStats> {
    let params = ReturnSeries::from_prices(prices)?.distribution_parameters()?;
    let annualized_volatility = params.annualized_volatility(TRADING_DAYS_PER_YEAR);
    let annualized_return = params.annualized_return(TRADING_DAYS_PER_YEAR);
    let sharpe = match sharpe_ratio(annualized_return, annualized_volatility, risk_free_rate) {
        Ok(ratio) => Some(ratio),
        Err(AnalyticsError::ZeroVolatility) => None,
        Err(e) => return Err(e),
    };
    Ok(AssetStats {
        observations: prices.len(),
        drift: params.drift,
        volatility: params.volatility,
        annualized_volatility,
        annualized_return,
        sharpe_ratio: sharpe,
        percentage_change: prices.percentage_change()?,
    })
}

/// Portfolio-level figures over an equally weighted basket of the assets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub assets: usize,
    /// Common dates the basket is evaluated on.
    pub observations: usize,
    /// Mean of the assets' annualized volatilities.
    pub average_volatility: Option<f64>,
    /// Change of the average price between the first and last common date.
    pub net_profit: f64,
    pub net_profit_percent: f64,
    pub horizon_days: usize,
    /// Projected average price on the last horizon day minus the current
    /// average price; `None` when any asset cannot be projected.
    pub projected_profit: Option<f64>,
}

pub fn compute_portfolio_summary(
    series_by_asset: &BTreeMap<String, PriceSeries>,
    horizon_days: usize,
    simulator: &GbmSimulator,
) -> AnalyticsResult<PortfolioSummary> {
    let aligned = align_series(series_by_asset);
    let observations = aligned.values().next().map_or(0, PriceSeries::len);
    if observations < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            actual: observations,
        });
    }

    let prices: Vec<Vec<f64>> = aligned.values().map(|s| s.prices().collect()).collect();
    let average_at = |i: usize| mean(&prices.iter().map(|p| p[i]).collect::<Vec<_>>());
    let (first, last) = (average_at(0), average_at(observations - 1));

    let volatilities: Vec<f64> = series_by_asset
        .values()
        .filter_map(|s| compute_stats(s).ok())
        .map(|stats| stats.annualized_volatility)
        .collect();

    let mut current = Vec::with_capacity(series_by_asset.len());
    let mut projected = Vec::with_capacity(series_by_asset.len());
    for (asset, series) in series_by_asset {
        match compute_projection_with(series, horizon_days, simulator) {
            Ok(bands) => {
                current.push(series.last_price().unwrap_or_default());
                projected.push(bands.last().map_or(f64::NAN, |b| b.mean_price));
            }
            Err(e) => debug!("No projection for {asset}: {e}"),
        }
    }
    let projected_profit = (projected.len() == series_by_asset.len())
        .then(|| mean(&projected) - mean(&current));

    Ok(PortfolioSummary {
        assets: series_by_asset.len(),
        observations,
        average_volatility: (!volatilities.is_empty()).then(|| mean(&volatilities)),
        net_profit: last - first,
        net_profit_percent: (last - first) / first,
        horizon_days,
        projected_profit,
    })
}

/// Projects `horizon_days` of prices from the last observation with the
/// default confidence band.
pub fn compute_projection(
    prices: &PriceSeries,
    horizon_days: usize,
    simulations: usize,
    seed: Option<u64>,
) -> AnalyticsResult<Vec<ProjectionBand>> {
    let simulator = GbmSimulator::new(simulations).with_seed(seed);
    compute_projection_with(prices, horizon_days, &simulator)
}

pub fn compute_projection_with(
    prices: &PriceSeries,
    horizon_days: usize,
    simulator: &GbmSimulator,
) -> AnalyticsResult<Vec<ProjectionBand>> {
    let params = ReturnSeries::from_prices(prices)?.distribution_parameters()?;
    // from_prices succeeded, so the series holds at least two points.
    let start_price = prices.last_price().unwrap_or_default();
    debug!(
        "Projecting {horizon_days} days from {start_price} (mu={}, sigma={})",
        params.drift, params.volatility
    );
    simulator.project(start_price, params, horizon_days)
}

pub fn compute_correlation_matrix(
    series_by_asset: &BTreeMap<String, PriceSeries>,
) -> AnalyticsResult<CorrelationMatrix> {
    CorrelationMatrix::from_price_series(series_by_asset)
}

/// Top recommendations (at most ten) for diversifying the portfolio.
pub fn compute_diversification(
    matrix: &CorrelationMatrix,
    portfolio_ids: &[String],
    candidates: &[AssetMetadata],
) -> AnalyticsResult<Vec<RankedCandidate>> {
    compute_diversification_with(matrix, portfolio_ids, candidates, DEFAULT_MAX_RESULTS)
}

pub fn compute_diversification_with(
    matrix: &CorrelationMatrix,
    portfolio_ids: &[String],
    candidates: &[AssetMetadata],
    max_results: usize,
) -> AnalyticsResult<Vec<RankedCandidate>> {
    rank_candidates(matrix, portfolio_ids, candidates, max_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::AssetType;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::from_prices(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), prices).unwrap()
    }

    #[test]
    fn test_projection_scenario_is_reproducible() {
        let prices = series(&[100.0, 105.0, 102.0, 108.0, 110.0]);
        assert_eq!(ReturnSeries::from_prices(&prices).unwrap().len(), 4);

        let first = compute_projection(&prices, 1, 5000, Some(42)).unwrap();
        let second = compute_projection(&prices, 1, 5000, Some(42)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);

        let band = first[0];
        assert_eq!(band.day, 1);
        for value in [
            band.mean_price,
            band.median_price,
            band.lower_bound,
            band.upper_bound,
        ] {
            assert!(value.is_finite() && value > 0.0);
        }
        assert!(band.std_dev > 0.0);
        assert!(band.lower_bound < band.upper_bound);
        assert!(band.lower_bound <= band.median_price && band.median_price <= band.upper_bound);
    }

    #[test]
    fn test_projection_requires_history() {
        let err = compute_projection(&series(&[100.0, 101.0]), 5, 100, Some(1)).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InsufficientData {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_projection_rejects_bad_horizon() {
        let prices = series(&[100.0, 105.0, 102.0]);
        assert!(matches!(
            compute_projection(&prices, 0, 100, None),
            Err(AnalyticsError::InvalidHorizon { .. })
        ));
        assert!(matches!(
            compute_projection(&prices, 10, 0, None),
            Err(AnalyticsError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_projection_with_custom_band() {
        let prices = series(&[100.0, 105.0, 102.0, 108.0, 110.0]);
        let narrow = GbmSimulator::new(2000)
            .with_seed(Some(5))
            .with_confidence_band(25.0, 75.0);
        let wide = GbmSimulator::new(2000).with_seed(Some(5));
        let n = compute_projection_with(&prices, 3, &narrow).unwrap();
        let w = compute_projection_with(&prices, 3, &wide).unwrap();
        for (a, b) in n.iter().zip(&w) {
            assert_eq!(a.mean_price, b.mean_price);
            assert!(a.upper_bound - a.lower_bound < b.upper_bound - b.lower_bound);
        }
    }

    #[test]
    fn test_stats() {
        let stats = compute_stats(&series(&[100.0, 110.0, 121.0])).unwrap();
        assert_eq!(stats.observations, 3);
        assert!((stats.drift - 1.1f64.ln()).abs() < 1e-12);
        assert!(stats.volatility < 1e-12);
        assert!((stats.percentage_change - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_identical_assets_and_diversification() {
        let a = [100.0, 105.0, 102.0, 108.0, 110.0];
        let mut by_asset = BTreeMap::new();
        by_asset.insert("A".to_string(), series(&a));
        by_asset.insert("B".to_string(), series(&a));
        let matrix = compute_correlation_matrix(&by_asset).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!((matrix.at(i, j).value().unwrap() - 1.0).abs() < 1e-12);
            }
        }

        let universe = vec![
            AssetMetadata {
                id: "A".to_string(),
                symbol: "AAA".to_string(),
                name: "A fund".to_string(),
                asset_type: AssetType::EquityEtf,
            },
            AssetMetadata {
                id: "B".to_string(),
                symbol: "BBB".to_string(),
                name: "B fund".to_string(),
                asset_type: AssetType::BondEtf,
            },
        ];
        let ranked = compute_diversification(&matrix, &["A".to_string()], &universe).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "B");
        assert_eq!(ranked[0].expected_improvement, 15.0);

        let all = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            compute_diversification(&matrix, &all, &universe),
            Err(AnalyticsError::EmptyCandidatePool)
        );
    }

    #[test]
    fn test_stats_sharpe_ratio() {
        let stats = compute_stats(&series(&[100.0, 104.0, 101.0, 107.0, 110.0])).unwrap();
        let expected = stats.annualized_return / stats.annualized_volatility;
        assert!((stats.sharpe_ratio.unwrap() - expected).abs() < 1e-12);

        let with_rate =
            compute_stats_with(&series(&[100.0, 104.0, 101.0, 107.0, 110.0]), 0.05).unwrap();
        assert!(with_rate.sharpe_ratio.unwrap() < stats.sharpe_ratio.unwrap());

        let flat = compute_stats(&series(&[50.0, 50.0, 50.0])).unwrap();
        assert_eq!(flat.sharpe_ratio, None);
    }

    #[test]
    fn test_portfolio_summary() {
        let mut by_asset = BTreeMap::new();
        by_asset.insert("A".to_string(), series(&[100.0, 102.0, 101.0, 110.0]));
        by_asset.insert("B".to_string(), series(&[50.0, 49.0, 52.0, 50.0]));
        let simulator = GbmSimulator::new(500).with_seed(Some(11));

        let summary = compute_portfolio_summary(&by_asset, 10, &simulator).unwrap();
        assert_eq!(summary.assets, 2);
        assert_eq!(summary.observations, 4);
        // Average price goes from 75 to 80.
        assert!((summary.net_profit - 5.0).abs() < 1e-12);
        assert!((summary.net_profit_percent - 5.0 / 75.0).abs() < 1e-12);

        let vol_a = compute_stats(&by_asset["A"]).unwrap().annualized_volatility;
        let vol_b = compute_stats(&by_asset["B"]).unwrap().annualized_volatility;
        assert!((summary.average_volatility.unwrap() - (vol_a + vol_b) / 2.0).abs() < 1e-12);

        let final_a = compute_projection_with(&by_asset["A"], 10, &simulator).unwrap()[9].mean_price;
        let final_b = compute_projection_with(&by_asset["B"], 10, &simulator).unwrap()[9].mean_price;
        let expected = (final_a + final_b) / 2.0 - 80.0;
        assert!((summary.projected_profit.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_portfolio_summary_edge_cases() {
        let simulator = GbmSimulator::new(100).with_seed(Some(1));

        let mut short = BTreeMap::new();
        short.insert("A".to_string(), series(&[100.0]));
        assert!(matches!(
            compute_portfolio_summary(&short, 5, &simulator),
            Err(AnalyticsError::InsufficientData { .. })
        ));

        // Two prices give one return: no volatility and no projection.
        let mut thin = BTreeMap::new();
        thin.insert("A".to_string(), series(&[100.0, 90.0]));
        let summary = compute_portfolio_summary(&thin, 5, &simulator).unwrap();
        assert_eq!(summary.average_volatility, None);
        assert_eq!(summary.projected_profit, None);
        assert!((summary.net_profit_percent + 0.1).abs() < 1e-12);
    }
}
