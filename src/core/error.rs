//! Validation failures raised by the analytics core.

use thiserror::Error;

pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid price {price} at index {index}: prices must be positive and finite")]
    InvalidPrice { index: usize, price: f64 },

    #[error("dates must be strictly increasing (violation at index {index})")]
    UnorderedDates { index: usize },

    #[error("invalid horizon: horizon_days={horizon_days}, simulations={simulations} (both must be >= 1)")]
    InvalidHorizon {
        horizon_days: usize,
        simulations: usize,
    },

    #[error("invalid distribution parameters: drift={drift}, volatility={volatility} (need finite values and volatility >= 0)")]
    InvalidParameters { drift: f64, volatility: f64 },

    #[error("invalid confidence band: lower={lower}, upper={upper} (need 0 <= lower <= 50 <= upper <= 100)")]
    InvalidConfidenceBand { lower: f64, upper: f64 },

    #[error("series for {asset} has {actual} observations, expected {expected}")]
    MisalignedSeries {
        asset: String,
        expected: usize,
        actual: usize,
    },

    #[error("volatility is zero, the Sharpe ratio is undefined")]
    ZeroVolatility,

    #[error("series for {asset} differs from the first series in its date at observation {index}")]
    MisalignedDates { asset: String, index: usize },

    #[error("group {group} has no defined correlation with the portfolio")]
    EmptyGroup { group: String },

    #[error("portfolio asset {asset} is missing from the asset universe")]
    UnknownPortfolioAsset { asset: String },

    #[error("no diversification candidates remain after excluding portfolio assets")]
    EmptyCandidatePool,
}
