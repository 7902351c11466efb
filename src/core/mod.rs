//! Analytics core: return statistics, GBM projection, correlation and
//! diversification scoring, plus the configuration and logging they run under.

pub mod analytics;
pub mod asset;
pub mod config;
pub mod correlation;
pub mod diversification;
pub mod error;
pub mod log;
pub mod price;
pub mod returns;
pub mod simulation;

// Re-export main types for cleaner imports
pub use asset::{AssetMetadata, AssetType};
pub use correlation::{Correlation, CorrelationGroup, CorrelationMatrix};
pub use diversification::RankedCandidate;
pub use error::{AnalyticsError, AnalyticsResult};
pub use price::{PriceHistoryProvider, PricePoint, PriceSeries};
pub use returns::{DistributionParameters, ReturnSeries};
pub use simulation::{GbmSimulator, ProjectionBand};
