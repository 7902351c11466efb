//! Ranks assets outside the portfolio by how much they would diversify it.

use crate::core::asset::{AssetMetadata, AssetType};
use crate::core::correlation::{CorrelationMatrix, average_correlation};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_MAX_RESULTS: usize = 10;

const DIFFERENT_TYPE_BONUS: f64 = 15.0;

/// (exclusive upper bound on average correlation, bonus, reason)
const CORRELATION_TIERS: [(f64, f64, &str); 3] = [
    (
        0.3,
        20.0,
        "very low correlation with current portfolio provides strong diversification",
    ),
    (
        0.5,
        12.0,
        "low correlation with current portfolio improves diversification",
    ),
    (
        0.7,
        5.0,
        "moderate correlation provides some diversification benefit",
    ),
];
const HIGH_CORRELATION_REASON: &str = "high correlation with current portfolio adds little diversification";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    /// Average correlation with the portfolio's assets.
    pub correlation_score: f64,
    pub expected_improvement: f64,
    pub reason: String,
}

/// Additive improvement score and the reason text for one candidate.
pub fn score_candidate(
    average_correlation: f64,
    asset_type: AssetType,
    portfolio_types: &HashSet<AssetType>,
) -> (f64, String) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if !portfolio_types.contains(&asset_type) {
        score += DIFFERENT_TYPE_BONUS;
        reasons.push(format!("Different asset class ({asset_type})"));
    }

    match CORRELATION_TIERS
        .iter()
        .find(|(bound, _, _)| average_correlation < *bound)
    {
        Some((_, bonus, reason)) => {
            score += bonus;
            reasons.push(reason.to_string());
        }
        None => reasons.push(HIGH_CORRELATION_REASON.to_string()),
    }

    (score, reasons.join(", "))
}

/// Scores every universe asset not already held and returns the best
/// `max_results`, ordered by score then by ascending correlation.
///
/// The universe must describe every portfolio asset, since their types decide
/// the asset-class bonus. Candidates with no defined correlation to any
/// portfolio asset cannot be scored and are left out.
pub fn rank_candidates(
    matrix: &CorrelationMatrix,
    portfolio: &[String],
    universe: &[AssetMetadata],
    max_results: usize,
) -> AnalyticsResult<Vec<RankedCandidate>> {
    let mut portfolio_types = HashSet::new();
    for id in portfolio {
        let asset = universe.iter().find(|a| &a.id == id).ok_or_else(|| {
            AnalyticsError::UnknownPortfolioAsset { asset: id.clone() }
        })?;
        portfolio_types.insert(asset.asset_type);
    }

    let candidates: Vec<&AssetMetadata> = universe
        .iter()
        .filter(|a| !portfolio.contains(&a.id))
        .collect();
    if candidates.is_empty() {
        return Err(AnalyticsError::EmptyCandidatePool);
    }

    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|asset| {
            let Some(avg) = average_correlation(matrix, &asset.id, portfolio) else {
                debug!(
                    "No defined correlation between {} and the portfolio, skipping",
                    asset.id
                );
                return None;
            };
            let (score, reason) = score_candidate(avg, asset.asset_type, &portfolio_types);
            Some(RankedCandidate {
                id: asset.id.clone(),
                symbol: asset.symbol.clone(),
                name: asset.name.clone(),
                asset_type: asset.asset_type,
                correlation_score: avg,
                expected_improvement: score,
                reason,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.expected_improvement
            .total_cmp(&a.expected_improvement)
            .then(a.correlation_score.total_cmp(&b.correlation_score))
    });
    ranked.truncate(max_results);
    debug!("Ranked {} diversification candidates", ranked.len());
    Ok(ranked)
}
