use super::ui;
use crate::core::asset::AssetMetadata;
use crate::core::price::{
    MIN_OVERLAP_PERIODS, PriceHistoryProvider, PriceSeries, align_series, align_with_optional,
};
use anyhow::{Context, Result, bail};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Fetches the history of every asset concurrently, keyed by asset id.
pub async fn fetch_histories(
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    assets: &[&AssetMetadata],
) -> HashMap<String, Result<PriceSeries>> {
    let pb = ui::new_progress_bar(assets.len() as u64, true);
    pb.set_message("Loading price history...");

    let futures = assets.iter().map(|asset| {
        let pb_clone = pb.clone();
        async move {
            let res = provider.fetch_history(&asset.symbol).await;
            pb_clone.inc(1);
            (asset.id.clone(), res)
        }
    });

    let results = join_all(futures).await.into_iter().collect();
    pb.finish_and_clear();
    results
}

/// Loads and aligns the histories needed for a correlation matrix.
///
/// Every `required` asset must load and the required assets must share at
/// least two dates. An `optional` asset is left out with a warning when its
/// history cannot be read or when admitting it would leave fewer than
/// [`MIN_OVERLAP_PERIODS`] common dates.
pub async fn load_aligned(
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    required: &[&AssetMetadata],
    optional: &[&AssetMetadata],
) -> Result<BTreeMap<String, PriceSeries>> {
    let all: Vec<&AssetMetadata> = required.iter().chain(optional).copied().collect();
    let mut fetched = fetch_histories(provider, &all).await;

    let mut held = BTreeMap::new();
    for asset in required {
        let history = fetched
            .remove(&asset.id)
            .context("History fetch result missing")?
            .with_context(|| format!("Failed to load history for {}", asset.symbol))?;
        held.insert(asset.id.clone(), history);
    }

    let common = align_series(&held).values().next().map_or(0, PriceSeries::len);
    if !held.is_empty() && common < 2 {
        let symbols: Vec<&str> = required.iter().map(|a| a.symbol.as_str()).collect();
        bail!(
            "Price histories of {} share only {common} dates",
            symbols.join(", ")
        );
    }

    let mut candidates = Vec::new();
    for asset in optional {
        match fetched.remove(&asset.id) {
            Some(Ok(history)) => candidates.push((asset.id.clone(), history)),
            Some(Err(e)) => warn!("Skipping {}: {e}", asset.symbol),
            None => debug!("{} already loaded", asset.symbol),
        }
    }

    let (aligned, dropped) = align_with_optional(&held, &candidates, MIN_OVERLAP_PERIODS);
    for id in dropped {
        let symbol = optional
            .iter()
            .find(|a| a.id == id)
            .map_or(id.as_str(), |a| a.symbol.as_str());
        warn!(
            "Skipping {symbol}: fewer than {MIN_OVERLAP_PERIODS} dates in common with the other assets"
        );
    }
    Ok(aligned)
}

/// Splits the universe into the portfolio's assets, in portfolio order, and
/// the investable assets outside it.
pub fn split_universe<'a>(
    portfolio_ids: &[String],
    universe: &'a [AssetMetadata],
) -> (Vec<&'a AssetMetadata>, Vec<&'a AssetMetadata>) {
    let held = portfolio_ids
        .iter()
        .filter_map(|id| universe.iter().find(|a| &a.id == id))
        .collect();
    let others = universe
        .iter()
        .filter(|a| a.asset_type.is_investable() && !portfolio_ids.contains(&a.id))
        .collect();
    (held, others)
}
