use super::{OutputFormat, history, print_json, ui};
use crate::core::analytics::{self, AssetStats, PortfolioSummary};
use crate::core::asset::AssetMetadata;
use crate::core::price::{PriceHistoryProvider, PriceSeries};
use crate::core::simulation::GbmSimulator;
use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResult {
    id: String,
    symbol: String,
    stats: Option<AssetStats>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    assets: Vec<StatsResult>,
    portfolio: Option<PortfolioSummary>,
}

pub async fn run(
    assets: &[&AssetMetadata],
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    risk_free_rate: f64,
    horizon_days: usize,
    simulator: &GbmSimulator,
    format: OutputFormat,
) -> Result<()> {
    info!("Computing statistics for {} assets", assets.len());
    let histories = history::fetch_histories(provider, assets).await;
    let report = StatsReport {
        assets: calculate_stats(assets, &histories, risk_free_rate),
        portfolio: calculate_summary(&histories, horizon_days, simulator),
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            display_results(&report.assets);
            if let Some(summary) = &report.portfolio {
                display_summary(summary);
            }
            Ok(())
        }
    }
}

fn calculate_stats(
    assets: &[&AssetMetadata],
    histories: &HashMap<String, Result<PriceSeries>>,
    risk_free_rate: f64,
) -> Vec<StatsResult> {
    assets
        .iter()
        .map(|asset| {
            let outcome = match histories.get(&asset.id) {
                Some(Ok(series)) => analytics::compute_stats_with(series, risk_free_rate)
                    .map_err(|e| e.to_string()),
                Some(Err(e)) => Err(e.to_string()),
                None => Err(format!("History not available for {}", asset.symbol)),
            };
            if let Err(e) = &outcome {
                debug!("Stats for {} failed: {e}", asset.symbol);
            }
            StatsResult {
                id: asset.id.clone(),
                symbol: asset.symbol.clone(),
                stats: outcome.as_ref().ok().copied(),
                error: outcome.err(),
            }
        })
        .collect()
}

/// Summary over the assets whose history loaded.
fn calculate_summary(
    histories: &HashMap<String, Result<PriceSeries>>,
    horizon_days: usize,
    simulator: &GbmSimulator,
) -> Option<PortfolioSummary> {
    let loaded: BTreeMap<String, PriceSeries> = histories
        .iter()
        .filter_map(|(id, res)| res.as_ref().ok().map(|s| (id.clone(), s.clone())))
        .collect();
    match analytics::compute_portfolio_summary(&loaded, horizon_days, simulator) {
        Ok(summary) => Some(summary),
        Err(e) => {
            debug!("No portfolio summary: {e}");
            None
        }
    }
}

fn display_results(results: &[StatsResult]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Days"),
        ui::header_cell("Drift (%/day)"),
        ui::header_cell("Volatility (%/day)"),
        ui::header_cell("Volatility (%/yr)"),
        ui::header_cell("Sharpe"),
        ui::header_cell("Change (%)"),
    ]);

    for result in results {
        let mut row = vec![Cell::new(&result.symbol)];
        match &result.stats {
            Some(stats) => {
                row.push(ui::number_cell(stats.observations as f64, 0));
                row.push(ui::number_cell(stats.drift * 100.0, 3));
                row.push(ui::number_cell(stats.volatility * 100.0, 3));
                row.push(ui::number_cell(stats.annualized_volatility * 100.0, 2));
                row.push(ui::format_optional_cell(stats.sharpe_ratio, |v| format!("{v:.2}")));
                row.push(ui::change_cell(stats.percentage_change * 100.0));
            }
            None => row.extend((0..6).map(|_| ui::na_cell(true))),
        }
        table.add_row(row);
    }

    println!("{table}");
    for result in results {
        if let Some(error) = &result.error {
            println!(
                "{}",
                ui::style_text(&format!("{}: {error}", result.symbol), ui::StyleType::Error)
            );
        }
    }
}

fn display_summary(summary: &PortfolioSummary) {
    let line = |label: &str, value: String| {
        println!(
            "{} {}",
            ui::style_text(label, ui::StyleType::TotalLabel),
            ui::style_text(&value, ui::StyleType::TotalValue)
        );
    };
    let or_na = |value: Option<f64>, scale: f64, suffix: &str| {
        value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}{suffix}", v * scale))
    };

    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Portfolio ({} assets, {} common days)",
                summary.assets, summary.observations
            ),
            ui::StyleType::Title
        )
    );
    line(
        "Average volatility:",
        or_na(summary.average_volatility, 100.0, "%"),
    );
    line(
        "Net profit:",
        format!(
            "{:.2} ({:.2}%)",
            summary.net_profit,
            summary.net_profit_percent * 100.0
        ),
    );
    line(
        &format!("Projected profit ({} days):", summary.horizon_days),
        or_na(summary.projected_profit, 1.0, ""),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::AssetType;
    use anyhow::anyhow;
    use chrono::NaiveDate;

    fn asset(id: &str) -> AssetMetadata {
        AssetMetadata {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: id.to_string(),
            asset_type: AssetType::EquityEtf,
        }
    }

    fn histories() -> HashMap<String, Result<PriceSeries>> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut histories = HashMap::new();
        histories.insert(
            "g".to_string(),
            Ok(PriceSeries::from_prices(start, &[10.0, 11.0, 10.5]).unwrap()),
        );
        histories.insert(
            "s".to_string(),
            Ok(PriceSeries::from_prices(start, &[10.0, 11.0]).unwrap()),
        );
        histories.insert("f".to_string(), Err(anyhow!("disk on fire")));
        histories
    }

    #[test]
    fn test_calculate_stats_reports_errors_per_asset() {
        let (good, short, missing, failed) = (asset("g"), asset("s"), asset("m"), asset("f"));

        let results = calculate_stats(&[&good, &short, &missing, &failed], &histories(), 0.0);
        assert_eq!(results.len(), 4);
        assert!(results[0].stats.is_some());
        assert!(results[0].stats.unwrap().sharpe_ratio.is_some());
        assert!(results[0].error.is_none());
        assert!(results[1].error.as_deref().unwrap().contains("insufficient data"));
        assert_eq!(
            results[2].error.as_deref(),
            Some("History not available for M")
        );
        assert_eq!(results[3].error.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn test_summary_uses_loaded_histories() {
        let simulator = GbmSimulator::new(50).with_seed(Some(3));
        let summary = calculate_summary(&histories(), 5, &simulator).unwrap();
        assert_eq!(summary.assets, 2);
        assert_eq!(summary.observations, 2);
        // Only "g" has enough history to be projected.
        assert_eq!(summary.projected_profit, None);
        assert!((summary.net_profit - 1.0).abs() < 1e-12);

        assert!(calculate_summary(&HashMap::new(), 5, &simulator).is_none());
    }
}
