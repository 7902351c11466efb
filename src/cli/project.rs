use super::{OutputFormat, history, print_json, ui};
use crate::core::analytics;
use crate::core::asset::AssetMetadata;
use crate::core::price::{PriceHistoryProvider, PriceSeries};
use crate::core::simulation::{GbmSimulator, ProjectionBand};
use anyhow::Result;
use chrono::{Days, NaiveDate};
use comfy_table::Cell;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Longest horizon printed day by day; longer ones are sampled.
const MAX_TABLE_ROWS: usize = 15;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResult {
    id: String,
    symbol: String,
    start_date: Option<NaiveDate>,
    start_price: Option<f64>,
    bands: Vec<ProjectionBand>,
    error: Option<String>,
}

pub async fn run(
    assets: &[&AssetMetadata],
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    horizon_days: usize,
    simulator: &GbmSimulator,
    format: OutputFormat,
) -> Result<()> {
    info!(
        "Projecting {} assets over {horizon_days} days with {} simulations",
        assets.len(),
        simulator.simulations()
    );
    let histories = history::fetch_histories(provider, assets).await;
    let results = calculate_projections(assets, &histories, horizon_days, simulator);

    match format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Table => {
            for result in &results {
                display_projection(result);
            }
            Ok(())
        }
    }
}

fn calculate_projections(
    assets: &[&AssetMetadata],
    histories: &HashMap<String, Result<PriceSeries>>,
    horizon_days: usize,
    simulator: &GbmSimulator,
) -> Vec<ProjectionResult> {
    assets
        .iter()
        .map(|asset| {
            let mut result = ProjectionResult {
                id: asset.id.clone(),
                symbol: asset.symbol.clone(),
                start_date: None,
                start_price: None,
                bands: Vec::new(),
                error: None,
            };
            match histories.get(&asset.id) {
                Some(Ok(series)) => {
                    result.start_date = series.last_date();
                    result.start_price = series.last_price();
                    match analytics::compute_projection_with(series, horizon_days, simulator) {
                        Ok(bands) => result.bands = bands,
                        Err(e) => {
                            debug!("Projection for {} failed: {e}", asset.symbol);
                            result.error = Some(e.to_string());
                        }
                    }
                }
                Some(Err(e)) => result.error = Some(e.to_string()),
                None => {
                    result.error = Some(format!("History not available for {}", asset.symbol))
                }
            }
            result
        })
        .collect()
}

/// Indices of the bands shown in the table; the final day is always kept.
fn sampled_rows(len: usize) -> Vec<usize> {
    if len <= MAX_TABLE_ROWS {
        return (0..len).collect();
    }
    let step = len.div_ceil(MAX_TABLE_ROWS - 1);
    let mut rows: Vec<usize> = (0..len).step_by(step).collect();
    if rows.last() != Some(&(len - 1)) {
        rows.push(len - 1);
    }
    rows
}

fn display_projection(result: &ProjectionResult) {
    println!(
        "\nProjection: {}",
        ui::style_text(&result.symbol, ui::StyleType::Title)
    );
    if let Some(error) = &result.error {
        println!("{}", ui::style_text(error, ui::StyleType::Error));
        return;
    }
    if let (Some(date), Some(price)) = (result.start_date, result.start_price) {
        println!(
            "{}",
            ui::style_text(
                &format!("Last close {price:.2} on {date}"),
                ui::StyleType::Subtle
            )
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Day"),
        ui::header_cell("Date"),
        ui::header_cell("Mean"),
        ui::header_cell("Median"),
        ui::header_cell("Std Dev"),
        ui::header_cell("Lower"),
        ui::header_cell("Upper"),
    ]);

    for i in sampled_rows(result.bands.len()) {
        let band = &result.bands[i];
        let date = result
            .start_date
            .and_then(|d| d.checked_add_days(Days::new(band.day as u64)));
        table.add_row(vec![
            Cell::new(band.day),
            ui::format_optional_cell(date, |d| d.to_string()),
            ui::number_cell(band.mean_price, 2),
            ui::number_cell(band.median_price, 2),
            ui::number_cell(band.std_dev, 2),
            ui::number_cell(band.lower_bound, 2),
            ui::number_cell(band.upper_bound, 2),
        ]);
    }
    println!("{table}");
}
