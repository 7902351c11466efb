use super::{OutputFormat, history, print_json, ui};
use crate::core::analytics;
use crate::core::asset::AssetMetadata;
use crate::core::correlation::CorrelationMatrix;
use crate::core::price::PriceHistoryProvider;
use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapOutput<'a> {
    portfolio: &'a str,
    average_correlation: Option<f64>,
    matrix: &'a CorrelationMatrix,
}

pub async fn run(
    portfolio_name: &str,
    assets: &[&AssetMetadata],
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    format: OutputFormat,
) -> Result<()> {
    info!("Building correlation heatmap for {portfolio_name}");
    let series = history::load_aligned(provider, assets, &[]).await?;
    let ids: Vec<String> = assets.iter().map(|a| a.id.clone()).collect();
    let matrix = analytics::compute_correlation_matrix(&series)?.select(&ids);
    let average = matrix.average_pairwise();

    match format {
        OutputFormat::Json => print_json(&HeatmapOutput {
            portfolio: portfolio_name,
            average_correlation: average,
            matrix: &matrix,
        }),
        OutputFormat::Table => {
            display_heatmap(portfolio_name, assets, &matrix, average);
            Ok(())
        }
    }
}

fn display_heatmap(
    portfolio_name: &str,
    assets: &[&AssetMetadata],
    matrix: &CorrelationMatrix,
    average: Option<f64>,
) {
    let symbol = |id: &str| {
        assets
            .iter()
            .find(|a| a.id == id)
            .map_or_else(|| id.to_string(), |a| a.symbol.clone())
    };

    println!(
        "\nPortfolio: {}",
        ui::style_text(portfolio_name, ui::StyleType::Title)
    );
    let mut table = ui::new_styled_table();
    let mut header = vec![ui::header_cell("")];
    header.extend(matrix.assets().iter().map(|id| ui::header_cell(&symbol(id))));
    table.set_header(header);

    for (i, id) in matrix.assets().iter().enumerate() {
        let mut row = vec![Cell::new(symbol(id))];
        row.extend(matrix.row(i).iter().map(|c| ui::correlation_cell(*c)));
        table.add_row(row);
    }
    println!("{table}");

    println!(
        "{} {}",
        ui::style_text("Average pairwise correlation:", ui::StyleType::TotalLabel),
        match average {
            Some(v) => ui::style_text(&format!("{v:.2}"), ui::StyleType::TotalValue),
            None => ui::style_text("N/A", ui::StyleType::Subtle),
        }
    );
}
