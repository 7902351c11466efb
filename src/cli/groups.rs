use super::{OutputFormat, history, print_json, ui};
use crate::core::analytics;
use crate::core::asset::AssetMetadata;
use crate::core::correlation::{CorrelationGroup, correlation_groups};
use crate::core::price::PriceHistoryProvider;
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

pub async fn run(
    portfolio_name: &str,
    portfolio_ids: &[String],
    universe: &[AssetMetadata],
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    format: OutputFormat,
) -> Result<()> {
    let (held, others) = history::split_universe(portfolio_ids, universe);
    info!(
        "Scoring correlation groups for {portfolio_name} ({} held, {} others)",
        held.len(),
        others.len()
    );
    let series = history::load_aligned(provider, &held, &others).await?;
    let matrix = analytics::compute_correlation_matrix(&series)?;
    let groups = correlation_groups(&matrix, portfolio_ids, universe);

    match format {
        OutputFormat::Json => print_json(&groups),
        OutputFormat::Table => {
            display_groups(portfolio_name, &groups, universe);
            Ok(())
        }
    }
}

fn display_groups(portfolio_name: &str, groups: &[CorrelationGroup], universe: &[AssetMetadata]) {
    println!(
        "\nPortfolio: {}",
        ui::style_text(portfolio_name, ui::StyleType::Title)
    );
    if groups.is_empty() {
        println!("No correlation groups could be scored.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Group"),
        ui::header_cell("Assets"),
        ui::header_cell("Avg Correlation"),
    ]);
    for group in groups {
        let symbols: Vec<&str> = group
            .asset_ids
            .iter()
            .map(|id| {
                universe
                    .iter()
                    .find(|a| &a.id == id)
                    .map_or(id.as_str(), |a| a.symbol.as_str())
            })
            .collect();
        table.add_row(vec![
            Cell::new(&group.name),
            Cell::new(symbols.join(", ")),
            ui::number_cell(group.correlation_score, 2),
        ]);
    }
    println!("{table}");
}
