use super::{OutputFormat, history, print_json, ui};
use crate::core::analytics;
use crate::core::asset::AssetMetadata;
use crate::core::diversification::RankedCandidate;
use crate::core::price::PriceHistoryProvider;
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::info;

pub async fn run(
    portfolio_name: &str,
    portfolio_ids: &[String],
    universe: &[AssetMetadata],
    provider: &(dyn PriceHistoryProvider + Send + Sync),
    max_results: usize,
    format: OutputFormat,
) -> Result<()> {
    let (held, others) = history::split_universe(portfolio_ids, universe);
    info!(
        "Ranking {} candidates against {portfolio_name}",
        others.len()
    );
    let series = history::load_aligned(provider, &held, &others).await?;
    let matrix = analytics::compute_correlation_matrix(&series)?;

    // Holdings plus the candidates whose history loaded.
    let scorable: Vec<AssetMetadata> = universe
        .iter()
        .filter(|a| {
            (a.asset_type.is_investable() || portfolio_ids.contains(&a.id))
                && series.contains_key(&a.id)
        })
        .cloned()
        .collect();
    let ranked = analytics::compute_diversification_with(
        &matrix,
        portfolio_ids,
        &scorable,
        max_results,
    )
    .with_context(|| format!("Cannot diversify portfolio {portfolio_name}"))?;

    match format {
        OutputFormat::Json => print_json(&ranked),
        OutputFormat::Table => {
            display_candidates(portfolio_name, &ranked);
            Ok(())
        }
    }
}

fn display_candidates(portfolio_name: &str, ranked: &[RankedCandidate]) {
    println!(
        "\nDiversification candidates for {}",
        ui::style_text(portfolio_name, ui::StyleType::Title)
    );
    if ranked.is_empty() {
        println!("No candidate has a defined correlation with this portfolio.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Type"),
        ui::header_cell("Avg Correlation"),
        ui::header_cell("Score"),
        ui::header_cell("Reason"),
    ]);
    for candidate in ranked {
        table.add_row(vec![
            Cell::new(&candidate.symbol),
            Cell::new(&candidate.name),
            Cell::new(candidate.asset_type),
            ui::number_cell(candidate.correlation_score, 2),
            ui::number_cell(candidate.expected_improvement, 0),
            Cell::new(&candidate.reason),
        ]);
    }
    println!("{table}");
}
