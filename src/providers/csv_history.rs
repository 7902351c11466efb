use crate::core::price::{PriceHistoryProvider, PricePoint, PriceSeries};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
}

/// Reads daily closes from `<data_dir>/<SYMBOL>.csv` files with `Date` and
/// `Close` columns.
pub struct CsvHistoryProvider {
    data_dir: PathBuf,
    lookback_days: Option<i64>,
}

impl CsvHistoryProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P, lookback_days: Option<i64>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            lookback_days,
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }

    fn parse(&self, symbol: &str, content: &str) -> Result<PriceSeries> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for (line, row) in reader.deserialize::<HistoryRow>().enumerate() {
            let row = row.with_context(|| format!("Malformed row {} for {symbol}", line + 2))?;
            let (Some(date), Some(price)) = (parse_date(&row.date), row.close) else {
                debug!("Skipping row {} for {symbol}: {:?}", line + 2, row);
                continue;
            };
            points.push(PricePoint { date, price });
        }

        points.sort_by_key(|p| p.date);
        // Keep the last close reported for a day.
        points.reverse();
        points.dedup_by_key(|p| p.date);
        points.reverse();

        let series = PriceSeries::new(points)
            .map_err(|e| anyhow!("Invalid price history for {symbol}: {e}"))?;

        let series = match (self.lookback_days, series.last_date()) {
            (Some(days), Some(last)) => series.since(last - Duration::days(days)),
            _ => series,
        };
        debug!("Loaded {} prices for {symbol}", series.len());
        Ok(series)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Accept both `2024-01-31` and timestamps such as `2024-01-31 00:00:00-05:00`.
    raw.trim()
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

#[async_trait]
impl PriceHistoryProvider for CsvHistoryProvider {
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries> {
        let path = self.path_for(symbol);
        debug!("Reading price history for {symbol} from {}", path.display());

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Data file not found for symbol {symbol}: {}", path.display()))?;

        let series = self.parse(symbol, &content)?;
        if series.len() < 2 {
            warn!("Only {} usable prices for {symbol}", series.len());
        }
        Ok(series)
    }
}
