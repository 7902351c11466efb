//! Price history abstractions and core types

use crate::core::error::{AnalyticsError, AnalyticsResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily closing prices for one asset, ordered by date.
///
/// Construction validates that every price is positive and finite and that
/// dates are strictly increasing, so downstream log-return math never sees a
/// zero, a negative price or a duplicated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> AnalyticsResult<Self> {
        for (index, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(AnalyticsError::InvalidPrice {
                    index,
                    price: point.price,
                });
            }
            if index > 0 && points[index - 1].date >= point.date {
                return Err(AnalyticsError::UnorderedDates { index });
            }
        }
        Ok(Self { points })
    }

    /// Builds a series from bare prices on consecutive days starting at `start`.
    pub fn from_prices(start: NaiveDate, prices: &[f64]) -> AnalyticsResult<Self> {
        let points = prices
            .iter()
            .zip(start.iter_days())
            .map(|(&price, date)| PricePoint { date, price })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.points.last().map(|p| p.price)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Relative change from the first to the last observation.
    pub fn percentage_change(&self) -> AnalyticsResult<f64> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 2 => {
                Ok((last.price - first.price) / first.price)
            }
            _ => Err(AnalyticsError::InsufficientData {
                required: 2,
                actual: self.points.len(),
            }),
        }
    }

    /// Keeps the observations dated on or after `cutoff`.
    pub fn since(&self, cutoff: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= cutoff)
                .copied()
                .collect(),
        }
    }

    fn dates(&self) -> BTreeSet<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    fn restricted_to(&self, dates: &BTreeSet<NaiveDate>) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| dates.contains(&p.date))
                .copied()
                .collect(),
        }
    }
}

/// Fewest common observations an optional series may leave behind when it is
/// admitted by [`align_with_optional`].
pub const MIN_OVERLAP_PERIODS: usize = 5;

/// Truncates every series to the dates that all of them share.
///
/// The correlation engine expects aligned inputs; this is the helper callers
/// use to establish that precondition.
pub fn align_series(series: &BTreeMap<String, PriceSeries>) -> BTreeMap<String, PriceSeries> {
    align_with_optional(series, &[], 0).0
}

/// Aligns the `required` series on their common dates, then admits each
/// `optional` series in order as long as at least `min_periods` common dates
/// remain. Returns the aligned series and the ids of the optional series left
/// out.
pub fn align_with_optional(
    required: &BTreeMap<String, PriceSeries>,
    optional: &[(String, PriceSeries)],
    min_periods: usize,
) -> (BTreeMap<String, PriceSeries>, Vec<String>) {
    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for s in required.values() {
        let dates = s.dates();
        common = Some(match common {
            Some(c) => c.intersection(&dates).copied().collect(),
            None => dates,
        });
    }

    let mut admitted: Vec<(&String, &PriceSeries)> = required.iter().collect();
    let mut dropped = Vec::new();
    for (id, s) in optional {
        let dates = s.dates();
        let narrowed: BTreeSet<NaiveDate> = match &common {
            Some(c) => c.intersection(&dates).copied().collect(),
            None => dates,
        };
        if narrowed.len() < min_periods {
            debug!(
                "{id} shares {} dates with the aligned set, need {min_periods}",
                narrowed.len()
            );
            dropped.push(id.clone());
            continue;
        }
        common = Some(narrowed);
        admitted.push((id, s));
    }

    let common = common.unwrap_or_default();
    debug!(
        "Aligned {} series on {} common dates ({} dropped)",
        admitted.len(),
        common.len(),
        dropped.len()
    );
    let aligned = admitted
        .into_iter()
        .map(|(id, s)| (id.clone(), s.restricted_to(&common)))
        .collect();
    (aligned, dropped)
}

#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn fetch_history(&self, symbol: &str) -> anyhow::Result<PriceSeries>;
}
