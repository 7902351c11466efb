//! Pairwise Pearson correlation of log returns and the scores derived from it.
//!
//! A correlation is undefined when either series has zero variance. That case
//! is carried as [`Correlation::Undefined`] instead of `NaN` so every consumer
//! has to decide, by matching, to skip it.

use crate::core::asset::{AssetMetadata, AssetType};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::price::PriceSeries;
use crate::core::returns::{ReturnSeries, mean};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Defined(f64),
    Undefined,
}

impl Correlation {
    pub fn value(&self) -> Option<f64> {
        match self {
            Correlation::Defined(v) => Some(*v),
            Correlation::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Correlation::Defined(_))
    }
}

impl Serialize for Correlation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Pearson correlation coefficient of two equally long samples.
pub fn pearson(x: &[f64], y: &[f64]) -> Correlation {
    if x.len() != y.len() || x.len() < 2 || is_constant(x) || is_constant(y) {
        return Correlation::Undefined;
    }

    let (mx, my) = (mean(x), mean(y));
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return Correlation::Undefined;
    }

    let r = sxy / (sxx * syy).sqrt();
    Correlation::Defined(r.clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// Square, symmetric matrix of correlations keyed by asset id.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    assets: Vec<String>,
    values: Vec<Correlation>,
}

impl CorrelationMatrix {
    /// Unit diagonal, the listed pairs mirrored, everything else undefined.
    /// A `NaN` pair value stands for an undefined entry.
    #[cfg(test)]
    pub(crate) fn new_for_test(assets: &[&str], pairs: &[(&str, &str, f64)]) -> Self {
        let k = assets.len();
        let mut values = vec![Correlation::Undefined; k * k];
        for i in 0..k {
            values[i * k + i] = Correlation::Defined(1.0);
        }
        let pos = |id: &str| assets.iter().position(|a| *a == id).unwrap();
        for (a, b, v) in pairs {
            let c = if v.is_nan() {
                Correlation::Undefined
            } else {
                Correlation::Defined(*v)
            };
            let (i, j) = (pos(a), pos(b));
            values[i * k + j] = c;
            values[j * k + i] = c;
        }
        Self {
            assets: assets.iter().map(|a| a.to_string()).collect(),
            values,
        }
    }

    /// Builds the matrix from aligned price series.
    ///
    /// Every series must cover exactly the same dates; aligning them is the
    /// caller's job (see `price::align_series`).
    pub fn from_price_series(series: &BTreeMap<String, PriceSeries>) -> AnalyticsResult<Self> {
        let reference = series.values().next().map_or(&[][..], |s| s.points());
        let mut returns = Vec::with_capacity(series.len());
        for (asset, s) in series {
            if s.len() != reference.len() {
                return Err(AnalyticsError::MisalignedSeries {
                    asset: asset.clone(),
                    expected: reference.len(),
                    actual: s.len(),
                });
            }
            if let Some(index) = s
                .points()
                .iter()
                .zip(reference)
                .position(|(p, r)| p.date != r.date)
            {
                return Err(AnalyticsError::MisalignedDates {
                    asset: asset.clone(),
                    index,
                });
            }
            returns.push((asset.clone(), ReturnSeries::from_prices(s)?));
        }
        Ok(Self::from_returns(&returns))
    }

    /// Computes each unordered pair once and mirrors it.
    pub fn from_returns(returns: &[(String, ReturnSeries)]) -> Self {
        let k = returns.len();
        let mut values = vec![Correlation::Undefined; k * k];

        for i in 0..k {
            let xi = returns[i].1.values();
            values[i * k + i] = if xi.len() >= 2 && !is_constant(xi) {
                Correlation::Defined(1.0)
            } else {
                Correlation::Undefined
            };
            for j in (i + 1)..k {
                let c = pearson(xi, returns[j].1.values());
                values[i * k + j] = c;
                values[j * k + i] = c;
            }
        }
        debug!("Computed {k}x{k} correlation matrix");

        Self {
            assets: returns.iter().map(|(id, _)| id.clone()).collect(),
            values,
        }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn index_of(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    pub fn at(&self, i: usize, j: usize) -> Correlation {
        self.values[i * self.assets.len() + j]
    }

    /// Looks up a pair by id; `None` when either id is not in the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<Correlation> {
        Some(self.at(self.index_of(a)?, self.index_of(b)?))
    }

    pub fn row(&self, i: usize) -> &[Correlation] {
        let k = self.assets.len();
        &self.values[i * k..(i + 1) * k]
    }

    /// Mean of the defined entries above the diagonal.
    pub fn average_pairwise(&self) -> Option<f64> {
        let k = self.assets.len();
        let defined: Vec<f64> = (0..k)
            .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
            .filter_map(|(i, j)| self.at(i, j).value())
            .collect();
        (!defined.is_empty()).then(|| mean(&defined))
    }

    /// Re-orders (and possibly subsets) the matrix to the given ids.
    /// Ids not present in the matrix are dropped.
    pub fn select(&self, ids: &[String]) -> Self {
        let idx: Vec<(String, usize)> = ids
            .iter()
            .filter_map(|id| self.index_of(id).map(|i| (id.clone(), i)))
            .collect();
        let values = idx
            .iter()
            .flat_map(|(_, i)| idx.iter().map(move |(_, j)| (*i, *j)))
            .map(|(i, j)| self.at(i, j))
            .collect();
        Self {
            assets: idx.into_iter().map(|(id, _)| id).collect(),
            values,
        }
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Heatmap<'a> {
            labels: &'a [String],
            data: Vec<&'a [Correlation]>,
        }
        Heatmap {
            labels: &self.assets,
            data: (0..self.len()).map(|i| self.row(i)).collect(),
        }
        .serialize(serializer)
    }
}

/// Average defined correlation between `asset` and the portfolio.
pub fn average_correlation(
    matrix: &CorrelationMatrix,
    asset: &str,
    portfolio: &[String],
) -> Option<f64> {
    let defined: Vec<f64> = portfolio
        .iter()
        .filter_map(|p| match matrix.get(asset, p) {
            Some(Correlation::Defined(v)) => Some(v),
            Some(Correlation::Undefined) | None => None,
        })
        .collect();
    (!defined.is_empty()).then(|| mean(&defined))
}

/// Average correlation over every (group asset, portfolio asset) pair.
pub fn group_correlation_score(
    matrix: &CorrelationMatrix,
    group: &str,
    group_assets: &[String],
    portfolio: &[String],
) -> AnalyticsResult<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for asset in group_assets {
        for p in portfolio {
            match matrix.get(asset, p) {
                Some(Correlation::Defined(v)) => {
                    sum += v;
                    count += 1;
                }
                Some(Correlation::Undefined) => {
                    debug!("Skipping undefined correlation {asset}/{p} in group {group}");
                }
                None => {}
            }
        }
    }

    if count == 0 {
        return Err(AnalyticsError::EmptyGroup {
            group: group.to_string(),
        });
    }
    Ok(sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationGroup {
    pub id: String,
    pub name: String,
    pub asset_type: AssetType,
    pub asset_ids: Vec<String>,
    pub correlation_score: f64,
}

/// Groups the universe by asset type and scores each group against the
/// portfolio. Only types holding at least one portfolio asset are reported,
/// highest score first.
pub fn correlation_groups(
    matrix: &CorrelationMatrix,
    portfolio: &[String],
    universe: &[AssetMetadata],
) -> Vec<CorrelationGroup> {
    let mut by_type: BTreeMap<AssetType, Vec<String>> = BTreeMap::new();
    for asset in universe {
        if !asset.asset_type.is_investable() || matrix.index_of(&asset.id).is_none() {
            continue;
        }
        by_type
            .entry(asset.asset_type)
            .or_default()
            .push(asset.id.clone());
    }

    let mut groups: Vec<CorrelationGroup> = by_type
        .into_iter()
        .filter(|(_, ids)| ids.iter().any(|id| portfolio.contains(id)))
        .filter_map(|(asset_type, ids)| {
            match group_correlation_score(matrix, asset_type.group_name(), &ids, portfolio) {
                Ok(score) => Some(CorrelationGroup {
                    id: String::new(),
                    name: asset_type.group_name().to_string(),
                    asset_type,
                    asset_ids: ids,
                    correlation_score: score,
                }),
                Err(e) => {
                    debug!("Omitting group: {e}");
                    None
                }
            }
        })
        .collect();

    groups.sort_by(|a, b| b.correlation_score.total_cmp(&a.correlation_score));
    for (i, group) in groups.iter_mut().enumerate() {
        group.id = format!("group-{:03}", i + 1);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::from_prices(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), prices).unwrap()
    }

    fn map(entries: &[(&str, &[f64])]) -> BTreeMap<String, PriceSeries> {
        entries
            .iter()
            .map(|(id, prices)| (id.to_string(), series(prices)))
            .collect()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn asset(id: &str, asset_type: AssetType) -> AssetMetadata {
        AssetMetadata {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: format!("Asset {id}"),
            asset_type,
        }
    }

    const A: &[f64] = &[100.0, 105.0, 102.0, 108.0, 110.0, 107.0];
    const B: &[f64] = &[50.0, 51.0, 53.0, 52.0, 55.0, 54.0];
    const C: &[f64] = &[20.0, 19.0, 19.5, 21.0, 20.0, 22.0];

    #[test]
    fn test_pearson_self_and_negation() {
        let x = [0.01, -0.02, 0.015, 0.003, -0.007];
        let r = pearson(&x, &x).value().unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let y: Vec<f64> = x.iter().map(|v| -v + 3.0).collect();
        let r = pearson(&x, &y).value().unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance_is_undefined() {
        let x = [0.01, -0.02, 0.015];
        assert_eq!(pearson(&x, &[0.0, 0.0, 0.0]), Correlation::Undefined);
        assert_eq!(pearson(&[0.5, 0.5, 0.5], &x), Correlation::Undefined);
        assert_eq!(pearson(&[0.1], &[0.2]), Correlation::Undefined);
    }

    #[test]
    fn test_identical_series_give_unit_matrix() {
        let matrix = CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", A)])).unwrap();
        assert_eq!(matrix.assets(), ids(&["A", "B"]).as_slice());
        for i in 0..2 {
            for j in 0..2 {
                let v = matrix.at(i, j).value().unwrap();
                assert!((v - 1.0).abs() < 1e-12, "entry ({i},{j}) = {v}");
            }
        }
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", B), ("C", C)])).unwrap();
        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.at(i, i), Correlation::Defined(1.0));
            for j in 0..3 {
                assert_eq!(matrix.at(i, j), matrix.at(j, i));
                let v = matrix.at(i, j).value().unwrap();
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_inverse_prices_are_perfectly_anticorrelated() {
        let inverse: Vec<f64> = A.iter().map(|p| 10_000.0 / p).collect();
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("INV", inverse.as_slice())])).unwrap();
        let r = matrix.get("A", "INV").unwrap().value().unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_asset_is_undefined_everywhere() {
        let flat = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", B), ("F", &flat[..])]))
                .unwrap();
        assert_eq!(matrix.get("F", "F"), Some(Correlation::Undefined));
        assert_eq!(matrix.get("A", "F"), Some(Correlation::Undefined));
        assert_eq!(matrix.get("F", "B"), Some(Correlation::Undefined));
        assert!(matrix.get("A", "B").unwrap().is_defined());
        assert_eq!(matrix.get("A", "missing"), None);
    }

    #[test]
    fn test_misaligned_series_rejected() {
        let err = CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", &B[..4])]))
            .unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::MisalignedSeries {
                asset: "B".to_string(),
                expected: 6,
                actual: 4
            }
        );
    }

    #[test]
    fn test_shifted_dates_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut by_asset = map(&[("A", A)]);
        by_asset.insert(
            "B".to_string(),
            PriceSeries::from_prices(start.succ_opt().unwrap(), B).unwrap(),
        );
        let err = CorrelationMatrix::from_price_series(&by_asset).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::MisalignedDates {
                asset: "B".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_short_series_rejected() {
        let err = CorrelationMatrix::from_price_series(&map(&[("A", &[1.0][..]), ("B", &[2.0][..])]))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn test_empty_input_gives_empty_matrix() {
        let matrix = CorrelationMatrix::from_price_series(&BTreeMap::new()).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.average_pairwise(), None);
    }

    #[test]
    fn test_average_pairwise_skips_undefined() {
        let flat = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", B), ("F", &flat[..])]))
                .unwrap();
        let ab = matrix.get("A", "B").unwrap().value().unwrap();
        assert_eq!(matrix.average_pairwise(), Some(ab));
    }

    #[test]
    fn test_select_reorders() {
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", B), ("C", C)])).unwrap();
        let sub = matrix.select(&ids(&["C", "A", "nope"]));
        assert_eq!(sub.assets(), ids(&["C", "A"]).as_slice());
        assert_eq!(sub.at(0, 1), matrix.get("C", "A").unwrap());
        assert_eq!(sub.at(1, 1), Correlation::Defined(1.0));
    }

    #[test]
    fn test_group_score_skips_undefined_pairs() {
        let flat = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let matrix =
            CorrelationMatrix::from_price_series(&map(&[("A", A), ("B", B), ("F", &flat[..])]))
                .unwrap();

        let score =
            group_correlation_score(&matrix, "mixed", &ids(&["B", "F"]), &ids(&["A"])).unwrap();
        assert_eq!(score, matrix.get("A", "B").unwrap().value().unwrap());

        let err =
            group_correlation_score(&matrix, "flat", &ids(&["F"]), &ids(&["A", "B"])).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::EmptyGroup {
                group: "flat".to_string()
            }
        );
    }

    #[test]
    fn test_correlation_groups_by_type() {
        let inverse: Vec<f64> = A.iter().map(|p| 10_000.0 / p).collect();
        let matrix = CorrelationMatrix::from_price_series(&map(&[
            ("a", A),
            ("b", B),
            ("c", C),
            ("inv", inverse.as_slice()),
        ]))
        .unwrap();
        let universe = vec![
            asset("a", AssetType::EquityEtf),
            asset("b", AssetType::EquityEtf),
            asset("inv", AssetType::LeveragedEtf),
            asset("c", AssetType::BondEtf),
            asset("spx", AssetType::Index),
        ];
        let portfolio = ids(&["a", "c"]);

        let groups = correlation_groups(&matrix, &portfolio, &universe);
        assert_eq!(groups.len(), 2);

        let ac = matrix.get("a", "c").unwrap().value().unwrap();
        assert_eq!(groups[0].id, "group-001");
        assert_eq!(groups[0].name, "Bond ETFs");
        assert_eq!(groups[0].asset_ids, ids(&["c"]));
        assert!((groups[0].correlation_score - (1.0 + ac) / 2.0).abs() < 1e-12);

        assert_eq!(groups[1].id, "group-002");
        assert_eq!(groups[1].asset_type, AssetType::EquityEtf);
        assert_eq!(groups[1].asset_ids, ids(&["a", "b"]));
        assert!(groups[0].correlation_score > groups[1].correlation_score);
    }

    #[test]
    fn test_undefined_serializes_as_null() {
        let json = serde_json::to_string(&vec![
            Correlation::Defined(0.5),
            Correlation::Undefined,
        ])
        .unwrap();
        assert_eq!(json, "[0.5,null]");
    }
}
