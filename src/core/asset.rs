use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AssetType {
    EquityEtf,
    BondEtf,
    CommodityEtf,
    CryptoEtf,
    LeveragedEtf,
    ClosedEndFund,
    Index,
    Other,
}

impl From<&str> for AssetType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "equity_etf" => AssetType::EquityEtf,
            "bond_etf" => AssetType::BondEtf,
            "commodity_etf" => AssetType::CommodityEtf,
            "crypto_etf" => AssetType::CryptoEtf,
            "leveraged_etf" => AssetType::LeveragedEtf,
            "closed_end_fund" => AssetType::ClosedEndFund,
            "index" => AssetType::Index,
            _ => AssetType::Other,
        }
    }
}

impl From<String> for AssetType {
    fn from(s: String) -> Self {
        AssetType::from(s.as_str())
    }
}

impl AssetType {
    /// Plural name used for groups of this type.
    pub fn group_name(&self) -> &'static str {
        match self {
            AssetType::EquityEtf => "Equity ETFs",
            AssetType::BondEtf => "Bond ETFs",
            AssetType::CommodityEtf => "Commodity ETFs",
            AssetType::CryptoEtf => "Crypto ETFs",
            AssetType::LeveragedEtf => "Leveraged ETFs",
            AssetType::ClosedEndFund => "Closed-End Funds",
            AssetType::Index => "Indices",
            AssetType::Other => "Other",
        }
    }

    /// Indices are benchmarks and cannot be held.
    pub fn is_investable(&self) -> bool {
        !matches!(self, AssetType::Index)
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AssetType::EquityEtf => "equity etf",
                AssetType::BondEtf => "bond etf",
                AssetType::CommodityEtf => "commodity etf",
                AssetType::CryptoEtf => "crypto etf",
                AssetType::LeveragedEtf => "leveraged etf",
                AssetType::ClosedEndFund => "closed end fund",
                AssetType::Index => "index",
                AssetType::Other => "other",
            }
        )
    }
}

/// Descriptive data about an asset, supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}
