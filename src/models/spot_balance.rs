//! Spot wallet balance snapshot.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lenient_decimal;

/// Holding of a single spot asset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpotBalance {
    /// Ticker (e.g. "HYPE").
    #[serde(rename = "Name")]
    pub name: String,
    /// Quantity held.
    #[serde(rename = "Balance", deserialize_with = "lenient_decimal")]
    pub balance: Decimal,
    /// Quantity locked in open orders.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub hold: Decimal,
    /// Notional paid on entry.
    #[serde(rename = "entryNtl", deserialize_with = "lenient_decimal")]
    pub entry_notional: Decimal,
    #[serde(rename = "EntryPrice", deserialize_with = "lenient_decimal")]
    pub entry_price: Decimal,
    /// Current mark price.
    #[serde(rename = "Price", deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    /// `balance * price` as computed by the backend.
    #[serde(rename = "Value", deserialize_with = "lenient_decimal")]
    pub value: Decimal,
    #[serde(rename = "PNL", deserialize_with = "lenient_decimal")]
    pub pnl: Decimal,
    #[serde(rename = "PNL_percent", deserialize_with = "lenient_decimal")]
    pub pnl_percent: Decimal,
}

/// All spot balances of one account at fetch time.
///
/// `stock_total_balance` is the backend's sum of every [`SpotBalance::value`];
/// it is carried as-is and never recomputed here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpotBalanceMapping {
    /// Holdings keyed by ticker.
    #[serde(default)]
    pub balances: HashMap<String, SpotBalance>,
    #[serde(deserialize_with = "lenient_decimal")]
    pub usdc_balance: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub stock_total_balance: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_pnl: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_pnl_percent: Decimal,
}

impl SpotBalanceMapping {
    /// Holdings ordered by value, largest first.
    pub fn holdings(&self) -> Vec<SpotBalance> {
        let mut holdings: Vec<SpotBalance> = self.balances.values().cloned().collect();
        holdings.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
        holdings
    }
}
