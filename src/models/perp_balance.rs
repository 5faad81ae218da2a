//! Perpetual account balance snapshot.
//!
//! Field names follow the backend's camelCase wire format.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lenient_decimal;

/// One open perpetual position.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDetail {
    pub name: String,
    /// Signed size (negative for shorts).
    #[serde(deserialize_with = "lenient_decimal")]
    pub szi: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub leverage: Decimal,
    /// Margin mode, e.g. "cross" or "isolated".
    #[serde(rename = "pos_type")]
    pub pos_type: String,
    #[serde(rename = "is_long")]
    pub is_long: bool,
    #[serde(deserialize_with = "lenient_decimal")]
    pub entry_px: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub mid_px: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub position_value: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub margin_used: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub unrealized_pnl: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub return_on_equity: Decimal,
    /// Zero when the backend reports no liquidation price.
    #[serde(deserialize_with = "lenient_decimal")]
    pub liquidation_px: Decimal,
}

/// Account-level margin totals.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    #[serde(deserialize_with = "lenient_decimal")]
    pub account_value: Decimal,
    /// Net notional of all positions.
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_ntl_pos: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_raw_usd: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_margin_used: Decimal,
}

/// Open positions grouped by position mode, keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub one_way: HashMap<String, PositionDetail>,
    /// Hedge-mode positions; currently always empty.
    #[serde(default)]
    pub two_way: HashMap<String, PositionDetail>,
}

/// Perpetual balances of one account at fetch time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpBalanceMapping {
    /// USDC that can be withdrawn right now.
    #[serde(deserialize_with = "lenient_decimal")]
    pub withdrawable: Decimal,
    /// Cash plus open position value.
    #[serde(deserialize_with = "lenient_decimal")]
    pub account_value: Decimal,
    /// Margin committed, net of unrealized PnL.
    #[serde(deserialize_with = "lenient_decimal")]
    pub invested: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_unrealized_pnl: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub pnl_percentage: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub total_margin_used: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub cross_maintenance_margin_used: Decimal,
    /// Backend query time in epoch milliseconds.
    pub time: i64,
    pub margin_summary: MarginSummary,
    pub cross_margin_summary: MarginSummary,
    #[serde(default)]
    pub position: Position,
}

impl PerpBalanceMapping {
    /// Returns the one-way position for `ticker`, if open.
    pub fn position(&self, ticker: &str) -> Option<&PositionDetail> {
        self.position.one_way.get(ticker)
    }

    /// Returns `true` if any position is open.
    pub fn has_open_positions(&self) -> bool {
        !self.position.one_way.is_empty() || !self.position.two_way.is_empty()
    }
}
