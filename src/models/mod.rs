//! Typed views of the trading backend's JSON responses.
//!
//! Every endpoint wraps its payload in the same envelope
//! (`{code, data, message?, error_message?}`); [`ApiResponse`] decodes it
//! and turns non-success codes into [`ApiError`]s.
//!
//! Balance snapshots are immutable once built. Required numeric fields must
//! be present, but a present value that is not a number (or a numeric
//! string) is read as zero and logged, see [`lenient_decimal`].

pub mod account;
pub mod perp_balance;
pub mod spot_balance;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::ApiError;

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ApiResponse {
    /// Returns `true` for 2xx-equivalent envelope codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Converts the envelope into its raw payload, or the mapped business error.
    pub fn into_data(self) -> crate::Result<serde_json::Value> {
        if self.is_success() {
            return Ok(self.data);
        }
        let detail = self.error_message.or(self.message);
        Err(ApiError::from_code(self.code, detail).into())
    }

    /// Decodes the payload of a successful envelope into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> crate::Result<T> {
        let data = self.into_data()?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Deserializes a required currency field, reading unparseable values as zero.
///
/// Accepts JSON numbers and numeric strings (plain or scientific notation).
/// Anything else (`null`, booleans, garbage strings, objects) becomes
/// [`Decimal::ZERO`] with a warning, so a bad field never fails the whole
/// snapshot. Absent fields are still rejected by serde.
pub(crate) fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_decimal(&raw).unwrap_or_else(|| {
        warn!(value = %raw, "unparseable numeric value, using zero");
        Decimal::ZERO
    }))
}

fn parse_decimal(raw: &serde_json::Value) -> Option<Decimal> {
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
