//! Wallet account as tracked by the backend.

use serde::{Deserialize, Serialize};

/// One of a user's wallets.
///
/// The backend guarantees exactly one account per user has
/// `is_active = true`; this crate only mirrors that flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    /// User-chosen label, unique among one user's accounts.
    pub nickname: String,
    /// On-chain address.
    pub public_key: String,
    pub is_active: bool,
    /// Whether the builder fee has been approved (gates most trading features).
    #[serde(default)]
    pub is_approved_builder_fee: bool,
}
