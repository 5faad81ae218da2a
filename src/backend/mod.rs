//! Access to the remote trading backend.
//!
//! [`AccountBackend`] is the seam between the account cache and the
//! backend's HTTP API: [`HttpBackend`] talks to the real service, tests
//! plug in an in-memory implementation.

mod http;

use async_trait::async_trait;

use crate::Result;
use crate::models::account::Account;
use crate::models::perp_balance::PerpBalanceMapping;
use crate::models::spot_balance::SpotBalanceMapping;

pub use http::HttpBackend;

/// Account and balance endpoints consumed by the cache layer.
///
/// Every method is a single backend round trip; implementations do no
/// caching of their own.
#[async_trait]
pub trait AccountBackend: Send + Sync {
    /// `GET /account/all`
    async fn list_accounts(&self, telegram_id: &str) -> Result<Vec<Account>>;

    /// `GET /account/balance/spot`
    async fn spot_balance(&self, telegram_id: &str, nickname: &str)
    -> Result<SpotBalanceMapping>;

    /// `GET /account/balance/perp`
    async fn perp_balance(&self, telegram_id: &str, nickname: &str)
    -> Result<PerpBalanceMapping>;

    /// `POST /account/create_account`
    async fn create_account(&self, telegram_id: &str, nickname: &str) -> Result<Account>;

    /// `POST /account/import_account`. `None` when the backend returned no account.
    async fn import_account(
        &self,
        telegram_id: &str,
        private_key: &str,
        nickname: &str,
    ) -> Result<Option<Account>>;

    /// `POST /account/delete_account`
    async fn delete_account(&self, telegram_id: &str, nickname: &str) -> Result<()>;

    /// `POST /account/activate`. Returns the newly active account.
    async fn activate_account(&self, telegram_id: &str, nickname: &str) -> Result<Account>;

    /// `GET /account/rebalance`
    async fn rebalance_account(&self, telegram_id: &str) -> Result<Option<Account>>;

    /// `GET /account/copytrading`
    async fn copytrading_account(&self, telegram_id: &str) -> Result<Option<Account>>;

    /// `POST /account/rebalance/register`
    async fn register_rebalance_account(&self, telegram_id: &str, nickname: &str) -> Result<()>;

    /// `POST /account/copytrading/register`
    async fn register_copytrading_account(&self, telegram_id: &str, nickname: &str)
    -> Result<()>;

    /// `POST /account/approve_builder_fee`
    async fn approve_builder_fee(&self, telegram_id: &str, nickname: &str) -> Result<()>;
}
