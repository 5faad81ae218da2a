//! Shared test utilities: an in-memory backend with call counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use tgbot_accounts::config::CacheConfig;
use tgbot_accounts::models::account::Account;
use tgbot_accounts::models::perp_balance::{PerpBalanceMapping, Position, PositionDetail};
use tgbot_accounts::models::spot_balance::{SpotBalance, SpotBalanceMapping};
use tgbot_accounts::{AccountBackend, AccountManager, AccountsError, ApiError, ApiErrorKind, Result};

pub const TELEGRAM_ID: &str = "424242";

/// Builds an account with a deterministic public key.
pub fn account(nickname: &str, is_active: bool) -> Account {
    Account {
        nickname: nickname.to_string(),
        public_key: format!("0x{nickname}"),
        is_active,
        is_approved_builder_fee: false,
    }
}

fn api_error(kind: ApiErrorKind) -> AccountsError {
    AccountsError::Api(ApiError::from_kind(kind))
}

/// Call counters, one per endpoint.
#[derive(Default)]
pub struct Calls {
    pub list: AtomicUsize,
    pub spot: AtomicUsize,
    pub perp: AtomicUsize,
    pub create: AtomicUsize,
    pub import: AtomicUsize,
    pub delete: AtomicUsize,
    pub activate: AtomicUsize,
    pub register: AtomicUsize,
    pub approve: AtomicUsize,
}

impl Calls {
    pub fn spot(&self) -> usize {
        self.spot.load(Ordering::SeqCst)
    }

    pub fn perp(&self) -> usize {
        self.perp.load(Ordering::SeqCst)
    }

    pub fn list(&self) -> usize {
        self.list.load(Ordering::SeqCst)
    }

    pub fn create(&self) -> usize {
        self.create.load(Ordering::SeqCst)
    }

    pub fn import(&self) -> usize {
        self.import.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for the trading backend.
///
/// Every balance fetch returns a new snapshot stamped with a sequence
/// number (`usdc_balance` / `withdrawable`) and tagged with the owning
/// nickname (the single holding / position key), so tests can tell
/// fresh data from cached data and one wallet's data from another's.
#[derive(Default)]
pub struct MockBackend {
    accounts: Mutex<Vec<Account>>,
    rebalance: Mutex<Option<String>>,
    copytrading: Mutex<Option<String>>,
    seq: AtomicU64,
    delay_ms: AtomicU64,
    list_delay_ms: AtomicU64,
    fail_spot: AtomicBool,
    fail_perp: AtomicBool,
    pub calls: Calls,
}

impl MockBackend {
    pub fn new(accounts: Vec<Account>) -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            ..Self::default()
        })
    }

    /// Scenario A fixture: `a` active, `b` inactive.
    pub fn two_wallets() -> Arc<Self> {
        Self::new(vec![account("a", true), account("b", false)])
    }

    /// Makes every balance fetch take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes the account list answer `delay` after reading it, so the
    /// answer can be stale by the time it arrives.
    pub fn set_list_delay(&self, delay: Duration) {
        self.list_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_spot(&self, fail: bool) {
        self.fail_spot.store(fail, Ordering::SeqCst);
    }

    pub fn fail_perp(&self, fail: bool) {
        self.fail_perp.store(fail, Ordering::SeqCst);
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.lock().expect("Failed to lock mock state").clone()
    }

    /// Clears every active flag, breaking the backend's own invariant.
    pub fn deactivate_all(&self) {
        for account in self.accounts.lock().expect("Failed to lock mock state").iter_mut() {
            account.is_active = false;
        }
    }

    fn find(&self, nickname: &str) -> Result<Account> {
        self.accounts
            .lock()
            .expect("Failed to lock mock state")
            .iter()
            .find(|a| a.nickname == nickname)
            .cloned()
            .ok_or_else(|| api_error(ApiErrorKind::NoSuchAccountByNickname))
    }

    async fn balance_round_trip(&self, nickname: &str, fail: &AtomicBool) -> Result<u64> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if fail.load(Ordering::SeqCst) {
            return Err(api_error(ApiErrorKind::ServerUnavailable));
        }
        self.find(nickname)?;
        Ok(self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Nickname a mock spot snapshot was fetched for.
pub fn spot_owner(mapping: &SpotBalanceMapping) -> String {
    mapping.balances.keys().next().cloned().unwrap_or_default()
}

/// Nickname a mock perp snapshot was fetched for.
pub fn perp_owner(mapping: &PerpBalanceMapping) -> String {
    mapping.position.one_way.keys().next().cloned().unwrap_or_default()
}

fn holding(name: &str, value: Decimal) -> SpotBalance {
    SpotBalance {
        name: name.to_string(),
        balance: Decimal::ONE,
        hold: Decimal::ZERO,
        entry_notional: value,
        entry_price: value,
        price: value,
        value,
        pnl: Decimal::ZERO,
        pnl_percent: Decimal::ZERO,
    }
}

fn position(name: &str) -> PositionDetail {
    PositionDetail {
        name: name.to_string(),
        szi: Decimal::ONE,
        leverage: Decimal::from(5),
        pos_type: "cross".to_string(),
        is_long: true,
        entry_px: Decimal::from(100),
        mid_px: Decimal::from(101),
        position_value: Decimal::from(101),
        margin_used: Decimal::from(20),
        unrealized_pnl: Decimal::ONE,
        return_on_equity: Decimal::new(5, 2),
        liquidation_px: Decimal::from(80),
    }
}

#[async_trait]
impl AccountBackend for MockBackend {
    async fn list_accounts(&self, _telegram_id: &str) -> Result<Vec<Account>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts();
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(accounts)
    }

    async fn spot_balance(&self, _telegram_id: &str, nickname: &str) -> Result<SpotBalanceMapping> {
        self.calls.spot.fetch_add(1, Ordering::SeqCst);
        let seq = self.balance_round_trip(nickname, &self.fail_spot).await?;
        let value = Decimal::from(10);
        Ok(SpotBalanceMapping {
            balances: HashMap::from([(nickname.to_string(), holding(nickname, value))]),
            usdc_balance: Decimal::from(seq),
            stock_total_balance: value,
            total_pnl: Decimal::ZERO,
            total_pnl_percent: Decimal::ZERO,
        })
    }

    async fn perp_balance(&self, _telegram_id: &str, nickname: &str) -> Result<PerpBalanceMapping> {
        self.calls.perp.fetch_add(1, Ordering::SeqCst);
        let seq = self.balance_round_trip(nickname, &self.fail_perp).await?;
        Ok(PerpBalanceMapping {
            withdrawable: Decimal::from(seq),
            account_value: Decimal::from(seq + 100),
            time: seq as i64,
            position: Position {
                one_way: HashMap::from([(nickname.to_string(), position(nickname))]),
                two_way: HashMap::new(),
            },
            ..PerpBalanceMapping::default()
        })
    }

    async fn create_account(&self, _telegram_id: &str, nickname: &str) -> Result<Account> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().expect("Failed to lock mock state");
        if accounts.iter().any(|a| a.nickname == nickname) {
            return Err(api_error(ApiErrorKind::DuplicateNickname));
        }
        if accounts.len() >= 10 {
            return Err(api_error(ApiErrorKind::MaxAccountsReached));
        }
        let created = account(nickname, false);
        accounts.push(created.clone());
        Ok(created)
    }

    async fn import_account(
        &self,
        _telegram_id: &str,
        private_key: &str,
        nickname: &str,
    ) -> Result<Option<Account>> {
        self.calls.import.fetch_add(1, Ordering::SeqCst);
        match private_key {
            "invalid" => Err(api_error(ApiErrorKind::InvalidSecretKey)),
            "silent" => Ok(None),
            _ => {
                let imported = account(nickname, false);
                self.accounts.lock().expect("Failed to lock mock state").push(imported.clone());
                Ok(Some(imported))
            }
        }
    }

    async fn delete_account(&self, _telegram_id: &str, nickname: &str) -> Result<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().expect("Failed to lock mock state");
        if accounts.len() <= 1 {
            return Err(api_error(ApiErrorKind::CannotDeleteAllAccounts));
        }
        let index = accounts
            .iter()
            .position(|a| a.nickname == nickname)
            .ok_or_else(|| api_error(ApiErrorKind::NoSuchAccountByNickname))?;
        let removed = accounts.remove(index);
        if removed.is_active {
            accounts[0].is_active = true;
        }
        Ok(())
    }

    async fn activate_account(&self, _telegram_id: &str, nickname: &str) -> Result<Account> {
        self.calls.activate.fetch_add(1, Ordering::SeqCst);
        self.find(nickname)?;
        let mut accounts = self.accounts.lock().expect("Failed to lock mock state");
        for account in accounts.iter_mut() {
            account.is_active = account.nickname == nickname;
        }
        Ok(accounts
            .iter()
            .find(|a| a.nickname == nickname)
            .cloned()
            .expect("Failed to find activated account"))
    }

    async fn rebalance_account(&self, _telegram_id: &str) -> Result<Option<Account>> {
        let nickname = self.rebalance.lock().expect("Failed to lock mock state").clone();
        nickname.map(|n| self.find(&n)).transpose()
    }

    async fn copytrading_account(&self, _telegram_id: &str) -> Result<Option<Account>> {
        let nickname = self.copytrading.lock().expect("Failed to lock mock state").clone();
        nickname.map(|n| self.find(&n)).transpose()
    }

    async fn register_rebalance_account(&self, _telegram_id: &str, nickname: &str) -> Result<()> {
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        self.find(nickname)?;
        *self.rebalance.lock().expect("Failed to lock mock state") = Some(nickname.to_string());
        Ok(())
    }

    async fn register_copytrading_account(&self, _telegram_id: &str, nickname: &str) -> Result<()> {
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        let account = self.find(nickname)?;
        if account.is_active {
            return Err(api_error(ApiErrorKind::ShouldBeTradingAccount));
        }
        *self.copytrading.lock().expect("Failed to lock mock state") = Some(nickname.to_string());
        Ok(())
    }

    async fn approve_builder_fee(&self, _telegram_id: &str, nickname: &str) -> Result<()> {
        self.calls.approve.fetch_add(1, Ordering::SeqCst);
        self.find(nickname)?;
        for account in self.accounts.lock().expect("Failed to lock mock state").iter_mut() {
            if account.nickname == nickname {
                account.is_approved_builder_fee = true;
            }
        }
        Ok(())
    }
}

/// Builds a manager over `backend` with the default 10s TTL.
pub fn manager(backend: &Arc<MockBackend>) -> AccountManager {
    manager_with(backend, CacheConfig::default())
}

pub fn manager_with(backend: &Arc<MockBackend>, config: CacheConfig) -> AccountManager {
    AccountManager::with_config(TELEGRAM_ID, Arc::clone(backend) as Arc<dyn AccountBackend>, config)
}
