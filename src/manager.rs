//! Per-user account and balance cache.
//!
//! [`AccountManager`] is shared by every conversation flow of one Telegram
//! user. It caches the active account and the latest spot and perp
//! balance snapshots, and coordinates refreshes so overlapping flows do
//! not hammer the backend:
//!
//! - spot and perp each have their own single-flight [`Refresher`];
//! - [`AccountManager::refresh_all`] has its own lock and fetches both
//!   resources concurrently. It does not take the per-resource locks, so it
//!   may interleave with a concurrent spot-only or perp-only refresh;
//! - wallet lifecycle operations serialize on a separate account lock.
//!
//! Account-list reads are not serialized with wallet switches. Every switch
//! bumps a generation counter, and a read only installs its result if no
//! switch happened while the list was in flight.
//!
//! A failed backend call leaves every cached value and timestamp as it was.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use crate::backend::AccountBackend;
use crate::config::CacheConfig;
use crate::error::{ApiError, ApiErrorKind};
use crate::models::account::Account;
use crate::models::perp_balance::PerpBalanceMapping;
use crate::models::spot_balance::{SpotBalance, SpotBalanceMapping};
use crate::refresh::{Refresher, bounded};
use crate::{AccountsError, Result};

/// Account whose balances `refresh_all` last fetched, and when.
struct CombinedStamp {
    owner: String,
    fetched_at: Instant,
}

/// Cached account state for one Telegram user.
pub struct AccountManager {
    telegram_id: String,
    backend: Arc<dyn AccountBackend>,
    config: CacheConfig,
    active_account: RwLock<Option<Account>>,
    /// Bumped each time a lifecycle operation installs the active account.
    active_generation: AtomicU64,
    spot: Refresher<SpotBalanceMapping>,
    perp: Refresher<PerpBalanceMapping>,
    refresh_all_lock: Mutex<Option<CombinedStamp>>,
    account_lock: Mutex<()>,
}

impl AccountManager {
    /// Creates an empty cache using the default refresh policy.
    pub fn new(telegram_id: impl Into<String>, backend: Arc<dyn AccountBackend>) -> Self {
        Self::with_config(telegram_id, backend, CacheConfig::default())
    }

    /// Creates an empty cache with an explicit refresh policy.
    pub fn with_config(
        telegram_id: impl Into<String>,
        backend: Arc<dyn AccountBackend>,
        config: CacheConfig,
    ) -> Self {
        Self {
            telegram_id: telegram_id.into(),
            backend,
            config,
            active_account: RwLock::new(None),
            active_generation: AtomicU64::new(0),
            spot: Refresher::new("spot", config.refresh_timeout),
            perp: Refresher::new("perp", config.refresh_timeout),
            refresh_all_lock: Mutex::new(None),
            account_lock: Mutex::new(()),
        }
    }

    pub fn telegram_id(&self) -> &str {
        &self.telegram_id
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Returns the active account, re-reading the account list when needed.
    ///
    /// The list is fetched when `force` is set, nothing is cached, or the
    /// cached account is no longer flagged active.
    ///
    /// # Errors
    ///
    /// [`AccountsError::NoActiveAccount`] if the backend lists no active
    /// account; backend errors are propagated unchanged.
    pub async fn get_active_account(&self, force: bool) -> Result<Account> {
        if !force && let Some(account) = self.cached_active_account().filter(|a| a.is_active) {
            return Ok(account);
        }

        self.load_active_account(false).await
    }

    /// Reads the account list and caches its active account.
    ///
    /// With `authoritative` the result is always installed and the
    /// generation bumped. Otherwise it is dropped in favour of the cached
    /// account if a lifecycle operation installed one after the list was
    /// requested.
    async fn load_active_account(&self, authoritative: bool) -> Result<Account> {
        let generation = self.active_generation.load(Ordering::Acquire);
        let accounts = self.get_all_accounts().await?;
        let found = accounts.into_iter().find(|a| a.is_active);

        {
            let mut slot = self
                .active_account
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let superseded =
                !authoritative && self.active_generation.load(Ordering::Acquire) != generation;
            if !superseded {
                if authoritative {
                    self.active_generation.fetch_add(1, Ordering::AcqRel);
                }
                *slot = found.clone();
            } else if let Some(current) = slot.clone() {
                debug!(telegram_id = %self.telegram_id, "discarding superseded account list");
                return Ok(current);
            }
        }

        found.ok_or_else(|| {
            error!(telegram_id = %self.telegram_id, "no active account");
            AccountsError::NoActiveAccount {
                telegram_id: self.telegram_id.clone(),
            }
        })
    }

    /// Fetches every account of this user. Never served from cache.
    pub async fn get_all_accounts(&self) -> Result<Vec<Account>> {
        self.backend.list_accounts(&self.telegram_id).await
    }

    /// The account registered for portfolio rebalancing, if any.
    pub async fn get_rebalance_account(&self) -> Result<Option<Account>> {
        self.backend.rebalance_account(&self.telegram_id).await
    }

    /// The account registered for copy trading, if any.
    pub async fn get_copytrading_account(&self) -> Result<Option<Account>> {
        self.backend.copytrading_account(&self.telegram_id).await
    }

    /// The cached active account, without touching the backend.
    pub fn cached_active_account(&self) -> Option<Account> {
        self.active_account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs `account` as active on behalf of a lifecycle operation.
    fn replace_active_account(&self, account: Account) {
        let mut slot = self
            .active_account
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.active_generation.fetch_add(1, Ordering::AcqRel);
        *slot = Some(account);
    }

    async fn resolve(&self, account: Option<&Account>) -> Result<Account> {
        match account {
            Some(account) => Ok(account.clone()),
            None => self.get_active_account(false).await,
        }
    }

    /// Spot balances of `account` (default: the active account), at most
    /// `max_age` old.
    pub async fn get_spot_balance_mapping(
        &self,
        account: Option<&Account>,
    ) -> Result<Arc<SpotBalanceMapping>> {
        self.refresh_spot_balance(account, false, self.config.max_age)
            .await
    }

    /// Perp balances of `account` (default: the active account), at most
    /// `max_age` old.
    pub async fn get_perp_balance_mapping(
        &self,
        account: Option<&Account>,
    ) -> Result<Arc<PerpBalanceMapping>> {
        self.refresh_perp_balance(account, false, self.config.max_age)
            .await
    }

    /// Refreshes spot balances under the spot lock.
    ///
    /// Without `force`, a snapshot of the same account younger than
    /// `max_age` is returned as-is and no backend call is made.
    pub async fn refresh_spot_balance(
        &self,
        account: Option<&Account>,
        force: bool,
        max_age: Duration,
    ) -> Result<Arc<SpotBalanceMapping>> {
        let account = self.resolve(account).await?;
        let nickname = account.nickname.as_str();
        self.spot
            .refresh(nickname, force, max_age, || {
                self.backend.spot_balance(&self.telegram_id, nickname)
            })
            .await
    }

    /// Refreshes perp balances under the perp lock. See [`Self::refresh_spot_balance`].
    pub async fn refresh_perp_balance(
        &self,
        account: Option<&Account>,
        force: bool,
        max_age: Duration,
    ) -> Result<Arc<PerpBalanceMapping>> {
        let account = self.resolve(account).await?;
        let nickname = account.nickname.as_str();
        self.perp
            .refresh(nickname, force, max_age, || {
                self.backend.perp_balance(&self.telegram_id, nickname)
            })
            .await
    }

    /// Refreshes spot and perp balances together, fetching both concurrently.
    ///
    /// Only self-exclusive: a concurrent [`Self::refresh_spot_balance`] or
    /// [`Self::refresh_perp_balance`] may run alongside. Both snapshots are
    /// written only if both fetches succeed.
    pub async fn refresh_all(
        &self,
        account: Option<&Account>,
        force: bool,
        max_age: Duration,
    ) -> Result<(Arc<SpotBalanceMapping>, Arc<PerpBalanceMapping>)> {
        let mut stamp = self.refresh_all_lock.lock().await;
        let account = self.resolve(account).await?;
        let nickname = account.nickname.as_str();

        if !force
            && let Some(last) = stamp.as_ref()
            && last.owner == nickname
            && last.fetched_at.elapsed() < max_age
            && let (Some(spot), Some(perp)) =
                (self.spot.cached_for(nickname), self.perp.cached_for(nickname))
        {
            debug!(telegram_id = %self.telegram_id, nickname, "refresh_all cache hit");
            return Ok((spot, perp));
        }

        debug!(telegram_id = %self.telegram_id, nickname, force, "refresh_all fetching");
        let started = Instant::now();
        let (spot, perp) = bounded("spot+perp", self.config.refresh_timeout, async {
            tokio::try_join!(
                self.backend.spot_balance(&self.telegram_id, nickname),
                self.backend.perp_balance(&self.telegram_id, nickname),
            )
        })
        .await?;

        let spot = self.spot.store(nickname, spot, started);
        let perp = self.perp.store(nickname, perp, started);
        *stamp = Some(CombinedStamp {
            owner: nickname.to_string(),
            fetched_at: started,
        });
        Ok((spot, perp))
    }

    /// The cached spot snapshot, without touching the backend.
    pub fn cached_spot_balance(&self) -> Option<Arc<SpotBalanceMapping>> {
        self.spot.cached()
    }

    /// The cached perp snapshot, without touching the backend.
    pub fn cached_perp_balance(&self) -> Option<Arc<PerpBalanceMapping>> {
        self.perp.cached()
    }

    pub fn spot_last_refresh_time(&self) -> Option<Instant> {
        self.spot.last_refreshed()
    }

    pub fn perp_last_refresh_time(&self) -> Option<Instant> {
        self.perp.last_refreshed()
    }

    /// Spot USDC of the active account.
    pub async fn usdc_balance(&self) -> Result<Decimal> {
        Ok(self.get_spot_balance_mapping(None).await?.usdc_balance)
    }

    /// Spot holdings of the active account, largest position first.
    pub async fn spot_holdings(&self) -> Result<Vec<SpotBalance>> {
        Ok(self.get_spot_balance_mapping(None).await?.holdings())
    }

    /// Creates a new wallet named `nickname`.
    ///
    /// # Errors
    ///
    /// `DuplicateNickname` if the user already has an account with that
    /// name; the backend is not asked to create anything in that case.
    pub async fn create_wallet(&self, nickname: &str) -> Result<Account> {
        let _guard = self.account_lock.lock().await;
        self.ensure_nickname_available(nickname).await?;

        let account = self
            .backend
            .create_account(&self.telegram_id, nickname)
            .await?;
        info!(telegram_id = %self.telegram_id, nickname, "created wallet");
        Ok(account)
    }

    /// Imports an existing wallet from its private key.
    ///
    /// # Errors
    ///
    /// `DuplicateNickname` as for [`Self::create_wallet`];
    /// [`AccountsError::ImportFailed`] if the backend returns no account.
    pub async fn import_wallet(
        &self,
        private_key: Zeroizing<String>,
        nickname: &str,
    ) -> Result<Account> {
        let _guard = self.account_lock.lock().await;
        self.ensure_nickname_available(nickname).await?;

        let account = self
            .backend
            .import_account(&self.telegram_id, &private_key, nickname)
            .await?
            .ok_or_else(|| {
                AccountsError::ImportFailed(format!("backend returned no account for {nickname}"))
            })?;
        info!(telegram_id = %self.telegram_id, nickname, "imported wallet");
        Ok(account)
    }

    /// Makes `nickname` the active wallet and reloads its balances.
    ///
    /// Both balance snapshots are force-refreshed before returning, so no
    /// caller sees the previous wallet's balances under the new identity.
    pub async fn change_wallet(&self, nickname: &str) -> Result<Account> {
        let _guard = self.account_lock.lock().await;

        let account = self
            .backend
            .activate_account(&self.telegram_id, nickname)
            .await?;
        let previous = self.cached_active_account().map(|a| a.nickname);
        self.replace_active_account(account.clone());
        info!(
            telegram_id = %self.telegram_id,
            previous = previous.as_deref().unwrap_or("-"),
            current = %account.nickname,
            "switched active wallet"
        );

        self.refresh_all(Some(&account), true, self.config.max_age)
            .await?;
        Ok(account)
    }

    /// Deletes `nickname`, then re-reads the active account and its balances.
    ///
    /// The backend may promote another wallet to active, so the account list
    /// is always re-fetched afterwards.
    pub async fn delete_wallet(&self, nickname: &str) -> Result<Account> {
        let _guard = self.account_lock.lock().await;

        self.backend
            .delete_account(&self.telegram_id, nickname)
            .await?;
        info!(telegram_id = %self.telegram_id, nickname, "deleted wallet");

        let active = self.load_active_account(true).await?;
        self.refresh_all(Some(&active), true, self.config.max_age)
            .await?;
        Ok(active)
    }

    /// Registers `nickname` as the rebalancing wallet.
    pub async fn change_rebalance_account(&self, nickname: &str) -> Result<()> {
        let _guard = self.account_lock.lock().await;
        self.backend
            .register_rebalance_account(&self.telegram_id, nickname)
            .await
    }

    /// Registers `nickname` as the copy-trading wallet.
    pub async fn change_copytrading_account(&self, nickname: &str) -> Result<()> {
        let _guard = self.account_lock.lock().await;
        self.backend
            .register_copytrading_account(&self.telegram_id, nickname)
            .await
    }

    /// Approves the builder fee for `nickname`.
    ///
    /// If that is the cached active wallet, the active account is re-read so
    /// its `is_approved_builder_fee` flag is current.
    pub async fn approve_builder_fee(&self, nickname: &str) -> Result<()> {
        let _guard = self.account_lock.lock().await;
        self.backend
            .approve_builder_fee(&self.telegram_id, nickname)
            .await?;

        let is_active = self
            .cached_active_account()
            .is_some_and(|a| a.nickname == nickname);
        if is_active {
            self.get_active_account(true).await?;
        }
        Ok(())
    }

    async fn ensure_nickname_available(&self, nickname: &str) -> Result<()> {
        let accounts = self.get_all_accounts().await?;
        if accounts.iter().any(|a| a.nickname == nickname) {
            return Err(ApiError {
                kind: ApiErrorKind::DuplicateNickname,
                code: ApiErrorKind::DuplicateNickname.code(),
                message: Some(format!("nickname {nickname} already exists")),
            }
            .into());
        }
        Ok(())
    }
}
