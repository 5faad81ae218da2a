//! Process-local registry of per-user account caches.
//!
//! Conversation flows obtain their user's [`AccountManager`] here instead
//! of keeping it in global state. The first fetch for a user primes the
//! cache with a forced `refresh_all`; racing first fetches share that
//! single priming call. Nothing is persisted: a restart rebuilds every
//! cache from the backend on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::info;

use crate::Result;
use crate::backend::AccountBackend;
use crate::config::CacheConfig;
use crate::manager::AccountManager;

type Slot = Arc<OnceCell<Arc<AccountManager>>>;

/// Hands out one shared [`AccountManager`] per Telegram user.
pub struct SessionRegistry {
    backend: Arc<dyn AccountBackend>,
    config: CacheConfig,
    sessions: Mutex<HashMap<String, Slot>>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn AccountBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the user's manager, creating and priming it on first use.
    ///
    /// A manager whose priming fails is not kept; the next call retries.
    pub async fn fetch(&self, telegram_id: &str) -> Result<Arc<AccountManager>> {
        let slot = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(sessions.entry(telegram_id.to_string()).or_default())
        };

        let primed = slot
            .get_or_try_init(|| async {
                let manager = Arc::new(AccountManager::with_config(
                    telegram_id,
                    Arc::clone(&self.backend),
                    self.config,
                ));
                manager
                    .refresh_all(None, true, self.config.max_age)
                    .await?;
                info!(telegram_id, "account session started");
                Ok::<_, crate::AccountsError>(manager)
            })
            .await;
        match primed {
            Ok(manager) => Ok(Arc::clone(manager)),
            Err(e) => {
                self.discard_unprimed(telegram_id, &slot);
                Err(e)
            }
        }
    }

    /// Drops a slot whose priming failed, unless another caller is still
    /// waiting on it.
    fn discard_unprimed(&self, telegram_id: &str, slot: &Slot) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = sessions.get(telegram_id)
            && Arc::ptr_eq(current, slot)
            && !current.initialized()
            && Arc::strong_count(current) == 2
        {
            sessions.remove(telegram_id);
        }
    }

    /// Returns the user's manager only if a primed session already exists.
    pub fn get(&self, telegram_id: &str) -> Option<Arc<AccountManager>> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(telegram_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Tears down the user's session. Returns `true` if one existed.
    pub fn evict(&self, telegram_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(telegram_id).is_some();
        if removed {
            info!(telegram_id, "account session ended");
        }
        removed
    }

    /// Number of users with a live or in-progress session.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
