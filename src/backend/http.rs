//! HTTP/JSON implementation of [`AccountBackend`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::AccountBackend;
use crate::Result;
use crate::config::BackendConfig;
use crate::models::ApiResponse;
use crate::models::account::Account;
use crate::models::perp_balance::PerpBalanceMapping;
use crate::models::spot_balance::SpotBalanceMapping;

/// Backend client sharing one connection pool across all users.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Builds a client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AccountsError::Tls`](crate::AccountsError::Tls) if the CA
    /// bundle cannot be loaded or the client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        if let Some(pem) = &config.ca_pem {
            builder = builder.use_preconfigured_tls(crate::tls::build_tls_config(pem)?);
        }
        let client = builder
            .build()
            .map_err(|e| crate::AccountsError::Tls(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).query(query).send().await?;
        read_envelope(path, response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read_envelope(path, response).await
    }
}

/// Reads a response body and decodes its envelope.
///
/// The backend reports business failures inside the envelope even on
/// error statuses; only a body that is not an envelope at all is treated
/// as a transport failure.
async fn read_envelope<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    match serde_json::from_slice::<ApiResponse>(&bytes) {
        Ok(envelope) => decode_envelope(path, envelope),
        Err(e) if status.is_success() => Err(e.into()),
        Err(_) => {
            warn!(path, %status, "backend returned error status without envelope");
            Err(crate::AccountsError::HttpStatus {
                path: path.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

fn decode_envelope<T: DeserializeOwned>(path: &str, envelope: ApiResponse) -> Result<T> {
    if !envelope.is_success() {
        warn!(
            path,
            code = envelope.code,
            detail = envelope.error_message.as_deref().or(envelope.message.as_deref()),
            "backend request failed"
        );
    }
    envelope.decode()
}

#[async_trait]
impl AccountBackend for HttpBackend {
    async fn list_accounts(&self, telegram_id: &str) -> Result<Vec<Account>> {
        self.get("/account/all", &[("telegram_id", telegram_id)])
            .await
    }

    async fn spot_balance(&self, telegram_id: &str, nickname: &str) -> Result<SpotBalanceMapping> {
        self.get(
            "/account/balance/spot",
            &[("telegram_id", telegram_id), ("nickname", nickname)],
        )
        .await
    }

    async fn perp_balance(&self, telegram_id: &str, nickname: &str) -> Result<PerpBalanceMapping> {
        self.get(
            "/account/balance/perp",
            &[("telegram_id", telegram_id), ("nickname", nickname)],
        )
        .await
    }

    async fn create_account(&self, telegram_id: &str, nickname: &str) -> Result<Account> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        self.post("/account/create_account", &body).await
    }

    async fn import_account(
        &self,
        telegram_id: &str,
        private_key: &str,
        nickname: &str,
    ) -> Result<Option<Account>> {
        let body = json!({
            "telegram_id": telegram_id,
            "private_key": private_key,
            "nickname": nickname,
        });
        self.post("/account/import_account", &body).await
    }

    async fn delete_account(&self, telegram_id: &str, nickname: &str) -> Result<()> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        let _: serde_json::Value = self.post("/account/delete_account", &body).await?;
        Ok(())
    }

    async fn activate_account(&self, telegram_id: &str, nickname: &str) -> Result<Account> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        self.post("/account/activate", &body).await
    }

    async fn rebalance_account(&self, telegram_id: &str) -> Result<Option<Account>> {
        self.get("/account/rebalance", &[("telegram_id", telegram_id)])
            .await
    }

    async fn copytrading_account(&self, telegram_id: &str) -> Result<Option<Account>> {
        self.get("/account/copytrading", &[("telegram_id", telegram_id)])
            .await
    }

    async fn register_rebalance_account(&self, telegram_id: &str, nickname: &str) -> Result<()> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        let _: serde_json::Value = self.post("/account/rebalance/register", &body).await?;
        Ok(())
    }

    async fn register_copytrading_account(&self, telegram_id: &str, nickname: &str) -> Result<()> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        let _: serde_json::Value = self.post("/account/copytrading/register", &body).await?;
        Ok(())
    }

    async fn approve_builder_fee(&self, telegram_id: &str, nickname: &str) -> Result<()> {
        let body = json!({ "telegram_id": telegram_id, "nickname": nickname });
        let _: serde_json::Value = self.post("/account/approve_builder_fee", &body).await?;
        Ok(())
    }
}
