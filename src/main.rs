use std::sync::Arc;

use tgbot_accounts::config::fetch_config;
use tgbot_accounts::{AccountsError, HttpBackend, SessionRegistry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AccountsError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;

    let telegram_id = std::env::args()
        .nth(1)
        .ok_or_else(|| AccountsError::Config("usage: tgbot-accounts <telegram_id>".to_string()))?;

    let backend = Arc::new(HttpBackend::new(&app_config.backend)?);
    let sessions = SessionRegistry::new(backend, app_config.cache);

    let manager = sessions.fetch(&telegram_id).await?;
    let account = manager.get_active_account(false).await?;
    info!(
        nickname = %account.nickname,
        public_key = %account.public_key,
        builder_fee_approved = account.is_approved_builder_fee,
        "active account"
    );

    let spot = manager.get_spot_balance_mapping(None).await?;
    info!(
        usdc = %spot.usdc_balance,
        holdings_value = %spot.stock_total_balance,
        pnl = %spot.total_pnl,
        pnl_percent = %spot.total_pnl_percent,
        "spot balance"
    );
    for holding in spot.holdings() {
        info!(
            ticker = %holding.name,
            qty = %holding.balance,
            value = %holding.value,
            pnl = %holding.pnl,
            "holding"
        );
    }

    let perp = manager.get_perp_balance_mapping(None).await?;
    info!(
        account_value = %perp.account_value,
        withdrawable = %perp.withdrawable,
        unrealized_pnl = %perp.total_unrealized_pnl,
        open_positions = perp.position.one_way.len(),
        "perp balance"
    );

    Ok(())
}
