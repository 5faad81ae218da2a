//! Crate-level error types.
//!
//! [`AccountsError`] unifies every error source (configuration, transport,
//! response validation, backend business codes) behind a single enum so
//! conversation flows can match on the variant they care about while still
//! using the `?` operator for easy propagation.
//!
//! Backend business failures arrive as a numeric `code` inside the JSON
//! envelope. [`ApiErrorKind::from_code`] is the fixed code table; codes it
//! does not know map to [`ApiErrorKind::Unhandled`].

use std::fmt;
use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AccountsError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    /// Environment configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The TLS root store could not be built.
    #[error("tls error: {0}")]
    Tls(String),

    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status and no response envelope.
    #[error("backend returned HTTP {status} for {path}")]
    HttpStatus { path: String, status: u16 },

    /// A backend payload did not match the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A backend payload was well-formed JSON but semantically unusable.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend answered with a non-success business code.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The backend listed no account with `is_active = true`.
    #[error("no active account for telegram_id {telegram_id}")]
    NoActiveAccount { telegram_id: String },

    /// The backend accepted an import request but returned no account.
    #[error("failed to import account: {0}")]
    ImportFailed(String),

    /// A balance refresh did not finish within the coordination bound.
    #[error("{resource} refresh timed out after {after:?}")]
    RefreshTimedOut {
        resource: &'static str,
        after: Duration,
    },
}

impl AccountsError {
    /// Message suitable for showing to the end user.
    ///
    /// Business errors use the fixed per-code text; everything else collapses
    /// to a generic server-issue message so transport details never leak.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Api(api) => api.kind.user_message(),
            Self::NoActiveAccount { .. } => {
                "Something went wrong. No active account found. Please contact support."
            }
            Self::ImportFailed(_) => ApiErrorKind::InvalidSecretKey.user_message(),
            Self::RefreshTimedOut { .. } | Self::Http(_) | Self::HttpStatus { .. } => {
                ApiErrorKind::ServerUnavailable.user_message()
            }
            Self::Config(_) | Self::Tls(_) | Self::Json(_) | Self::Validation(_) => {
                ApiErrorKind::Unhandled.user_message()
            }
        }
    }

    /// Returns the business error kind, if this is a backend business error.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(api) => Some(api.kind),
            _ => None,
        }
    }
}

/// A backend business error: the mapped kind plus whatever the backend said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// The raw code from the envelope (kept even when the kind is `Unhandled`).
    pub code: i64,
    /// Backend-supplied detail (`error_message`, falling back to `message`).
    pub message: Option<String>,
}

impl ApiError {
    /// Builds an error from an envelope code.
    pub fn from_code(code: i64, message: Option<String>) -> Self {
        Self {
            kind: ApiErrorKind::from_code(code),
            code,
            message,
        }
    }

    /// Builds an error for a known kind without backend detail.
    pub fn from_kind(kind: ApiErrorKind) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend error {} ({:?})", self.code, self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Named business conditions the backend can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    // Transport-level codes relayed in the envelope.
    UnprocessableRequest,
    ExchangeClient,
    ExchangeServer,
    Database,
    ServerUnavailable,

    // Order server.
    InvalidSecretKeyForChain,
    EmptyOrder,
    TooHighSlippage,
    TooLowSlippage,
    NoSuchTicker,
    TooSmallOrderAmount,
    InsufficientMargin,
    BuilderFeeNotApproved,
    ReduceOnly,
    TooManyCumulativeOrders,
    TooManySize,
    InsufficientSpotBalance,
    InvalidNonce,
    NoSuchPosition,
    InsufficientUsdc,
    UnsupportedDeltaNeutralSymbol,

    // Account server.
    ApiLimitExceeded,
    MaxAccountsReached,
    DuplicateNickname,
    NoSuchAccountByNickname,
    NoSuchAccountByTelegramId,
    CannotDeleteAllAccounts,
    InvalidSecretKey,
    SendUsdcFailed,
    InsufficientPerpBalance,
    NoSuchAccountByPublicKey,
    RebalanceAccountAlreadyExists,
    ShouldBeTradingAccount,
    RebalanceAccountNotRegistered,
    NoRebalanceDetails,
    AlreadyRegisteredAccount,
    CannotApproveBuilderFee,
    ReferralCodeNotFound,
    CannotAddReferral,
    NoSuchReferralCode,
    UsdTransferSmallerThanFee,
    ShouldBeDexLpVaultAccount,
    AccountTypeNotFound,
    InsufficientBalance,

    // Copy trading server.
    CannotAcquireLock,
    SubscribeFailed,
    NoSuchSubscription,
    CannotDeleteSubscription,
    NotCopyTradingAccount,
    MaxCopyReached,
    InvalidEthAddress,
    MaxTargetReached,
    MaxSubscriptionReached,

    // DCA server.
    DuplicateDca,
    CannotCreateMoreDca,

    // Strategy server.
    InvalidFilter,

    // DEX server.
    NoSuchPool,
    NoSuchDex,
    NoLpVaultJob,
    NoSuchDexProtocol,
    DecreaseLiquidityFailed,
    RouteExpired,

    // Market data server.
    MarketData,
    CandleData,
    AllMids,
    PerpMeta,
    PerpMarketData,

    /// Catch-all for 9999 and any code not in the table.
    Unhandled,
}

/// Code table shared between [`ApiErrorKind::from_code`] and [`ApiErrorKind::code`].
const CODE_TABLE: &[(i64, ApiErrorKind)] = &[
    (422, ApiErrorKind::UnprocessableRequest),
    (500, ApiErrorKind::ExchangeClient),
    (501, ApiErrorKind::ExchangeServer),
    (502, ApiErrorKind::Database),
    (503, ApiErrorKind::ServerUnavailable),
    (1000, ApiErrorKind::InvalidSecretKeyForChain),
    (1001, ApiErrorKind::EmptyOrder),
    (1002, ApiErrorKind::TooHighSlippage),
    (1003, ApiErrorKind::TooLowSlippage),
    (1004, ApiErrorKind::NoSuchTicker),
    (1005, ApiErrorKind::TooSmallOrderAmount),
    (1006, ApiErrorKind::InsufficientMargin),
    (1007, ApiErrorKind::BuilderFeeNotApproved),
    (1008, ApiErrorKind::ReduceOnly),
    (1009, ApiErrorKind::TooManyCumulativeOrders),
    (1010, ApiErrorKind::TooManySize),
    (1011, ApiErrorKind::InsufficientSpotBalance),
    (1012, ApiErrorKind::InvalidNonce),
    (1013, ApiErrorKind::NoSuchPosition),
    (1014, ApiErrorKind::InsufficientUsdc),
    (1015, ApiErrorKind::UnsupportedDeltaNeutralSymbol),
    (3000, ApiErrorKind::ApiLimitExceeded),
    (3001, ApiErrorKind::MaxAccountsReached),
    (3002, ApiErrorKind::DuplicateNickname),
    (3003, ApiErrorKind::NoSuchAccountByNickname),
    (3004, ApiErrorKind::NoSuchAccountByTelegramId),
    (3005, ApiErrorKind::CannotDeleteAllAccounts),
    (3006, ApiErrorKind::InvalidSecretKey),
    (3007, ApiErrorKind::SendUsdcFailed),
    (3009, ApiErrorKind::InsufficientPerpBalance),
    (3010, ApiErrorKind::NoSuchAccountByPublicKey),
    (3011, ApiErrorKind::RebalanceAccountAlreadyExists),
    (3012, ApiErrorKind::ShouldBeTradingAccount),
    (3013, ApiErrorKind::RebalanceAccountNotRegistered),
    (3014, ApiErrorKind::NoRebalanceDetails),
    (3015, ApiErrorKind::AlreadyRegisteredAccount),
    (3016, ApiErrorKind::CannotApproveBuilderFee),
    (3017, ApiErrorKind::ReferralCodeNotFound),
    (3018, ApiErrorKind::CannotAddReferral),
    (3019, ApiErrorKind::NoSuchReferralCode),
    (3020, ApiErrorKind::UsdTransferSmallerThanFee),
    (3021, ApiErrorKind::ShouldBeDexLpVaultAccount),
    (3022, ApiErrorKind::AccountTypeNotFound),
    (3100, ApiErrorKind::InsufficientBalance),
    (5000, ApiErrorKind::CannotAcquireLock),
    (5001, ApiErrorKind::SubscribeFailed),
    (5002, ApiErrorKind::NoSuchSubscription),
    (5003, ApiErrorKind::CannotDeleteSubscription),
    (5004, ApiErrorKind::NotCopyTradingAccount),
    (5005, ApiErrorKind::MaxCopyReached),
    (5006, ApiErrorKind::InvalidEthAddress),
    (5007, ApiErrorKind::MaxTargetReached),
    (5008, ApiErrorKind::MaxSubscriptionReached),
    (6000, ApiErrorKind::DuplicateDca),
    (6001, ApiErrorKind::CannotCreateMoreDca),
    (7000, ApiErrorKind::InvalidFilter),
    (8000, ApiErrorKind::NoSuchPool),
    (8001, ApiErrorKind::NoSuchDex),
    (8002, ApiErrorKind::NoLpVaultJob),
    (8003, ApiErrorKind::NoSuchDexProtocol),
    (8004, ApiErrorKind::DecreaseLiquidityFailed),
    (8005, ApiErrorKind::RouteExpired),
    (9000, ApiErrorKind::MarketData),
    (9001, ApiErrorKind::CandleData),
    (9002, ApiErrorKind::AllMids),
    (9003, ApiErrorKind::PerpMeta),
    (9004, ApiErrorKind::PerpMarketData),
    (9999, ApiErrorKind::Unhandled),
];

impl ApiErrorKind {
    /// Maps an envelope code to its kind. Unknown codes are [`Self::Unhandled`].
    pub fn from_code(code: i64) -> Self {
        CODE_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Unhandled)
    }

    /// Returns the canonical code for this kind.
    pub fn code(self) -> i64 {
        CODE_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(c, _)| *c)
            .unwrap_or(9999)
    }

    /// Fixed user-facing text for this kind.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::UnprocessableRequest => "The request could not be processed. Please contact the developer.",
            Self::ExchangeClient => "A client error occurred while placing the order. Please contact the developer.",
            Self::ExchangeServer => "An error occurred on the exchange server. Please try again later.",
            Self::Database | Self::ServerUnavailable => {
                "There is an issue with the server. Please try again in a moment."
            }
            Self::InvalidSecretKeyForChain => "The provided secret key is invalid for the L1 chain. Please check your key and try again.",
            Self::EmptyOrder => "The order is empty. Please add at least one item to the order and try again.",
            Self::TooHighSlippage => "The slippage value is too high. Please reduce the slippage and try again.",
            Self::TooLowSlippage => "Some items could not be purchased due to the current slippage settings. The remaining items have been successfully purchased.",
            Self::NoSuchTicker => "The requested ticker does not exist.",
            Self::TooSmallOrderAmount => "The order amount is too small. Please increase the order amount and try again.",
            Self::InsufficientMargin => "Insufficient margin for the order. Please check your account balance and try again.",
            Self::BuilderFeeNotApproved => "The builder fee has not been approved. Please check your account settings.",
            Self::ReduceOnly => "The order is a reduce-only order. Please check your order settings.",
            Self::TooManyCumulativeOrders => "The cumulative order limit has been exceeded. Please reduce the number of orders and try again.",
            Self::TooManySize => "The limit price value is too high. Please use a smaller value and try again.",
            Self::InsufficientSpotBalance => "Insufficient balance for spot trading.",
            Self::InvalidNonce => "Invalid nonce. Try again.",
            Self::NoSuchPosition => "No open position for the specified ticker. Please open a position first.",
            Self::InsufficientUsdc => "Insufficient USDC balance for the operation. Please deposit more USDC.",
            Self::UnsupportedDeltaNeutralSymbol => "Unsupported delta-neutral symbol. Please use a valid symbol.",
            Self::ApiLimitExceeded => "The API request limit has been exceeded. Try again!",
            Self::MaxAccountsReached => "You can create up to 10 accounts only.",
            Self::DuplicateNickname => "Duplicate nicknames are not allowed. Please choose a unique nickname.",
            Self::NoSuchAccountByNickname => "No account exists with the provided nickname. Please contact the developer.",
            Self::NoSuchAccountByTelegramId => "No account exists with the provided telegram id. Please contact the developer.",
            Self::CannotDeleteAllAccounts => "At least one account must be maintained.",
            Self::InvalidSecretKey => "The provided secret key is invalid.",
            Self::SendUsdcFailed => "Failed to send USDC.",
            Self::InsufficientPerpBalance => "Insufficient balance for perpetual trading.",
            Self::NoSuchAccountByPublicKey => "No account exists with the provided public key. Please contact the developer.",
            Self::RebalanceAccountAlreadyExists => "Rebalance account already exists.",
            Self::ShouldBeTradingAccount => "This wallet is already registered for either alarm or copy trading purposes. Please try again with a different wallet.",
            Self::RebalanceAccountNotRegistered => "Rebalance account is not registered.",
            Self::NoRebalanceDetails => "No rebalance details for the account.",
            Self::AlreadyRegisteredAccount => "The account is already registered.",
            Self::CannotApproveBuilderFee => "Cannot authenticate. Please deposit USDC and try again.",
            Self::ReferralCodeNotFound => "Cannot find referral code. Please try again.",
            Self::CannotAddReferral => "Cannot add referral. Please try again.",
            Self::NoSuchReferralCode => "No such referral code exists. Please check the code.",
            Self::UsdTransferSmallerThanFee => "The receiving account is being registered for the first time. Please send at least $2.",
            Self::ShouldBeDexLpVaultAccount => "This account is not a DEX LP Vault account. Please use a valid DEX LP Vault account.",
            Self::AccountTypeNotFound => "The specified account type does not exist. Please check the account type and try again.",
            Self::InsufficientBalance => "Insufficient balance for withdrawal.",
            Self::CannotAcquireLock => "Cannot acquire lock. Please try again later.",
            Self::SubscribeFailed => "Failed to subscribe to the market data. Please try again.",
            Self::NoSuchSubscription => "No such subscription exists.",
            Self::CannotDeleteSubscription => "Cannot delete the subscription.",
            Self::NotCopyTradingAccount => "This account is not a copy trading account.",
            Self::MaxCopyReached => "Cannot copy this account. The maximum number of copy trading accounts has been reached.",
            Self::InvalidEthAddress => "The provided Ethereum address is invalid.",
            Self::MaxTargetReached => "You can only subscribe to a maximum of 1 target.",
            Self::MaxSubscriptionReached => "Subscription limit reached. Please try again once other users have canceled their subscriptions.",
            Self::DuplicateDca => "A ticker can only have one DCA order at a time.",
            Self::CannotCreateMoreDca => "You have reached the maximum limit orders.",
            Self::InvalidFilter => "This filter is invalid. Please contact the developer.",
            Self::NoSuchPool => "The specified pool does not exist. Please check the pool and try again.",
            Self::NoSuchDex => "The specified DEX does not exist. Please check the DEX and try again.",
            Self::NoLpVaultJob => "No LP Vault job found for the specified account. Please check the account and try again.",
            Self::NoSuchDexProtocol => "The specified DEX protocol is not supported. Please check the protocol and try again.",
            Self::DecreaseLiquidityFailed => "Decrease liquidity failed. Please check the parameters and try again.",
            Self::RouteExpired => "The route has expired. Try again.",
            Self::MarketData => "Market data is empty.",
            Self::CandleData => "Candle data is unavailable. Please try again later.",
            Self::AllMids => "Mid prices are unavailable. Please try again later.",
            Self::PerpMeta => "Perpetual market metadata is unavailable. Please try again later.",
            Self::PerpMarketData => "Perpetual market data is unavailable. Please try again later.",
            Self::Unhandled => "Something went wrong. Please try again later.",
        }
    }
}
