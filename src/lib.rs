//! Account and balance cache for a Telegram trading bot front-end.
//!
//! Conversation flows share one [`AccountManager`] per user, obtained from a
//! [`SessionRegistry`]. The manager caches the active wallet and its spot
//! and perp balance snapshots, and coordinates refreshes against the
//! trading backend (reached through an [`AccountBackend`]).

pub mod backend;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
mod refresh;
pub mod session;
pub mod tls;

pub use backend::{AccountBackend, HttpBackend};
pub use error::{AccountsError, ApiError, ApiErrorKind, Result};
pub use manager::AccountManager;
pub use session::SessionRegistry;
