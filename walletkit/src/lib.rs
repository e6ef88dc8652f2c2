//! WalletKit Accounts
//!
//! Multi-network wallet accounts derived from a BIP-39 phrase: phrase
//! generation and validation, a versioned account serialization, extended
//! public keys for receive and change chains, per-network initialization,
//! and address parsing and formatting for BTC, BCH, BSV, LTC, DOGE, ETH
//! and HBAR.

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod json;
pub mod network;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use account::{Account, Address, AddressScheme, ChainRole, XPubs};
pub use config::KitConfig;
pub use error::{Error, Result};
pub use network::{Network, NetworkType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
