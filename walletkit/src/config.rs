//! Kit configuration

use crate::crypto::mnemonic::MnemonicStrength;
use crate::account::DEFAULT_XPUB_CAPACITY;
use crate::network::{Network, NetworkType};

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct KitConfig {
    /// Mainnet or testnet accounts
    pub is_mainnet: bool,
    /// Strength of generated phrases
    pub mnemonic_strength: MnemonicStrength,
    /// Largest xpub string handed out by the `_with_config` derivations
    pub xpub_capacity: usize,
    /// `tracing` filter directive for [`crate::telemetry::init_tracing_from`]
    pub log_filter: String,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            is_mainnet: std::env::var("WALLETKIT_MAINNET")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            mnemonic_strength: std::env::var("WALLETKIT_MNEMONIC_WORDS")
                .ok()
                .and_then(|words| words.parse().ok())
                .and_then(MnemonicStrength::from_word_count)
                .unwrap_or(MnemonicStrength::Words12),
            xpub_capacity: std::env::var("WALLETKIT_XPUB_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_XPUB_CAPACITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_XPUB_CAPACITY),
            log_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl KitConfig {
    /// Configuration for mainnet accounts with default settings
    pub fn mainnet() -> Self {
        Self {
            is_mainnet: true,
            mnemonic_strength: MnemonicStrength::Words12,
            xpub_capacity: DEFAULT_XPUB_CAPACITY,
            log_filter: "info".to_string(),
        }
    }

    /// Configuration for testnet accounts with default settings
    pub fn testnet() -> Self {
        Self {
            is_mainnet: false,
            ..Self::mainnet()
        }
    }

    /// The network of the given type under this configuration
    pub fn network(&self, network_type: NetworkType) -> Network {
        Network::new(network_type, self.is_mainnet)
    }
}
