//! Extended public keys for receive and change chains
//!
//! The chain key is `m/44'/coin'/0'/role`. When a serialization carries the
//! network's account key it is derived publicly; serializations written
//! before the network existed fall back to the phrase.

use std::fmt;

use super::{serialization, Account};
use crate::config::KitConfig;
use crate::crypto::keys::bitcoin::{ExtendedPrivateKey, ExtendedPublicKey};
use crate::crypto::keys::{format_derivation_path, KeyType};
use crate::crypto::mnemonic::phrase_to_seed;
use crate::error::{Error, Result};
use crate::network::{Network, NetworkType};

/// Largest xpub string returned unless a capacity is given
pub const DEFAULT_XPUB_CAPACITY: usize = 120;

/// BIP-44 chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainRole {
    Receive,
    Change,
}

impl ChainRole {
    /// BIP-44 change index
    pub fn index(&self) -> u32 {
        match self {
            Self::Receive => 0,
            Self::Change => 1,
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => f.write_str("receive"),
            Self::Change => f.write_str("change"),
        }
    }
}

/// Receive and change xpubs of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPubs {
    pub receiver: String,
    pub change: String,
}

/// Derive the xpub of a chain for `network_type`
pub fn derive_extended_public_key(
    serialization: &[u8],
    network_type: NetworkType,
    role: ChainRole,
    phrase: &str,
) -> Result<String> {
    derive_extended_public_key_with_capacity(serialization, network_type, role, phrase, DEFAULT_XPUB_CAPACITY)
}

/// As [`derive_extended_public_key`], failing with
/// [`Error::ExtendedKeyOverflow`] when the text exceeds `capacity`
pub fn derive_extended_public_key_with_capacity(
    serialization: &[u8],
    network_type: NetworkType,
    role: ChainRole,
    phrase: &str,
    capacity: usize,
) -> Result<String> {
    ensure_public_derivation(network_type)?;

    let decoded = serialization::decode(serialization)?;
    let network = Network::new(network_type, decoded.is_mainnet);

    let chain_key = match decoded.keys.extended(network_type) {
        Some(account_key) => account_key.derive_child(role.index())?,
        None => {
            tracing::debug!(
                network = %network,
                version = decoded.version,
                path = %format_derivation_path(&network.account_path()),
                "no stored account key, deriving from phrase"
            );
            let seed = phrase_to_seed(phrase, None);
            ExtendedPrivateKey::master(seed.as_bytes())?
                .derive_path(&network.account_path())?
                .derive_child(role.index())?
                .to_extended_public_key()?
        }
    };

    encode_bounded(&chain_key, network, capacity)
}

/// As [`derive_extended_public_key`], bounded by the configured capacity
pub fn derive_extended_public_key_with_config(
    serialization: &[u8],
    network_type: NetworkType,
    role: ChainRole,
    phrase: &str,
    config: &KitConfig,
) -> Result<String> {
    derive_extended_public_key_with_capacity(serialization, network_type, role, phrase, config.xpub_capacity)
}

/// Derive an xpub for a textual network code. Unknown codes are treated as
/// BTC.
pub fn derive_extended_public_key_for_code(
    serialization: &[u8],
    code: &str,
    role: ChainRole,
    phrase: &str,
) -> Result<String> {
    derive_extended_public_key(serialization, NetworkType::from_code_or_btc(code), role, phrase)
}

impl Account {
    /// The xpub of a chain, derived from the stored account key
    pub fn extended_public_key(&self, network_type: NetworkType, role: ChainRole) -> Result<String> {
        self.extended_public_key_with_capacity(network_type, role, DEFAULT_XPUB_CAPACITY)
    }

    pub fn extended_public_key_with_capacity(
        &self,
        network_type: NetworkType,
        role: ChainRole,
        capacity: usize,
    ) -> Result<String> {
        let chain_key = self.chain_key(network_type, role)?;
        encode_bounded(&chain_key, self.network(network_type), capacity)
    }

    pub fn extended_public_key_with_config(
        &self,
        network_type: NetworkType,
        role: ChainRole,
        config: &KitConfig,
    ) -> Result<String> {
        self.extended_public_key_with_capacity(network_type, role, config.xpub_capacity)
    }

    /// Receive and change xpubs
    pub fn xpubs(&self, network_type: NetworkType) -> Result<XPubs> {
        Ok(XPubs {
            receiver: self.extended_public_key(network_type, ChainRole::Receive)?,
            change: self.extended_public_key(network_type, ChainRole::Change)?,
        })
    }

    pub(crate) fn chain_key(&self, network_type: NetworkType, role: ChainRole) -> Result<ExtendedPublicKey> {
        ensure_public_derivation(network_type)?;

        self.keys
            .extended(network_type)
            .ok_or_else(|| Error::KeyDerivation(format!("Missing account key for {}", network_type)))?
            .derive_child(role.index())
    }
}

fn ensure_public_derivation(network_type: NetworkType) -> Result<()> {
    match network_type.key_type() {
        KeyType::Bitcoin | KeyType::Ethereum => Ok(()),
        KeyType::Hedera => Err(Error::NotSupported(format!(
            "Extended public keys are not available for {}",
            network_type
        ))),
    }
}

fn encode_bounded(key: &ExtendedPublicKey, network: Network, capacity: usize) -> Result<String> {
    let version = network
        .xpub_version()
        .ok_or_else(|| Error::NotSupported(format!("No extended key version for {}", network)))?;

    let encoded = key.encode(version);
    if encoded.len() > capacity {
        tracing::warn!(length = encoded.len(), capacity, "extended public key exceeds capacity");
        return Err(Error::ExtendedKeyOverflow {
            length: encoded.len(),
            capacity,
        });
    }

    Ok(encoded)
}
