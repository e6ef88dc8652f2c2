//! Accounts
//!
//! An [`Account`] is the durable identity derived from a BIP-39 phrase: a
//! caller-supplied uid, a creation timestamp, the mainnet flag, one
//! account-level public key per supported network, and the per-network
//! initialization records. Accounts are built from a phrase or restored
//! from a serialization; both paths yield equal values.

pub mod address;
pub mod initialization;
pub mod serialization;
pub mod xpub;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::config::KitConfig;
use crate::crypto::encoding::hash160;
use crate::crypto::keys::bitcoin::{ExtendedPrivateKey, ExtendedPublicKey};
use crate::crypto::keys::{hedera, KeyType};
use crate::crypto::mnemonic::{english_word_list, generate_phrase_with_strength, phrase_to_seed};
use crate::error::{Error, Result};
use crate::network::{Network, NetworkType};

pub use address::{Address, AddressScheme, Destination};
pub use xpub::{
    derive_extended_public_key, derive_extended_public_key_for_code,
    derive_extended_public_key_with_capacity, derive_extended_public_key_with_config, ChainRole, XPubs,
    DEFAULT_XPUB_CAPACITY,
};

/// An account-level public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub enum AccountPublicKey {
    /// BIP-32 key at `m/44'/coin'/0'`
    Extended(ExtendedPublicKey),
    /// ed25519 key at `m/44'/3030'/0'/0'/0'`
    Ed25519([u8; 32]),
}

impl AccountPublicKey {
    /// Check that the key has the shape `network_type` expects
    pub fn is_valid_for(&self, network_type: NetworkType) -> bool {
        match (self, network_type.key_type()) {
            (Self::Extended(key), KeyType::Bitcoin | KeyType::Ethereum) => key.is_valid(),
            (Self::Ed25519(key), KeyType::Hedera) => hedera::is_valid_public_key(key),
            _ => false,
        }
    }
}

/// Account key material, one key per network. Zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccountKeys(BTreeMap<NetworkType, AccountPublicKey>);

impl AccountKeys {
    /// Derive the account keys of every network from a seed
    pub fn derive(seed: &[u8], is_mainnet: bool) -> Result<Self> {
        let master = ExtendedPrivateKey::master(seed)?;
        let mut keys = BTreeMap::new();

        for network_type in NetworkType::ALL {
            let network = Network::new(network_type, is_mainnet);
            let key = match network_type.key_type() {
                KeyType::Bitcoin | KeyType::Ethereum => AccountPublicKey::Extended(
                    master.derive_path(&network.account_path())?.to_extended_public_key()?,
                ),
                KeyType::Hedera => AccountPublicKey::Ed25519(hedera::derive_account_public_key(seed)?),
            };
            keys.insert(network_type, key);
        }

        Ok(Self(keys))
    }

    pub fn get(&self, network_type: NetworkType) -> Option<&AccountPublicKey> {
        self.0.get(&network_type)
    }

    /// The BIP-32 account key, for secp256k1 networks
    pub fn extended(&self, network_type: NetworkType) -> Option<&ExtendedPublicKey> {
        match self.0.get(&network_type) {
            Some(AccountPublicKey::Extended(key)) => Some(key),
            _ => None,
        }
    }

    /// The ed25519 account key, for Hedera
    pub fn ed25519(&self, network_type: NetworkType) -> Option<&[u8; 32]> {
        match self.0.get(&network_type) {
            Some(AccountPublicKey::Ed25519(key)) => Some(key),
            _ => None,
        }
    }

    /// Whether every supported network has a well-formed key
    pub fn is_complete(&self) -> bool {
        NetworkType::ALL
            .into_iter()
            .all(|network_type| self.get(network_type).is_some_and(|key| key.is_valid_for(network_type)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NetworkType, &AccountPublicKey)> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, network_type: NetworkType, key: AccountPublicKey) -> Option<AccountPublicKey> {
        self.0.insert(network_type, key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for AccountKeys {
    fn drop(&mut self) {
        self.0.values_mut().for_each(Zeroize::zeroize);
    }
}

impl fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// A wallet account
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    uids: String,
    timestamp: DateTime<Utc>,
    is_mainnet: bool,
    keys: AccountKeys,
    initializations: BTreeMap<NetworkType, Vec<u8>>,
}

impl Account {
    /// Create an account from a phrase.
    ///
    /// The phrase is not checked against a word list (the caller validates
    /// with [`crate::crypto::mnemonic::validate_phrase`] for its locale), but
    /// it must have a BIP-39 word count. The timestamp is truncated to whole
    /// seconds. The seed and all private keys are dropped before returning.
    pub fn create_from_phrase(
        phrase: &str,
        timestamp: DateTime<Utc>,
        uids: &str,
        is_mainnet: bool,
    ) -> Result<Self> {
        let word_count = phrase.split_whitespace().count();
        if !matches!(word_count, 12 | 15 | 18 | 21 | 24) {
            return Err(Error::Mnemonic(format!("Invalid word count: {}", word_count)));
        }

        let seed = phrase_to_seed(phrase, None);
        let keys = AccountKeys::derive(seed.as_bytes(), is_mainnet)?;

        let account = Self {
            uids: uids.to_string(),
            timestamp: truncate_to_seconds(timestamp)?,
            is_mainnet,
            keys,
            initializations: BTreeMap::new(),
        };

        tracing::info!(uids, is_mainnet, "account created from phrase");
        Ok(account)
    }

    /// Generate a fresh English phrase and its account, using the
    /// configured strength and network flavor
    pub fn generate(config: &KitConfig, uids: &str) -> Result<(Self, String)> {
        let (phrase, timestamp) = generate_phrase_with_strength(english_word_list(), config.mnemonic_strength);
        let account = Self::create_from_phrase(&phrase, timestamp, uids, config.is_mainnet)?;
        Ok((account, phrase))
    }

    /// Restore an account from a serialization.
    ///
    /// `None` means the bytes are not a current, complete serialization and
    /// the user has to re-enter the phrase.
    pub fn create_from_serialization(serialization: &[u8], uids: &str) -> Option<Self> {
        serialization::restore(serialization, uids)
    }

    /// Serialize in the current format
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialization::serialize(self)
    }

    /// Check that `serialization` is a current-format serialization of this
    /// account
    pub fn validate(&self, serialization: &[u8]) -> bool {
        serialization::validate(self, serialization)
    }

    pub fn uids(&self) -> &str {
        &self.uids
    }

    /// Creation time, the earliest possible account activity
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    /// The network of the given type matching this account's flavor
    pub fn network(&self, network_type: NetworkType) -> Network {
        Network::new(network_type, self.is_mainnet)
    }

    pub fn keys(&self) -> &AccountKeys {
        &self.keys
    }

    /// A stable identifier suitable for naming per-account storage: the hex
    /// HASH160 of the BTC account public key.
    pub fn file_system_identifier(&self) -> Result<String> {
        let key = self
            .keys
            .extended(NetworkType::Btc)
            .ok_or_else(|| Error::KeyDerivation("Missing btc account key".to_string()))?;

        Ok(hex::encode(hash160(key.public_key())))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("uids", &self.uids)
            .field("timestamp", &self.timestamp)
            .field("is_mainnet", &self.is_mainnet)
            .field("networks", &self.keys)
            .field("initialized", &self.initializations.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn truncate_to_seconds(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.timestamp(), 0)
        .ok_or_else(|| Error::InvalidInput(format!("Timestamp out of range: {}", timestamp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_create_from_phrase() {
        let account = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", true).unwrap();

        assert_eq!(account.uids(), "uid-1");
        assert_eq!(account.timestamp(), timestamp());
        assert!(account.is_mainnet());
        assert_eq!(account.keys().len(), NetworkType::ALL.len());
        assert!(account.keys().is_complete());
        assert!(account.keys().ed25519(NetworkType::Hbar).is_some());
        assert!(account.keys().extended(NetworkType::Hbar).is_none());
    }

    #[test]
    fn test_account_key_matches_bip44() {
        let account = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", true).unwrap();
        let key = account.keys().extended(NetworkType::Btc).unwrap();

        assert_eq!(
            key.encode([0x04, 0x88, 0xb2, 0x1e]),
            "xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj"
        );
    }

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let precise = timestamp() + chrono::Duration::milliseconds(750);
        let account = Account::create_from_phrase(ABANDON, precise, "uid-1", true).unwrap();
        assert_eq!(account.timestamp(), timestamp());
    }

    #[test]
    fn test_create_rejects_bad_word_count() {
        assert!(Account::create_from_phrase("abandon about", timestamp(), "uid-1", true).is_err());
        assert!(Account::create_from_phrase("", timestamp(), "uid-1", true).is_err());
    }

    #[test]
    fn test_mainnet_and_testnet_keys_differ() {
        let mainnet = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", true).unwrap();
        let testnet = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", false).unwrap();

        assert_ne!(mainnet, testnet);
        assert_ne!(
            mainnet.keys().extended(NetworkType::Btc),
            testnet.keys().extended(NetworkType::Btc)
        );
        // ETH uses coin type 60 on both
        assert_eq!(
            mainnet.keys().extended(NetworkType::Eth),
            testnet.keys().extended(NetworkType::Eth)
        );
    }

    #[test]
    fn test_generate_uses_config() {
        let config = KitConfig {
            is_mainnet: false,
            mnemonic_strength: crate::crypto::mnemonic::MnemonicStrength::Words24,
            ..KitConfig::default()
        };
        let (account, phrase) = Account::generate(&config, "uid-2").unwrap();

        assert_eq!(phrase.split_whitespace().count(), 24);
        assert!(!account.is_mainnet());
    }

    #[test]
    fn test_file_system_identifier() {
        let a = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", true).unwrap();
        let b = Account::create_from_phrase(ABANDON, timestamp(), "uid-2", true).unwrap();

        let id = a.file_system_identifier().unwrap();
        assert_eq!(id.len(), 40);
        assert_eq!(id, b.file_system_identifier().unwrap());
    }

    #[test]
    fn test_debug_hides_keys() {
        let account = Account::create_from_phrase(ABANDON, timestamp(), "uid-1", true).unwrap();
        let debug = format!("{:?}", account);

        assert!(debug.contains("uid-1"));
        assert!(!debug.contains("chain_code"));
    }
}
