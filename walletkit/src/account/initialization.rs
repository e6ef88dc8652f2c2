//! Network initialization
//!
//! Some networks need an out-of-band setup before an account can use them.
//! For Hedera the account's ed25519 public key is submitted to an external
//! service, which answers with an opaque payload (the assigned account id).
//! The payload is committed once per account and network; later commits
//! are ignored.
//!
//! A [`Network`] whose mainnet flag differs from the account's is foreign to
//! it: queries answer as for a network with nothing set up (`false`, `None`)
//! and commits are rejected with [`Error::InvalidInput`], so provider data is
//! never dropped silently.

use super::Account;
use crate::error::{Error, Result};
use crate::network::Network;

impl Account {
    /// Whether the account can use `network` without further setup.
    /// `false` for a network of the other flavor.
    pub fn is_initialized(&self, network: &Network) -> bool {
        if network.is_mainnet() != self.is_mainnet {
            return false;
        }

        let network_type = network.network_type();
        !network_type.requires_initialization() || self.initializations.contains_key(&network_type)
    }

    /// Data to submit to the network's setup service, or `None` when no
    /// setup is pending or the network is of the other flavor
    pub fn initialization_data(&self, network: &Network) -> Option<Vec<u8>> {
        if network.is_mainnet() != self.is_mainnet || self.is_initialized(network) {
            return None;
        }

        self.keys.ed25519(network.network_type()).map(|key| key.to_vec())
    }

    /// Commit the setup service's payload.
    ///
    /// Returns `Ok(None)` without changes if already initialized. Otherwise
    /// returns the new serialization, which the caller must persist.
    /// Fails with [`Error::InvalidInput`] for a network of the other flavor.
    pub fn initialize(&mut self, network: &Network, data: &[u8]) -> Result<Option<Vec<u8>>> {
        if network.is_mainnet() != self.is_mainnet {
            return Err(Error::InvalidInput(format!(
                "Network {} does not match the account",
                network
            )));
        }

        if self.is_initialized(network) {
            tracing::debug!(network = %network, "network already initialized");
            return Ok(None);
        }

        self.initializations.insert(network.network_type(), data.to_vec());

        let serialization = match self.serialize() {
            Ok(serialization) => serialization,
            Err(e) => {
                self.initializations.remove(&network.network_type());
                return Err(e);
            }
        };

        tracing::info!(uids = %self.uids, network = %network, "network initialized");
        Ok(Some(serialization))
    }

    /// The committed setup payload. `None` for a network of the other flavor.
    pub fn initialization(&self, network: &Network) -> Option<&[u8]> {
        if network.is_mainnet() != self.is_mainnet {
            return None;
        }

        self.initializations.get(&network.network_type()).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkType;
    use chrono::Utc;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn account() -> Account {
        Account::create_from_phrase(ABANDON, Utc::now(), "uid-1", true).unwrap()
    }

    #[test]
    fn test_hedera_initialization() {
        let mut account = account();
        let hedera = Network::mainnet(NetworkType::Hbar);

        assert!(!account.is_initialized(&hedera));
        let data = account.initialization_data(&hedera).unwrap();
        assert_eq!(hex::encode(&data), "10fcec8c5db29aeab62272a08be39b1ec75eba50624351fba9948ff5d3d78ecf");

        let serialization = account.initialize(&hedera, b"0.0.1234").unwrap().unwrap();
        assert!(account.is_initialized(&hedera));
        assert!(account.initialization_data(&hedera).is_none());
        assert_eq!(account.initialization(&hedera), Some(&b"0.0.1234"[..]));
        assert!(account.validate(&serialization));

        assert_eq!(account.initialize(&hedera, b"0.0.9999").unwrap(), None);
        assert_eq!(account.initialization(&hedera), Some(&b"0.0.1234"[..]));
    }

    #[test]
    fn test_initialization_survives_restore() {
        let mut account = account();
        let hedera = Network::mainnet(NetworkType::Hbar);
        let serialization = account.initialize(&hedera, b"0.0.42").unwrap().unwrap();

        let restored = Account::create_from_serialization(&serialization, "uid-1").unwrap();
        assert!(restored.is_initialized(&hedera));
        assert_eq!(restored.initialization(&hedera), Some(&b"0.0.42"[..]));
        assert_eq!(restored, account);
    }

    #[test]
    fn test_serialization_before_initialize_is_stale() {
        let mut account = account();
        let hedera = Network::mainnet(NetworkType::Hbar);
        let stale = account.serialize().unwrap();
        assert!(account.validate(&stale));

        let current = account.initialize(&hedera, b"0.0.42").unwrap().unwrap();

        assert!(!account.validate(&stale));
        assert!(account.validate(&current));

        let restored = Account::create_from_serialization(&stale, "uid-1").unwrap();
        assert!(!restored.is_initialized(&hedera));
        assert_ne!(restored, account);
    }

    #[test]
    fn test_other_networks_always_initialized() {
        let mut account = account();

        for network_type in NetworkType::ALL.into_iter().filter(|n| *n != NetworkType::Hbar) {
            let network = Network::mainnet(network_type);
            assert!(account.is_initialized(&network));
            assert!(account.initialization_data(&network).is_none());
            assert_eq!(account.initialize(&network, b"ignored").unwrap(), None);
        }
    }

    #[test]
    fn test_network_flavor_must_match() {
        let mut account = account();
        let testnet = Network::testnet(NetworkType::Hbar);

        assert!(!account.is_initialized(&testnet));
        assert!(account.initialization_data(&testnet).is_none());
        assert!(matches!(account.initialize(&testnet, b"0.0.1"), Err(Error::InvalidInput(_))));
        assert!(account.initialization(&testnet).is_none());

        account.initialize(&Network::mainnet(NetworkType::Hbar), b"0.0.1").unwrap();
        assert!(!account.is_initialized(&testnet));
        assert!(account.initialization(&testnet).is_none());
        assert!(!account.is_initialized(&Network::testnet(NetworkType::Btc)));
    }
}
