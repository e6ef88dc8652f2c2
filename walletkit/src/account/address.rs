//! Addresses and address schemes

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bech32::{segwit, Fe32, Hrp};
use serde::{Deserialize, Serialize};

use super::{Account, ChainRole};
use crate::crypto::cashaddr::{self, CashAddrType};
use crate::crypto::encoding::{base58check_decode, base58check_encode};
use crate::crypto::keys::bitcoin::public_key_hash;
use crate::crypto::keys::{ethereum, KeyType};
use crate::error::{Error, Result};
use crate::network::{Base58Prefixes, Network, NetworkType};

/// How an address is presented for a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressScheme {
    /// Base58Check P2PKH
    BtcLegacy,
    /// Bech32 P2WPKH
    BtcSegwit,
    /// The network's own format
    Native,
}

impl AddressScheme {
    pub const ALL: [AddressScheme; 3] = [AddressScheme::BtcLegacy, AddressScheme::BtcSegwit, AddressScheme::Native];

    pub fn description(&self) -> &'static str {
        match self {
            Self::BtcLegacy => "BTC Legacy",
            Self::BtcSegwit => "BTC Segwit",
            Self::Native => "Native",
        }
    }

    /// Stable identifier for persisted preferences
    pub fn code(&self) -> &'static str {
        match self {
            Self::BtcLegacy => "btc-legacy",
            Self::BtcSegwit => "btc-segwit",
            Self::Native => "native",
        }
    }

    /// Parse a scheme identifier, ignoring case. Unknown identifiers have no
    /// fallback scheme.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|scheme| scheme.code().eq_ignore_ascii_case(code))
    }
}

impl FromStr for AddressScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s).ok_or_else(|| Error::InvalidInput(format!("Unknown address scheme: {}", s)))
    }
}

impl fmt::Display for AddressScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What an address pays to, independent of its text encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    WitnessProgram { version: u8, program: Vec<u8> },
    EthereumAccount([u8; 20]),
    HederaAccount { shard: u64, realm: u64, num: u64 },
}

/// A validated address on a network.
///
/// Two addresses are equal when they share network type, mainnet flag and
/// destination; the text is not compared. A BCH legacy address therefore
/// equals the CashAddr form of the same hash.
#[derive(Debug, Clone)]
pub struct Address {
    network_type: NetworkType,
    is_mainnet: bool,
    destination: Destination,
    text: String,
}

impl Address {
    /// Parse `string` under `network`'s address rules
    pub fn create(string: &str, network: &Network) -> Option<Self> {
        match Self::parse(string, network) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::debug!(network = %network, "address rejected: {}", e);
                None
            }
        }
    }

    /// Parse a BCH address written in the legacy Base58Check form
    /// (leading `1` or `3`). `None` for any other network or string.
    pub fn create_legacy(string: &str, network: &Network) -> Option<Self> {
        if network.network_type() != NetworkType::Bch || !(string.starts_with('1') || string.starts_with('3')) {
            return None;
        }

        let prefixes = network.base58_prefixes()?;
        match Self::parse_base58(string, network, prefixes) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::debug!(network = %network, "legacy address rejected: {}", e);
                None
            }
        }
    }

    /// Format the address of a public key under `scheme`
    pub fn from_public_key(public_key: &[u8], network: &Network, scheme: AddressScheme) -> Result<Self> {
        let network_type = network.network_type();

        match (scheme, network_type) {
            (
                AddressScheme::BtcLegacy,
                NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv | NetworkType::Ltc | NetworkType::Doge,
            ) => {
                let prefixes = network
                    .base58_prefixes()
                    .ok_or_else(|| Error::Address(format!("No base58 prefixes for {}", network)))?;
                let hash = public_key_hash(public_key)?;
                Ok(Self::new(network, Destination::PubKeyHash(hash), base58_text(prefixes.pubkey_hash, &hash)))
            }
            (AddressScheme::BtcSegwit, NetworkType::Btc | NetworkType::Ltc) => {
                let hrp = network
                    .segwit_hrp()
                    .ok_or_else(|| Error::Address(format!("No segwit prefix for {}", network)))?;
                let hash = public_key_hash(public_key)?;
                let text = segwit_text(hrp, &hash)?;
                Ok(Self::new(
                    network,
                    Destination::WitnessProgram { version: 0, program: hash.to_vec() },
                    text,
                ))
            }
            (AddressScheme::Native, NetworkType::Bch) => {
                let prefix = network
                    .cashaddr_prefix()
                    .ok_or_else(|| Error::Address(format!("No CashAddr prefix for {}", network)))?;
                let hash = public_key_hash(public_key)?;
                let text = cashaddr::encode(prefix, CashAddrType::PubKeyHash, &hash)?;
                Ok(Self::new(network, Destination::PubKeyHash(hash), text))
            }
            (AddressScheme::Native, NetworkType::Eth) => {
                let address = ethereum::address_from_public_key(public_key)?;
                Ok(Self::new(
                    network,
                    Destination::EthereumAccount(address),
                    ethereum::to_checksum_address(&address),
                ))
            }
            (scheme, network_type) => Err(Error::NotSupported(format!(
                "{} addresses from public keys are not available for {}",
                scheme, network_type
            ))),
        }
    }

    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn new(network: &Network, destination: Destination, text: String) -> Self {
        Self {
            network_type: network.network_type(),
            is_mainnet: network.is_mainnet(),
            destination,
            text,
        }
    }

    fn parse(string: &str, network: &Network) -> Result<Self> {
        let string = string.trim();

        match network.network_type() {
            NetworkType::Btc | NetworkType::Ltc => {
                if let Some(hrp) = network.segwit_hrp() {
                    let lower = string.to_ascii_lowercase();
                    if lower.starts_with(hrp) && lower[hrp.len()..].starts_with('1') {
                        return Self::parse_segwit(string, network, hrp);
                    }
                }
                Self::parse_base58(string, network, required_prefixes(network)?)
            }
            NetworkType::Bsv | NetworkType::Doge => Self::parse_base58(string, network, required_prefixes(network)?),
            NetworkType::Bch => Self::parse_cashaddr(string, network),
            NetworkType::Eth => Self::parse_ethereum(string, network),
            NetworkType::Hbar => Self::parse_hedera(string, network),
        }
    }

    fn parse_base58(string: &str, network: &Network, prefixes: Base58Prefixes) -> Result<Self> {
        let payload = base58check_decode(string)?;
        if payload.len() != 21 {
            return Err(Error::Address(format!("Invalid base58 payload length: {}", payload.len())));
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);

        let destination = match payload[0] {
            version if version == prefixes.pubkey_hash => Destination::PubKeyHash(hash),
            version if version == prefixes.script_hash => Destination::ScriptHash(hash),
            version => {
                return Err(Error::Address(format!("Unexpected version byte {:#04x} for {}", version, network)))
            }
        };

        Ok(Self::new(network, destination, string.to_string()))
    }

    fn parse_segwit(string: &str, network: &Network, hrp: &str) -> Result<Self> {
        let (decoded_hrp, version, program) =
            segwit::decode(string).map_err(|e| Error::Address(format!("Invalid segwit address: {}", e)))?;

        if decoded_hrp.to_lowercase() != hrp {
            return Err(Error::Address(format!("Unexpected segwit prefix for {}", network)));
        }

        Ok(Self::new(
            network,
            Destination::WitnessProgram { version: version.to_u8(), program },
            string.to_ascii_lowercase(),
        ))
    }

    fn parse_cashaddr(string: &str, network: &Network) -> Result<Self> {
        let prefix = network
            .cashaddr_prefix()
            .ok_or_else(|| Error::Address(format!("No CashAddr prefix for {}", network)))?;

        let (kind, hash) = cashaddr::decode(string, prefix)?;
        let hash: [u8; 20] = hash
            .as_slice()
            .try_into()
            .map_err(|_| Error::Address(format!("Unsupported CashAddr hash length: {}", hash.len())))?;

        let destination = match kind {
            CashAddrType::PubKeyHash => Destination::PubKeyHash(hash),
            CashAddrType::ScriptHash => Destination::ScriptHash(hash),
        };

        Ok(Self::new(network, destination, cashaddr::encode(prefix, kind, &hash)?))
    }

    fn parse_ethereum(string: &str, network: &Network) -> Result<Self> {
        let digits = string
            .strip_prefix("0x")
            .ok_or_else(|| Error::Address("Missing 0x prefix".to_string()))?;

        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Address("Expected 40 hex digits".to_string()));
        }

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && !ethereum::verify_checksum(digits) {
            return Err(Error::Address("EIP-55 checksum mismatch".to_string()));
        }

        let mut address = [0u8; 20];
        hex::decode_to_slice(digits, &mut address).map_err(|e| Error::Address(format!("Invalid hex: {}", e)))?;

        Ok(Self::new(
            network,
            Destination::EthereumAccount(address),
            ethereum::to_checksum_address(&address),
        ))
    }

    fn parse_hedera(string: &str, network: &Network) -> Result<Self> {
        let parts = string
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(|| Error::Address("Expected shard.realm.num".to_string()))?;

        let [shard, realm, num] = parts[..] else {
            return Err(Error::Address("Expected shard.realm.num".to_string()));
        };

        Ok(Self::new(
            network,
            Destination::HederaAccount { shard, realm, num },
            format!("{}.{}.{}", shard, realm, num),
        ))
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.network_type == other.network_type
            && self.is_mainnet == other.is_mainnet
            && self.destination == other.destination
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.network_type.hash(state);
        self.is_mainnet.hash(state);
        self.destination.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Account {
    /// The address at `m/44'/coin'/0'/role/index` presented under `scheme`.
    ///
    /// Hedera accounts have a single address, the account id committed at
    /// initialization; `role` and `index` are ignored for them.
    pub fn address(
        &self,
        network_type: NetworkType,
        scheme: AddressScheme,
        role: ChainRole,
        index: u32,
    ) -> Result<Address> {
        let network = self.network(network_type);

        if !network_type.supported_address_schemes().contains(&scheme) {
            return Err(Error::NotSupported(format!("{} addresses are not available for {}", scheme, network)));
        }

        match network_type.key_type() {
            KeyType::Bitcoin | KeyType::Ethereum => {
                let key = self.chain_key(network_type, role)?.derive_child(index)?;
                Address::from_public_key(key.public_key(), &network, scheme)
            }
            KeyType::Hedera => {
                let account_id = self
                    .initialization(&network)
                    .ok_or_else(|| Error::NotSupported(format!("{} is not initialized", network)))?;
                let account_id = std::str::from_utf8(account_id)
                    .map_err(|e| Error::Address(format!("Invalid account id: {}", e)))?;

                Address::parse_hedera(account_id, &network)
            }
        }
    }
}

fn required_prefixes(network: &Network) -> Result<Base58Prefixes> {
    network
        .base58_prefixes()
        .ok_or_else(|| Error::Address(format!("No base58 prefixes for {}", network)))
}

fn base58_text(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    base58check_encode(&payload)
}

fn segwit_text(hrp: &str, program: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(hrp).map_err(|e| Error::Address(format!("Invalid segwit prefix: {}", e)))?;
    segwit::encode(hrp, Fe32::Q, program).map_err(|e| Error::Address(format!("Segwit encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn btc() -> Network {
        Network::mainnet(NetworkType::Btc)
    }

    fn bch() -> Network {
        Network::mainnet(NetworkType::Bch)
    }

    #[test]
    fn test_scheme_descriptions() {
        let descriptions: Vec<String> = AddressScheme::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(descriptions, vec!["BTC Legacy", "BTC Segwit", "Native"]);
    }

    #[test]
    fn test_scheme_codes() {
        for scheme in AddressScheme::ALL {
            assert_eq!(AddressScheme::from_code(scheme.code()), Some(scheme));
        }
        assert_eq!(AddressScheme::from_code(" BTC-SEGWIT "), Some(AddressScheme::BtcSegwit));
        assert_eq!(AddressScheme::from_code("cashaddr"), None);
        assert!(matches!("p2tr".parse::<AddressScheme>(), Err(Error::InvalidInput(_))));
        assert_eq!("native".parse::<AddressScheme>().unwrap(), AddressScheme::Native);
    }

    #[test]
    fn test_create_bitcoin() {
        let legacy = Address::create("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", &btc()).unwrap();
        assert!(matches!(legacy.destination(), Destination::PubKeyHash(_)));

        let segwit = Address::create("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4", &btc()).unwrap();
        assert_eq!(segwit.as_str(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert_eq!(
            segwit.destination(),
            &Destination::WitnessProgram {
                version: 0,
                program: hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
            }
        );

        // wrong network flavor
        assert!(Address::create("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", &Network::testnet(NetworkType::Btc)).is_none());
        assert!(Address::create("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx", &btc()).is_none());
        assert!(Address::create("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5", &btc()).is_none());
        assert!(Address::create("", &btc()).is_none());
    }

    #[test]
    fn test_create_bitcoin_cash() {
        let address = Address::create("qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", &bch()).unwrap();
        assert_eq!(address.as_str(), "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a");

        let upper = Address::create("BITCOINCASH:QPM2QSZNHKS23Z7629MMS6S4CWEF74VCWVY22GDX6A", &bch()).unwrap();
        assert_eq!(upper.as_str(), address.as_str());

        // legacy strings are not accepted by create
        assert!(Address::create("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &bch()).is_none());
    }

    #[test]
    fn test_create_legacy() {
        let legacy = Address::create_legacy("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &bch()).unwrap();
        let cashaddr = Address::create("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", &bch()).unwrap();
        assert_eq!(legacy, cashaddr);
        assert_ne!(legacy.as_str(), cashaddr.as_str());

        let script = Address::create_legacy("3CWFddi6m4ndiGyKqzYvsFYagqDLPVMTzC", &bch()).unwrap();
        assert_eq!(script, Address::create("bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq", &bch()).unwrap());

        assert!(Address::create_legacy("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &btc()).is_none());
        assert!(Address::create_legacy("qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", &bch()).is_none());
    }

    #[test]
    fn test_create_ethereum() {
        let network = Network::mainnet(NetworkType::Eth);
        let checksummed = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";

        let address = Address::create(checksummed, &network).unwrap();
        assert_eq!(address.as_str(), checksummed);

        let lower = Address::create(&checksummed.to_lowercase(), &network).unwrap();
        assert_eq!(lower.as_str(), checksummed);
        assert_eq!(lower, address);

        assert!(Address::create("0x9858efFD232B4033E47d90003D41EC34EcaEda94", &network).is_none());
        assert!(Address::create("9858EfFD232B4033E47d90003D41EC34EcaEda94", &network).is_none());
        assert!(Address::create("0x9858EfFD232B4033E47d90003D41EC34EcaEda9", &network).is_none());
    }

    #[test]
    fn test_create_hedera() {
        let network = Network::mainnet(NetworkType::Hbar);

        let address = Address::create("0.0.1234", &network).unwrap();
        assert_eq!(address.destination(), &Destination::HederaAccount { shard: 0, realm: 0, num: 1234 });

        assert!(Address::create("0.0", &network).is_none());
        assert!(Address::create("0.0.+1", &network).is_none());
        assert!(Address::create("0.0.1.2", &network).is_none());
    }

    #[test]
    fn test_from_public_key() {
        // m/44'/0'/0'/0/0 of "abandon ... about"
        let public_key = hex::decode("03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e").unwrap();

        let legacy = Address::from_public_key(&public_key, &btc(), AddressScheme::BtcLegacy).unwrap();
        assert_eq!(legacy.as_str(), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");

        let segwit = Address::from_public_key(&public_key, &btc(), AddressScheme::BtcSegwit).unwrap();
        assert_eq!(Address::create(segwit.as_str(), &btc()), Some(segwit.clone()));
        assert_ne!(legacy, segwit);

        assert!(matches!(
            Address::from_public_key(&public_key, &Network::mainnet(NetworkType::Doge), AddressScheme::BtcSegwit),
            Err(Error::NotSupported(_))
        ));
        assert!(matches!(
            Address::from_public_key(&public_key, &Network::mainnet(NetworkType::Hbar), AddressScheme::Native),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_equality_ignores_text_but_not_network() {
        let a = Address::create("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &btc()).unwrap();
        let b = Address::create("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &Network::mainnet(NetworkType::Bsv)).unwrap();
        let c = Address::create_legacy("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", &bch()).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Address> = [
            c.clone(),
            Address::create("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", &bch()).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
    }
}
