//! Network identity and per-network constants
//!
//! [`NetworkType`] is a closed set; every per-network decision in the crate
//! is an exhaustive `match` over it. [`Network`] adds the mainnet/testnet
//! flag, which selects coin types and encodings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::account::address::AddressScheme;
use crate::crypto::keys::{hedera, KeyType, HARDENED};
use crate::error::{Error, Result};

/// BIP-44 purpose
pub const BIP44_PURPOSE: u32 = 44;

/// Coin type shared by all bitcoin-family testnets
pub const TESTNET_COIN_TYPE: u32 = 1;

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    Btc,
    Bch,
    Bsv,
    Ltc,
    Doge,
    Eth,
    Hbar,
}

impl NetworkType {
    /// Every supported network, in serialization order
    pub const ALL: [NetworkType; 7] = [
        NetworkType::Btc,
        NetworkType::Bch,
        NetworkType::Bsv,
        NetworkType::Ltc,
        NetworkType::Doge,
        NetworkType::Eth,
        NetworkType::Hbar,
    ];

    /// Networks sharing Bitcoin's key and script model
    pub const BITCOIN_FAMILY: [NetworkType; 5] = [
        NetworkType::Btc,
        NetworkType::Bch,
        NetworkType::Bsv,
        NetworkType::Ltc,
        NetworkType::Doge,
    ];

    /// Lowercase currency code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Btc => "btc",
            Self::Bch => "bch",
            Self::Bsv => "bsv",
            Self::Ltc => "ltc",
            Self::Doge => "doge",
            Self::Eth => "eth",
            Self::Hbar => "hbar",
        }
    }

    /// Parse a currency code, ignoring case
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|network_type| network_type.code().eq_ignore_ascii_case(code))
    }

    /// Parse a currency code, falling back to BTC for unknown codes.
    ///
    /// This is a degraded mode for callers holding codes from outside the
    /// closed set; the fallback is logged.
    pub fn from_code_or_btc(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            tracing::warn!(code, "unknown network code, falling back to btc");
            Self::Btc
        })
    }

    /// Key family used for this network's account keys
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Btc | Self::Bch | Self::Bsv | Self::Ltc | Self::Doge => KeyType::Bitcoin,
            Self::Eth => KeyType::Ethereum,
            Self::Hbar => KeyType::Hedera,
        }
    }

    /// Registered BIP-44 coin type on mainnet
    pub fn mainnet_coin_type(&self) -> u32 {
        match self {
            Self::Btc => 0,
            Self::Bch => 145,
            Self::Bsv => 236,
            Self::Ltc => 2,
            Self::Doge => 3,
            Self::Eth => 60,
            Self::Hbar => hedera::HEDERA_COIN_TYPE,
        }
    }

    /// Whether the network needs an out-of-band setup before first use
    pub fn requires_initialization(&self) -> bool {
        match self {
            Self::Hbar => true,
            Self::Btc | Self::Bch | Self::Bsv | Self::Ltc | Self::Doge | Self::Eth => false,
        }
    }

    /// Address schemes this network can present, preferred first
    pub fn supported_address_schemes(&self) -> &'static [AddressScheme] {
        match self {
            Self::Btc | Self::Ltc => &[AddressScheme::BtcSegwit, AddressScheme::BtcLegacy],
            Self::Bch => &[AddressScheme::Native, AddressScheme::BtcLegacy],
            Self::Bsv | Self::Doge => &[AddressScheme::BtcLegacy],
            Self::Eth | Self::Hbar => &[AddressScheme::Native],
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s).ok_or_else(|| Error::InvalidInput(format!("Unknown network code: {}", s)))
    }
}

/// Base58Check version bytes for legacy addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base58Prefixes {
    pub pubkey_hash: u8,
    pub script_hash: u8,
}

/// A network type together with its mainnet/testnet flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    network_type: NetworkType,
    is_mainnet: bool,
}

impl Network {
    pub fn new(network_type: NetworkType, is_mainnet: bool) -> Self {
        Self { network_type, is_mainnet }
    }

    pub fn mainnet(network_type: NetworkType) -> Self {
        Self::new(network_type, true)
    }

    pub fn testnet(network_type: NetworkType) -> Self {
        Self::new(network_type, false)
    }

    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    /// BIP-44 coin type. Bitcoin-family testnets share coin type 1.
    pub fn coin_type(&self) -> u32 {
        match self.network_type {
            NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv | NetworkType::Ltc | NetworkType::Doge
                if !self.is_mainnet =>
            {
                TESTNET_COIN_TYPE
            }
            network_type => network_type.mainnet_coin_type(),
        }
    }

    /// Path of the account-level key
    pub fn account_path(&self) -> Vec<u32> {
        match self.network_type {
            NetworkType::Hbar => hedera::account_path().to_vec(),
            _ => vec![BIP44_PURPOSE + HARDENED, self.coin_type() + HARDENED, HARDENED],
        }
    }

    /// BIP-32 version bytes for extended public keys
    pub fn xpub_version(&self) -> Option<[u8; 4]> {
        let version: u32 = match (self.network_type, self.is_mainnet) {
            (NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv | NetworkType::Eth, true) => 0x0488_b21e,
            (NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv | NetworkType::Eth, false) => 0x0435_87cf,
            (NetworkType::Ltc, true) => 0x019d_a462,
            (NetworkType::Ltc, false) => 0x0436_f6e1,
            (NetworkType::Doge, true) => 0x02fa_cafd,
            (NetworkType::Doge, false) => 0x0432_a9a8,
            (NetworkType::Hbar, _) => return None,
        };
        Some(version.to_be_bytes())
    }

    /// Legacy Base58Check address prefixes
    pub fn base58_prefixes(&self) -> Option<Base58Prefixes> {
        let (pubkey_hash, script_hash) = match (self.network_type, self.is_mainnet) {
            (NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv, true) => (0x00, 0x05),
            (NetworkType::Btc | NetworkType::Bch | NetworkType::Bsv, false) => (0x6f, 0xc4),
            (NetworkType::Ltc, true) => (0x30, 0x32),
            (NetworkType::Ltc, false) => (0x6f, 0x3a),
            (NetworkType::Doge, true) => (0x1e, 0x16),
            (NetworkType::Doge, false) => (0x71, 0xc4),
            (NetworkType::Eth | NetworkType::Hbar, _) => return None,
        };
        Some(Base58Prefixes { pubkey_hash, script_hash })
    }

    /// Human readable part of segwit addresses
    pub fn segwit_hrp(&self) -> Option<&'static str> {
        match (self.network_type, self.is_mainnet) {
            (NetworkType::Btc, true) => Some("bc"),
            (NetworkType::Btc, false) => Some("tb"),
            (NetworkType::Ltc, true) => Some("ltc"),
            (NetworkType::Ltc, false) => Some("tltc"),
            _ => None,
        }
    }

    /// CashAddr prefix
    pub fn cashaddr_prefix(&self) -> Option<&'static str> {
        match (self.network_type, self.is_mainnet) {
            (NetworkType::Bch, true) => Some("bitcoincash"),
            (NetworkType::Bch, false) => Some("bchtest"),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.is_mainnet { "mainnet" } else { "testnet" };
        write!(f, "{}-{}", self.network_type, suffix)
    }
}
