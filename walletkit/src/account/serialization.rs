//! Account serialization
//!
//! Blob layout:
//!
//! ```text
//! magic "WKAC" (4) | version (1) | bincode payload | sha256d checksum (32)
//! ```
//!
//! The checksum covers everything before it. Versions 1 and 2 predate the
//! tagged key list and carry a fixed set of extended keys; version 3 is
//! written by [`serialize`]. Restoring and validating accept only version 3
//! with key material for every network. [`decode`] is lenient and reads any
//! recognized version, for callers that can fill gaps from the phrase.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::{Account, AccountKeys, AccountPublicKey};
use crate::crypto::encoding::sha256d;
use crate::crypto::keys::bitcoin::ExtendedPublicKey;
use crate::error::{Error, Result};
use crate::network::NetworkType;

/// Blob magic
pub const MAGIC: [u8; 4] = *b"WKAC";

/// Version written by [`serialize`]
pub const CURRENT_VERSION: u8 = 3;

const HEADER_LEN: usize = MAGIC.len() + 1;
const CHECKSUM_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct PayloadV1 {
    timestamp: i64,
    is_mainnet: bool,
    btc: ExtendedPublicKey,
    bch: ExtendedPublicKey,
    bsv: ExtendedPublicKey,
    ltc: ExtendedPublicKey,
    doge: ExtendedPublicKey,
}

#[derive(Serialize, Deserialize)]
struct PayloadV2 {
    timestamp: i64,
    is_mainnet: bool,
    btc: ExtendedPublicKey,
    bch: ExtendedPublicKey,
    bsv: ExtendedPublicKey,
    ltc: ExtendedPublicKey,
    doge: ExtendedPublicKey,
    eth: ExtendedPublicKey,
}

#[derive(Serialize, Deserialize)]
struct PayloadV3 {
    timestamp: i64,
    is_mainnet: bool,
    keys: Vec<(NetworkType, AccountPublicKey)>,
    initializations: Vec<(NetworkType, Vec<u8>)>,
}

/// The contents of a blob of any recognized version
#[derive(Debug)]
pub struct DecodedAccount {
    pub version: u8,
    pub timestamp: i64,
    pub is_mainnet: bool,
    pub keys: AccountKeys,
    pub initializations: BTreeMap<NetworkType, Vec<u8>>,
}

impl DecodedAccount {
    fn from_bitcoin_keys(
        version: u8,
        timestamp: i64,
        is_mainnet: bool,
        keys: impl IntoIterator<Item = (NetworkType, ExtendedPublicKey)>,
    ) -> Self {
        let mut account_keys = AccountKeys::default();
        for (network_type, key) in keys {
            account_keys.insert(network_type, AccountPublicKey::Extended(key));
        }

        Self {
            version,
            timestamp,
            is_mainnet,
            keys: account_keys,
            initializations: BTreeMap::new(),
        }
    }
}

/// Serialize an account in the current format
pub fn serialize(account: &Account) -> Result<Vec<u8>> {
    let payload = PayloadV3 {
        timestamp: account.timestamp.timestamp(),
        is_mainnet: account.is_mainnet,
        keys: account.keys.iter().map(|(network_type, key)| (*network_type, key.clone())).collect(),
        initializations: account
            .initializations
            .iter()
            .map(|(network_type, data)| (*network_type, data.clone()))
            .collect(),
    };

    let payload_bytes = bincode::serialize(&payload)
        .map_err(|e| Error::Serialization(format!("Failed to encode account: {}", e)))?;

    Ok(seal(CURRENT_VERSION, &payload_bytes))
}

/// Decode a blob of any recognized version
pub fn decode(bytes: &[u8]) -> Result<DecodedAccount> {
    let (version, payload) = open(bytes)?;

    match version {
        1 => {
            let p: PayloadV1 = decode_payload(payload)?;
            Ok(DecodedAccount::from_bitcoin_keys(
                version,
                p.timestamp,
                p.is_mainnet,
                [
                    (NetworkType::Btc, p.btc),
                    (NetworkType::Bch, p.bch),
                    (NetworkType::Bsv, p.bsv),
                    (NetworkType::Ltc, p.ltc),
                    (NetworkType::Doge, p.doge),
                ],
            ))
        }
        2 => {
            let p: PayloadV2 = decode_payload(payload)?;
            Ok(DecodedAccount::from_bitcoin_keys(
                version,
                p.timestamp,
                p.is_mainnet,
                [
                    (NetworkType::Btc, p.btc),
                    (NetworkType::Bch, p.bch),
                    (NetworkType::Bsv, p.bsv),
                    (NetworkType::Ltc, p.ltc),
                    (NetworkType::Doge, p.doge),
                    (NetworkType::Eth, p.eth),
                ],
            ))
        }
        3 => {
            let p: PayloadV3 = decode_payload(payload)?;

            let mut keys = AccountKeys::default();
            for (network_type, key) in p.keys {
                if keys.insert(network_type, key).is_some() {
                    return Err(Error::Serialization(format!("Duplicate key for {}", network_type)));
                }
            }

            let mut initializations = BTreeMap::new();
            for (network_type, data) in p.initializations {
                if !network_type.requires_initialization() {
                    return Err(Error::Serialization(format!(
                        "Unexpected initialization for {}",
                        network_type
                    )));
                }
                if initializations.insert(network_type, data).is_some() {
                    return Err(Error::Serialization(format!(
                        "Duplicate initialization for {}",
                        network_type
                    )));
                }
            }

            Ok(DecodedAccount {
                version,
                timestamp: p.timestamp,
                is_mainnet: p.is_mainnet,
                keys,
                initializations,
            })
        }
        other => Err(Error::Serialization(format!("Unknown serialization version: {}", other))),
    }
}

/// Restore an account from a current, complete serialization
pub fn restore(bytes: &[u8], uids: &str) -> Option<Account> {
    match restore_checked(bytes, uids) {
        Ok(account) => {
            tracing::info!(uids, "account restored from serialization");
            Some(account)
        }
        Err(e) => {
            tracing::debug!(uids, "serialization rejected: {}", e);
            None
        }
    }
}

/// Check that `bytes` is a current serialization of `account`, including
/// its initialization records
pub fn validate(account: &Account, bytes: &[u8]) -> bool {
    match decode_current(bytes) {
        Ok(decoded) => {
            decoded.timestamp == account.timestamp.timestamp()
                && decoded.is_mainnet == account.is_mainnet
                && decoded.keys == account.keys
                && decoded.initializations == account.initializations
        }
        Err(e) => {
            tracing::debug!("serialization failed validation: {}", e);
            false
        }
    }
}

fn restore_checked(bytes: &[u8], uids: &str) -> Result<Account> {
    let decoded = decode_current(bytes)?;

    let timestamp = DateTime::from_timestamp(decoded.timestamp, 0)
        .ok_or_else(|| Error::Serialization(format!("Timestamp out of range: {}", decoded.timestamp)))?;

    Ok(Account {
        uids: uids.to_string(),
        timestamp,
        is_mainnet: decoded.is_mainnet,
        keys: decoded.keys,
        initializations: decoded.initializations,
    })
}

/// Decode, requiring the current version and a complete key set
fn decode_current(bytes: &[u8]) -> Result<DecodedAccount> {
    let decoded = decode(bytes)?;

    if decoded.version != CURRENT_VERSION {
        return Err(Error::Serialization(format!(
            "Outdated serialization version {}, expected {}",
            decoded.version, CURRENT_VERSION
        )));
    }

    if !decoded.keys.is_complete() {
        return Err(Error::Serialization("Missing network key material".to_string()));
    }

    Ok(decoded)
}

fn decode_payload<T: Serialize + for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T> {
    let value: T = bincode::deserialize(payload)
        .map_err(|e| Error::Serialization(format!("Malformed payload: {}", e)))?;

    // Reject trailing bytes so that every accepted blob is canonical
    let consumed = bincode::serialized_size(&value)
        .map_err(|e| Error::Serialization(format!("Malformed payload: {}", e)))?;
    if consumed != payload.len() as u64 {
        return Err(Error::Serialization("Trailing bytes after payload".to_string()));
    }

    Ok(value)
}

/// Frame a payload with magic, version and checksum
fn seal(version: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(&MAGIC);
    bytes.push(version);
    bytes.extend_from_slice(payload);

    let checksum = sha256d(&bytes);
    bytes.extend_from_slice(&checksum);
    bytes
}

/// Check framing and checksum, returning the version and payload
fn open(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(Error::Serialization(format!("Serialization too short: {} bytes", bytes.len())));
    }

    if bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::Serialization("Bad magic".to_string()));
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if sha256d(body) != *checksum {
        return Err(Error::Serialization("Checksum mismatch".to_string()));
    }

    Ok((body[MAGIC.len()], &body[HEADER_LEN..]))
}

/// Write a version 1 or 2 blob, as produced before the tagged key list
#[cfg(test)]
pub(crate) fn encode_legacy(account: &Account, version: u8) -> Vec<u8> {
    let key = |network_type| account.keys.extended(network_type).cloned().expect("bitcoin-family key");
    let payload = match version {
        1 => bincode::serialize(&PayloadV1 {
            timestamp: account.timestamp.timestamp(),
            is_mainnet: account.is_mainnet,
            btc: key(NetworkType::Btc),
            bch: key(NetworkType::Bch),
            bsv: key(NetworkType::Bsv),
            ltc: key(NetworkType::Ltc),
            doge: key(NetworkType::Doge),
        }),
        2 => bincode::serialize(&PayloadV2 {
            timestamp: account.timestamp.timestamp(),
            is_mainnet: account.is_mainnet,
            btc: key(NetworkType::Btc),
            bch: key(NetworkType::Bch),
            bsv: key(NetworkType::Bsv),
            ltc: key(NetworkType::Ltc),
            doge: key(NetworkType::Doge),
            eth: key(NetworkType::Eth),
        }),
        other => panic!("no legacy layout for version {}", other),
    };
    seal(version, &payload.expect("legacy payload"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const LEGAL: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn account(phrase: &str) -> Account {
        let timestamp = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        Account::create_from_phrase(phrase, timestamp, "uid-1", true).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let original = account(ABANDON);
        let bytes = serialize(&original).unwrap();

        assert_eq!(&bytes[..4], b"WKAC");
        assert_eq!(bytes[4], CURRENT_VERSION);

        let restored = restore(&bytes, "uid-1").unwrap();
        assert_eq!(restored, original);
        assert!(validate(&original, &bytes));
    }

    #[test]
    fn test_serialization_is_canonical() {
        assert_eq!(serialize(&account(ABANDON)).unwrap(), serialize(&account(ABANDON)).unwrap());
    }

    #[test]
    fn test_validate_rejects_other_account() {
        let bytes = serialize(&account(LEGAL)).unwrap();
        assert!(!validate(&account(ABANDON), &bytes));
    }

    #[test]
    fn test_rejects_corruption() {
        let bytes = serialize(&account(ABANDON)).unwrap();

        let mut flipped = bytes.clone();
        flipped[20] ^= 0x01;
        assert!(restore(&flipped, "uid-1").is_none());

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(restore(&bad_magic, "uid-1").is_none());

        assert!(restore(&bytes[..bytes.len() - 1], "uid-1").is_none());
        assert!(restore(&[], "uid-1").is_none());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let bytes = serialize(&account(ABANDON)).unwrap();
        let payload = &bytes[HEADER_LEN..bytes.len() - CHECKSUM_LEN];

        let future = seal(4, payload);
        assert!(decode(&future).is_err());
        assert!(restore(&future, "uid-1").is_none());
    }

    #[test]
    fn test_rejects_trailing_payload_bytes() {
        let bytes = serialize(&account(ABANDON)).unwrap();
        let mut payload = bytes[HEADER_LEN..bytes.len() - CHECKSUM_LEN].to_vec();
        payload.push(0);

        assert!(decode(&seal(CURRENT_VERSION, &payload)).is_err());
    }

    #[test]
    fn test_old_versions_decode_but_do_not_restore() {
        let original = account(ABANDON);

        for (version, bytes) in [(1, encode_legacy(&original, 1)), (2, encode_legacy(&original, 2))] {
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.version, version);
            assert_eq!(decoded.keys.extended(NetworkType::Btc), original.keys().extended(NetworkType::Btc));
            assert!(decoded.keys.get(NetworkType::Hbar).is_none());

            assert!(restore(&bytes, "uid-1").is_none());
            assert!(!validate(&original, &bytes));
        }

        assert!(decode(&encode_legacy(&original, 1)).unwrap().keys.get(NetworkType::Eth).is_none());
        assert!(decode(&encode_legacy(&original, 2)).unwrap().keys.get(NetworkType::Eth).is_some());
    }

    #[test]
    fn test_rejects_incomplete_current_version() {
        let original = account(ABANDON);
        let payload = PayloadV3 {
            timestamp: original.timestamp().timestamp(),
            is_mainnet: true,
            keys: vec![(
                NetworkType::Btc,
                AccountPublicKey::Extended(original.keys().extended(NetworkType::Btc).unwrap().clone()),
            )],
            initializations: Vec::new(),
        };
        let bytes = seal(CURRENT_VERSION, &bincode::serialize(&payload).unwrap());

        assert!(decode(&bytes).is_ok());
        assert!(restore(&bytes, "uid-1").is_none());
    }

    #[test]
    fn test_rejects_mismatched_key_shape() {
        let original = account(ABANDON);
        let mut keys: Vec<_> = original.keys().iter().map(|(n, k)| (*n, k.clone())).collect();
        for (network_type, key) in keys.iter_mut() {
            if *network_type == NetworkType::Hbar {
                *key = AccountPublicKey::Extended(original.keys().extended(NetworkType::Btc).unwrap().clone());
            }
        }
        let payload = PayloadV3 {
            timestamp: original.timestamp().timestamp(),
            is_mainnet: true,
            keys,
            initializations: Vec::new(),
        };

        assert!(restore(&seal(CURRENT_VERSION, &bincode::serialize(&payload).unwrap()), "uid-1").is_none());
    }
}
