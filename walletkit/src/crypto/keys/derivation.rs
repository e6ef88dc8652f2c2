//! Common key derivation functionality

use serde::{Deserialize, Serialize};

/// Offset added to an index for hardened derivation
pub const HARDENED: u32 = 0x8000_0000;

/// Key families, by curve and public key encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// secp256k1, compressed public keys (Bitcoin and its forks)
    Bitcoin,
    /// secp256k1, addresses from the uncompressed key hash
    Ethereum,
    /// ed25519 via SLIP-10
    Hedera,
}

/// Format a parsed path in BIP-32 notation, e.g. `m/44'/0'/0'/1`
pub fn format_derivation_path(path: &[u32]) -> String {
    path.iter().fold("m".to_string(), |mut text, index| {
        if *index >= HARDENED {
            text.push_str(&format!("/{}'", index - HARDENED));
        } else {
            text.push_str(&format!("/{}", index));
        }
        text
    })
}
