//! Ethereum addresses
//!
//! Keys are derived by the shared secp256k1 path in [`super::bitcoin`]; this
//! module turns a public key into an account address and handles EIP-55
//! mixed-case checksums.

use secp256k1::PublicKey as Secp256k1PublicKey;
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};

/// Length of an uncompressed secp256k1 public key
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Address from a compressed or uncompressed secp256k1 key
pub fn address_from_public_key(public_key: &[u8]) -> Result<[u8; 20]> {
    let public_key = Secp256k1PublicKey::from_slice(public_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid Ethereum public key: {}", e)))?;

    address_from_uncompressed(&public_key.serialize_uncompressed())
}

/// Address from a 65 byte uncompressed key: last 20 bytes of the Keccak-256
/// of the key without its 0x04 prefix.
pub fn address_from_uncompressed(public_key: &[u8]) -> Result<[u8; 20]> {
    if public_key.len() != UNCOMPRESSED_PUBLIC_KEY_LEN || public_key[0] != 0x04 {
        return Err(Error::KeyDerivation("Invalid Ethereum public key length".to_string()));
    }

    let key_hash = keccak256(&public_key[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&key_hash[12..]);
    Ok(address)
}

/// Format an address with its EIP-55 checksum casing
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let body: String = lower
        .chars()
        .enumerate()
        .map(|(i, ch)| {
            if ch.is_ascii_alphabetic() && hash_nibble(&hash, i) >= 8 {
                ch.to_ascii_uppercase()
            } else {
                ch
            }
        })
        .collect();

    format!("0x{}", body)
}

/// Check the EIP-55 casing of the 40 hex digits of an address
pub fn verify_checksum(hex_digits: &str) -> bool {
    let hash = keccak256(hex_digits.to_ascii_lowercase().as_bytes());

    hex_digits.chars().enumerate().all(|(i, ch)| {
        !ch.is_ascii_alphabetic() || ch.is_ascii_uppercase() == (hash_nibble(&hash, i) >= 8)
    })
}

fn hash_nibble(hash: &[u8; 32], i: usize) -> u8 {
    let byte = hash[i / 2];
    if i % 2 == 0 {
        byte >> 4
    } else {
        byte & 0x0f
    }
}

/// Calculate the Keccak-256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let mut address = [0u8; 20];
            address.copy_from_slice(&hex::decode(&expected[2..].to_lowercase()).unwrap());

            assert_eq!(to_checksum_address(&address), expected);
            assert!(verify_checksum(&expected[2..]));
        }

        assert!(!verify_checksum("5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn test_rejects_invalid_keys() {
        assert!(address_from_uncompressed(&[4; 64]).is_err());
        assert!(address_from_uncompressed(&[2; 33]).is_err());
        assert!(address_from_public_key(&[0; 33]).is_err());
    }

    #[test]
    fn test_compressed_and_uncompressed_agree() {
        let compressed = hex::decode("0237b0bb7a8288d38ed49a524b5dc98cff3eb5ca824c9f9dc0dfdb3d9cd600f299").unwrap();
        let uncompressed = Secp256k1PublicKey::from_slice(&compressed).unwrap().serialize_uncompressed();

        let address = address_from_public_key(&compressed).unwrap();
        assert_eq!(address, address_from_uncompressed(&uncompressed).unwrap());
        assert_eq!(to_checksum_address(&address), "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    }
}
