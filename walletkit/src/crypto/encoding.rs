//! Hashing and Base58Check helpers shared by key and address encoding

use bitcoin::hashes::{hash160, Hash};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Length of the Base58Check checksum suffix
const CHECKSUM_LEN: usize = 4;

/// SHA-256 applied twice
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// RIPEMD-160 of SHA-256, the Bitcoin key and script hash
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// Encode `payload` with a trailing 4 byte double SHA-256 checksum
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d(payload);

    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..CHECKSUM_LEN]);

    bs58::encode(data).into_string()
}

/// Decode a Base58Check string, verifying and stripping the checksum
pub fn base58check_decode(encoded: &str) -> Result<Vec<u8>> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Error::Address(format!("Invalid base58: {}", e)))?;

    if data.len() < CHECKSUM_LEN {
        return Err(Error::Address("Base58 data too short for checksum".to_string()));
    }

    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if sha256d(payload)[..CHECKSUM_LEN] != *checksum {
        return Err(Error::Address("Base58 checksum mismatch".to_string()));
    }

    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256d() {
        // sha256d("hello")
        assert_eq!(
            hex::encode(sha256d(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_hash160_of_genesis_pubkey() {
        let pubkey = hex::decode(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_base58check() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap());

        let encoded = base58check_encode(&payload);
        assert_eq!(encoded, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(base58check_decode(&encoded).unwrap(), payload);

        assert!(base58check_decode("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMJ").is_err());
        assert!(base58check_decode("0OIl").is_err());
        assert!(base58check_decode("1").is_err());
    }
}
