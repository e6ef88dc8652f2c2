//! Hedera key derivation (SLIP-10 over ed25519)

use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use super::derivation::HARDENED;

/// Coin type registered for Hedera
pub const HEDERA_COIN_TYPE: u32 = 3030;

/// Length of an ed25519 public key
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Account key path `m/44'/3030'/0'/0'/0'`
pub fn account_path() -> [u32; 5] {
    [44 + HARDENED, HEDERA_COIN_TYPE + HARDENED, HARDENED, HARDENED, HARDENED]
}

/// Derive the ed25519 public key at a fully hardened path. The secret key
/// is wiped before returning.
pub fn derive_public_key(seed: &[u8], path: &[u32]) -> Result<[u8; ED25519_PUBLIC_KEY_LEN]> {
    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;

    for index in path {
        (secret_key, chain_code) = derive_child_key(&secret_key, &chain_code, *index)?;
    }

    let signing_key = SigningKey::from_bytes(&secret_key);
    Ok(VerifyingKey::from(&signing_key).to_bytes())
}

/// The 32 byte ed25519 account public key for a seed
pub fn derive_account_public_key(seed: &[u8]) -> Result<[u8; ED25519_PUBLIC_KEY_LEN]> {
    derive_public_key(seed, &account_path())
}

/// Check that bytes are a valid ed25519 public key
pub fn is_valid_public_key(bytes: &[u8]) -> bool {
    <[u8; ED25519_PUBLIC_KEY_LEN]>::try_from(bytes)
        .ok()
        .and_then(|key| VerifyingKey::from_bytes(&key).ok())
        .is_some()
}

type KeyAndChainCode = (Zeroizing<[u8; 32]>, [u8; 32]);

fn derive_master_key(seed: &[u8]) -> Result<KeyAndChainCode> {
    hmac_sha512(b"ed25519 seed", seed)
}

fn derive_child_key(parent_key: &[u8; 32], parent_chain_code: &[u8; 32], index: u32) -> Result<KeyAndChainCode> {
    // ed25519 has no public derivation
    if index < HARDENED {
        return Err(Error::KeyDerivation(format!(
            "Ed25519 derivation requires hardened indices, got {}",
            index
        )));
    }

    let mut data = Zeroizing::new(Vec::with_capacity(37));
    data.push(0);
    data.extend_from_slice(parent_key);
    data.extend_from_slice(&index.to_be_bytes());

    hmac_sha512(parent_chain_code, &data)
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<KeyAndChainCode> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;

    hmac.update(data);
    let result = hmac.finalize().into_bytes();

    let mut secret_key = Zeroizing::new([0u8; 32]);
    let mut chain_code = [0u8; 32];
    secret_key.copy_from_slice(&result[0..32]);
    chain_code.copy_from_slice(&result[32..64]);

    Ok((secret_key, chain_code))
}
