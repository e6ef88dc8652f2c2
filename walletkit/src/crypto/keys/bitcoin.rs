//! Bitcoin-style key derivation (BIP-32 over secp256k1)
//!
//! Private derivation produces the account keys at creation time; public
//! derivation lets receive and change chains be computed later from the
//! serialized account keys alone.

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey as Secp256k1PublicKey, Scalar, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::encoding::{base58check_decode, base58check_encode, hash160};
use crate::error::{Error, Result};
use super::derivation::HARDENED;

/// Serialized size of a BIP-32 extended key
pub const EXTENDED_KEY_LEN: usize = 78;

/// Length of a compressed secp256k1 public key
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// A BIP-32 extended private key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedPrivateKey {
    secret_key: [u8; 32],
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
}

impl ExtendedPrivateKey {
    /// Derive the master key from a seed
    pub fn master(seed: &[u8]) -> Result<Self> {
        let (secret_key, chain_code) = hmac_sha512(b"Bitcoin seed", seed)?;
        SecretKey::from_slice(secret_key.as_slice())
            .map_err(|e| Error::KeyDerivation(format!("Invalid master key: {}", e)))?;

        Ok(Self {
            secret_key: *secret_key,
            chain_code,
            depth: 0,
            parent_fingerprint: [0; 4],
            child_number: 0,
        })
    }

    /// Derive a child key; indices at or above [`HARDENED`] are hardened
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        let secp = Secp256k1::new();
        let parent_secret_key = self.secret_key()?;
        let parent_public_key = Secp256k1PublicKey::from_secret_key(&secp, &parent_secret_key).serialize();

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if index >= HARDENED {
            data.push(0);
            data.extend_from_slice(&self.secret_key);
        } else {
            data.extend_from_slice(&parent_public_key);
        }
        data.extend_from_slice(&index.to_be_bytes());

        let (tweak, chain_code) = hmac_sha512(&self.chain_code, &data)?;

        // child = IL + k_par (mod n)
        let parent_scalar = Scalar::from_be_bytes(self.secret_key)
            .map_err(|_| Error::KeyDerivation("Parent key out of range".to_string()))?;
        let child_secret_key = SecretKey::from_slice(tweak.as_slice())
            .map_err(|e| Error::KeyDerivation(format!("Invalid child key: {}", e)))?
            .add_tweak(&parent_scalar)
            .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;

        Ok(Self {
            secret_key: child_secret_key.secret_bytes(),
            chain_code,
            depth: next_depth(self.depth)?,
            parent_fingerprint: fingerprint(&parent_public_key),
            child_number: index,
        })
    }

    /// Derive along a parsed path
    pub fn derive_path(&self, path: &[u32]) -> Result<Self> {
        path.iter().try_fold(self.clone(), |key, index| key.derive_child(*index))
    }

    fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.secret_key)
            .map_err(|e| Error::KeyDerivation(format!("Invalid secret key: {}", e)))
    }

    /// Neuter into the matching extended public key
    pub fn to_extended_public_key(&self) -> Result<ExtendedPublicKey> {
        let secp = Secp256k1::new();
        let public_key = Secp256k1PublicKey::from_secret_key(&secp, &self.secret_key()?);

        Ok(ExtendedPublicKey {
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            chain_code: self.chain_code,
            public_key: public_key.serialize().to_vec(),
        })
    }
}

/// A BIP-32 extended public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct ExtendedPublicKey {
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    public_key: Vec<u8>,
}

impl ExtendedPublicKey {
    /// The compressed public key
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The chain code
    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// Depth in the derivation tree
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Index this key was derived at
    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    /// First four bytes of HASH160 of the public key
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&self.public_key)
    }

    /// Derive a non-hardened child
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        if index >= HARDENED {
            return Err(Error::KeyDerivation(
                "Hardened derivation requires a private key".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(COMPRESSED_PUBLIC_KEY_LEN + 4);
        data.extend_from_slice(&self.public_key);
        data.extend_from_slice(&index.to_be_bytes());

        let (tweak, chain_code) = hmac_sha512(&self.chain_code, &data)?;
        let tweak = Scalar::from_be_bytes(*tweak)
            .map_err(|_| Error::KeyDerivation("Child tweak out of range".to_string()))?;

        let secp = Secp256k1::new();
        let child_public_key = Secp256k1PublicKey::from_slice(&self.public_key)
            .map_err(|e| Error::KeyDerivation(format!("Invalid public key: {}", e)))?
            .add_exp_tweak(&secp, &tweak)
            .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;

        Ok(Self {
            depth: next_depth(self.depth)?,
            parent_fingerprint: self.fingerprint(),
            child_number: index,
            chain_code,
            public_key: child_public_key.serialize().to_vec(),
        })
    }

    /// The 78 byte BIP-32 serialization under the given version bytes
    pub fn to_bytes(&self, version: [u8; 4]) -> [u8; EXTENDED_KEY_LEN] {
        let mut bytes = [0u8; EXTENDED_KEY_LEN];
        bytes[0..4].copy_from_slice(&version);
        bytes[4] = self.depth;
        bytes[5..9].copy_from_slice(&self.parent_fingerprint);
        bytes[9..13].copy_from_slice(&self.child_number.to_be_bytes());
        bytes[13..45].copy_from_slice(&self.chain_code);
        bytes[45..78].copy_from_slice(&self.public_key);
        bytes
    }

    /// Base58Check text form under the given version bytes
    pub fn encode(&self, version: [u8; 4]) -> String {
        base58check_encode(&self.to_bytes(version))
    }

    /// Parse a Base58Check extended public key, returning its version bytes
    pub fn decode(encoded: &str) -> Result<([u8; 4], Self)> {
        let bytes = base58check_decode(encoded)
            .map_err(|e| Error::KeyDerivation(format!("Invalid extended key: {}", e)))?;

        if bytes.len() != EXTENDED_KEY_LEN {
            return Err(Error::KeyDerivation(format!(
                "Invalid extended key length: {}",
                bytes.len()
            )));
        }

        Secp256k1PublicKey::from_slice(&bytes[45..78])
            .map_err(|e| Error::KeyDerivation(format!("Invalid public key: {}", e)))?;

        let mut version = [0u8; 4];
        let mut parent_fingerprint = [0u8; 4];
        let mut child_number = [0u8; 4];
        let mut chain_code = [0u8; 32];
        version.copy_from_slice(&bytes[0..4]);
        parent_fingerprint.copy_from_slice(&bytes[5..9]);
        child_number.copy_from_slice(&bytes[9..13]);
        chain_code.copy_from_slice(&bytes[13..45]);

        Ok((
            version,
            Self {
                depth: bytes[4],
                parent_fingerprint,
                child_number: u32::from_be_bytes(child_number),
                chain_code,
                public_key: bytes[45..78].to_vec(),
            },
        ))
    }

    /// Check that the stored key is a valid compressed secp256k1 point
    pub fn is_valid(&self) -> bool {
        self.public_key.len() == COMPRESSED_PUBLIC_KEY_LEN
            && Secp256k1PublicKey::from_slice(&self.public_key).is_ok()
    }
}

/// HASH160 of a compressed public key, as used by P2PKH and P2WPKH
pub fn public_key_hash(public_key: &[u8]) -> Result<[u8; 20]> {
    if public_key.len() != COMPRESSED_PUBLIC_KEY_LEN {
        return Err(Error::KeyDerivation("Invalid Bitcoin public key length".to_string()));
    }

    Secp256k1PublicKey::from_slice(public_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid Bitcoin public key: {}", e)))?;

    Ok(hash160(public_key))
}

fn fingerprint(public_key: &[u8]) -> [u8; 4] {
    let hash = hash160(public_key);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn next_depth(depth: u8) -> Result<u8> {
    depth
        .checked_add(1)
        .ok_or_else(|| Error::KeyDerivation("Maximum derivation depth exceeded".to_string()))
}

/// HMAC-SHA512 split into (IL, IR)
fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<(Zeroizing<[u8; 32]>, [u8; 32])> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;

    hmac.update(data);
    let result = hmac.finalize().into_bytes();

    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = [0u8; 32];
    left.copy_from_slice(&result[0..32]);
    right.copy_from_slice(&result[32..64]);

    Ok((left, right))
}
