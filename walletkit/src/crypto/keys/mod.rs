//! Key derivation and management
//!
//! secp256k1 keys (Bitcoin family and Ethereum) follow BIP-32; Hedera keys
//! follow SLIP-10 over ed25519.

pub mod bitcoin;
pub mod ethereum;
pub mod hedera;
mod derivation;

pub use derivation::*;
