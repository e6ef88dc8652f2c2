//! Cryptographic primitives and operations
//!
//! Mnemonic generation, key derivation, and the hash and text encodings
//! shared by keys and addresses.

pub mod cashaddr;
pub mod encoding;
pub mod keys;
pub mod mnemonic;

pub use keys::*;
pub use mnemonic::*;
