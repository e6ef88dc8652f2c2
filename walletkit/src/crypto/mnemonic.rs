//! Mnemonic phrase generation and handling
//!
//! Phrases are generated and validated against a caller-supplied, locale
//! specific BIP-39 word list. The list must hold exactly
//! [`BIP39_WORDLIST_COUNT`] words; anything else is a packaging defect and
//! panics rather than producing a weakened phrase.

use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Number of words in every BIP-39 dictionary
pub const BIP39_WORDLIST_COUNT: usize = 2048;

const SEED_ROUNDS: u32 = 2048;

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16,
            Self::Words24 => 32,
        }
    }

    /// Number of words in a phrase of this strength
    pub fn word_count(&self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words24 => 24,
        }
    }

    /// Parse a word count into a strength
    pub fn from_word_count(count: usize) -> Option<Self> {
        match count {
            12 => Some(Self::Words12),
            24 => Some(Self::Words24),
            _ => None,
        }
    }
}

/// A 64-byte BIP-39 seed. Zeroized on drop; deliberately neither `Clone`
/// nor `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Returns the raw seed bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// The built-in English BIP-39 word list
pub fn english_word_list() -> &'static [&'static str] {
    bip39::Language::English.word_list()
}

/// Check that `words` has the size of a BIP-39 dictionary
pub fn validate_word_list<S: AsRef<str>>(words: &[S]) -> bool {
    words.len() == BIP39_WORDLIST_COUNT
}

fn assert_word_list<S: AsRef<str>>(words: &[S]) {
    assert!(
        validate_word_list(words),
        "BIP-39 word list must contain {} words, got {}",
        BIP39_WORDLIST_COUNT,
        words.len()
    );
}

/// Generate a 12 word phrase from `words` along with its generation time.
///
/// # Panics
///
/// Panics if `words` does not contain exactly [`BIP39_WORDLIST_COUNT`] words.
pub fn generate_phrase<S: AsRef<str>>(words: &[S]) -> (String, DateTime<Utc>) {
    generate_phrase_with_strength(words, MnemonicStrength::Words12)
}

/// Generate a phrase of the given strength from `words`.
///
/// # Panics
///
/// Panics if `words` does not contain exactly [`BIP39_WORDLIST_COUNT`] words.
pub fn generate_phrase_with_strength<S: AsRef<str>>(
    words: &[S],
    strength: MnemonicStrength,
) -> (String, DateTime<Utc>) {
    assert_word_list(words);

    let mut entropy = Zeroizing::new(vec![0u8; strength.entropy_bytes()]);
    OsRng.fill_bytes(&mut entropy);

    (entropy_to_phrase(&entropy, words), Utc::now())
}

/// Validate `phrase` as a BIP-39 mnemonic over `words`.
///
/// Malformed phrases (unknown words, bad length, bad checksum) yield `false`.
///
/// # Panics
///
/// Panics if `words` does not contain exactly [`BIP39_WORDLIST_COUNT`] words.
pub fn validate_phrase<S: AsRef<str>>(phrase: &str, words: &[S]) -> bool {
    assert_word_list(words);

    match phrase_to_entropy(phrase, words) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("phrase rejected: {}", e);
            false
        }
    }
}

/// Derive the BIP-39 seed for `phrase` and an optional passphrase.
///
/// Only whitespace is normalized; no Unicode NFKD is applied. Phrases from
/// word lists with non-ASCII words (French, Spanish, Japanese) must be
/// passed already NFKD-normalized, or the seed will differ from other
/// BIP-39 wallets.
pub fn phrase_to_seed(phrase: &str, passphrase: Option<&str>) -> Seed {
    let normalized = Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "));
    let salt = Zeroizing::new(format!("mnemonic{}", passphrase.unwrap_or("")));

    let mut seed = Seed([0u8; 64]);
    pbkdf2_hmac::<Sha512>(normalized.as_bytes(), salt.as_bytes(), SEED_ROUNDS, &mut seed.0);
    seed
}

/// Encode entropy as words: entropy bits followed by ENT/32 checksum bits,
/// read in 11 bit groups.
fn entropy_to_phrase<S: AsRef<str>>(entropy: &[u8], words: &[S]) -> String {
    let checksum = Sha256::digest(entropy);
    let entropy_bits = entropy.len() * 8;
    let total_bits = entropy_bits + entropy_bits / 32;

    let bit = |i: usize| -> u16 {
        let byte = if i < entropy_bits {
            entropy[i / 8]
        } else {
            checksum[(i - entropy_bits) / 8]
        };
        ((byte >> (7 - (i % 8))) & 1) as u16
    };

    (0..total_bits / 11)
        .map(|w| {
            let index = (0..11).fold(0u16, |acc, j| (acc << 1) | bit(w * 11 + j));
            words[index as usize].as_ref()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn phrase_to_entropy<S: AsRef<str>>(phrase: &str, words: &[S]) -> Result<Zeroizing<Vec<u8>>> {
    let indices = phrase
        .split_whitespace()
        .map(|word| {
            words
                .iter()
                .position(|candidate| candidate.as_ref() == word)
                .map(|index| index as u16)
                .ok_or_else(|| Error::Mnemonic("word not in list".to_string()))
        })
        .collect::<Result<Vec<u16>>>()?;

    if !matches!(indices.len(), 12 | 15 | 18 | 21 | 24) {
        return Err(Error::Mnemonic(format!(
            "invalid word count: {}",
            indices.len()
        )));
    }

    let total_bits = indices.len() * 11;
    let checksum_bits = total_bits / 33;
    let entropy_bits = total_bits - checksum_bits;
    let bit = |i: usize| -> u8 { ((indices[i / 11] >> (10 - (i % 11))) & 1) as u8 };

    let mut entropy = Zeroizing::new(vec![0u8; entropy_bits / 8]);
    for i in 0..entropy_bits {
        if bit(i) == 1 {
            entropy[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    let checksum = Sha256::digest(entropy.as_slice());
    for i in 0..checksum_bits {
        let expected = (checksum[i / 8] >> (7 - (i % 8))) & 1;
        if bit(entropy_bits + i) != expected {
            return Err(Error::Mnemonic("checksum mismatch".to_string()));
        }
    }

    Ok(entropy)
}
