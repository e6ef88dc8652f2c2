//! CashAddr encoding used by Bitcoin Cash
//!
//! `prefix:payload` where the payload is base32 over a version byte plus the
//! hash, followed by a 40 bit BCH checksum that also commits to the prefix.

use crate::error::{Error, Result};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;

/// Kind of hash carried by a CashAddr payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashAddrType {
    PubKeyHash,
    ScriptHash,
}

impl CashAddrType {
    fn bits(&self) -> u8 {
        match self {
            Self::PubKeyHash => 0,
            Self::ScriptHash => 1,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::PubKeyHash),
            1 => Some(Self::ScriptHash),
            _ => None,
        }
    }
}

fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut out: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    out.push(0);
    out
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        let value = u32::from(value);
        if value >> from != 0 {
            return None;
        }
        acc = (acc << from) | value;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max) as u8);
        }
    } else if bits >= from || (acc << (to - bits)) & max != 0 {
        return None;
    }

    Some(out)
}

fn size_code(hash_len: usize) -> Option<u8> {
    match hash_len {
        20 => Some(0),
        24 => Some(1),
        28 => Some(2),
        32 => Some(3),
        40 => Some(4),
        48 => Some(5),
        56 => Some(6),
        64 => Some(7),
        _ => None,
    }
}

/// Encode `hash` as `prefix:payload`
pub fn encode(prefix: &str, kind: CashAddrType, hash: &[u8]) -> Result<String> {
    let size = size_code(hash.len())
        .ok_or_else(|| Error::Address(format!("Invalid CashAddr hash length: {}", hash.len())))?;

    let mut versioned = Vec::with_capacity(hash.len() + 1);
    versioned.push((kind.bits() << 3) | size);
    versioned.extend_from_slice(hash);

    let mut payload = convert_bits(&versioned, 8, 5, true)
        .ok_or_else(|| Error::Address("CashAddr conversion failed".to_string()))?;

    let mut checked = expand_prefix(prefix);
    checked.extend_from_slice(&payload);
    checked.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let checksum = polymod(&checked);
    payload.extend((0..CHECKSUM_LEN).map(|i| ((checksum >> (5 * (7 - i))) & 0x1f) as u8));

    let body: String = payload.iter().map(|&v| CHARSET[v as usize] as char).collect();
    Ok(format!("{}:{}", prefix, body))
}

/// Decode a CashAddr string for `expected_prefix`. The prefix may be
/// omitted; mixed case is rejected.
pub fn decode(address: &str, expected_prefix: &str) -> Result<(CashAddrType, Vec<u8>)> {
    let has_lower = address.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = address.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(Error::Address("Mixed case CashAddr".to_string()));
    }

    let address = address.to_ascii_lowercase();
    let (prefix, body) = match address.split_once(':') {
        Some((prefix, body)) => (prefix, body),
        None => (expected_prefix, address.as_str()),
    };

    if prefix != expected_prefix {
        return Err(Error::Address(format!("Unexpected CashAddr prefix: {}", prefix)));
    }

    let values = body
        .bytes()
        .map(|b| CHARSET.iter().position(|&c| c == b).map(|p| p as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| Error::Address("Invalid CashAddr character".to_string()))?;

    if values.len() <= CHECKSUM_LEN {
        return Err(Error::Address("CashAddr too short".to_string()));
    }

    let mut checked = expand_prefix(prefix);
    checked.extend_from_slice(&values);
    if polymod(&checked) != 0 {
        return Err(Error::Address("CashAddr checksum mismatch".to_string()));
    }

    let data = convert_bits(&values[..values.len() - CHECKSUM_LEN], 5, 8, false)
        .ok_or_else(|| Error::Address("Invalid CashAddr padding".to_string()))?;

    let (version, hash) = data
        .split_first()
        .ok_or_else(|| Error::Address("Empty CashAddr payload".to_string()))?;

    if version & 0x80 != 0 || size_code(hash.len()) != Some(version & 0x07) {
        return Err(Error::Address("Invalid CashAddr version byte".to_string()));
    }

    let kind = CashAddrType::from_bits((version >> 3) & 0x0f)
        .ok_or_else(|| Error::Address("Unknown CashAddr type".to_string()))?;

    Ok((kind, hash.to_vec()))
}
