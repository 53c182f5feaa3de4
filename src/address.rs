//! Bech32m addresses (`xch1…`, `txch1…`) for 32-byte puzzle hashes.

use thiserror::Error;

/// Prefixes accepted for address literals.
pub const PREFIXES: &[&str] = &["xch", "txch"];

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc8_30a3;
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address has no `1` separator")]
    MissingSeparator,
    #[error("unknown address prefix `{0}`")]
    UnknownPrefix(String),
    #[error("invalid character {0:?} in address")]
    InvalidChar(char),
    #[error("address mixes upper and lower case")]
    MixedCase,
    #[error("address checksum mismatch")]
    Checksum,
    #[error("address payload is {0} bytes, expected 32")]
    Length(usize),
    #[error("address has non-zero padding bits")]
    Padding,
}

fn polymod(values: &[u8]) -> u32 {
    values.iter().fold(1u32, |chk, &v| {
        let top = chk >> 25;
        let mut chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(v);
        for (i, g) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
        chk
    })
}

fn expand_hrp(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut out: Vec<u8> = bytes.iter().map(|b| b >> 5).collect();
    out.push(0);
    out.extend(bytes.iter().map(|b| b & 0x1f));
    out
}

fn checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let mut values = expand_hrp(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; 6]);
    let pm = polymod(&values) ^ BECH32M_CONST;
    let mut out = [0u8; 6];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((pm >> (5 * (5 - i))) & 0x1f) as u8;
    }
    out
}

/// Regroup bits, e.g. 8-bit bytes into 5-bit groups.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, AddressError> {
    let mut acc = 0u32;
    let mut bits = 0u32;
    let mask = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & mask) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & mask) as u8);
        }
    } else if bits >= from || (acc << (to - bits)) & mask != 0 {
        return Err(AddressError::Padding);
    }
    Ok(out)
}

/// Encode a puzzle hash under `prefix`.
pub fn encode_address(puzzle_hash: &[u8; 32], prefix: &str) -> Result<String, AddressError> {
    if !PREFIXES.contains(&prefix) {
        return Err(AddressError::UnknownPrefix(prefix.to_string()));
    }
    let data = convert_bits(puzzle_hash, 8, 5, true)?;
    let check = checksum(prefix, &data);
    let mut out = String::with_capacity(prefix.len() + 1 + data.len() + 6);
    out.push_str(prefix);
    out.push('1');
    for d in data.iter().chain(check.iter()) {
        out.push(char::from(CHARSET[usize::from(*d)]));
    }
    Ok(out)
}

/// Decode an address into its prefix and 32-byte puzzle hash.
pub fn decode_address(address: &str) -> Result<(String, [u8; 32]), AddressError> {
    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressError::MixedCase);
    }
    let address = address.to_ascii_lowercase();
    let sep = address.rfind('1').ok_or(AddressError::MissingSeparator)?;
    let (hrp, rest) = (&address[..sep], &address[sep + 1..]);
    if !PREFIXES.contains(&hrp) {
        return Err(AddressError::UnknownPrefix(hrp.to_string()));
    }
    if rest.len() < 6 {
        return Err(AddressError::Checksum);
    }

    let mut values = Vec::with_capacity(rest.len());
    for ch in rest.chars() {
        let index = CHARSET
            .iter()
            .position(|&c| char::from(c) == ch)
            .ok_or(AddressError::InvalidChar(ch))?;
        values.push(index as u8);
    }
    let mut check = expand_hrp(hrp);
    check.extend_from_slice(&values);
    if polymod(&check) != BECH32M_CONST {
        return Err(AddressError::Checksum);
    }

    let data = &values[..values.len() - 6];
    let bytes = convert_bits(data, 5, 8, false)?;
    let hash: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AddressError::Length(bytes.len()))?;
    Ok((hrp.to_string(), hash))
}

/// Whether a string literal looks like an address rather than text.
pub fn looks_like_address(text: &str) -> bool {
    PREFIXES
        .iter()
        .any(|p| text.len() > p.len() + 1 && text.starts_with(p) && text[p.len()..].starts_with('1'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let hash = [0x5au8; 32];
        let address = encode_address(&hash, "xch").unwrap();
        assert!(address.starts_with("xch1"));
        assert_eq!(address.len(), 3 + 1 + 52 + 6);
        assert_eq!(decode_address(&address).unwrap(), ("xch".to_string(), hash));

        let testnet = encode_address(&hash, "txch").unwrap();
        assert_eq!(decode_address(&testnet).unwrap().0, "txch");
        assert_eq!(decode_address(&address.to_uppercase()).unwrap().1, hash);
    }

    #[test]
    fn test_zero_hash_vector() {
        let address = encode_address(&[0u8; 32], "xch").unwrap();
        assert_eq!(
            address,
            "xch1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqm6ks6e8mvy"
        );
    }

    #[test]
    fn test_rejects_corruption() {
        let mut address = encode_address(&[7u8; 32], "xch").unwrap();
        let last = address.pop().unwrap();
        address.push(if last == 'q' { 'p' } else { 'q' });
        assert_eq!(decode_address(&address), Err(AddressError::Checksum));

        assert_eq!(
            decode_address("btc1qqqqqq"),
            Err(AddressError::UnknownPrefix("btc".into()))
        );
        assert_eq!(decode_address("xchqqqq"), Err(AddressError::MissingSeparator));
        assert_eq!(decode_address("xch1qqqqqqb"), Err(AddressError::InvalidChar('b')));
        assert_eq!(decode_address("xch1Qqqqqqqq"), Err(AddressError::MixedCase));
    }

    #[test]
    fn test_looks_like_address() {
        assert!(looks_like_address("xch1abc"));
        assert!(looks_like_address("txch1abc"));
        assert!(!looks_like_address("xchange"));
        assert!(!looks_like_address("hello"));
    }
}
