//! Asset ids: 16 raw bytes on the wire, canonical `8-4-4-4-12` lowercase hex as text.
//!
//! The first three groups are stored little-endian (byte-reversed); the last two are stored
//! in text order.

use crate::codec::{array, Accessor, CodecError};
use crate::numeric::uint8;

/// Byte index of each hex pair in text order.
const TEXT_ORDER: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// Dash positions in the 36-character form.
const DASHES: [usize; 4] = [8, 13, 18, 23];

fn hex_pair(byte: u8) -> String {
    format!("{:02x}", byte)
}

/// One byte as two lowercase hex characters.
pub fn hex_digit() -> impl Accessor<View = [u8], State = String> {
    uint8().try_map(hex_pair, |text: String| {
        let valid = text.len() == 2 && text.bytes().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(CodecError::InvalidUuid(text));
        }
        u8::from_str_radix(&text, 16).map_err(|_| CodecError::InvalidUuid(text))
    })
}

/// Canonical text from 16 hex pairs in stored byte order.
fn join_pairs(pairs: &[String]) -> String {
    let mut out = String::with_capacity(36);
    for (i, &index) in TEXT_ORDER.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        if let Some(pair) = pairs.get(index) {
            out.push_str(pair);
        }
    }
    out
}

pub fn hex_bytes_to_uuid_string(bytes: &[u8; 16]) -> String {
    join_pairs(&bytes.map(hex_pair))
}

/// Inverse of [`hex_bytes_to_uuid_string`]. Accepts either hex case.
pub fn uuid_string_to_hex_bytes(text: &str) -> Result<[u8; 16], CodecError> {
    let invalid = || CodecError::InvalidUuid(text.to_string());
    let chars = text.as_bytes();
    if chars.len() != 36 || DASHES.iter().any(|&i| chars[i] != b'-') {
        return Err(invalid());
    }
    let digits: Vec<u8> = chars
        .iter()
        .enumerate()
        .filter(|(i, _)| !DASHES.contains(i))
        .map(|(_, &c)| c)
        .collect();
    let mut out = [0u8; 16];
    for (pair, &index) in digits.chunks(2).zip(TEXT_ORDER.iter()) {
        let high = nibble(pair[0]).ok_or_else(invalid)?;
        let low = nibble(pair[1]).ok_or_else(invalid)?;
        out[index] = (high << 4) | low;
    }
    Ok(out)
}

fn nibble(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// 16 bytes at the cursor as a canonical UUID string.
///
/// Strings that are not canonical UUIDs fail on write with [`CodecError::InvalidUuid`].
pub fn uuid() -> impl Accessor<View = [u8], State = String> {
    let pairs = array((0..TEXT_ORDER.len()).map(|_| hex_digit()).collect());
    pairs.try_map(
        |pairs: Vec<String>| join_pairs(&pairs),
        |text: String| Ok(uuid_string_to_hex_bytes(&text)?.map(hex_pair).to_vec()),
    )
}
