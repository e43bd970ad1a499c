// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! Primitive value codecs: minimum-length unsigned integers, and the
//! opaque/string/uint option-value conversions CoAP options are built from.

use thiserror::Error;

/// Primitive codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `opaque_from_text` saw more than one 'x' separator.
    #[error("malformed opaque literal")]
    MalformedOpaque,
    /// Hex digits did not decode.
    #[error("invalid hex digits")]
    InvalidHex,
    /// `uint_from_bytes` input longer than a u64 can hold.
    #[error("unsigned integer value too wide")]
    TooWide,
}

/// Emits `v` as a big-endian byte string using the minimum number of bytes
/// needed to represent it; `0` encodes to zero bytes.
pub fn uint_to_bytes(v: u64) -> Vec<u8> {
    if v == 0 {
        return Vec::new();
    }
    let full = v.to_be_bytes();
    let first_nonzero = full.iter().position(|&b| b != 0).unwrap_or(full.len() - 1);
    full[first_nonzero..].to_vec()
}

/// Decodes a big-endian byte string into an unsigned integer. Empty input
/// decodes to `0`.
pub fn uint_from_bytes(bs: &[u8]) -> Result<u64, PrimitiveError> {
    if bs.len() > 8 {
        return Err(PrimitiveError::TooWide);
    }
    let mut out: u64 = 0;
    for &b in bs {
        out = (out << 8) | u64::from(b);
    }
    Ok(out)
}

/// Parses an opaque literal of the form `"0xHEX"` or `"HEX"`. Rejects any
/// string containing more than one `'x'` character.
pub fn opaque_from_text(s: &str) -> Result<Vec<u8>, PrimitiveError> {
    if s.matches('x').count() > 1 {
        return Err(PrimitiveError::MalformedOpaque);
    }
    let hex_part = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex_part).map_err(|_| PrimitiveError::InvalidHex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_encodes_to_empty() {
        assert_eq!(uint_to_bytes(0), Vec::<u8>::new());
    }

    #[test]
    fn minimum_length_round_trip() {
        for v in [1u64, 0xAB, 0x1234, 0xFFFF, 0x1_0000, u64::MAX] {
            let bs = uint_to_bytes(v);
            let expected_len = ((64 - v.leading_zeros()) as usize).div_ceil(8);
            assert_eq!(bs.len(), expected_len, "value {v:#x}");
            assert_eq!(uint_from_bytes(&bs).unwrap(), v);
        }
    }

    #[test]
    fn empty_bytes_decode_to_zero() {
        assert_eq!(uint_from_bytes(&[]).unwrap(), 0);
    }

    #[test]
    fn opaque_accepts_prefixed_and_bare_hex() {
        assert_eq!(opaque_from_text("0xAB01").unwrap(), vec![0xAB, 0x01]);
        assert_eq!(opaque_from_text("AB01").unwrap(), vec![0xAB, 0x01]);
    }

    #[test]
    fn opaque_rejects_multiple_x() {
        assert_eq!(
            opaque_from_text("0x0x01"),
            Err(PrimitiveError::MalformedOpaque)
        );
    }
}
