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

//! Encode/decode one CoAP datagram: header, token, sorted delta-encoded
//! options, and payload (RFC 7252 §3).

use thiserror::Error;

use super::message::{Code, Message, MessageId, Token, Type};
use super::primitive::uint_to_bytes;

const VERSION: u8 = 1;
const PAYLOAD_MARKER: u8 = 0xFF;

/// Codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Token requires more than 8 bytes to encode.
    #[error("token too long: requires more than 8 bytes")]
    TokenTooLong,
}

impl From<super::message::TokenError> for EncodeError {
    fn from(_: super::message::TokenError) -> Self {
        EncodeError::TokenTooLong
    }
}

/// Decode errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than 4 bytes were supplied.
    #[error("datagram shorter than the 4-byte header")]
    TooShort,
    /// The version bits were not `1`.
    #[error("unsupported CoAP version")]
    UnsupportedVersion,
    /// The declared token length runs past the end of the datagram.
    #[error("token length exceeds datagram")]
    TruncatedToken,
    /// The declared token length was greater than 8, the maximum CoAP
    /// allows (RFC 7252 §3 reserves 9-15).
    #[error("token length exceeds the 8-byte maximum")]
    InvalidTokenLength,
    /// An option's delta or length nibble was the reserved value `15`.
    #[error("reserved option nibble (15) encountered")]
    ReservedOptionNibble,
    /// An option's extended delta/length bytes ran past the end of the
    /// datagram.
    #[error("truncated option header")]
    TruncatedOptionHeader,
    /// An option's value bytes ran past the end of the datagram.
    #[error("truncated option value")]
    TruncatedOptionValue,
}

/// Encodes `msg` to its wire form.
///
/// Options are emitted in strictly ascending option-number order; multiple
/// values of a repeatable option are each emitted as their own on-wire
/// option, in the order they appear in [`Message::options`].
pub fn encode(msg: &Message) -> Result<Vec<u8>, EncodeError> {
    let token_bytes = uint_to_bytes(msg.token.0);
    if token_bytes.len() > 8 {
        return Err(EncodeError::TokenTooLong);
    }

    let mut out = Vec::with_capacity(4 + token_bytes.len() + 16);
    out.push((VERSION << 6) | (msg.mtype.to_bits() << 4) | (token_bytes.len() as u8));
    out.push(msg.code.to_byte());
    out.extend_from_slice(&msg.message_id.to_be_bytes());
    out.extend_from_slice(&token_bytes);

    let mut prev_number: u32 = 0;
    for (&number, values) in msg.options.iter() {
        for value in values.iter() {
            let delta = u32::from(number) - prev_number;
            prev_number = u32::from(number);
            encode_option(&mut out, delta, value);
        }
    }

    if let Some(payload) = &msg.payload {
        out.push(PAYLOAD_MARKER);
        out.extend_from_slice(payload);
    }

    Ok(out)
}

fn encode_option(out: &mut Vec<u8>, delta: u32, value: &[u8]) {
    let (delta_nibble, delta_ext) = split_nibble(delta);
    let (len_nibble, len_ext) = split_nibble(value.len() as u32);

    out.push((delta_nibble << 4) | len_nibble);
    out.extend_from_slice(&delta_ext);
    out.extend_from_slice(&len_ext);
    out.extend_from_slice(value);
}

/// Splits a delta or length into its wire nibble plus 0/1/2 extension
/// bytes, per RFC 7252's option delta/length nibble scheme.
fn split_nibble(v: u32) -> (u8, Vec<u8>) {
    if v <= 12 {
        (v as u8, Vec::new())
    } else if v <= 12 + 255 {
        (13, vec![(v - 13) as u8])
    } else {
        let ext = (v - 269) as u16;
        (14, ext.to_be_bytes().to_vec())
    }
}

/// Decodes one CoAP datagram.
///
/// Accepts a `0xFF` payload marker followed by zero bytes as "no payload"
/// rather than rejecting it, tolerating a class of malformed encoders
/// some deployed stacks emit (see `DESIGN.md`).
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    if bytes.len() < 4 {
        return Err(DecodeError::TooShort);
    }

    let header = bytes[0];
    if (header >> 6) != VERSION {
        return Err(DecodeError::UnsupportedVersion);
    }
    let mtype = Type::from_bits((header >> 4) & 0x03);
    let token_len = (header & 0x0F) as usize;
    if token_len > 8 {
        return Err(DecodeError::InvalidTokenLength);
    }

    let code = Code::from_byte(bytes[1]);
    let message_id: MessageId = u16::from_be_bytes([bytes[2], bytes[3]]);

    let token_start = 4;
    let token_end = token_start + token_len;
    if token_end > bytes.len() {
        return Err(DecodeError::TruncatedToken);
    }
    let token = Token(super::primitive::uint_from_bytes(&bytes[token_start..token_end]).unwrap_or(0));

    let mut options = super::message::Options::new();
    let mut idx = token_end;
    let mut option_number: u32 = 0;

    while idx < bytes.len() {
        if bytes[idx] == PAYLOAD_MARKER {
            idx += 1;
            break;
        }

        let byte = bytes[idx];
        idx += 1;
        let mut delta = u32::from(byte >> 4);
        let mut length = u32::from(byte & 0x0F);

        if delta == 15 || length == 15 {
            return Err(DecodeError::ReservedOptionNibble);
        }

        delta = read_extension(bytes, &mut idx, delta)?;
        length = read_extension(bytes, &mut idx, length)?;

        option_number += delta;

        let value_end = idx + length as usize;
        if value_end > bytes.len() {
            return Err(DecodeError::TruncatedOptionValue);
        }
        options
            .entry(option_number as u16)
            .or_default()
            .push(bytes[idx..value_end].to_vec());
        idx = value_end;
    }

    let payload = if idx < bytes.len() {
        Some(bytes[idx..].to_vec())
    } else {
        None
    };

    Ok(Message {
        mtype,
        code,
        message_id,
        token,
        options,
        payload,
    })
}

/// Resolves a raw 4-bit delta/length nibble to its true value, consuming
/// 0/1/2 extension bytes as required by the nibble.
fn read_extension(bytes: &[u8], idx: &mut usize, nibble: u32) -> Result<u32, DecodeError> {
    match nibble {
        13 => {
            if *idx >= bytes.len() {
                return Err(DecodeError::TruncatedOptionHeader);
            }
            let v = u32::from(bytes[*idx]) + 13;
            *idx += 1;
            Ok(v)
        }
        14 => {
            if *idx + 1 >= bytes.len() {
                return Err(DecodeError::TruncatedOptionHeader);
            }
            let v = u32::from(u16::from_be_bytes([bytes[*idx], bytes[*idx + 1]])) + 269;
            *idx += 2;
            Ok(v)
        }
        n => Ok(n),
    }
}
