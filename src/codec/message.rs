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

//! Message identity: [`Code`], [`Type`], token and message-id, and the
//! in-memory [`Message`] the wire codec (`codec::wire`) serializes.

use std::collections::BTreeMap;
use std::fmt;

use super::option_registry::{self, number, OptionFormat};
use super::primitive::{uint_from_bytes, uint_to_bytes};

/// The four CoAP message types (RFC 7252 §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Confirmable: requires an ACK or RST.
    Confirmable,
    /// Non-confirmable: fire and forget.
    NonConfirmable,
    /// Acknowledgement.
    Acknowledgement,
    /// Reset.
    Reset,
}

impl Type {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            Type::Confirmable => 0,
            Type::NonConfirmable => 1,
            Type::Acknowledgement => 2,
            Type::Reset => 3,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Type {
        match bits & 0x03 {
            0 => Type::Confirmable,
            1 => Type::NonConfirmable,
            2 => Type::Acknowledgement,
            _ => Type::Reset,
        }
    }
}

/// A CoAP code: the `(class, detail)` pair packed into one wire byte as
/// `(class << 5) | detail`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code {
    /// 0-7.
    pub class: u8,
    /// 0-31.
    pub detail: u8,
}

impl Code {
    /// Builds a code from class and detail, as they appear in `c.dd`
    /// notation.
    pub const fn new(class: u8, detail: u8) -> Self {
        Self { class, detail }
    }

    pub(crate) fn to_byte(self) -> u8 {
        (self.class << 5) | (self.detail & 0x1F)
    }

    pub(crate) fn from_byte(b: u8) -> Self {
        Self {
            class: b >> 5,
            detail: b & 0x1F,
        }
    }

    /// Empty message (0.00): pings, and the auto-generated ACK/RST.
    pub const EMPTY: Code = Code::new(0, 0);
    /// GET.
    pub const GET: Code = Code::new(0, 1);
    /// POST.
    pub const POST: Code = Code::new(0, 2);
    /// PUT.
    pub const PUT: Code = Code::new(0, 3);
    /// DELETE.
    pub const DELETE: Code = Code::new(0, 4);
    /// 2.05 Content.
    pub const CONTENT: Code = Code::new(2, 5);
    /// 2.04 Changed.
    pub const CHANGED: Code = Code::new(2, 4);
    /// 2.03 Valid.
    pub const VALID: Code = Code::new(2, 3);
    /// 2.01 Created.
    pub const CREATED: Code = Code::new(2, 1);
    /// 4.04 Not Found.
    pub const NOT_FOUND: Code = Code::new(4, 4);
    /// 4.00 Bad Request.
    pub const BAD_REQUEST: Code = Code::new(4, 0);
    /// 5.00 Internal Server Error.
    pub const INTERNAL_SERVER_ERROR: Code = Code::new(5, 0);

    /// Whether this code's class marks it as a request (0.xx, nonzero
    /// detail) as opposed to empty or a response.
    pub fn is_request(self) -> bool {
        self.class == 0 && self.detail != 0
    }

    /// Whether this code is a response (2.xx-5.xx).
    pub fn is_response(self) -> bool {
        (2..=5).contains(&self.class)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.class, self.detail)
    }
}

/// Opaque request/response correlator, 0-2^64-1, encoded in the minimum
/// number of bytes (0-8); the value `0` is encoded in zero bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Token(pub u64);

/// A token could not be built from raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// More than 8 bytes were supplied; CoAP tokens are 0-8 bytes.
    #[error("token requires more than 8 bytes")]
    TooLong,
}

impl Token {
    /// The empty (zero-length) token.
    pub const EMPTY: Token = Token(0);

    /// Minimum byte length this token encodes to on the wire.
    pub fn byte_len(self) -> usize {
        uint_to_bytes(self.0).len()
    }

    /// Builds a token from a raw opaque byte string, as a caller relaying
    /// a token obtained from elsewhere would have it. Rejects inputs
    /// longer than 8 bytes rather than silently truncating.
    pub fn from_bytes(bytes: &[u8]) -> Result<Token, TokenError> {
        if bytes.len() > 8 {
            return Err(TokenError::TooLong);
        }
        Ok(Token(uint_from_bytes(bytes).unwrap_or(0)))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// 16-bit message identifier used for de-duplication and ACK matching.
pub type MessageId = u16;

/// Ordered option-number -> value-list map. Values for a repeatable option
/// keep insertion order.
pub type Options = BTreeMap<u16, Vec<Vec<u8>>>;

/// A decoded/in-memory CoAP message (version is always 1; the version bit
/// pattern lives only in the wire codec).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// CON/NON/ACK/RST.
    pub mtype: Type,
    /// Request/response/empty code.
    pub code: Code,
    /// 16-bit message id.
    pub message_id: MessageId,
    /// Request/response correlator.
    pub token: Token,
    /// Option number -> ordered values.
    pub options: Options,
    /// Payload bytes; `None` means absent (a zero-length payload is not a
    /// valid wire representation, see `codec::wire`).
    pub payload: Option<Vec<u8>>,
}

impl Message {
    /// A message with no options and no payload.
    pub fn new(mtype: Type, code: Code, message_id: MessageId, token: Token) -> Self {
        Self {
            mtype,
            code,
            message_id,
            token,
            options: Options::new(),
            payload: None,
        }
    }

    /// Appends one value to an option, preserving repeat order.
    pub fn add_option(&mut self, number: u16, value: Vec<u8>) -> &mut Self {
        self.options.entry(number).or_default().push(value);
        self
    }

    /// Sets the payload, replacing any existing one.
    pub fn set_payload(&mut self, payload: Vec<u8>) -> &mut Self {
        self.payload = Some(payload);
        self
    }

    /// The first value of `number`, if present.
    pub fn get_first(&self, number: u16) -> Option<&[u8]> {
        self.options.get(&number).and_then(|vs| vs.first()).map(Vec::as_slice)
    }

    /// All values of `number`, in wire order.
    pub fn get_all(&self, number: u16) -> &[Vec<u8>] {
        self.options.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A GET request for the given `/`-joined Uri-Path segments.
    pub fn get(mtype: Type, message_id: MessageId, token: Token, path: &[&str]) -> Self {
        let mut m = Self::new(mtype, Code::GET, message_id, token);
        for seg in path {
            m.add_option(number::URI_PATH, seg.as_bytes().to_vec());
        }
        m
    }

    /// A PUT request for the given `/`-joined Uri-Path segments and body.
    pub fn put(mtype: Type, message_id: MessageId, token: Token, path: &[&str], body: Vec<u8>) -> Self {
        let mut m = Self::new(mtype, Code::PUT, message_id, token);
        for seg in path {
            m.add_option(number::URI_PATH, seg.as_bytes().to_vec());
        }
        m.set_payload(body);
        m
    }

    /// An empty ACK mirroring `message_id`, no token, no options.
    pub fn empty_ack(message_id: MessageId) -> Self {
        Self::new(Type::Acknowledgement, Code::EMPTY, message_id, Token::EMPTY)
    }

    /// An empty RST mirroring `message_id`, no token, no options.
    pub fn empty_reset(message_id: MessageId) -> Self {
        Self::new(Type::Reset, Code::EMPTY, message_id, Token::EMPTY)
    }

    /// An empty Confirmable message used as a CoAP ping (keepalive probe).
    pub fn ping(message_id: MessageId) -> Self {
        Self::new(Type::Confirmable, Code::EMPTY, message_id, Token::EMPTY)
    }

    /// Sets the Observe option to `value` (0 = register, nonzero = sequence
    /// number / deregister signal for notifications).
    pub fn set_observe(&mut self, value: u32) -> &mut Self {
        self.options.remove(&number::OBSERVE);
        self.add_option(number::OBSERVE, uint_to_bytes(value as u64));
        self
    }

    /// This message's decoded Observe value (RFC 7641), if present.
    pub fn observe(&self) -> Option<u32> {
        self.typed_uint_option(number::OBSERVE).map(|v| v as u32)
    }

    /// Whether this message carries an Observe option whose decoded value
    /// is `0` (a fresh subscription request or the first notification).
    pub fn is_observation(&self) -> bool {
        self.observe() == Some(0)
    }

    /// The Max-Age the message declares, or the RFC default of 60s.
    pub fn max_age_secs(&self) -> u32 {
        self.typed_uint_option(number::MAX_AGE)
            .map(|v| v as u32)
            .unwrap_or(option_registry::DEFAULT_MAX_AGE_SECS)
    }

    /// This message's Uri-Path segments, in wire order, decoded as UTF-8.
    pub fn uri_path(&self) -> Vec<String> {
        self.typed_string_options(number::URI_PATH)
    }

    /// This message's Uri-Query entries, in wire order, decoded as UTF-8.
    pub fn uri_query(&self) -> Vec<String> {
        self.typed_string_options(number::URI_QUERY)
    }

    /// This message's Block1 option (RFC 7959), decoded, if present.
    pub fn block1(&self) -> Option<BlockOption> {
        self.typed_uint_option(number::BLOCK1).map(BlockOption::from_value)
    }

    /// This message's Block2 option (RFC 7959), decoded, if present.
    pub fn block2(&self) -> Option<BlockOption> {
        self.typed_uint_option(number::BLOCK2).map(BlockOption::from_value)
    }

    /// The first value of `number`, decoded as [`OptionFormat::Uint`].
    fn typed_uint_option(&self, number: u16) -> Option<u64> {
        self.get_first(number).map(|bytes| match option_value_as_format(number, bytes) {
            OptionValue::Uint(v) => v,
            _ => 0,
        })
    }

    /// Every value of `number`, decoded as [`OptionFormat::String`].
    fn typed_string_options(&self, number: u16) -> Vec<String> {
        self.get_all(number)
            .iter()
            .map(|bytes| match option_value_as_format(number, bytes) {
                OptionValue::Text(s) => s,
                _ => String::new(),
            })
            .collect()
    }

    /// Whether the message is still fresh at `now`, given `received_at`
    /// and its declared (or default) Max-Age.
    pub fn is_fresh(&self, received_at: std::time::Instant, now: std::time::Instant) -> bool {
        let max_age = std::time::Duration::from_secs(u64::from(self.max_age_secs()));
        now <= received_at + max_age
    }

    /// Cache-equivalence: same [`Code`], and for every option number that
    /// is *not* no-cache-key, the same ordered value sequence. Caller
    /// supplies whether the two messages share an endpoint; this function
    /// only compares message content.
    pub fn cache_key_eq(&self, other: &Message) -> bool {
        if self.code != other.code {
            return false;
        }
        let keys: std::collections::BTreeSet<u16> = self
            .options
            .keys()
            .chain(other.options.keys())
            .copied()
            .filter(|n| !option_registry::is_no_cache_key(*n))
            .collect();
        for n in keys {
            let a = self.options.get(&n).map(Vec::as_slice).unwrap_or(&[]);
            let b = other.options.get(&n).map(Vec::as_slice).unwrap_or(&[]);
            if a != b {
                return false;
            }
        }
        true
    }
}

/// Converts an option's raw bytes to the format its registered number
/// implies. Unknown options are always returned as opaque bytes.
pub fn option_value_as_format(number: u16, bytes: &[u8]) -> OptionValue {
    let format = option_registry::lookup(number).map(|k| k.format).unwrap_or(OptionFormat::Opaque);
    match format {
        OptionFormat::Empty => OptionValue::Empty,
        OptionFormat::Opaque => OptionValue::Opaque(bytes.to_vec()),
        OptionFormat::Uint => OptionValue::Uint(uint_from_bytes(bytes).unwrap_or(0)),
        OptionFormat::String => OptionValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// A decoded option value in its semantic format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// Zero-length value.
    Empty,
    /// Raw bytes.
    Opaque(Vec<u8>),
    /// Minimum-length big-endian unsigned integer.
    Uint(u64),
    /// UTF-8 text.
    Text(String),
}

/// A decoded Block1/Block2 option (RFC 7959 §2.2): block number, whether
/// more blocks follow, and the block size exponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockOption {
    /// Sequence number of this block.
    pub num: u32,
    /// Whether more blocks follow this one.
    pub more: bool,
    /// Block size as `2^(size_exponent + 4)` bytes, SZX 0-7.
    pub size_exponent: u8,
}

impl BlockOption {
    /// This block's size in bytes.
    pub fn size(self) -> u16 {
        1u16 << (self.size_exponent as u32 + 4)
    }

    fn from_value(v: u64) -> Self {
        Self {
            num: (v >> 4) as u32,
            more: (v & 0x8) != 0,
            size_exponent: (v & 0x7) as u8,
        }
    }
}

/// Known Content-Format values (RFC 7252 §12.3 and friends).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ContentFormat {
    /// text/plain;charset=utf-8.
    TextPlain = 0,
    /// application/link-format.
    LinkFormat = 40,
    /// application/xml.
    Xml = 41,
    /// application/octet-stream.
    OctetStream = 42,
    /// application/json.
    Json = 50,
    /// application/cbor.
    Cbor = 60,
}

impl ContentFormat {
    /// Looks up a known content-format by its numeric id.
    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => Self::TextPlain,
            40 => Self::LinkFormat,
            41 => Self::Xml,
            42 => Self::OctetStream,
            50 => Self::Json,
            60 => Self::Cbor,
            _ => return None,
        })
    }
}

impl Message {
    /// Sets the Content-Format option to a known value.
    pub fn set_content_format(&mut self, cf: ContentFormat) -> &mut Self {
        self.options.remove(&number::CONTENT_FORMAT);
        self.add_option(number::CONTENT_FORMAT, uint_to_bytes(cf as u64));
        self
    }

    /// Reads back a known Content-Format, if the option is present and
    /// recognized.
    pub fn content_format(&self) -> Option<ContentFormat> {
        self.get_first(number::CONTENT_FORMAT)
            .and_then(|b| uint_from_bytes(b).ok())
            .and_then(|v| ContentFormat::from_u16(v as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_display_matches_cdd_notation() {
        assert_eq!(Code::GET.to_string(), "0.01");
        assert_eq!(Code::CONTENT.to_string(), "2.05");
    }

    #[test]
    fn put_and_post_are_not_conflated() {
        assert_eq!(Code::PUT, Code::new(0, 3));
        assert_eq!(Code::POST, Code::new(0, 2));
        assert_ne!(Code::PUT, Code::POST);
    }

    #[test]
    fn token_byte_len_matches_minimal_encoding() {
        assert_eq!(Token(0).byte_len(), 0);
        assert_eq!(Token(0xAB).byte_len(), 1);
        assert_eq!(Token(0x1_0000).byte_len(), 3);
    }

    #[test]
    fn cache_key_ignores_no_cache_key_options() {
        let mut a = Message::new(Type::Confirmable, Code::GET, 1, Token(1));
        a.add_option(number::URI_PATH, b"a".to_vec());
        a.add_option(60, b"x".to_vec()); // Size1, no-cache-key

        let mut b = Message::new(Type::Confirmable, Code::GET, 2, Token(2));
        b.add_option(number::URI_PATH, b"a".to_vec());
        b.add_option(60, b"y".to_vec());

        assert!(a.cache_key_eq(&b));

        let mut c = b.clone();
        c.add_option(number::URI_PATH, b"different".to_vec());
        assert!(!a.cache_key_eq(&c));
    }

    #[test]
    fn observe_zero_is_an_observation() {
        let mut m = Message::new(Type::Confirmable, Code::GET, 1, Token(1));
        m.set_observe(0);
        assert!(m.is_observation());
        assert_eq!(m.observe(), Some(0));
        m.set_observe(5);
        assert!(!m.is_observation());
        assert_eq!(m.observe(), Some(5));
    }

    #[test]
    fn uri_path_and_query_decode_in_wire_order() {
        let m = Message::get(Type::Confirmable, 1, Token(1), &["a", "b", "c"]);
        assert_eq!(m.uri_path(), vec!["a", "b", "c"]);
        assert!(m.uri_query().is_empty());

        let mut q = Message::new(Type::Confirmable, Code::GET, 1, Token(1));
        q.add_option(number::URI_QUERY, b"first=1".to_vec());
        q.add_option(number::URI_QUERY, b"second=2".to_vec());
        assert_eq!(q.uri_query(), vec!["first=1", "second=2"]);
    }

    #[test]
    fn block_option_decodes_num_more_and_size() {
        let mut m = Message::new(Type::Confirmable, Code::GET, 1, Token(1));
        // NUM=5, M=1, SZX=6 (1024-byte blocks): (5 << 4) | 0x8 | 0x6 = 0x8E.
        m.add_option(number::BLOCK1, uint_to_bytes(0x8E));
        let block = m.block1().expect("block1 present");
        assert_eq!(block.num, 5);
        assert!(block.more);
        assert_eq!(block.size(), 1024);
        assert!(m.block2().is_none());
    }
}
