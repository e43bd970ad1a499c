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

//! Known CoAP option numbers and their semantic predicates.
//!
//! Unknown options are preserved verbatim on both encode and decode; the
//! critical bit does not cause the codec to reject them. Higher layers may
//! choose to react to [`is_critical`].

/// Value format an option's bytes are interpreted as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionFormat {
    /// Zero-length value.
    Empty,
    /// Raw bytes, no further structure.
    Opaque,
    /// Minimum-length big-endian unsigned integer.
    Uint,
    /// UTF-8 text.
    String,
}

/// A statically known option.
#[derive(Clone, Copy, Debug)]
pub struct KnownOption {
    /// On-wire option number.
    pub number: u16,
    /// Human-readable name, for logging.
    pub name: &'static str,
    /// Wire value format.
    pub format: OptionFormat,
    /// Whether the option may repeat (appear more than once).
    pub repeatable: bool,
}

macro_rules! known_options {
    ($($number:expr => ($name:expr, $format:expr, $repeatable:expr)),+ $(,)?) => {
        /// The option numbers this codec recognizes by name.
        pub const KNOWN_OPTIONS: &[KnownOption] = &[
            $(KnownOption { number: $number, name: $name, format: $format, repeatable: $repeatable }),+
        ];
    };
}

known_options! {
    1  => ("If-Match", OptionFormat::Opaque, true),
    3  => ("Uri-Host", OptionFormat::String, false),
    4  => ("ETag", OptionFormat::Opaque, true),
    5  => ("If-None-Match", OptionFormat::Empty, false),
    6  => ("Observe", OptionFormat::Uint, false),
    7  => ("Uri-Port", OptionFormat::Uint, false),
    8  => ("Location-Path", OptionFormat::String, true),
    11 => ("Uri-Path", OptionFormat::String, true),
    12 => ("Content-Format", OptionFormat::Uint, false),
    14 => ("Max-Age", OptionFormat::Uint, false),
    15 => ("Uri-Query", OptionFormat::String, true),
    17 => ("Accept", OptionFormat::Uint, false),
    20 => ("Location-Query", OptionFormat::String, true),
    23 => ("Block2", OptionFormat::Uint, false),
    27 => ("Block1", OptionFormat::Uint, false),
    35 => ("Proxy-Uri", OptionFormat::String, false),
    39 => ("Proxy-Scheme", OptionFormat::String, false),
    60 => ("Size1", OptionFormat::Uint, false),
    28 => ("Size2", OptionFormat::Uint, false),
}

/// Option number constants, named for readability at call sites.
pub mod number {
    /// If-Match.
    pub const IF_MATCH: u16 = 1;
    /// Uri-Host.
    pub const URI_HOST: u16 = 3;
    /// ETag.
    pub const ETAG: u16 = 4;
    /// If-None-Match.
    pub const IF_NONE_MATCH: u16 = 5;
    /// Observe (RFC 7641).
    pub const OBSERVE: u16 = 6;
    /// Uri-Port.
    pub const URI_PORT: u16 = 7;
    /// Location-Path.
    pub const LOCATION_PATH: u16 = 8;
    /// Uri-Path.
    pub const URI_PATH: u16 = 11;
    /// Content-Format.
    pub const CONTENT_FORMAT: u16 = 12;
    /// Max-Age.
    pub const MAX_AGE: u16 = 14;
    /// Uri-Query.
    pub const URI_QUERY: u16 = 15;
    /// Accept.
    pub const ACCEPT: u16 = 17;
    /// Location-Query.
    pub const LOCATION_QUERY: u16 = 20;
    /// Block2 (RFC 7959).
    pub const BLOCK2: u16 = 23;
    /// Block1 (RFC 7959).
    pub const BLOCK1: u16 = 27;
}

/// Looks up a statically known option by number.
pub fn lookup(n: u16) -> Option<&'static KnownOption> {
    KNOWN_OPTIONS.iter().find(|o| o.number == n)
}

/// Whether option number `n` may be repeated (carry more than one value).
pub fn is_repeatable(n: u16) -> bool {
    matches!(
        n,
        number::IF_MATCH
            | number::ETAG
            | number::LOCATION_PATH
            | number::URI_PATH
            | number::URI_QUERY
            | number::LOCATION_QUERY
    )
}

/// Critical options must be understood by the recipient or the message
/// (or the option) must be rejected: `n mod 2 = 1`.
pub fn is_critical(n: u16) -> bool {
    n % 2 == 1
}

/// Unsafe-to-forward options: `n & 2 != 0`.
pub fn is_unsafe_to_forward(n: u16) -> bool {
    n & 2 != 0
}

/// No-Cache-Key options are excluded from cache-key comparison:
/// `(n & 0x1E) = 0x1C`.
pub fn is_no_cache_key(n: u16) -> bool {
    (n & 0x1E) == 0x1C
}

/// Default Max-Age in seconds when the option is absent (RFC 7252).
pub const DEFAULT_MAX_AGE_SECS: u32 = 60;
