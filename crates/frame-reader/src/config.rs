//! Per-parse configuration

use std::collections::HashMap;
use std::fmt;

/// Byte order applied to multi-byte reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little endian"),
            Self::Big => write!(f, "big endian"),
        }
    }
}

/// Text encoding used by string elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1, every byte maps to the code point of the same value
    Latin1,
}

impl TextEncoding {
    /// Decode `bytes`, returning `None` when they are not valid in this encoding
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units = bytes.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if self == Self::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                });
                char::decode_utf16(units).collect::<Result<String, _>>().ok()
            }
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// What happens when text fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDecoding {
    /// Undecodable text reads as an empty string
    #[default]
    Lenient,
    /// Undecodable text fails the parse
    Strict,
}

/// Read-only settings supplied once per parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Byte order for every multi-byte read without a local override
    pub byte_order: ByteOrder,
    /// Turn short frames into warnings instead of failures
    pub ignore_recoverable_errors: bool,
    /// Encoding of `String` elements
    pub text_encoding: TextEncoding,
    /// Decode failure policy
    pub text_decoding: TextDecoding,
    extensions: HashMap<String, i64>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn big_endian(mut self) -> Self {
        self.byte_order = ByteOrder::Big;
        self
    }

    pub fn little_endian(mut self) -> Self {
        self.byte_order = ByteOrder::Little;
        self
    }

    pub fn ignore_recoverable_errors(mut self, ignore: bool) -> Self {
        self.ignore_recoverable_errors = ignore;
        self
    }

    pub fn text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    pub fn strict_text(mut self) -> Self {
        self.text_decoding = TextDecoding::Strict;
        self
    }

    /// Attach a caller defined value, readable by strategies and factories
    pub fn with_extension(mut self, name: impl Into<String>, value: i64) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    pub fn extension(&self, name: &str) -> Option<i64> {
        self.extensions.get(name).copied()
    }

    pub fn is_big_endian(&self) -> bool {
        self.byte_order == ByteOrder::Big
    }
}

/// Out-of-band messages emitted while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A frame closed before its declared end and the error was ignored
    Warning {
        message: String,
        /// Offset where the frame started
        start: usize,
        /// Declared end of the frame
        end: Option<usize>,
        /// Element type of the frame
        type_name: &'static str,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning {
                message,
                start,
                end: Some(end),
                type_name,
            } => write!(f, "{type_name} [{start}..{end}]: {message}"),
            Self::Warning {
                message,
                start,
                end: None,
                type_name,
            } => write!(f, "{type_name} [{start}..]: {message}"),
        }
    }
}
