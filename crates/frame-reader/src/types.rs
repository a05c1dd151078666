//! Common data types found in binary formats

use std::fmt;
use std::ops::Deref;

use custom_debug::Debug;

use crate::debug;
use crate::element::Element;
use crate::error::Result;
use crate::reader::Reader;

/// Zero terminated text
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CString(pub String);

impl Element for CString {
    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        let end = reader.frame_end();
        let config = reader.config();
        reader
            .cursor_mut()
            .read_cstring(end, config.text_encoding, config.text_decoding, symbol)
            .map(Self)
    }
}

impl Deref for CString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label packed into a fixed number of bytes, like a four character code
///
/// The bytes are kept in file order whatever the configured byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedLabel<const N: usize> {
    #[debug(with = debug::lossy_text_fmt)]
    raw: [u8; N],
}

impl<const N: usize> FixedLabel<N> {
    pub fn new(raw: [u8; N]) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.raw
    }

    /// The label with trailing NUL padding removed
    pub fn trimmed(&self) -> &[u8] {
        let length = self
            .raw
            .iter()
            .rposition(|&byte| byte != 0)
            .map_or(0, |last| last + 1);
        &self.raw[..length]
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.trimmed()).into_owned()
    }
}

impl<const N: usize> Default for FixedLabel<N> {
    fn default() -> Self {
        Self { raw: [0; N] }
    }
}

impl<const N: usize> PartialEq<&str> for FixedLabel<N> {
    fn eq(&self, other: &&str) -> bool {
        self.trimmed() == other.as_bytes()
    }
}

impl<const N: usize> fmt::Display for FixedLabel<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl<const N: usize> Element for FixedLabel<N> {
    fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
        Ok(Some(N))
    }

    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        let bytes = reader.cursor_mut().read_bytes(N, symbol)?;
        let mut raw = [0; N];
        raw.copy_from_slice(bytes);
        Ok(Self { raw })
    }
}

/// One byte split into two 4-bit values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Nibbles {
    pub high: u8,
    pub low: u8,
}

impl Element for Nibbles {
    fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
        Ok(Some(1))
    }

    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        let (high, low) = reader.cursor_mut().read_nibbles(symbol)?;
        Ok(Self { high, low })
    }
}

/// Every byte left in the enclosing frame
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RawBytes(pub Vec<u8>);

impl fmt::Debug for RawBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBytes(")?;
        debug::trimmed_bytes_fmt(&self.0, f)?;
        write!(f, ")")
    }
}

impl Element for RawBytes {
    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        let end = reader.frame_end();
        let bytes = reader.cursor_mut().read_bytes_until(end, symbol)?;
        Ok(Self(bytes.map(<[u8]>::to_vec).unwrap_or_default()))
    }
}

impl Deref for RawBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}
