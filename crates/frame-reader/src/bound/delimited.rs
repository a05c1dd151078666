use std::borrow::Cow;

use custom_debug::Debug;

use super::{Bound, bump_child_index, set_child_index};
use crate::debug;
use crate::element::Element;
use crate::error::Result;
use crate::reader::Reader;

/// Builds an element out of one token
pub type TokenFactory<T> = Box<dyn Fn(&mut Reader<'_>, &'static str, Token<'_>) -> Result<T>>;

/// A delimited run of bytes, surrounding escape bytes removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    #[debug(with = debug::lossy_text_fmt)]
    pub bytes: &'a [u8],
    /// Absolute offset of the first byte
    pub start: usize,
    /// Absolute offset one past the last byte
    pub end: usize,
    /// Whether the token was wrapped in escape bytes
    pub quoted: bool,
    #[debug(skip)]
    escape: u8,
}

impl<'a> Token<'a> {
    fn new(data: &'a [u8], start: usize, end: usize, escape: u8) -> Self {
        let raw = &data[start..end];
        let quoted = raw.len() >= 2 && raw[0] == escape && raw[raw.len() - 1] == escape;
        let (start, end) = if quoted {
            (start + 1, end - 1)
        } else {
            (start, end)
        };

        Self {
            bytes: &data[start..end],
            start,
            end,
            quoted,
            escape,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes with every doubled escape byte collapsed into one
    pub fn unescaped(&self) -> Cow<'a, [u8]> {
        let doubled = [self.escape, self.escape];
        if !self.bytes.windows(2).any(|pair| pair == doubled) {
            return Cow::Borrowed(self.bytes);
        }

        let mut bytes = Vec::with_capacity(self.bytes.len());
        let mut position = 0;
        while position < self.bytes.len() {
            let byte = self.bytes[position];
            bytes.push(byte);
            if byte == self.escape && self.bytes.get(position + 1) == Some(&self.escape) {
                position += 1;
            }
            position += 1;
        }
        Cow::Owned(bytes)
    }

    /// Unescaped bytes as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.unescaped()).into_owned()
    }
}

/// Tokens split on `divider` up to a `terminator` sequence
///
/// The scan runs from the cursor to the frame end. An `escape` byte toggles
/// quoting, and dividers or terminators inside quotes are plain bytes. The
/// terminator is consumed and ends the scan early; without one the scan
/// emits the trailing token and stops at the frame end.
pub struct EscapedDelimited<T> {
    terminator: Vec<u8>,
    divider: u8,
    escape: u8,
    factory: TokenFactory<T>,
}

impl<T: Element> EscapedDelimited<T> {
    /// Each token is parsed as a `T` spanning exactly the token bytes
    ///
    /// Only the escapes wrapping a token are removed. Doubled escapes inside
    /// it reach `T` unchanged; use [`Self::with_factory`] with
    /// [`Token::text`] to collapse them.
    pub fn new(terminator: impl Into<Vec<u8>>, divider: u8, escape: u8) -> Self {
        Self::with_factory(
            terminator,
            divider,
            escape,
            Box::new(|reader: &mut Reader<'_>, symbol: &'static str, token: Token<'_>| {
                reader.parse_range(symbol, token.start, token.end)
            }),
        )
    }
}

impl<T> EscapedDelimited<T> {
    pub fn with_factory(
        terminator: impl Into<Vec<u8>>,
        divider: u8,
        escape: u8,
        factory: TokenFactory<T>,
    ) -> Self {
        Self {
            terminator: terminator.into(),
            divider,
            escape,
            factory,
        }
    }

    fn emit(
        &self,
        reader: &mut Reader<'_>,
        symbol: &'static str,
        start: usize,
        end: usize,
        items: &mut Vec<T>,
    ) -> Result<()> {
        let token = Token::new(reader.data(), start, end, self.escape);
        items.push((self.factory)(reader, symbol, token)?);
        bump_child_index(reader);
        Ok(())
    }
}

impl<T> Bound for EscapedDelimited<T> {
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        let data = reader.data();
        let end = reader.frame_end();
        let mut items = Vec::new();

        let mut token_start = reader.offset();
        let mut position = token_start;
        let mut quoted = false;
        let mut resume = None;

        set_child_index(reader, 0);
        while position < end {
            let byte = data[position];

            if byte == self.escape {
                quoted = !quoted;
            } else if !quoted
                && !self.terminator.is_empty()
                && data[position..end].starts_with(&self.terminator)
            {
                if position > token_start || !items.is_empty() {
                    self.emit(reader, symbol, token_start, position, &mut items)?;
                }
                resume = Some(position + self.terminator.len());
                break;
            } else if !quoted && byte == self.divider {
                self.emit(reader, symbol, token_start, position, &mut items)?;
                token_start = position + 1;
            }

            position += 1;
        }

        if resume.is_none() && token_start < end {
            self.emit(reader, symbol, token_start, end, &mut items)?;
        }
        set_child_index(reader, 0);

        reader.cursor_mut().set_offset(resume.unwrap_or(end))?;
        log::debug!(
            "{} : {} tokens, resuming at {}",
            symbol,
            items.len(),
            reader.offset()
        );
        Ok(items)
    }
}
