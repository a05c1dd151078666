//! Bounds-checked reads over a borrowed byte buffer

use std::any::type_name;
use std::fmt;

use byteorder::{BigEndian, ByteOrder as Endianness, LittleEndian};

use crate::config::{ByteOrder, TextDecoding, TextEncoding};
use crate::error::{ErrorContext, ReaderError, Result};

/// Fixed width numeric value readable straight from the buffer
pub trait Primitive: Copy + PartialEq + fmt::Debug + fmt::Display + 'static {
    /// Width in bytes
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes
    fn decode(bytes: &[u8], order: ByteOrder) -> Self;
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8], _order: ByteOrder) -> Self {
        bytes[0]
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8], _order: ByteOrder) -> Self {
        i8::from_ne_bytes([bytes[0]])
    }
}

macro_rules! impl_primitive {
    ($($ty:ty => $read:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn decode(bytes: &[u8], order: ByteOrder) -> Self {
                    match order {
                        ByteOrder::Little => LittleEndian::$read(bytes),
                        ByteOrder::Big => BigEndian::$read(bytes),
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    u16 => read_u16,
    i16 => read_i16,
    u32 => read_u32,
    i32 => read_i32,
    u64 => read_u64,
    i64 => read_i64,
    f32 => read_f32,
    f64 => read_f64,
}

/// A byte buffer plus the single offset shared by a whole parse
///
/// Every read checks its range first and leaves the offset untouched on
/// failure, so `0 <= offset <= len` holds between reads.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.data.len()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute offset inside `[0, len]`
    pub fn set_offset(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(self.out_of_bounds::<()>("", offset));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize, symbol: &str) -> Result<()> {
        self.checked_end::<[u8]>(symbol, count)?;
        self.offset += count;
        Ok(())
    }

    /// Read one fixed width value in the given byte order
    pub fn read_int<I: Primitive>(&mut self, order: ByteOrder, symbol: &str) -> Result<I> {
        let end = self.checked_end::<I>(symbol, I::SIZE)?;
        let value = I::decode(&self.data[self.offset..end], order);
        log::trace!(
            "[{}] {} : {} = {}",
            self.offset,
            symbol,
            type_name::<I>(),
            value
        );
        self.offset = end;
        Ok(value)
    }

    /// Read exactly `count` bytes
    pub fn read_bytes(&mut self, count: usize, symbol: &str) -> Result<&'a [u8]> {
        let end = self.checked_end::<[u8]>(symbol, count)?;
        let bytes = &self.data[self.offset..end];
        log::trace!("[{}] {} : {} bytes", self.offset, symbol, count);
        self.offset = end;
        Ok(bytes)
    }

    /// Read up to the absolute offset `upper_bound`, `None` when already there
    pub fn read_bytes_until(
        &mut self,
        upper_bound: usize,
        symbol: &str,
    ) -> Result<Option<&'a [u8]>> {
        self.check_upper_bound::<[u8]>(symbol, upper_bound)?;
        if upper_bound == self.offset {
            return Ok(None);
        }
        self.read_bytes(upper_bound - self.offset, symbol).map(Some)
    }

    /// Decode `[offset, upper_bound)` as text
    pub fn read_string(
        &mut self,
        upper_bound: usize,
        encoding: TextEncoding,
        decoding: TextDecoding,
        symbol: &str,
    ) -> Result<String> {
        self.check_upper_bound::<String>(symbol, upper_bound)?;
        let bytes = &self.data[self.offset..upper_bound];
        let text = self.decode_text(bytes, encoding, decoding, symbol)?;
        self.offset = upper_bound;
        Ok(text)
    }

    /// Decode text up to a zero byte or `upper_bound`, whichever comes first
    ///
    /// The terminator is consumed when found; the offset never moves past
    /// `upper_bound`.
    pub fn read_cstring(
        &mut self,
        upper_bound: usize,
        encoding: TextEncoding,
        decoding: TextDecoding,
        symbol: &str,
    ) -> Result<String> {
        self.check_upper_bound::<String>(symbol, upper_bound)?;
        let region = &self.data[self.offset..upper_bound];
        let (text_len, consumed) = match memchr::memchr(0, region) {
            Some(position) => (position, position + 1),
            None => (region.len(), region.len()),
        };
        let text = self.decode_text(&region[..text_len], encoding, decoding, symbol)?;
        self.offset += consumed;
        Ok(text)
    }

    /// Split one byte into its high and low 4-bit halves
    pub fn read_nibbles(&mut self, symbol: &str) -> Result<(u8, u8)> {
        let byte: u8 = self.read_int(ByteOrder::Little, symbol)?;
        Ok((byte >> 4, byte & 0x0F))
    }

    /// Read as many values of `I` as fit exactly into `[offset, upper_bound)`
    pub fn read_array<I: Primitive>(
        &mut self,
        upper_bound: usize,
        order: ByteOrder,
        symbol: &str,
    ) -> Result<Vec<I>> {
        self.check_upper_bound::<Vec<I>>(symbol, upper_bound)?;
        let length = upper_bound - self.offset;
        if length % I::SIZE != 0 {
            return Err(ReaderError::incompatible(
                ErrorContext::of::<Vec<I>>(symbol, self.offset),
                format!(
                    "{} bytes is not a multiple of the element size {}",
                    length,
                    I::SIZE
                ),
            ));
        }

        let values = self.data[self.offset..upper_bound]
            .chunks_exact(I::SIZE)
            .map(|chunk| I::decode(chunk, order))
            .collect();
        self.offset = upper_bound;
        Ok(values)
    }

    fn decode_text(
        &self,
        bytes: &[u8],
        encoding: TextEncoding,
        decoding: TextDecoding,
        symbol: &str,
    ) -> Result<String> {
        match encoding.decode(bytes) {
            Some(text) => Ok(text),
            None if decoding == TextDecoding::Lenient => {
                log::debug!(
                    "[{}] {} : undecodable {:?} text read as empty",
                    self.offset,
                    symbol,
                    encoding
                );
                Ok(String::new())
            }
            None => Err(ReaderError::incompatible(
                ErrorContext::of::<String>(symbol, self.offset),
                format!("{} bytes are not valid {:?}", bytes.len(), encoding),
            )),
        }
    }

    fn checked_end<T: ?Sized>(&self, symbol: &str, count: usize) -> Result<usize> {
        match self.offset.checked_add(count) {
            Some(end) if end <= self.data.len() => Ok(end),
            _ => Err(self.out_of_bounds::<T>(symbol, self.offset)),
        }
    }

    fn check_upper_bound<T: ?Sized>(&self, symbol: &str, upper_bound: usize) -> Result<()> {
        if upper_bound > self.data.len() || upper_bound < self.offset {
            return Err(self.out_of_bounds::<T>(symbol, self.offset));
        }
        Ok(())
    }

    fn out_of_bounds<T: ?Sized>(&self, symbol: &str, offset: usize) -> ReaderError {
        ReaderError::InvalidMemoryAddress {
            context: ErrorContext::of::<T>(symbol, offset),
            limit: self.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ByteOrder::Little, 0x2A00_0000 ; "little endian")]
    #[test_case(ByteOrder::Big, 0x2A ; "big endian")]
    fn test_read_int_byte_order(order: ByteOrder, expected: u32) {
        let data = [0, 0, 0, 0x2A];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_int::<u32>(order, "value").unwrap(), expected);
        assert_eq!(cursor.offset(), 4);
    }

    #[test]
    fn test_read_int_widths() {
        let data = [0u8; 15];
        let mut cursor = Cursor::new(&data);
        cursor.read_int::<u8>(ByteOrder::Little, "a").unwrap();
        assert_eq!(cursor.offset(), 1);
        cursor.read_int::<i16>(ByteOrder::Big, "b").unwrap();
        assert_eq!(cursor.offset(), 3);
        cursor.read_int::<f32>(ByteOrder::Little, "c").unwrap();
        assert_eq!(cursor.offset(), 7);
        cursor.read_int::<u64>(ByteOrder::Big, "d").unwrap();
        assert_eq!(cursor.offset(), 15);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_out_of_bounds_keeps_offset() {
        let data = [1, 2, 3];
        let mut cursor = Cursor::new(&data);
        cursor.read_int::<u8>(ByteOrder::Little, "first").unwrap();

        let error = cursor.read_int::<u32>(ByteOrder::Little, "count").unwrap_err();
        assert!(matches!(
            error,
            ReaderError::InvalidMemoryAddress { limit: 3, .. }
        ));
        assert_eq!(error.offset(), 1);
        assert_eq!(cursor.offset(), 1);

        assert!(cursor.read_bytes(5, "bytes").is_err());
        assert!(cursor.set_offset(4).is_err());
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn test_read_bytes_until() {
        let data = *b"abcdef";
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_bytes_until(0, "empty").unwrap(), None);
        assert_eq!(cursor.read_bytes_until(3, "head").unwrap(), Some(&b"abc"[..]));
        assert!(cursor.read_bytes_until(7, "past").is_err());
        assert!(cursor.read_bytes_until(2, "behind").is_err());
        assert_eq!(cursor.offset(), 3);
    }

    #[test]
    fn test_read_string_policies() {
        let data = [0xff, 0xfe, b'o', b'k'];
        let mut cursor = Cursor::new(&data);

        let error = cursor
            .read_string(2, TextEncoding::Utf8, TextDecoding::Strict, "name")
            .unwrap_err();
        assert!(matches!(error, ReaderError::IncompatibleDataFormat { .. }));
        assert_eq!(cursor.offset(), 0);

        let text = cursor
            .read_string(2, TextEncoding::Utf8, TextDecoding::Lenient, "name")
            .unwrap();
        assert_eq!(text, "");
        assert_eq!(cursor.offset(), 2);

        let text = cursor
            .read_string(4, TextEncoding::Utf8, TextDecoding::Strict, "name")
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_read_cstring() {
        let data = *b"ab\0cd";
        let mut cursor = Cursor::new(&data);
        let text = cursor
            .read_cstring(5, TextEncoding::Utf8, TextDecoding::Lenient, "s")
            .unwrap();
        assert_eq!(text, "ab");
        assert_eq!(cursor.offset(), 3);

        // no terminator before the bound
        let text = cursor
            .read_cstring(4, TextEncoding::Utf8, TextDecoding::Lenient, "s")
            .unwrap();
        assert_eq!(text, "c");
        assert_eq!(cursor.offset(), 4);
    }

    #[test]
    fn test_read_nibbles() {
        let data = [0xA5];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_nibbles("n").unwrap(), (0x0A, 0x05));
        assert!(cursor.read_nibbles("n").is_err());
    }

    #[test]
    fn test_read_array() {
        let data = [1, 0, 2, 0, 3];
        let mut cursor = Cursor::new(&data);
        let error = cursor
            .read_array::<u16>(5, ByteOrder::Little, "values")
            .unwrap_err();
        assert!(matches!(error, ReaderError::IncompatibleDataFormat { .. }));
        assert_eq!(cursor.offset(), 0);

        let values = cursor
            .read_array::<u16>(4, ByteOrder::Little, "values")
            .unwrap();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(cursor.remaining(), 1);
    }
}
