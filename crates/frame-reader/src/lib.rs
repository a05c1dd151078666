//! Declarative parsing of binary file formats.
//!
//! A format is described as a tree of [`Element`]s. Records list their
//! fields in read order, each field paired with a [`bound`] strategy that
//! decides how many elements it reads: exactly one, a fixed count, a count
//! stored in an earlier field, elements up to a sentinel, or delimited
//! tokens. The reader walks a byte buffer with a single cursor and keeps a
//! stack of frames, one per element being read, so that later fields can
//! look up earlier ones and every element is checked to end exactly where
//! it said it would.
//!
//! # Example
//!
//! ```
//! use frame_reader::{Configuration, Element};
//!
//! #[derive(Debug, Default, Element)]
//! struct Chunk {
//!     #[frame(transient)]
//!     count: u8,
//!     #[frame(counter = Self::COUNT)]
//!     values: Vec<u16>,
//! }
//!
//! let data = [2, 0x01, 0x00, 0x02, 0x00];
//! let chunk: Chunk = frame_reader::parse(&data, &Configuration::default(), None).unwrap();
//! assert_eq!(chunk.values, vec![1, 2]);
//! ```

extern crate self as frame_reader;

pub mod bound;
pub mod config;
pub mod cursor;
pub mod debug;
pub mod element;
pub mod error;
pub mod file;
pub mod reader;
pub mod stack;
mod std_impls;
pub mod types;

pub use config::{ByteOrder, Configuration, Notification, TextDecoding, TextEncoding};
pub use cursor::{Cursor, Primitive};
pub use element::{Element, Field, Record};
pub use error::{ErrorContext, LoadError, ReaderError, Result};
pub use file::{parse_file, parse_file_with};
pub use frame_reader_derive::Element;
pub use reader::Reader;
pub use stack::{FieldRef, Frame};

pub mod prelude {
    pub use crate::bound::{
        Align, Bound, ComparisonInequality, CounterReference, CriterionEquality, Direct, Endian,
        EscapedDelimited, FixedCount, OptionalIfEquals, SizedBy, Token, UnboundedRepeat,
    };
    pub use crate::types::{CString, FixedLabel, Nibbles, RawBytes};
    pub use crate::{
        ByteOrder, Configuration, Element, Field, FieldRef, Notification, Reader, ReaderError,
        Record,
    };
}

/// Parse a whole `T` from `buffer`
///
/// Warnings about frames that closed short are passed to `notify` when
/// recoverable errors are ignored. Any error aborts the parse; no partial
/// value is returned.
pub fn parse<'a, T: Element>(
    buffer: &'a [u8],
    configuration: &'a Configuration,
    notify: Option<&'a mut dyn FnMut(&Notification)>,
) -> Result<T> {
    let mut reader = Reader::new(buffer, configuration);
    if let Some(notify) = notify {
        reader = reader.with_notify(notify);
    }

    let symbol = short_type_name::<T>();
    log::debug!("parsing {} from {} bytes", symbol, buffer.len());
    reader.parse(symbol)
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let path = name.split('<').next().unwrap_or(name);
    match path.rfind("::") {
        Some(index) => &name[index + 2..],
        None => name,
    }
}
