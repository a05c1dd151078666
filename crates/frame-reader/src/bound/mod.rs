//! Strategies deciding how many elements, and which bytes, a field reads
//!
//! Every strategy runs with the frame of the record owning the field on top
//! of the stack. Looping strategies use that frame's `child_index` as their
//! position counter and reset it to zero before and after the loop.

mod count;
mod criterion;
mod delimited;

pub use count::{CounterReference, FixedCount};
pub use criterion::{ComparisonInequality, CriterionEquality, UnboundedRepeat};
pub use delimited::{EscapedDelimited, Token, TokenFactory};

use std::marker::PhantomData;

use crate::config::ByteOrder;
use crate::element::Element;
use crate::error::{ErrorContext, ReaderError, Result};
use crate::reader::Reader;
use crate::stack::FieldRef;

/// How a field obtains its value from the reader
pub trait Bound {
    type Output;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self::Output>;
}

/// Exactly one element
pub struct Direct<T>(PhantomData<fn() -> T>);

impl<T> Direct<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Direct<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Bound for Direct<T> {
    type Output = T;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<T> {
        reader.parse(symbol)
    }
}

/// Run the wrapped strategy with a fixed byte order
pub struct Endian<S> {
    order: ByteOrder,
    inner: S,
}

impl<S> Endian<S> {
    pub fn new(order: ByteOrder, inner: S) -> Self {
        Self { order, inner }
    }

    pub fn big(inner: S) -> Self {
        Self::new(ByteOrder::Big, inner)
    }

    pub fn little(inner: S) -> Self {
        Self::new(ByteOrder::Little, inner)
    }
}

impl<S: Bound> Bound for Endian<S> {
    type Output = S::Output;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<S::Output> {
        reader.with_byte_order(self.order, |reader| self.inner.read(reader, symbol))
    }
}

/// One element spanning the number of bytes held by an earlier field
pub struct SizedBy<T, P, C> {
    size: FieldRef<P, C>,
    _element: PhantomData<fn() -> T>,
}

impl<T, P, C> SizedBy<T, P, C> {
    pub fn new(size: FieldRef<P, C>) -> Self {
        Self {
            size,
            _element: PhantomData,
        }
    }
}

impl<T, P, C> Bound for SizedBy<T, P, C>
where
    T: Element,
    P: 'static,
    C: TryInto<usize> + Clone + 'static,
{
    type Output = T;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<T> {
        let size = resolve_count::<T, P, C>(reader, self.size, symbol, "size reference not found")?;
        reader.parse_bounded(symbol, Some(size))
    }
}

/// One element when an earlier field holds `value`, otherwise `None`
pub struct OptionalIfEquals<T, P, V> {
    field: FieldRef<P, V>,
    value: V,
    _element: PhantomData<fn() -> T>,
}

impl<T, P, V> OptionalIfEquals<T, P, V> {
    pub fn new(field: FieldRef<P, V>, value: V) -> Self {
        Self {
            field,
            value,
            _element: PhantomData,
        }
    }
}

impl<T, P, V> Bound for OptionalIfEquals<T, P, V>
where
    T: Element,
    P: 'static,
    V: PartialEq + Clone + 'static,
{
    type Output = Option<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Option<T>> {
        if reader.seek(self.field).as_ref() == Some(&self.value) {
            reader.parse(symbol).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Skip forward to the next multiple of `alignment`
#[derive(Debug, Clone, Copy)]
pub struct Align(pub usize);

impl Bound for Align {
    type Output = ();

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<()> {
        if self.0 == 0 {
            return Err(ReaderError::internal(
                ErrorContext::of::<Self>(symbol, reader.offset()),
                "alignment must be positive",
            ));
        }
        let padding = (self.0 - reader.offset() % self.0) % self.0;
        reader.skip(padding, symbol)
    }
}

/// Resolve a count or size stored in an earlier field
fn resolve_count<T, P, C>(
    reader: &Reader<'_>,
    field: FieldRef<P, C>,
    symbol: &'static str,
    missing: &str,
) -> Result<usize>
where
    P: 'static,
    C: TryInto<usize> + Clone + 'static,
{
    let context = || ErrorContext::of::<T>(symbol, reader.offset());
    let value = reader
        .seek(field)
        .ok_or_else(|| ReaderError::internal(context(), format!("{missing}: {field:?}")))?;
    value.try_into().map_err(|_| {
        ReaderError::incompatible(context(), format!("{field:?} does not fit a length"))
    })
}

/// Parse one element, failing when it consumed nothing
fn parse_advancing<T: Element>(reader: &mut Reader<'_>, symbol: &'static str) -> Result<T> {
    let start = reader.offset();
    let value = reader.parse(symbol)?;
    if reader.offset() == start {
        return Err(ReaderError::internal(
            ErrorContext::of::<T>(symbol, start),
            "repeated element consumed no bytes",
        ));
    }
    Ok(value)
}

fn set_child_index(reader: &mut Reader<'_>, index: usize) {
    if let Some(head) = reader.head_mut() {
        head.child_index = index;
    }
}

fn bump_child_index(reader: &mut Reader<'_>) {
    if let Some(head) = reader.head_mut() {
        head.child_index += 1;
    }
}
