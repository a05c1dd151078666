use std::marker::PhantomData;

use super::{Bound, bump_child_index, resolve_count, set_child_index};
use crate::element::Element;
use crate::error::Result;
use crate::reader::Reader;
use crate::stack::FieldRef;

/// Exactly `n` elements
pub struct FixedCount<T> {
    count: usize,
    _element: PhantomData<fn() -> T>,
}

impl<T> FixedCount<T> {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            _element: PhantomData,
        }
    }
}

impl<T: Element> Bound for FixedCount<T> {
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        read_counted(reader, self.count, symbol)
    }
}

/// As many elements as an earlier field says
///
/// The count is looked up with [`Reader::seek`], so it may live on this
/// record or on any enclosing one. Bytes left over in the frame after the
/// last element are not touched.
pub struct CounterReference<T, P, C> {
    counter: FieldRef<P, C>,
    _element: PhantomData<fn() -> T>,
}

impl<T, P, C> CounterReference<T, P, C> {
    pub fn new(counter: FieldRef<P, C>) -> Self {
        Self {
            counter,
            _element: PhantomData,
        }
    }
}

impl<T, P, C> Bound for CounterReference<T, P, C>
where
    T: Element,
    P: 'static,
    C: TryInto<usize> + Clone + 'static,
{
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        let count = resolve_count::<Vec<T>, P, C>(
            reader,
            self.counter,
            symbol,
            "counting reference not found",
        )?;
        log::debug!("{} : counted by {:?} = {}", symbol, self.counter, count);
        read_counted(reader, count, symbol)
    }
}

fn read_counted<T: Element>(
    reader: &mut Reader<'_>,
    count: usize,
    symbol: &'static str,
) -> Result<Vec<T>> {
    // a corrupt count must not reserve more than the frame could hold
    let available = reader.frame_end().saturating_sub(reader.offset());
    let mut items = Vec::with_capacity(count.min(available));

    set_child_index(reader, 0);
    for _ in 0..count {
        items.push(reader.parse(symbol)?);
        bump_child_index(reader);
    }
    set_child_index(reader, 0);

    Ok(items)
}
