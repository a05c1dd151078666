use std::marker::PhantomData;

use super::{Bound, bump_child_index, parse_advancing, set_child_index};
use crate::element::Element;
use crate::error::{ErrorContext, ReaderError, Result};
use crate::reader::Reader;
use crate::stack::FieldRef;

/// Elements up to and including the first whose `field` equals `value`
///
/// At least one element is read. The loop also stops at the frame end.
pub struct CriterionEquality<T, V> {
    field: FieldRef<T, V>,
    value: V,
}

impl<T, V> CriterionEquality<T, V> {
    pub fn new(field: FieldRef<T, V>, value: V) -> Self {
        Self { field, value }
    }
}

impl<T, V> Bound for CriterionEquality<T, V>
where
    T: Element,
    V: PartialEq,
{
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        let mut items = Vec::new();

        set_child_index(reader, 0);
        loop {
            let item: T = parse_advancing(reader, symbol)?;
            let matched = self.field.get(&item).as_ref() == Some(&self.value);
            items.push(item);
            bump_child_index(reader);

            if matched || reader.offset() >= reader.frame_end() {
                break;
            }
        }
        set_child_index(reader, 0);

        log::debug!("{} : {} elements until {:?}", symbol, items.len(), self.field);
        Ok(items)
    }
}

/// Elements while a field of an enclosing record differs from `value`
///
/// The field is resolved with [`Reader::seek`] before every element, so
/// children usually drive it by publishing to the enclosing record. Running
/// into the frame end while more elements are requested fails with
/// [`ReaderError::MisalignedData`].
pub struct ComparisonInequality<T, P, V> {
    field: FieldRef<P, V>,
    value: V,
    _element: PhantomData<fn() -> T>,
}

impl<T, P, V> ComparisonInequality<T, P, V> {
    pub fn new(field: FieldRef<P, V>, value: V) -> Self {
        Self {
            field,
            value,
            _element: PhantomData,
        }
    }
}

impl<T, P, V> Bound for ComparisonInequality<T, P, V>
where
    T: Element,
    P: 'static,
    V: PartialEq + Clone + 'static,
{
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        let mut items = Vec::new();

        set_child_index(reader, 0);
        while reader.seek(self.field).as_ref() != Some(&self.value) {
            let end = reader.frame_end();
            let offset = reader.offset();
            if offset >= end {
                return Err(ReaderError::MisalignedData {
                    context: ErrorContext::of::<Vec<T>>(symbol, offset),
                    expected: end,
                    actual: offset,
                });
            }

            items.push(parse_advancing(reader, symbol)?);
            bump_child_index(reader);
        }
        set_child_index(reader, 0);

        Ok(items)
    }
}

/// Elements until the frame end
pub struct UnboundedRepeat<T>(PhantomData<fn() -> T>);

impl<T> UnboundedRepeat<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for UnboundedRepeat<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Bound for UnboundedRepeat<T> {
    type Output = Vec<T>;

    fn read(&self, reader: &mut Reader<'_>, symbol: &'static str) -> Result<Vec<T>> {
        let mut items = Vec::new();

        set_child_index(reader, 0);
        while reader.offset() < reader.frame_end() {
            items.push(parse_advancing(reader, symbol)?);
            bump_child_index(reader);
        }
        set_child_index(reader, 0);

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    const TERMINATOR: u32 = 1_701_733_408;

    // u32 values are their own criterion
    const VALUE: FieldRef<u32, u32> = FieldRef::new("value", |value: &u32| *value);

    #[test]
    fn test_criterion_is_inclusive() {
        let mut data = Vec::new();
        for value in [1u32, 2, TERMINATOR, 4] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let config = Configuration::default();
        let mut reader = Reader::new(&data, &config);

        let items = CriterionEquality::new(VALUE, TERMINATOR)
            .read(&mut reader, "items")
            .unwrap();
        assert_eq!(items, vec![1, 2, TERMINATOR]);
        assert_eq!(reader.offset(), 12);
    }

    #[test]
    fn test_criterion_stops_at_frame_end() {
        let data = [1u8, 0, 2, 0];
        let config = Configuration::default();
        let mut reader = Reader::new(&data, &config);

        let values: FieldRef<u16, u16> = FieldRef::new("value", |value: &u16| *value);
        let items = CriterionEquality::new(values, 9)
            .read(&mut reader, "items")
            .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_unbounded_repeat() {
        let data = [1, 2, 3];
        let config = Configuration::default();
        let mut reader = Reader::new(&data, &config);

        let items = UnboundedRepeat::<u8>::new()
            .read(&mut reader, "items")
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert!(reader.cursor().is_eof());
    }

    #[test]
    fn test_comparison_guarded_at_frame_end() {
        let data = [1, 2];
        let config = Configuration::default();
        let mut reader = Reader::new(&data, &config);

        // the referenced field is never found, so only the frame end stops the loop
        let error = ComparisonInequality::<u8, _, _>::new(VALUE, TERMINATOR)
            .read(&mut reader, "items")
            .unwrap_err();
        assert!(matches!(
            error,
            ReaderError::MisalignedData {
                expected: 2,
                actual: 2,
                ..
            }
        ));
    }
}
