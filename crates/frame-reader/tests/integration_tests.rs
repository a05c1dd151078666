//! End to end parsing behaviour of the engine

use frame_reader::bound::{CounterReference, Direct};
use frame_reader::types::{FixedLabel, RawBytes};
use frame_reader::{
    Configuration, Element, Field, FieldRef, Notification, Reader, ReaderError, Record, parse,
};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn collect_warnings<T: Element>(
    data: &[u8],
    config: &Configuration,
) -> (Result<T, ReaderError>, Vec<Notification>) {
    let mut warnings = Vec::new();
    let mut collect = |notification: &Notification| warnings.push(notification.clone());
    let result = parse::<T>(data, config, Some(&mut collect));
    (result, warnings)
}

#[test_case(Configuration::default().big_endian(), 42 ; "big endian")]
#[test_case(Configuration::default().little_endian(), 704_643_072 ; "little endian")]
fn test_byte_order(config: Configuration, expected: u32) {
    let value: u32 = parse(&[0, 0, 0, 0x2A], &config, None).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn test_bounds_enforced() {
    let config = Configuration::default();
    let error = parse::<u32>(&[1, 2, 3], &config, None).unwrap_err();
    assert!(matches!(
        error,
        ReaderError::InvalidMemoryAddress { limit: 3, .. }
    ));
    assert_eq!(error.offset(), 0);
}

#[test]
fn test_failed_parse_is_repeatable() {
    let config = Configuration::default();
    let data = [3, 1, 2];
    let first = parse::<Counted>(&data, &config, None).unwrap_err();
    let second = parse::<Counted>(&data, &config, None).unwrap_err();
    assert_eq!(first, second);
}

// Frame alignment

#[derive(Debug, Default, PartialEq, Element)]
#[frame(size = 4)]
struct PaddedValue {
    value: u16,
}

#[derive(Debug, Default, PartialEq, Element)]
struct PaddedThenByte {
    first: PaddedValue,
    next: u8,
}

#[derive(Debug, Default, Element)]
#[frame(size = 1)]
struct Tiny {
    value: u8,
    #[frame(align = 4)]
    padding: (),
}

#[derive(Debug, Default, PartialEq, Element)]
#[frame(size = 2)]
struct Exact {
    value: u16,
}

#[test]
fn test_exact_frame() {
    let config = Configuration::default();
    let (result, warnings) = collect_warnings::<Exact>(&[5, 0], &config);
    assert_eq!(result.unwrap(), Exact { value: 5 });
    assert!(warnings.is_empty());
}

#[test]
fn test_under_read_is_fatal_by_default() {
    let config = Configuration::default();
    let error = parse::<PaddedThenByte>(&[1, 0, 0xAA, 0xBB, 7], &config, None).unwrap_err();
    match error {
        ReaderError::MisalignedData {
            context,
            expected,
            actual,
        } => {
            assert_eq!((expected, actual), (4, 2));
            assert_eq!(context.symbol, "first");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_under_read_recovers_when_ignored() {
    let config = Configuration::default().ignore_recoverable_errors(true);
    let (result, warnings) = collect_warnings::<PaddedThenByte>(&[1, 0, 0xAA, 0xBB, 7], &config);

    assert_eq!(
        result.unwrap(),
        PaddedThenByte {
            first: PaddedValue { value: 1 },
            next: 7,
        }
    );
    assert_eq!(warnings.len(), 1);
    let Notification::Warning { start, end, .. } = &warnings[0];
    assert_eq!((*start, *end), (0, Some(4)));
}

#[test]
fn test_over_read_is_always_fatal() {
    let config = Configuration::default().ignore_recoverable_errors(true);
    let (result, warnings) = collect_warnings::<Tiny>(&[1, 0, 0, 0], &config);
    assert!(matches!(
        result,
        Err(ReaderError::MisalignedData {
            expected: 1,
            actual: 4,
            ..
        })
    ));
    assert!(warnings.is_empty());
}

#[derive(Debug, Default, Element)]
struct SizedChild {
    #[frame(transient)]
    size: u8,
    #[frame(size_by = Self::SIZE)]
    body: RawBytes,
}

#[derive(Debug, Default, Element)]
#[frame(size = 3)]
struct SizedParent {
    child: SizedChild,
}

#[derive(Debug, Default, Element)]
struct SizedFile {
    parent: SizedParent,
    tail: u8,
}

#[test]
fn test_child_cannot_claim_beyond_parent() {
    let config = Configuration::default().ignore_recoverable_errors(true);
    let (result, warnings) = collect_warnings::<SizedFile>(&[5, 1, 2, 3, 4, 5, 6], &config);

    match result {
        Err(ReaderError::InvalidMemoryAddress { context, limit }) => {
            assert_eq!(limit, 3);
            assert_eq!(context.symbol, "body");
            assert_eq!(context.offset, 1);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(warnings.is_empty());
}

#[test]
fn test_child_inside_parent_bound() {
    let config = Configuration::default();
    let file: SizedFile = parse(&[2, 1, 2, 9], &config, None).unwrap();
    assert_eq!(file.parent.child.body.0, vec![1, 2]);
    assert_eq!(file.tail, 9);
}

// Counters and cross references

#[derive(Debug, Default, PartialEq, Element)]
struct Counted {
    #[frame(transient)]
    count: u8,
    #[frame(counter = Self::COUNT)]
    items: Vec<u8>,
}

#[test]
fn test_counter_leaves_trailing_bytes() {
    let config = Configuration::default();
    let data = [2, 10, 20, 30];
    let counted: Counted = parse(&data, &config, None).unwrap();
    assert_eq!(
        counted,
        Counted {
            count: 2,
            items: vec![10, 20],
        }
    );
}

#[derive(Debug, Default, PartialEq, Element)]
struct Outer {
    #[frame(transient)]
    count: u8,
    inner: Inner,
}

#[derive(Debug, Default, PartialEq, Element)]
struct Inner {
    #[frame(counter = Outer::COUNT)]
    items: Vec<u16>,
}

#[test]
fn test_child_sees_ancestor_field() {
    let config = Configuration::default();
    let outer: Outer = parse(&[2, 1, 0, 2, 0], &config, None).unwrap();
    assert_eq!(outer.inner.items, vec![1, 2]);
}

#[derive(Debug, Default, PartialEq, Element)]
struct Announcer {
    #[frame(transient)]
    count: u8,
}

#[derive(Debug, Default, PartialEq, Element)]
struct Listener {
    #[frame(counter = Announcer::COUNT)]
    items: Vec<u8>,
}

#[derive(Debug, Default, PartialEq, Element)]
struct Siblings {
    announcer: Announcer,
    listener: Listener,
}

#[test]
fn test_closed_sibling_is_not_visible() {
    let config = Configuration::default();
    let error = parse::<Siblings>(&[2, 7, 8], &config, None).unwrap_err();
    match error {
        ReaderError::InternalError { context, message } => {
            assert!(message.starts_with("counting reference not found"));
            assert_eq!(context.symbol, "items");
            assert_eq!(context.offset, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_reference_outside_the_stack() {
    let config = Configuration::default();
    let error = parse::<Inner>(&[2, 1, 0, 2, 0], &config, None).unwrap_err();
    match error {
        ReaderError::InternalError { message, .. } => {
            assert!(message.starts_with("counting reference not found"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

// Sentinel terminated lists

#[derive(Debug, Default, PartialEq, Element)]
struct Child {
    index: u8,
    #[frame(reference)]
    data: u32,
}

#[derive(Debug, Default, PartialEq, Element)]
struct Parent {
    #[frame(until = (Child::DATA, 1_701_733_408))]
    children: Vec<Child>,
    counter: u8,
    text: String,
}

#[test]
fn test_criterion_includes_the_match() {
    let bytes: [u8; 25] = [
        0, 115, 116, 97, 114, // star
        1, 109, 101, 116, 97, // meta
        2, 105, 110, 102, 111, // info
        3, 101, 110, 100, 32, // end
        4, 116, 101, 115, 116, // test
    ];
    let config = Configuration::default().big_endian();
    let parent: Parent = parse(&bytes, &config, None).unwrap();

    assert_eq!(parent.children.len(), 4);
    assert_eq!(parent.children[0].index, 0);
    assert_eq!(parent.children[0].data, 1_937_006_962);
    assert_eq!(parent.children[1].index, 1);
    assert_eq!(parent.children[1].data, 1_835_365_473);
    assert_eq!(parent.children[2].index, 2);
    assert_eq!(parent.children[2].data, 1_768_842_863);
    assert_eq!(parent.children[3].index, 3);
    assert_eq!(parent.children[3].data, 1_701_733_408);
    assert_eq!(parent.counter, 4);
    assert_eq!(parent.text, "test");
}

#[derive(Debug, Default, PartialEq, Element)]
struct Container {
    #[frame(skip, reference)]
    done: u8,
    #[frame(while_not = (Container::DONE, 1))]
    entries: Vec<Entry>,
    tail: u8,
}

#[derive(Debug, Default, PartialEq, Element)]
struct Entry {
    #[frame(publish = Container::DONE)]
    last: u8,
    value: u8,
}

#[test]
fn test_children_end_the_parent_list() {
    let config = Configuration::default();
    let container: Container = parse(&[0, 10, 0, 11, 1, 12, 99], &config, None).unwrap();

    let values: Vec<u8> = container.entries.iter().map(|entry| entry.value).collect();
    assert_eq!(values, vec![10, 11, 12]);
    assert_eq!(container.tail, 99);
    assert_eq!(container.done, 0);
}

#[test]
fn test_comparison_never_satisfied() {
    let config = Configuration::default();
    let error = parse::<Container>(&[0, 10, 0, 11], &config, None).unwrap_err();
    assert!(matches!(
        error,
        ReaderError::MisalignedData {
            expected: 4,
            actual: 4,
            ..
        }
    ));
}

// Delimited text

#[derive(Debug, Default, PartialEq, Element)]
struct Line {
    #[frame(delimited)]
    values: Vec<String>,
    rest: String,
}

#[test]
fn test_delimited_line() {
    let config = Configuration::default();
    let line: Line = parse(b"a,b,\"c,d\",e\r\nrest", &config, None).unwrap();
    assert_eq!(line.values, vec!["a", "b", "c,d", "e"]);
    assert_eq!(line.rest, "rest");
}

// Schemas written by hand

#[derive(Debug, Default)]
struct Manual {
    count: u8,
    items: Vec<u8>,
}

impl Manual {
    const COUNT: FieldRef<Self, u8> = FieldRef::new("count", |record: &Self| record.count);
}

impl Record for Manual {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::<Self>::bind("count", Direct::<u8>::new())
                .transient(Self::COUNT)
                .assign(|record: &mut Self, count| record.count = count),
            Field::<Self>::bind("items", CounterReference::<u8, _, _>::new(Self::COUNT))
                .assign(|record: &mut Self, items| record.items = items),
        ]
    }
}

impl Element for Manual {
    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> frame_reader::Result<Self> {
        reader.fill_record(symbol)
    }
}

/// Position of the element inside the list being read
#[derive(Debug, PartialEq)]
struct Indexed(usize);

impl Element for Indexed {
    fn upper_bound(_reader: &Reader<'_>) -> frame_reader::Result<Option<usize>> {
        Ok(Some(1))
    }

    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> frame_reader::Result<Self> {
        let index = reader.parent().map_or(0, |frame| frame.child_index);
        reader.read_int::<u8>(symbol)?;
        Ok(Self(index))
    }
}

#[derive(Debug, Default, PartialEq, Element)]
struct IndexedList {
    #[frame(count = 3)]
    items: Vec<Indexed>,
}

#[test]
fn test_hand_written_record() {
    let config = Configuration::default();
    let manual: Manual = parse(&[1, 9, 8], &config, None).unwrap();
    assert_eq!(manual.count, 1);
    assert_eq!(manual.items, vec![9]);
}

#[test]
fn test_child_index_tracks_position() {
    let config = Configuration::default();
    let list: IndexedList = parse(&[0, 0, 0], &config, None).unwrap();
    assert_eq!(list.items, vec![Indexed(0), Indexed(1), Indexed(2)]);
}

// Chunked layouts

#[derive(Debug, Default, PartialEq, Element)]
struct Chunk {
    magic: FixedLabel<4>,
    #[frame(transient)]
    size: u32,
    #[frame(size_by = Self::SIZE)]
    body: RawBytes,
}

#[derive(Debug, Default, PartialEq, Element)]
struct ChunkFile {
    #[frame(repeat)]
    chunks: Vec<Chunk>,
}

#[test]
fn test_chunk_stream() {
    let mut data = Vec::new();
    data.extend_from_slice(b"MVER");
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&18u32.to_le_bytes());
    data.extend_from_slice(b"MAIN");
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&[0xAB, 0xCD]);

    let config = Configuration::default();
    let file: ChunkFile = parse(&data, &config, None).unwrap();

    assert_eq!(file.chunks.len(), 2);
    assert_eq!(file.chunks[0].magic, "MVER");
    assert_eq!(file.chunks[0].body.0, 18u32.to_le_bytes().to_vec());
    assert_eq!(file.chunks[1].magic, "MAIN");
    assert_eq!(file.chunks[1].body.0, vec![0xAB, 0xCD]);
}

#[test]
fn test_truncated_chunk() {
    let mut data = Vec::new();
    data.extend_from_slice(b"MVER");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&[1, 2]);

    let config = Configuration::default();
    let error = parse::<ChunkFile>(&data, &config, None).unwrap_err();
    assert!(matches!(error, ReaderError::InvalidMemoryAddress { .. }));
}
