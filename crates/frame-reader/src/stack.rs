//! Frame stack and cross-frame field lookup

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use custom_debug::Debug;

use crate::element::{AnyRecord, Record};

/// Identity of a field: its name scoped to the record type declaring it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub owner: TypeId,
    pub name: &'static str,
}

/// Typed reference to a field of record `R` holding a `V`
///
/// Two references are equal when they name the same field of the same
/// record type, whatever getter they carry. A reference without a getter
/// only resolves through transient values stored during the parse.
pub struct FieldRef<R, V> {
    name: &'static str,
    getter: Option<fn(&R) -> V>,
    _owner: PhantomData<fn() -> R>,
}

impl<R, V> FieldRef<R, V> {
    pub const fn new(name: &'static str, getter: fn(&R) -> V) -> Self {
        Self {
            name,
            getter: Some(getter),
            _owner: PhantomData,
        }
    }

    /// Reference to a value that only exists as a transient
    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            getter: None,
            _owner: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Read the field from a record instance
    pub fn get(&self, record: &R) -> Option<V> {
        self.getter.map(|getter| getter(record))
    }
}

impl<R: 'static, V> FieldRef<R, V> {
    pub fn key(&self) -> FieldKey {
        FieldKey {
            owner: TypeId::of::<R>(),
            name: self.name,
        }
    }
}

impl<R, V> Clone for FieldRef<R, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, V> Copy for FieldRef<R, V> {}

impl<R, V> PartialEq for FieldRef<R, V> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<R, V> Eq for FieldRef<R, V> {}

impl<R, V> fmt::Debug for FieldRef<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", std::any::type_name::<R>(), self.name)
    }
}

/// One element being parsed
#[derive(Debug)]
pub struct Frame {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub symbol: &'static str,
    pub start_offset: usize,
    /// Offset the cursor must sit on when the frame closes
    pub end_offset: Option<usize>,
    /// Position of the repeated child currently being read
    pub child_index: usize,
    #[debug(skip)]
    pub(crate) record: Option<Box<dyn AnyRecord>>,
    #[debug(with = transient_keys_fmt)]
    transients: HashMap<FieldKey, Box<dyn Any>>,
}

fn transient_keys_fmt(
    transients: &HashMap<FieldKey, Box<dyn Any>>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_list()
        .entries(transients.keys().map(|key| key.name))
        .finish()
}

impl Frame {
    pub fn new<T: 'static>(
        symbol: &'static str,
        start_offset: usize,
        end_offset: Option<usize>,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            symbol,
            start_offset,
            end_offset,
            child_index: 0,
            record: None,
            transients: HashMap::new(),
        }
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// The record filled by this frame, or a base record it embeds
    pub fn view<R: Record>(&self) -> Option<&R> {
        self.record
            .as_ref()?
            .view(TypeId::of::<R>())?
            .downcast_ref::<R>()
    }

    pub(crate) fn record_mut<R: Record>(&mut self) -> Option<&mut R> {
        self.record.as_mut()?.as_any_mut().downcast_mut::<R>()
    }

    fn views(&self, owner: TypeId) -> bool {
        self.record
            .as_ref()
            .is_some_and(|record| record.view(owner).is_some())
    }

    pub fn transient<R: 'static, V: Clone + 'static>(&self, field: FieldRef<R, V>) -> Option<V> {
        self.transients
            .get(&field.key())?
            .downcast_ref::<V>()
            .cloned()
    }

    pub fn store_transient<R: 'static, V: 'static>(&mut self, field: FieldRef<R, V>, value: V) {
        self.transients.insert(field.key(), Box::new(value));
    }
}

/// Frames of the elements being parsed, root first
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        log::debug!(
            "push {} : {} [{}..{:?}] depth {}",
            frame.symbol,
            frame.type_name,
            frame.start_offset,
            frame.end_offset,
            self.frames.len() + 1
        );
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Drop every frame above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn head(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn head_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn root(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn parent(&self) -> Option<&Frame> {
        let depth = self.frames.len();
        if depth < 2 {
            return None;
        }
        self.frames.get(depth - 2)
    }

    /// Nearest declared end, walking outward from the head
    pub fn frame_end(&self) -> Option<usize> {
        self.frames.iter().rev().find_map(|frame| frame.end_offset)
    }

    /// Resolve `field` on the innermost frame holding its record type
    ///
    /// A transient stored for the field wins over the value on the record.
    pub fn seek<R: 'static, V: Clone + 'static>(&self, field: FieldRef<R, V>) -> Option<V> {
        let owner = TypeId::of::<R>();
        let frame = self.frames.iter().rev().find(|frame| frame.views(owner))?;

        if let Some(value) = frame.transient(field) {
            return Some(value);
        }

        let record = frame.record.as_ref()?.view(owner)?.downcast_ref::<R>()?;
        field.get(record)
    }

    /// Store `value` on the innermost frame holding the record type `R`
    ///
    /// Returns `false` when no such frame is active.
    pub fn publish<R: 'static, V: 'static>(&mut self, field: FieldRef<R, V>, value: V) -> bool {
        let owner = TypeId::of::<R>();
        match self.frames.iter_mut().rev().find(|frame| frame.views(owner)) {
            Some(frame) => {
                frame.store_transient(field, value);
                true
            }
            None => false,
        }
    }
}
