//! Parseable elements and record schemas

use std::any::{Any, TypeId};

use crate::bound::Bound;
use crate::error::Result;
use crate::reader::Reader;
use crate::stack::FieldRef;

/// A type that can be read from a frame
///
/// Primitives, strings, tagged enums and records all implement this.
/// `#[derive(Element)]` writes the implementation for records.
pub trait Element: Sized + 'static {
    /// Number of bytes this element spans, when known before reading it
    fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
        Ok(None)
    }

    /// Read the element inside the frame already pushed for it
    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self>;
}

/// An element described by an ordered table of fields
pub trait Record: Default + 'static {
    /// Fields in read order, base record fields first
    fn fields() -> Vec<Field<Self>>;

    /// This record, or an embedded base record, as the type `type_id`
    fn view(&self, type_id: TypeId) -> Option<&dyn Any> {
        if type_id == TypeId::of::<Self>() {
            Some(self)
        } else {
            None
        }
    }
}

/// Object safe face of [`Record`] kept inside frames
pub trait AnyRecord: Any {
    fn view(&self, type_id: TypeId) -> Option<&dyn Any>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<R: Record> AnyRecord for R {
    fn view(&self, type_id: TypeId) -> Option<&dyn Any> {
        Record::view(self, type_id)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Deferred write of a field value into its record
pub type Assign<R> = Box<dyn FnOnce(&mut R)>;

type ReadField<R> = Box<dyn Fn(&mut Reader<'_>) -> Result<Assign<R>>>;

type Hook<T> = Box<dyn Fn(&mut Reader<'_>, &T) -> Result<()>>;

/// One entry of a record schema: a name and how to read it
pub struct Field<R> {
    name: &'static str,
    read: ReadField<R>,
}

impl<R: 'static> Field<R> {
    /// Start describing the field `name`, read with `strategy`
    pub fn bind<S>(name: &'static str, strategy: S) -> FieldBuilder<R, S>
    where
        S: Bound + 'static,
        S::Output: 'static,
    {
        FieldBuilder {
            name,
            strategy,
            hooks: Vec::new(),
            _record: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the strategy and return the write to apply on success
    pub fn read(&self, reader: &mut Reader<'_>) -> Result<Assign<R>> {
        (self.read)(reader)
    }

    /// Turn a field of an embedded record into a field of the outer record
    pub fn lift<D: 'static>(self, project: fn(&mut D) -> &mut R) -> Field<D> {
        let read = self.read;
        Field {
            name: self.name,
            read: Box::new(move |reader: &mut Reader<'_>| {
                let assign = read(reader)?;
                Ok(Box::new(move |record: &mut D| assign(project(record))) as Assign<D>)
            }),
        }
    }
}

impl<R> std::fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// Builder returned by [`Field::bind`]
pub struct FieldBuilder<R, S: Bound> {
    name: &'static str,
    strategy: S,
    hooks: Vec<Hook<S::Output>>,
    _record: std::marker::PhantomData<fn(&mut R)>,
}

impl<R: 'static, S> FieldBuilder<R, S>
where
    S: Bound + 'static,
    S::Output: 'static,
{
    /// Keep a copy of the value on the record's frame for later fields
    pub fn transient(mut self, key: FieldRef<R, S::Output>) -> Self
    where
        S::Output: Clone,
    {
        self.hooks.push(Box::new(move |reader: &mut Reader<'_>, value: &S::Output| {
            reader.store_transient(key, value.clone())
        }));
        self
    }

    /// Store a copy of the value on the innermost enclosing `P` record
    pub fn publish<P: 'static>(mut self, key: FieldRef<P, S::Output>) -> Self
    where
        S::Output: Clone,
    {
        self.hooks.push(Box::new(move |reader: &mut Reader<'_>, value: &S::Output| {
            reader.publish(key, value.clone())
        }));
        self
    }

    /// Finish the field, writing the value with `setter`
    pub fn assign(self, setter: fn(&mut R, S::Output)) -> Field<R> {
        let Self {
            name,
            strategy,
            hooks,
            ..
        } = self;

        Field {
            name,
            read: Box::new(move |reader: &mut Reader<'_>| {
                let value = strategy.read(reader, name)?;
                for hook in &hooks {
                    hook(reader, &value)?;
                }
                Ok(Box::new(move |record: &mut R| setter(record, value)) as Assign<R>)
            }),
        }
    }

    /// Finish the field, dropping the value once its hooks ran
    pub fn discard(self) -> Field<R> {
        self.assign(|_, _| {})
    }
}
