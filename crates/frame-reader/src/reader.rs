//! The parse driver: one cursor, one frame stack, one configuration

use std::any::type_name;

use crate::config::{ByteOrder, Configuration, Notification};
use crate::cursor::{Cursor, Primitive};
use crate::element::{Element, Record};
use crate::error::{ErrorContext, ReaderError, Result};
use crate::stack::{FieldRef, Frame, FrameStack};

/// Receiver of [`Notification`]s for the duration of one parse
pub type Notify<'a> = &'a mut dyn FnMut(&Notification);

/// State of a single parse over one buffer
///
/// Elements and bound strategies receive the reader mutably and drive the
/// cursor through it. A reader is never shared between parses.
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    stack: FrameStack,
    config: &'a Configuration,
    byte_order: ByteOrder,
    notify: Option<Notify<'a>>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], config: &'a Configuration) -> Self {
        Self {
            cursor: Cursor::new(data),
            stack: FrameStack::new(),
            config,
            byte_order: config.byte_order,
            notify: None,
        }
    }

    pub fn with_notify(mut self, notify: Notify<'a>) -> Self {
        self.notify = Some(notify);
        self
    }

    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    pub fn data(&self) -> &'a [u8] {
        self.cursor.data()
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    pub fn config(&self) -> &'a Configuration {
        self.config
    }

    /// Byte order of multi-byte reads at this point of the parse
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn stack(&self) -> &FrameStack {
        &self.stack
    }

    pub fn head(&self) -> Option<&Frame> {
        self.stack.head()
    }

    pub fn head_mut(&mut self) -> Option<&mut Frame> {
        self.stack.head_mut()
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.stack.parent()
    }

    pub fn root(&self) -> Option<&Frame> {
        self.stack.root()
    }

    /// Nearest enclosing frame bound, else the end of the buffer
    pub fn frame_end(&self) -> usize {
        self.stack.frame_end().unwrap_or_else(|| self.cursor.len())
    }

    /// Read a primitive in the current byte order
    pub fn read_int<I: Primitive>(&mut self, symbol: &str) -> Result<I> {
        self.cursor.read_int(self.byte_order, symbol)
    }

    /// Run `read` with a different byte order, restoring it afterwards
    pub fn with_byte_order<T>(
        &mut self,
        order: ByteOrder,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.byte_order, order);
        let result = read(self);
        self.byte_order = previous;
        result
    }

    pub fn skip(&mut self, count: usize, symbol: &str) -> Result<()> {
        self.cursor.skip(count, symbol)
    }

    /// Open a frame for `T` at the current offset
    ///
    /// The declared end must lie inside the enclosing frame, or inside the
    /// buffer at the top level.
    pub fn push<T: 'static>(&mut self, symbol: &'static str, end: Option<usize>) -> Result<()> {
        let start = self.offset();
        let limit = self.frame_end();
        if let Some(end) = end {
            if end > limit {
                return Err(ReaderError::InvalidMemoryAddress {
                    context: ErrorContext::of::<T>(symbol, start),
                    limit,
                });
            }
        }
        self.stack.push(Frame::new::<T>(symbol, start, end));
        Ok(())
    }

    /// Close the head frame and check where the cursor landed
    ///
    /// Reading past the declared end always fails. Stopping short fails
    /// unless recoverable errors are ignored, in which case a warning is
    /// emitted and the cursor moves on to the declared end.
    pub fn pop(&mut self) -> Result<Frame> {
        let frame = self.stack.pop().ok_or_else(|| {
            ReaderError::internal(
                ErrorContext::new("", "FrameStack", self.offset()),
                "no frame to close",
            )
        })?;

        let offset = self.offset();
        log::debug!(
            "pop {} : {} [{}..{}]",
            frame.symbol,
            frame.type_name,
            frame.start_offset,
            offset
        );

        let Some(end) = frame.end_offset else {
            return Ok(frame);
        };

        let misaligned = || ReaderError::MisalignedData {
            context: ErrorContext::new(frame.symbol, frame.type_name, offset),
            expected: end,
            actual: offset,
        };

        if offset > end {
            return Err(misaligned());
        }

        if offset < end {
            if !self.config.ignore_recoverable_errors {
                return Err(misaligned());
            }

            let message = format!(
                "{} : {} closed at {} with {} unread bytes",
                frame.symbol,
                frame.type_name,
                offset,
                end - offset
            );
            log::warn!("{}", message);
            if let Some(notify) = self.notify.as_deref_mut() {
                notify(&Notification::Warning {
                    message,
                    start: frame.start_offset,
                    end: frame.end_offset,
                    type_name: frame.type_name,
                });
            }
            self.cursor.set_offset(end)?;
        }

        Ok(frame)
    }

    /// Parse one `T` at the current offset
    pub fn parse<T: Element>(&mut self, symbol: &'static str) -> Result<T> {
        self.parse_bounded(symbol, None)
    }

    /// Parse one `T` spanning exactly `limit` bytes, or its own upper bound
    pub fn parse_bounded<T: Element>(
        &mut self,
        symbol: &'static str,
        limit: Option<usize>,
    ) -> Result<T> {
        let size = match limit {
            Some(limit) => Some(limit),
            None => T::upper_bound(self)?,
        };
        let start = self.offset();
        let end = match size {
            Some(size) => Some(start.checked_add(size).ok_or_else(|| {
                ReaderError::InvalidMemoryAddress {
                    context: ErrorContext::of::<T>(symbol, start),
                    limit: self.cursor.len(),
                }
            })?),
            None => None,
        };

        let depth = self.stack.depth();
        self.push::<T>(symbol, end)?;

        let value = match T::read_frame(self, symbol) {
            Ok(value) => value,
            Err(error) => {
                self.stack.truncate(depth);
                return Err(error);
            }
        };

        let closed = match self.pop() {
            Ok(frame) => frame,
            Err(error) => {
                self.stack.truncate(depth);
                return Err(error);
            }
        };
        if !closed.is::<T>() {
            return Err(ReaderError::internal(
                ErrorContext::new(closed.symbol, closed.type_name, self.offset()),
                format!("closing the wrong element, expected {}", type_name::<T>()),
            ));
        }

        Ok(value)
    }

    /// Parse one `T` out of the byte range `[start, end)`
    ///
    /// The cursor is put back where it was once the element is read.
    pub fn parse_range<T: Element>(
        &mut self,
        symbol: &'static str,
        start: usize,
        end: usize,
    ) -> Result<T> {
        let saved = self.offset();
        self.cursor.set_offset(start)?;
        let result = self.parse_bounded(symbol, Some(end.saturating_sub(start)));
        self.cursor.set_offset(saved)?;
        result
    }

    /// Fill a fresh `R` field by field inside the head frame
    pub fn fill_record<R: Record>(&mut self, symbol: &'static str) -> Result<R> {
        self.head_frame_mut(symbol)?.record = Some(Box::new(R::default()));

        for field in R::fields() {
            let assign = field.read(self)?;
            let offset = self.offset();
            match self.stack.head_mut().and_then(|frame| frame.record_mut::<R>()) {
                Some(record) => assign(record),
                None => {
                    return Err(ReaderError::internal(
                        ErrorContext::of::<R>(field.name(), offset),
                        "record missing from its frame",
                    ));
                }
            }
        }

        let offset = self.offset();
        let record = self.head_frame_mut(symbol)?.record.take();
        record
            .and_then(|record| record.into_any().downcast::<R>().ok())
            .map(|record| *record)
            .ok_or_else(|| {
                ReaderError::internal(
                    ErrorContext::of::<R>(symbol, offset),
                    "record missing from its frame",
                )
            })
    }

    /// Look `field` up on the innermost frame reading its record type
    pub fn seek<R: 'static, V: Clone + 'static>(&self, field: FieldRef<R, V>) -> Option<V> {
        self.stack.seek(field)
    }

    /// Keep `value` for `field` on the head frame
    pub fn store_transient<R: 'static, V: 'static>(
        &mut self,
        field: FieldRef<R, V>,
        value: V,
    ) -> Result<()> {
        self.head_frame_mut(field.name())?
            .store_transient(field, value);
        Ok(())
    }

    /// Keep `value` for `field` on the innermost frame reading an `R`
    pub fn publish<R: 'static, V: 'static>(&mut self, field: FieldRef<R, V>, value: V) -> Result<()> {
        if self.stack.publish(field, value) {
            Ok(())
        } else {
            Err(ReaderError::internal(
                ErrorContext::of::<R>(field.name(), self.offset()),
                "no enclosing record to publish to",
            ))
        }
    }

    /// Read a raw tag and map it to a value
    ///
    /// Unknown raw values fail with [`ReaderError::WrongDataType`] and leave
    /// the cursor on the tag.
    pub fn read_tag<I: Primitive, T>(
        &mut self,
        symbol: &str,
        map: impl FnOnce(I) -> Option<T>,
    ) -> Result<T> {
        let start = self.offset();
        let raw: I = self.read_int(symbol)?;
        match map(raw) {
            Some(value) => Ok(value),
            None => {
                self.cursor.set_offset(start)?;
                Err(ReaderError::WrongDataType {
                    context: ErrorContext::of::<T>(symbol, start),
                    raw: raw.to_string(),
                })
            }
        }
    }

    fn head_frame_mut(&mut self, symbol: &str) -> Result<&mut Frame> {
        let offset = self.offset();
        self.stack.head_mut().ok_or_else(|| {
            ReaderError::internal(
                ErrorContext::new(symbol, "FrameStack", offset),
                "no open frame",
            )
        })
    }
}

impl std::fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("offset", &self.offset())
            .field("len", &self.cursor.len())
            .field("byte_order", &self.byte_order)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}
