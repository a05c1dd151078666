//! Error handling for frame parsing

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where a failure happened: the field symbol, the element type and the
/// cursor offset at the time of the failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Name of the field (or element) being read, `_` when unnamed
    pub symbol: String,
    /// Type name of the element being read
    pub type_name: &'static str,
    /// Cursor offset
    pub offset: usize,
}

impl ErrorContext {
    pub fn new(symbol: &str, type_name: &'static str, offset: usize) -> Self {
        let symbol = if symbol.is_empty() { "_" } else { symbol };
        Self {
            symbol: symbol.to_string(),
            type_name,
            offset,
        }
    }

    /// Context for reading a value of type `T`
    pub fn of<T: ?Sized>(symbol: &str, offset: usize) -> Self {
        Self::new(symbol, std::any::type_name::<T>(), offset)
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {} at {}", self.symbol, self.type_name, self.offset)
    }
}

/// Errors raised while parsing a buffer
///
/// Only [`ReaderError::MisalignedData`] caused by a frame closing short is
/// recoverable, and only when the configuration asks to ignore recoverable
/// errors. Everything else unwinds the whole parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// A read needed bytes outside of the buffer
    #[error("{context} outside the bounds of [0...{limit}]")]
    InvalidMemoryAddress {
        /// Position of the failed read
        context: ErrorContext,
        /// Length of the addressable range
        limit: usize,
    },

    /// The bytes exist but cannot be reinterpreted as the requested value
    #[error("{context} not readable: {reason}")]
    IncompatibleDataFormat {
        /// Position of the failed read
        context: ErrorContext,
        /// What went wrong
        reason: String,
    },

    /// A raw value does not correspond to any known case of a tagged type
    #[error("{context} has no case for raw value {raw}")]
    WrongDataType {
        /// Position of the raw value
        context: ErrorContext,
        /// The raw value as read
        raw: String,
    },

    /// A frame closed at a different offset than it declared
    #[error("{context} expected to end at {expected} but ended at {actual}")]
    MisalignedData {
        /// The closing element
        context: ErrorContext,
        /// Declared end offset
        expected: usize,
        /// Cursor offset at close time
        actual: usize,
    },

    /// A schema invariant was violated
    #[error("{message} at {context}")]
    InternalError {
        /// Position of the violation
        context: ErrorContext,
        /// Description of the violated invariant
        message: String,
    },
}

impl ReaderError {
    pub fn internal(context: ErrorContext, message: impl Into<String>) -> Self {
        Self::InternalError {
            context,
            message: message.into(),
        }
    }

    pub fn incompatible(context: ErrorContext, reason: impl Into<String>) -> Self {
        Self::IncompatibleDataFormat {
            context,
            reason: reason.into(),
        }
    }

    /// The position triple carried by every variant
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidMemoryAddress { context, .. }
            | Self::IncompatibleDataFormat { context, .. }
            | Self::WrongDataType { context, .. }
            | Self::MisalignedData { context, .. }
            | Self::InternalError { context, .. } => context,
        }
    }

    /// Offset at which the error was raised
    pub fn offset(&self) -> usize {
        self.context().offset
    }
}

/// Type alias for Results from parsing operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors of the file loading convenience layer
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file content did not parse
    #[error(transparent)]
    Reader(#[from] ReaderError),
}
