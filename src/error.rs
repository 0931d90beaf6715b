//! Contains the error-related types for the `bson_mapping` crate.

mod datetime;
mod decimal128;
mod oid;
mod uuid;

use thiserror::Error;

pub use self::{
    datetime::DateTimeErrorKind,
    decimal128::Decimal128ErrorKind,
    oid::ObjectIdErrorKind,
    uuid::UuidErrorKind,
};
use crate::spec::ElementType;

pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `bson_mapping` crate.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,

    /// The document key associated with the error, if any.
    pub key: Option<String>,

    /// The array index associated with the error, if any.
    pub index: Option<usize>,

    /// An optional message describing the error.
    pub message: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(key) = self.key.as_deref() {
            write!(f, "Error at key \"{key}\": ")?;
        } else if let Some(index) = self.index {
            write!(f, "Error at array index {index}: ")?;
        }

        write!(f, "{}", self.kind)?;

        if let Some(message) = self.message.as_deref() {
            write!(f, ". {message}")?;
        }

        Ok(())
    }
}

/// The types of errors that can occur in the `bson_mapping` crate.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A value was narrowed to a type it does not hold.
    #[error("Expected a value of type {expected:?}, found {actual:?}")]
    #[non_exhaustive]
    TypeMismatch {
        /// The type that was requested.
        expected: ElementType,

        /// The type of the value actually present.
        actual: ElementType,
    },

    /// No value for the requested key was present in the document.
    #[error("The key was not present in the document")]
    NotPresent,

    /// A length prefix or fixed-size value ran past the end of the input.
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    #[non_exhaustive]
    UnexpectedEndOfInput {
        /// The number of bytes the reader needed.
        needed: usize,

        /// The number of bytes left in the input.
        remaining: usize,
    },

    /// Malformed binary framing, malformed extended JSON, or a value whose shape does not match
    /// the representation its serializer requires.
    #[error("Format error: {message}")]
    #[non_exhaustive]
    Format { message: String },

    /// Invalid UTF-8 bytes were encountered.
    #[error("Invalid UTF-8")]
    Utf8Encoding,

    /// A class map could not be built.
    #[error("Unable to build the class map for {class}: {message}")]
    #[non_exhaustive]
    MappingBuild {
        /// The class whose map failed to build.
        class: String,

        /// A description of the conflict.
        message: String,
    },

    /// A member marked as required had no element in the document being read.
    #[error("Required element '{element}' for member '{member}' of class {class} is missing")]
    #[non_exhaustive]
    MissingRequiredElement {
        element: String,
        member: String,
        class: String,
    },

    /// A document contained an element that no member map accepts and the class does not ignore
    /// extra elements.
    #[error("Element '{element}' does not match any field or property of class {class}")]
    #[non_exhaustive]
    UnknownElement { element: String, class: String },

    /// A value cannot be converted in the requested direction, e.g. a scalar written where only a
    /// document is valid.
    #[error("Unsupported conversion: {message}")]
    #[non_exhaustive]
    UnsupportedConversion { message: String },

    /// An error related to the [`ObjectId`](crate::oid::ObjectId) type occurred.
    #[error("An ObjectId-related error occurred: {kind}")]
    #[non_exhaustive]
    ObjectId { kind: ObjectIdErrorKind },

    /// An error related to the [`DateTime`](crate::DateTime) type occurred.
    #[error("A DateTime-related error occurred: {kind}")]
    #[non_exhaustive]
    DateTime { kind: DateTimeErrorKind },

    /// An error related to the [`Decimal128`](crate::Decimal128) type occurred.
    #[error("A Decimal128-related error occurred: {kind}")]
    #[non_exhaustive]
    Decimal128 { kind: Decimal128ErrorKind },

    /// An error related to the [`Uuid`](crate::uuid::Uuid) type occurred.
    #[error("A UUID-related error occurred: {kind}")]
    #[non_exhaustive]
    Uuid { kind: UuidErrorKind },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            key: None,
            index: None,
            message: None,
        }
    }
}

impl Error {
    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        // keep the innermost location
        if self.key.is_none() && self.index.is_none() {
            self.key = Some(key.into());
        }
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        if self.key.is_none() && self.index.is_none() {
            self.index = Some(index);
        }
        self
    }

    pub(crate) fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub(crate) fn type_mismatch(expected: ElementType, actual: ElementType) -> Self {
        ErrorKind::TypeMismatch { expected, actual }.into()
    }

    pub(crate) fn not_present() -> Self {
        ErrorKind::NotPresent.into()
    }

    pub(crate) fn end_of_input(needed: usize, remaining: usize) -> Self {
        ErrorKind::UnexpectedEndOfInput { needed, remaining }.into()
    }

    pub(crate) fn format(message: impl ToString) -> Self {
        ErrorKind::Format {
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn mapping(class: impl Into<String>, message: impl ToString) -> Self {
        ErrorKind::MappingBuild {
            class: class.into(),
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn missing_required(
        element: impl Into<String>,
        member: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        ErrorKind::MissingRequiredElement {
            element: element.into(),
            member: member.into(),
            class: class.into(),
        }
        .into()
    }

    pub(crate) fn unknown_element(element: impl Into<String>, class: impl Into<String>) -> Self {
        ErrorKind::UnknownElement {
            element: element.into(),
            class: class.into(),
        }
        .into()
    }

    pub(crate) fn unsupported(message: impl ToString) -> Self {
        ErrorKind::UnsupportedConversion {
            message: message.to_string(),
        }
        .into()
    }

    /// Whether this error was caused by input that ended before a length prefix was satisfied.
    pub fn is_unexpected_end_of_input(&self) -> bool {
        matches!(self.kind, ErrorKind::UnexpectedEndOfInput { .. })
    }

    /// Whether this error was raised while building a class map.
    pub fn is_mapping_build(&self) -> bool {
        matches!(self.kind, ErrorKind::MappingBuild { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_type_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::TypeMismatch { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_not_present(&self) -> bool {
        matches!(self.kind, ErrorKind::NotPresent)
    }

    #[cfg(test)]
    pub(crate) fn is_format(&self) -> bool {
        matches!(self.kind, ErrorKind::Format { .. })
    }
}
