use hex::FromHexError;
use thiserror::Error as ThisError;

use crate::error::{Error, ErrorKind};

/// The kinds of errors that can occur when constructing an [`ObjectId`](crate::oid::ObjectId).
#[derive(Clone, Debug, ThisError)]
#[non_exhaustive]
pub enum ObjectIdErrorKind {
    /// A character outside of `0-9`, `a-f` and `A-F` was found in a hex string.
    #[error("invalid character '{c}' at index {index}")]
    #[non_exhaustive]
    InvalidHexStringCharacter { c: char, index: usize },

    /// A hex string did not describe exactly 12 bytes.
    #[error("invalid hex string length {length}, expected 24")]
    #[non_exhaustive]
    InvalidHexStringLength { length: usize },

    /// A byte slice did not contain exactly 12 bytes.
    #[error("invalid byte length {length}, expected 12")]
    #[non_exhaustive]
    InvalidBytesLength { length: usize },
}

impl Error {
    pub(crate) fn oid_from_hex(error: FromHexError, length: usize) -> Self {
        let kind = match error {
            FromHexError::InvalidHexCharacter { c, index } => {
                ObjectIdErrorKind::InvalidHexStringCharacter { c, index }
            }
            FromHexError::InvalidStringLength | FromHexError::OddLength => {
                ObjectIdErrorKind::InvalidHexStringLength { length }
            }
        };
        ErrorKind::ObjectId { kind }.into()
    }

    pub(crate) fn oid_hex_length(length: usize) -> Self {
        ErrorKind::ObjectId {
            kind: ObjectIdErrorKind::InvalidHexStringLength { length },
        }
        .into()
    }

    pub(crate) fn oid_bytes_length(length: usize) -> Self {
        ErrorKind::ObjectId {
            kind: ObjectIdErrorKind::InvalidBytesLength { length },
        }
        .into()
    }
}
