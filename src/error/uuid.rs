use thiserror::Error as ThisError;

use crate::{
    error::{Error, ErrorKind},
    spec::BinarySubtype,
    uuid::UuidRepresentation,
};

/// The kinds of errors that can occur when working with the [`Uuid`](crate::uuid::Uuid) type.
#[derive(Clone, Debug, ThisError)]
#[non_exhaustive]
pub enum UuidErrorKind {
    /// A string could not be parsed as a UUID.
    #[error("invalid UUID string")]
    InvalidString,

    /// A binary value's subtype does not match the representation it was read with.
    #[error(
        "expected binary subtype {expected_binary_subtype:?} for representation \
         {requested_representation:?}, got {actual_binary_subtype:?}"
    )]
    #[non_exhaustive]
    RepresentationMismatch {
        expected_binary_subtype: BinarySubtype,
        actual_binary_subtype: BinarySubtype,
        requested_representation: UuidRepresentation,
    },

    /// A binary value did not contain 16 bytes.
    #[error("expected 16 bytes, got {length}")]
    #[non_exhaustive]
    InvalidLength { length: usize },
}

impl Error {
    pub(crate) fn invalid_uuid_string(message: impl ToString) -> Self {
        Self::from(ErrorKind::Uuid {
            kind: UuidErrorKind::InvalidString,
        })
        .with_message(message)
    }

    pub(crate) fn uuid_representation_mismatch(
        requested_representation: UuidRepresentation,
        actual_binary_subtype: BinarySubtype,
        expected_binary_subtype: BinarySubtype,
    ) -> Self {
        ErrorKind::Uuid {
            kind: UuidErrorKind::RepresentationMismatch {
                expected_binary_subtype,
                actual_binary_subtype,
                requested_representation,
            },
        }
        .into()
    }

    pub(crate) fn invalid_uuid_length(length: usize) -> Self {
        ErrorKind::Uuid {
            kind: UuidErrorKind::InvalidLength { length },
        }
        .into()
    }
}
