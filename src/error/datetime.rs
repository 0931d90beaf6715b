use thiserror::Error as ThisError;

use crate::error::{Error, ErrorKind};

/// The kinds of errors that can occur when working with the [`DateTime`](crate::DateTime) type.
#[derive(Clone, Debug, ThisError)]
#[non_exhaustive]
pub enum DateTimeErrorKind {
    /// The value could not be rendered as an RFC 3339 string.
    #[error("cannot format: {message}")]
    #[non_exhaustive]
    CannotFormat { message: String },

    /// A date string or set of date components could not be understood.
    #[error("invalid value: {message}")]
    #[non_exhaustive]
    InvalidValue { message: String },
}

impl Error {
    pub(crate) fn invalid_datetime(message: impl ToString) -> Self {
        ErrorKind::DateTime {
            kind: DateTimeErrorKind::InvalidValue {
                message: message.to_string(),
            },
        }
        .into()
    }

    pub(crate) fn cannot_format_datetime(message: impl ToString) -> Self {
        ErrorKind::DateTime {
            kind: DateTimeErrorKind::CannotFormat {
                message: message.to_string(),
            },
        }
        .into()
    }
}
