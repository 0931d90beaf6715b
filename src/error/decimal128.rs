use thiserror::Error as ThisError;

use crate::error::{Error, ErrorKind};

/// The kinds of errors that can occur when working with the [`Decimal128`](crate::Decimal128)
/// type.
#[derive(Clone, Debug, ThisError)]
#[non_exhaustive]
pub enum Decimal128ErrorKind {
    /// The input is not a decimal string.
    #[error("unparseable decimal string {input:?}")]
    #[non_exhaustive]
    Unparseable { input: String },

    /// The exponent is outside of the representable range even after clamping.
    #[error("exponent out of range")]
    Overflow,

    /// The coefficient has more than 34 significant digits that cannot be dropped exactly.
    #[error("inexact rounding")]
    InexactRounding,
}

impl Error {
    pub(crate) fn decimal128_unparseable(input: &str) -> Self {
        ErrorKind::Decimal128 {
            kind: Decimal128ErrorKind::Unparseable {
                input: input.to_string(),
            },
        }
        .into()
    }

    pub(crate) fn decimal128(kind: Decimal128ErrorKind) -> Self {
        ErrorKind::Decimal128 { kind }.into()
    }
}
