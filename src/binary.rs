//! Module containing functionality related to BSON binary values.

use std::fmt::{self, Display};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    error::{Error, Result},
    spec::BinarySubtype,
};

/// Represents a BSON binary value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    /// The subtype of the bytes.
    pub subtype: BinarySubtype,

    /// The binary bytes.
    pub bytes: Vec<u8>,
}

impl Default for Binary {
    fn default() -> Self {
        Self {
            subtype: BinarySubtype::Generic,
            bytes: Vec::new(),
        }
    }
}

impl Display for Binary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Binary({:#x}, {})",
            u8::from(self.subtype),
            STANDARD.encode(&self.bytes)
        )
    }
}

impl Binary {
    /// Creates a [`Binary`] from a base64 string and optional [`BinarySubtype`]. If the
    /// `subtype` argument is [`None`], the [`Binary`] constructed will default to
    /// [`BinarySubtype::Generic`].
    ///
    /// ```rust
    /// # use bson_mapping::Binary;
    /// let binary = Binary::from_base64("aGVsbG8=", None)?;
    /// assert_eq!(binary.bytes, b"hello");
    /// # Ok::<(), bson_mapping::error::Error>(())
    /// ```
    pub fn from_base64(
        input: impl AsRef<str>,
        subtype: impl Into<Option<BinarySubtype>>,
    ) -> Result<Self> {
        let bytes = STANDARD
            .decode(input.as_ref())
            .map_err(|e| Error::format(format!("invalid base64: {e}")))?;
        let subtype = subtype.into().unwrap_or(BinarySubtype::Generic);
        Ok(Binary { subtype, bytes })
    }

    /// Creates a [`Binary`] from a hex string, as accepted by the shell's `HexData` constructor.
    pub fn from_hex(input: impl AsRef<str>, subtype: BinarySubtype) -> Result<Self> {
        let bytes =
            hex::decode(input.as_ref()).map_err(|e| Error::format(format!("invalid hex: {e}")))?;
        Ok(Binary { subtype, bytes })
    }

    /// Encodes the bytes as standard padded base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}
