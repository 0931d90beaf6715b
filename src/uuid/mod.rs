//! UUID support for BSON.
//!
//! BSON stores UUIDs as binary values. Subtype 4 holds the standard RFC 4122 byte order; subtype 3
//! is the legacy subtype whose byte order depends on the driver that wrote it. The
//! [`UuidRepresentation`] enum names each of those layouts so that values written by older drivers
//! can be read back without scrambling their bytes:
//!
//! ```
//! use bson_mapping::{Binary, spec::BinarySubtype, uuid::{Uuid, UuidRepresentation}};
//!
//! let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff")?;
//! let legacy = Binary::from_uuid_with_representation(uuid, UuidRepresentation::CSharpLegacy);
//! assert_eq!(legacy.subtype, BinarySubtype::UuidOld);
//! assert_eq!(legacy.bytes[..4], [0x33, 0x22, 0x11, 0x00]);
//! assert_eq!(legacy.to_uuid_with_representation(UuidRepresentation::CSharpLegacy)?, uuid);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::{
    Binary,
    Bson,
    error::{Error, Result},
    spec::BinarySubtype,
};

/// A struct modeling a BSON UUID value (i.e. a Binary value with subtype 4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uuid {
    uuid: uuid::Uuid,
}

impl Uuid {
    /// Creates a random UUID.
    ///
    /// This uses the operating system's RNG as the source of random numbers.
    pub fn new() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4(),
        }
    }

    /// The all-zero UUID.
    pub const fn nil() -> Self {
        Self::from_bytes([0; 16])
    }

    /// Creates a [`Uuid`] using the supplied big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self::from_external_uuid(uuid::Uuid::from_bytes(bytes))
    }

    /// Creates a [`Uuid`] from the provided hex string.
    pub fn parse_str(input: impl AsRef<str>) -> Result<Self> {
        let uuid = uuid::Uuid::parse_str(input.as_ref()).map_err(Error::invalid_uuid_string)?;
        Ok(Self::from_external_uuid(uuid))
    }

    pub(crate) const fn from_external_uuid(uuid: uuid::Uuid) -> Self {
        Self { uuid }
    }

    /// Returns an array of 16 bytes containing the [`Uuid`]'s data.
    pub const fn bytes(self) -> [u8; 16] {
        *self.uuid.as_bytes()
    }

    /// Whether every byte of this UUID is zero.
    pub fn is_nil(&self) -> bool {
        self.uuid.is_nil()
    }
}

#[cfg(feature = "uuid-1")]
#[cfg_attr(docsrs, doc(cfg(feature = "uuid-1")))]
impl Uuid {
    /// Create a [`Uuid`] from a [`uuid::Uuid`](https://docs.rs/uuid/latest/uuid/struct.Uuid.html).
    pub fn from_uuid_1(uuid: uuid::Uuid) -> Self {
        Self::from_external_uuid(uuid)
    }

    /// Convert this [`Uuid`] to a [`uuid::Uuid`](https://docs.rs/uuid/latest/uuid/struct.Uuid.html).
    pub fn to_uuid_1(self) -> uuid::Uuid {
        self.uuid
    }
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uuid.fmt(f)
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.uuid, f)
    }
}

impl From<Uuid> for Binary {
    fn from(uuid: Uuid) -> Self {
        Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.bytes().to_vec(),
        }
    }
}

impl From<Uuid> for Bson {
    fn from(u: Uuid) -> Self {
        Bson::Binary(u.into())
    }
}

#[cfg(feature = "uuid-1")]
impl From<uuid::Uuid> for Uuid {
    fn from(u: uuid::Uuid) -> Self {
        Self::from_external_uuid(u)
    }
}

#[cfg(feature = "uuid-1")]
impl From<Uuid> for uuid::Uuid {
    fn from(s: Uuid) -> Self {
        s.uuid
    }
}

/// The byte layouts a UUID may have been stored with.
///
/// Only [`UuidRepresentation::Standard`] uses subtype 4; the legacy layouts all use subtype 3 and
/// differ in which groups of bytes are reversed.
#[non_exhaustive]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub enum UuidRepresentation {
    /// The canonical representation of UUIDs in BSON (binary with subtype 0x04)
    #[default]
    Standard,
    /// The legacy representation of UUIDs in BSON used by the C# driver (binary subtype 0x03)
    CSharpLegacy,
    /// The legacy representation of UUIDs in BSON used by the Java driver (binary subtype 0x03)
    JavaLegacy,
    /// The legacy representation of UUIDs in BSON used by the Python driver, which is the same
    /// format as STANDARD, but has binary subtype 0x03
    PythonLegacy,
}

impl UuidRepresentation {
    fn subtype(self) -> BinarySubtype {
        match self {
            Self::Standard => BinarySubtype::Uuid,
            _ => BinarySubtype::UuidOld,
        }
    }

    // each legacy layout is its own inverse
    fn swap(self, bytes: &mut [u8; 16]) {
        match self {
            Self::Standard | Self::PythonLegacy => {}
            Self::CSharpLegacy => {
                bytes[0..4].reverse();
                bytes[4..6].reverse();
                bytes[6..8].reverse();
            }
            Self::JavaLegacy => {
                bytes[0..8].reverse();
                bytes[8..16].reverse();
            }
        }
    }
}

impl Binary {
    /// Serializes a [`Uuid`] into BSON [`Binary`] type
    pub fn from_uuid(uuid: Uuid) -> Self {
        Binary::from(uuid)
    }

    /// Serializes a [`Uuid`] into BSON binary type and takes the desired representation as a
    /// parameter.
    pub fn from_uuid_with_representation(uuid: Uuid, rep: UuidRepresentation) -> Self {
        let mut bytes = uuid.bytes();
        rep.swap(&mut bytes);
        Binary {
            subtype: rep.subtype(),
            bytes: bytes.to_vec(),
        }
    }

    /// Deserializes a BSON [`Binary`] type into a [`Uuid`] according to the provided
    /// representation. If the representation does not match the [`Binary`], an error will be
    /// returned.
    pub fn to_uuid_with_representation(&self, rep: UuidRepresentation) -> Result<Uuid> {
        let expected = rep.subtype();
        if self.subtype != expected {
            return Err(Error::uuid_representation_mismatch(
                rep,
                self.subtype,
                expected,
            ));
        }
        let mut buf: [u8; 16] = self
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::invalid_uuid_length(self.bytes.len()))?;
        rep.swap(&mut buf);
        Ok(Uuid::from_bytes(buf))
    }

    /// Deserializes a BSON [`Binary`] type into a [`Uuid`] using the standard
    /// representation.
    pub fn to_uuid(&self) -> Result<Uuid> {
        self.to_uuid_with_representation(UuidRepresentation::Standard)
    }
}
