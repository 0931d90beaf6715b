//! Module containing functionality related to BSON ObjectIds.
//! For more information, see the documentation for the [`ObjectId`] type.

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
    time::SystemTime,
};

use once_cell::sync::Lazy;
use rand::{Rng, random};

use crate::error::{Error, Result};

const TIMESTAMP_SIZE: usize = 4;
const PROCESS_ID_SIZE: usize = 5;
const COUNTER_SIZE: usize = 3;

const TIMESTAMP_OFFSET: usize = 0;
const PROCESS_ID_OFFSET: usize = TIMESTAMP_OFFSET + TIMESTAMP_SIZE;
const COUNTER_OFFSET: usize = PROCESS_ID_OFFSET + PROCESS_ID_SIZE;

const MAX_U24: usize = 0xFF_FFFF;

static OID_COUNTER: Lazy<AtomicUsize> =
    Lazy::new(|| AtomicUsize::new(rand::rng().random_range(0..=MAX_U24)));

static PROCESS_UNIQUE: Lazy<[u8; PROCESS_ID_SIZE]> = Lazy::new(|| random());

/// A wrapper around a raw 12-byte ObjectId.
///
/// ```
/// use bson_mapping::oid::ObjectId;
///
/// let oid = ObjectId::parse_str("56e1fc72e0c917e9c4714161")?;
/// assert_eq!(oid.to_hex(), "56e1fc72e0c917e9c4714161");
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct ObjectId {
    id: [u8; 12],
}

impl ObjectId {
    /// The all-zero ObjectId, used as the "empty" id by id generators.
    pub const EMPTY: ObjectId = ObjectId { id: [0; 12] };

    /// Generates a new [`ObjectId`], represented in bytes.
    /// See the [docs](http://www.mongodb.com/docs/manual/reference/object-id/)
    /// for more information.
    pub fn new() -> ObjectId {
        let timestamp = ObjectId::gen_timestamp();
        let process_id = *PROCESS_UNIQUE;
        let counter = ObjectId::gen_count();

        let mut buf: [u8; 12] = [0; 12];
        buf[TIMESTAMP_OFFSET..PROCESS_ID_OFFSET].copy_from_slice(&timestamp);
        buf[PROCESS_ID_OFFSET..COUNTER_OFFSET].copy_from_slice(&process_id);
        buf[COUNTER_OFFSET..].copy_from_slice(&counter);

        ObjectId::from_bytes(buf)
    }

    /// Constructs a new ObjectId wrapper around the raw byte representation.
    pub const fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { id: bytes }
    }

    /// Constructs an ObjectId from a slice that must hold exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<ObjectId> {
        let id: [u8; 12] = bytes
            .try_into()
            .map_err(|_| Error::oid_bytes_length(bytes.len()))?;
        Ok(ObjectId { id })
    }

    /// Creates an [`ObjectId`] using a 12-byte (24-char) hexadecimal string.
    pub fn parse_str(s: impl AsRef<str>) -> Result<ObjectId> {
        let s = s.as_ref();

        let bytes: Vec<u8> = hex::decode(s.as_bytes()).map_err(|e| Error::oid_from_hex(e, s.len()))?;
        if bytes.len() != 12 {
            return Err(Error::oid_hex_length(s.len()));
        }
        let mut byte_array: [u8; 12] = [0; 12];
        byte_array[..].copy_from_slice(&bytes[..]);
        Ok(ObjectId::from_bytes(byte_array))
    }

    /// Creates an ObjectId with the given generation time and zeroes everywhere else.
    /// Useful for range queries over ids.
    pub fn from_timestamp(seconds: u32) -> ObjectId {
        let mut id = [0; 12];
        id[..TIMESTAMP_SIZE].copy_from_slice(&seconds.to_be_bytes());
        ObjectId { id }
    }

    /// Retrieves the timestamp (seconds since epoch) from an [`ObjectId`].
    pub fn timestamp(&self) -> u32 {
        let mut buf = [0; 4];
        buf.copy_from_slice(&self.id[TIMESTAMP_OFFSET..PROCESS_ID_OFFSET]);
        u32::from_be_bytes(buf)
    }

    /// Retrieves the increment counter from an [`ObjectId`].
    pub fn counter(&self) -> u32 {
        let mut buf = [0; 4];
        buf[1..].copy_from_slice(&self.id[COUNTER_OFFSET..]);
        u32::from_be_bytes(buf)
    }

    /// Returns the raw byte representation of an ObjectId.
    pub const fn bytes(&self) -> [u8; 12] {
        self.id
    }

    /// Convert this [`ObjectId`] to its hex string representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.id)
    }

    /// Whether this is [`ObjectId::EMPTY`].
    pub fn is_empty(&self) -> bool {
        self.id == [0; 12]
    }

    fn gen_timestamp() -> [u8; 4] {
        let seconds = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        seconds.to_be_bytes()
    }

    fn gen_count() -> [u8; 3] {
        Self::counter_bytes(OID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    fn counter_bytes(u_counter: usize) -> [u8; 3] {
        // the counter wraps at 2^24
        let u = u_counter % (MAX_U24 + 1);

        let buf = (u as u32).to_be_bytes();
        [buf[1], buf[2], buf[3]]
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self { id: bytes }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.to_hex()).finish()
    }
}
