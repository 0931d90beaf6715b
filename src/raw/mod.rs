//! The binary codec: encoding [`Document`]s to the BSON wire format and decoding them back.
//!
//! Output is built in a [`ChunkedBuffer`], which grows in fixed 16 KiB chunks. Each document's
//! length prefix is reserved before its body is written and backpatched once the body is complete,
//! so nesting depth and document size never need to be known up front.
//!
//! ```rust
//! use bson_mapping::{doc, raw};
//!
//! let doc = doc! { "hi": "y'all" };
//! let bytes = raw::encode_document(&doc)?;
//! assert_eq!(bytes, b"\x13\x00\x00\x00\x02hi\x00\x06\x00\x00\x00y'all\x00\x00");
//! assert_eq!(raw::decode_document(&bytes)?, doc);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```
//!
//! Decoding checks every length prefix against the bytes that remain, so truncated input fails
//! with an error rather than producing a partial document:
//!
//! ```rust
//! use bson_mapping::{doc, raw};
//!
//! let bytes = raw::encode_document(&doc! { "a": 1 })?;
//! let err = raw::decode_document(&bytes[..bytes.len() - 1]).unwrap_err();
//! assert!(err.is_unexpected_end_of_input());
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

mod buffer;
mod doc_writer;
mod reader;
#[cfg(test)]
mod test;
mod writer;

pub use self::{
    buffer::{CHUNK_SIZE, ChunkedBuffer, LengthSlot},
    reader::BsonReader,
    writer::BsonWriter,
};
use crate::{
    Document,
    error::{Error, Result},
};

pub(crate) const MIN_BSON_DOCUMENT_SIZE: i32 = 4 + 1; // 4 bytes for length, one byte for null terminator

/// The largest document the codec will read or write: 16 MiB.
pub const MAX_BSON_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// The deepest nesting of documents and arrays the decoder accepts, counting the top-level
/// document.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Encodes `doc` into a contiguous byte vector.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = ChunkedBuffer::new();
    encode_document_to(doc, &mut buf)?;
    Ok(buf.to_vec())
}

/// Appends the encoding of `doc` to `buf`.
pub fn encode_document_to(doc: &Document, buf: &mut ChunkedBuffer) -> Result<()> {
    writer::write_top_level(buf, doc)
}

/// Decodes exactly one document from `bytes`.
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let mut reader = BsonReader::new(bytes);
    let doc = reader.read_document()?;
    if !reader.is_at_end() {
        return Err(Error::format(format!(
            "{} trailing bytes after document",
            reader.remaining()
        )));
    }
    Ok(doc)
}

/// Decodes a sequence of documents written back to back.
pub fn decode_document_sequence(bytes: &[u8]) -> Result<Vec<Document>> {
    let mut reader = BsonReader::new(bytes);
    let mut docs = Vec::new();
    while !reader.is_at_end() {
        let index = docs.len();
        docs.push(reader.read_document().map_err(|e| e.with_index(index))?);
    }
    Ok(docs)
}

/// Decodes exactly one document from the contents of a [`ChunkedBuffer`].
pub fn decode_document_from(buf: &ChunkedBuffer) -> Result<Document> {
    match buf.chunk_count() {
        0 | 1 => decode_document(buf.chunks().next().unwrap_or_default()),
        _ => decode_document(&buf.to_vec()),
    }
}
