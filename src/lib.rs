// The MIT License (MIT)

// Copyright (c) 2015 Y. T. Chung <zonyitoo@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! BSON is a binary format in which zero or more key/value pairs are stored as a single entity.
//! We call this entity a document.
//!
//! This library provides:
//!   - the BSON value model: [`Bson`], [`Document`] and the supporting value types,
//!   - a binary codec ([`raw`]) that reads and writes the BSON wire format,
//!   - an extended JSON codec ([`extjson`]) for MongoDB's strict and shell notations,
//!   - an object mapper that stores Rust types as documents, described by [class
//!     maps](class_map) that are derived by [conventions] unless configured explicitly.
//!
//! ## Values and documents
//!
//! ```rust
//! use bson_mapping::{Bson, Document, doc};
//!
//! let doc = doc! {
//!     "title": "Jaws",
//!     "year": 1975,
//!     "cast": ["Roy Scheider", "Robert Shaw"],
//! };
//! assert_eq!(doc.get_i32("year")?, 1975);
//!
//! let bytes = doc.to_vec()?;
//! assert_eq!(Document::from_slice(&bytes)?, doc);
//! assert_eq!(Document::from_json(&doc.to_string())?, doc);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```
//!
//! ## Mapping Rust types
//!
//! A type implements [`Mapped`] to declare its members, usually through the [`bson_class!`]
//! macro. By default every member is stored under its own name and a member named `id` becomes
//! the `_id` element.
//!
//! ```rust
//! use bson_mapping::{bson_class, doc, oid::ObjectId};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Movie {
//!     id: ObjectId,
//!     title: String,
//!     year: i32,
//! }
//! bson_class!(Movie { id, title, year });
//!
//! let id = ObjectId::new();
//! let movie = Movie { id, title: "Jaws".into(), year: 1975 };
//! let doc = bson_mapping::to_document(&movie)?;
//! assert_eq!(doc, doc! { "_id": id, "title": "Jaws", "year": 1975 });
//! assert_eq!(bson_mapping::from_document::<Movie>(doc)?, movie);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use self::{
    binary::Binary,
    bson::{Array, Bson, DbPointer, JavaScriptCodeWithScope, Regex, Timestamp},
    class_map::{ClassDescription, ClassMap, ClassMapBuilder, Mapped},
    datetime::DateTime,
    decimal128::Decimal128,
    document::Document,
    registry::Registry,
    uuid::{Uuid, UuidRepresentation},
};
use self::{
    error::Result,
    extjson::JsonWriterOptions,
    serializers::BsonValue,
};

#[macro_use]
mod macros;
mod binary;
mod bson;
pub mod class_map;
pub mod conventions;
pub mod datetime;
pub mod decimal128;
pub mod document;
pub mod error;
pub mod extjson;
pub mod oid;
pub mod raw;
mod registry;
pub mod serializers;
pub mod spec;
pub mod uuid;


/// Converts `value` to a [`Bson`] value through [`Registry::global`].
pub fn to_bson<T: BsonValue>(value: &T) -> Result<Bson> {
    Registry::global().to_bson(value)
}

/// Converts `value` to a [`Document`] through [`Registry::global`]. Fails with
/// [`UnsupportedConversion`](error::ErrorKind::UnsupportedConversion) if `value` is not stored as
/// a document.
pub fn to_document<T: BsonValue>(value: &T) -> Result<Document> {
    Registry::global().to_document(value)
}

/// Encodes `value` as BSON bytes through [`Registry::global`].
pub fn to_vec<T: BsonValue>(value: &T) -> Result<Vec<u8>> {
    Registry::global().to_vec(value)
}

/// Writes `value` as extended JSON through [`Registry::global`].
pub fn to_json<T: BsonValue>(value: &T, options: &JsonWriterOptions) -> Result<String> {
    Registry::global().to_json(value, options)
}

/// Reads a `T` from a [`Bson`] value through [`Registry::global`].
pub fn from_bson<T: BsonValue>(bson: Bson) -> Result<T> {
    Registry::global().from_bson(bson)
}

/// Reads a `T` from a [`Document`] through [`Registry::global`].
pub fn from_document<T: BsonValue>(doc: Document) -> Result<T> {
    Registry::global().from_document(doc)
}

/// Decodes BSON bytes and reads a `T` from them through [`Registry::global`].
pub fn from_slice<T: BsonValue>(bytes: &[u8]) -> Result<T> {
    Registry::global().from_slice(bytes)
}

/// Parses extended JSON and reads a `T` from it through [`Registry::global`].
pub fn from_json<T: BsonValue>(text: &str) -> Result<T> {
    Registry::global().from_json(text)
}
