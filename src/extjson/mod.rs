//! Reading and writing MongoDB extended JSON.
//!
//! Extended JSON is a superset of JSON that can describe every BSON type. Two flavors are
//! produced by [`JsonWriterOptions`]:
//!   - [`JsonOutputMode::Strict`] uses only `$`-prefixed objects, such as
//!     `{ "$oid" : "56e1fc72e0c917e9c4714161" }`. Reading strict output back always yields the
//!     original values.
//!   - [`JsonOutputMode::Shell`] uses the constructor syntax of the mongo shell, such as
//!     `ObjectId("56e1fc72e0c917e9c4714161")` or `/ab/i`.
//!
//! [`JsonReader`] accepts both flavors, and the alternative spellings of the shell constructors
//! (`new Date(...)`, `RegExp(...)`, `NumberLong("...")`, `BinData(...)`, ...), in any mix.
//!
//! ```
//! use bson_mapping::{doc, extjson::JsonWriterOptions, Document};
//!
//! let doc = Document::from_json(r#"{ "n" : NumberLong(5), 're' : /a.c/i }"#)?;
//! assert_eq!(doc, doc! { "n": 5i64, "re": bson_mapping::Regex::new("a.c", "i") });
//! assert_eq!(
//!     doc.to_json(&JsonWriterOptions::strict()),
//!     r#"{ "n" : { "$numberLong" : "5" }, "re" : { "$regex" : "a.c", "$options" : "i" } }"#
//! );
//! assert_eq!(doc.to_string(), r#"{ "n" : NumberLong(5), "re" : /a.c/i }"#);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

#[cfg(feature = "serde_json-1")]
pub mod json;
mod reader;
mod scanner;
mod writer;

pub use self::{
    reader::{JsonReader, JsonReaderOptions},
    writer::{JsonOutputMode, JsonWriterOptions},
};
pub(crate) use self::writer::{Json, format_double};
