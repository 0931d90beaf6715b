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

//! BSON definition

use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

pub use crate::document::Document;
use crate::{
    Binary,
    Decimal128,
    error::{Error, Result},
    extjson::{Json, JsonWriterOptions},
    oid::ObjectId,
    spec::ElementType,
};

/// Possible BSON value types.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Bson {
    /// 64-bit binary floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Array
    Array(Array),
    /// Embedded document
    Document(Document),
    /// Boolean value
    Boolean(bool),
    /// Null value
    #[default]
    Null,
    /// Regular expression
    RegularExpression(Regex),
    /// JavaScript code
    JavaScriptCode(String),
    /// JavaScript code w/ scope
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// Timestamp
    Timestamp(Timestamp),
    /// Binary data
    Binary(Binary),
    /// [ObjectId](http://dochub.mongodb.org/core/objectids)
    ObjectId(ObjectId),
    /// UTC datetime
    DateTime(crate::DateTime),
    /// Symbol (Deprecated)
    Symbol(String),
    /// [128-bit decimal floating point](https://github.com/mongodb/specifications/blob/master/source/bson-decimal128/decimal128.md)
    Decimal128(Decimal128),
    /// Undefined value (Deprecated)
    Undefined,
    /// Max key
    MaxKey,
    /// Min key
    MinKey,
    /// DBPointer (Deprecated)
    DbPointer(DbPointer),
}

/// Alias for `Vec<Bson>`.
pub type Array = Vec<Bson>;

impl Hash for Bson {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            // 0.0 == -0.0, so both must hash alike
            Bson::Double(f) if *f == 0.0 => 0u64.hash(state),
            Bson::Double(f) => f.to_bits().hash(state),
            Bson::String(s) | Bson::JavaScriptCode(s) | Bson::Symbol(s) => s.hash(state),
            Bson::Array(a) => a.hash(state),
            Bson::Document(d) => d.hash(state),
            Bson::Boolean(b) => b.hash(state),
            Bson::RegularExpression(r) => r.hash(state),
            Bson::JavaScriptCodeWithScope(c) => c.hash(state),
            Bson::Int32(i) => i.hash(state),
            Bson::Int64(i) => i.hash(state),
            Bson::Timestamp(t) => t.hash(state),
            Bson::Binary(b) => b.hash(state),
            Bson::ObjectId(o) => o.hash(state),
            Bson::DateTime(d) => d.hash(state),
            Bson::Decimal128(d) => d.hash(state),
            Bson::DbPointer(p) => p.hash(state),
            Bson::Null | Bson::Undefined | Bson::MaxKey | Bson::MinKey => {}
        }
    }
}

/// Prints the value in the shell form of extended JSON.
impl Display for Bson {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Json::value(self, &JsonWriterOptions::shell()).fmt(fmt)
    }
}

impl From<f32> for Bson {
    fn from(a: f32) -> Bson {
        Bson::Double(a.into())
    }
}

impl From<f64> for Bson {
    fn from(a: f64) -> Bson {
        Bson::Double(a)
    }
}

impl From<&str> for Bson {
    fn from(s: &str) -> Bson {
        Bson::String(s.to_owned())
    }
}

impl From<&String> for Bson {
    fn from(s: &String) -> Bson {
        Bson::String(s.clone())
    }
}

impl From<String> for Bson {
    fn from(a: String) -> Bson {
        Bson::String(a)
    }
}

impl From<Document> for Bson {
    fn from(a: Document) -> Bson {
        Bson::Document(a)
    }
}

impl From<bool> for Bson {
    fn from(a: bool) -> Bson {
        Bson::Boolean(a)
    }
}

impl From<Regex> for Bson {
    fn from(regex: Regex) -> Bson {
        Bson::RegularExpression(regex)
    }
}

impl From<JavaScriptCodeWithScope> for Bson {
    fn from(code_with_scope: JavaScriptCodeWithScope) -> Bson {
        Bson::JavaScriptCodeWithScope(code_with_scope)
    }
}

impl From<Binary> for Bson {
    fn from(binary: Binary) -> Bson {
        Bson::Binary(binary)
    }
}

impl From<Timestamp> for Bson {
    fn from(ts: Timestamp) -> Bson {
        Bson::Timestamp(ts)
    }
}

impl<T> From<Vec<T>> for Bson
where
    T: Into<Bson>,
{
    fn from(v: Vec<T>) -> Bson {
        Bson::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T> From<&[T]> for Bson
where
    T: Clone + Into<Bson>,
{
    fn from(s: &[T]) -> Bson {
        Bson::Array(s.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Bson>> FromIterator<T> for Bson {
    /// # Examples
    ///
    /// ```
    /// use bson_mapping::Bson;
    ///
    /// let data = vec![1, 2, 3, 4, 5];
    /// let arr: Bson = data.into_iter().collect();
    /// assert_eq!(arr.as_array().map(Vec::len), Some(5));
    /// ```
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Bson::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Bson
where
    T: Into<Bson>,
{
    fn from(a: Option<T>) -> Bson {
        match a {
            None => Bson::Null,
            Some(t) => t.into(),
        }
    }
}

impl From<i8> for Bson {
    fn from(a: i8) -> Bson {
        Bson::Int32(a.into())
    }
}

impl From<i16> for Bson {
    fn from(a: i16) -> Bson {
        Bson::Int32(a.into())
    }
}

impl From<u8> for Bson {
    fn from(a: u8) -> Bson {
        Bson::Int32(a.into())
    }
}

impl From<u16> for Bson {
    fn from(a: u16) -> Bson {
        Bson::Int32(a.into())
    }
}

impl From<i32> for Bson {
    fn from(a: i32) -> Bson {
        Bson::Int32(a)
    }
}

impl From<u32> for Bson {
    fn from(a: u32) -> Bson {
        Bson::Int64(a.into())
    }
}

impl From<i64> for Bson {
    fn from(a: i64) -> Bson {
        Bson::Int64(a)
    }
}

impl From<[u8; 12]> for Bson {
    fn from(a: [u8; 12]) -> Bson {
        Bson::ObjectId(ObjectId::from_bytes(a))
    }
}

impl From<ObjectId> for Bson {
    fn from(a: ObjectId) -> Bson {
        Bson::ObjectId(a)
    }
}

impl From<crate::DateTime> for Bson {
    fn from(a: crate::DateTime) -> Bson {
        Bson::DateTime(a)
    }
}

impl From<Decimal128> for Bson {
    fn from(d: Decimal128) -> Bson {
        Bson::Decimal128(d)
    }
}

impl From<DbPointer> for Bson {
    fn from(a: DbPointer) -> Bson {
        Bson::DbPointer(a)
    }
}

macro_rules! narrowing {
    ($name:ident, $variant:ident => $element_type:ident, $out:ty, |$v:ident| $conv:expr) => {
        pub fn $name(&self) -> Result<$out> {
            match self {
                Bson::$variant($v) => Ok($conv),
                other => Err(Error::type_mismatch(
                    ElementType::$element_type,
                    other.element_type(),
                )),
            }
        }
    };
}

impl Bson {
    /// Get the [`ElementType`] of this value.
    pub fn element_type(&self) -> ElementType {
        match *self {
            Bson::Double(..) => ElementType::Double,
            Bson::String(..) => ElementType::String,
            Bson::Array(..) => ElementType::Array,
            Bson::Document(..) => ElementType::EmbeddedDocument,
            Bson::Boolean(..) => ElementType::Boolean,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(..) => ElementType::RegularExpression,
            Bson::JavaScriptCode(..) => ElementType::JavaScriptCode,
            Bson::JavaScriptCodeWithScope(..) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(..) => ElementType::Int32,
            Bson::Int64(..) => ElementType::Int64,
            Bson::Timestamp(..) => ElementType::Timestamp,
            Bson::Binary(..) => ElementType::Binary,
            Bson::ObjectId(..) => ElementType::ObjectId,
            Bson::DateTime(..) => ElementType::DateTime,
            Bson::Symbol(..) => ElementType::Symbol,
            Bson::Decimal128(..) => ElementType::Decimal128,
            Bson::Undefined => ElementType::Undefined,
            Bson::MaxKey => ElementType::MaxKey,
            Bson::MinKey => ElementType::MinKey,
            Bson::DbPointer(..) => ElementType::DbPointer,
        }
    }

    /// Whether this value is [`Bson::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Bson::Null)
    }

    /// Parses a single value from extended JSON text. Any of the strict or shell forms is
    /// accepted.
    pub fn from_json(text: &str) -> Result<Bson> {
        crate::extjson::JsonReader::new(text, Default::default()).read_single_value()
    }

    /// Renders this value as strict extended JSON.
    pub fn to_json_string(&self) -> String {
        self.to_json(&JsonWriterOptions::default())
    }

    /// Renders this value as extended JSON using the given options.
    pub fn to_json(&self, options: &JsonWriterOptions) -> String {
        Json::value(self, options).to_string()
    }
}

/// Value helpers
impl Bson {
    /// If `self` is [`Double`](Bson::Double), return its value as an `f64`. Returns [`None`]
    /// otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Bson::Double(v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`String`](Bson::String), return its value as a `&str`. Returns [`None`]
    /// otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Bson::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// If `self` is [`String`](Bson::String), return a mutable reference to its value as a [`str`].
    /// Returns [`None`] otherwise.
    pub fn as_str_mut(&mut self) -> Option<&mut str> {
        match *self {
            Bson::String(ref mut s) => Some(s),
            _ => None,
        }
    }

    /// If `self` is [`Array`](Bson::Array), return its value. Returns [`None`] otherwise.
    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Bson::Array(ref v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Array`](Bson::Array), return a mutable reference to its value. Returns
    /// [`None`] otherwise.
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match *self {
            Bson::Array(ref mut v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Document`](Bson::Document), return its value. Returns [`None`] otherwise.
    pub fn as_document(&self) -> Option<&Document> {
        match *self {
            Bson::Document(ref v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Document`](Bson::Document), return a mutable reference to its value. Returns
    /// [`None`] otherwise.
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match *self {
            Bson::Document(ref mut v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Boolean`](Bson::Boolean), return its value. Returns [`None`] otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Bson::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Int32`](Bson::Int32), return its value. Returns [`None`] otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Bson::Int32(v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Int64`](Bson::Int64), return its value. Returns [`None`] otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Bson::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`ObjectId`](Bson::ObjectId), return its value. Returns [`None`] otherwise.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match *self {
            Bson::ObjectId(v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`DateTime`](Bson::DateTime), return its value. Returns [`None`] otherwise.
    pub fn as_datetime(&self) -> Option<&crate::DateTime> {
        match *self {
            Bson::DateTime(ref v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Symbol`](Bson::Symbol), return its value. Returns [`None`] otherwise.
    pub fn as_symbol(&self) -> Option<&str> {
        match *self {
            Bson::Symbol(ref v) => Some(v),
            _ => None,
        }
    }

    /// If `self` is [`Timestamp`](Bson::Timestamp), return its value. Returns [`None`] otherwise.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match *self {
            Bson::Timestamp(timestamp) => Some(timestamp),
            _ => None,
        }
    }

    /// If `self` is [`Binary`](Bson::Binary), return its value. Returns [`None`] otherwise.
    pub fn as_binary(&self) -> Option<&Binary> {
        match *self {
            Bson::Binary(ref b) => Some(b),
            _ => None,
        }
    }

    /// If `self` is [`Decimal128`](Bson::Decimal128), return its value. Returns [`None`]
    /// otherwise.
    pub fn as_decimal128(&self) -> Option<Decimal128> {
        match *self {
            Bson::Decimal128(d) => Some(d),
            _ => None,
        }
    }

    /// If `self` is [`Null`](Bson::Null), return `()`. Returns [`None`] otherwise.
    pub fn as_null(&self) -> Option<()> {
        match *self {
            Bson::Null => Some(()),
            _ => None,
        }
    }

    /// If `self` is [`DbPointer`](Bson::DbPointer), return its value. Returns [`None`] otherwise.
    pub fn as_db_pointer(&self) -> Option<&DbPointer> {
        match *self {
            Bson::DbPointer(ref db_pointer) => Some(db_pointer),
            _ => None,
        }
    }
}

/// Checked narrowing. Each accessor fails with
/// [`ErrorKind::TypeMismatch`](crate::error::ErrorKind::TypeMismatch) when the value holds a
/// different case.
impl Bson {
    narrowing!(try_as_f64, Double => Double, f64, |v| *v);
    narrowing!(try_as_str, String => String, &str, |v| v.as_str());
    narrowing!(try_as_array, Array => Array, &Array, |v| v);
    narrowing!(try_as_document, Document => EmbeddedDocument, &Document, |v| v);
    narrowing!(try_as_bool, Boolean => Boolean, bool, |v| *v);
    narrowing!(try_as_i32, Int32 => Int32, i32, |v| *v);
    narrowing!(try_as_i64, Int64 => Int64, i64, |v| *v);
    narrowing!(try_as_object_id, ObjectId => ObjectId, ObjectId, |v| *v);
    narrowing!(try_as_datetime, DateTime => DateTime, crate::DateTime, |v| *v);
    narrowing!(try_as_symbol, Symbol => Symbol, &str, |v| v.as_str());
    narrowing!(try_as_timestamp, Timestamp => Timestamp, Timestamp, |v| *v);
    narrowing!(try_as_binary, Binary => Binary, &Binary, |v| v);
    narrowing!(try_as_decimal128, Decimal128 => Decimal128, Decimal128, |v| *v);
    narrowing!(try_as_regex, RegularExpression => RegularExpression, &Regex, |v| v);
    narrowing!(try_as_javascript_code, JavaScriptCode => JavaScriptCode, &str, |v| v.as_str());
}

/// Represents a BSON timestamp value.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Default)]
pub struct Timestamp {
    /// The number of seconds since the Unix epoch.
    pub time: u32,

    /// An incrementing value to order timestamps with the same number of seconds in the `time`
    /// field.
    pub increment: u32,
}

impl Timestamp {
    /// The combined wire value: `time` in the high 32 bits, `increment` in the low.
    pub(crate) fn to_u64(self) -> u64 {
        (u64::from(self.time) << 32) | u64::from(self.increment)
    }

    pub(crate) fn from_u64(val: u64) -> Self {
        Timestamp {
            time: (val >> 32) as u32,
            increment: (val & 0xFFFF_FFFF) as u32,
        }
    }
}

/// Represents a BSON regular expression value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Regex {
    /// The regex pattern to match.
    pub pattern: String,

    /// The options for the regex.
    ///
    /// Options are identified by characters, which must be stored in
    /// alphabetical order. Valid options are 'i' for case insensitive matching, 'm' for
    /// multiline matching, 'x' for verbose mode, 'l' to make \w, \W, etc. locale dependent,
    /// 's' for dotall mode ('.' matches everything), and 'u' to make \w, \W, etc. match
    /// unicode.
    pub options: String,
}

impl Regex {
    /// Creates a new [`Regex`], sorting the option characters.
    pub fn new(pattern: impl AsRef<str>, options: impl AsRef<str>) -> Self {
        let mut chars: Vec<_> = options.as_ref().chars().collect();
        chars.sort_unstable();
        Self {
            pattern: pattern.as_ref().to_string(),
            options: chars.into_iter().collect(),
        }
    }
}

impl Display for Regex {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "/{}/{}", self.pattern, self.options)
    }
}

/// Represents a BSON code with scope value.
#[derive(Debug, Clone, PartialEq, Hash, Default)]
pub struct JavaScriptCodeWithScope {
    pub code: String,
    pub scope: Document,
}

/// Represents a DBPointer. (Deprecated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}
