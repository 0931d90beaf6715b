//! Conversions between [`Bson`] and [`serde_json::Value`].

use serde_json::{Map, Value, json};

use super::{JsonReader, JsonReaderOptions};
use crate::{
    Binary,
    Bson,
    DbPointer,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    error::{Error, Result},
};

/// Converts the value into relaxed extended JSON: numbers become JSON numbers and everything
/// else uses the `$`-prefixed object forms.
impl From<Bson> for Value {
    fn from(bson: Bson) -> Self {
        bson.into_relaxed_extjson()
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Bson::Document(doc).into_relaxed_extjson()
    }
}

/// Interprets plain JSON as well as the strict `$`-prefixed object forms.
impl TryFrom<Value> for Bson {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let text = serde_json::to_string(&value).map_err(Error::format)?;
        JsonReader::new(&text, JsonReaderOptions::default()).read_single_value()
    }
}

impl TryFrom<Map<String, Value>> for Document {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let text = serde_json::to_string(&map).map_err(Error::format)?;
        JsonReader::new(&text, JsonReaderOptions::default()).read_single_document()
    }
}

impl Bson {
    /// Converts this value into a [`serde_json::Value`] in relaxed extended JSON.
    pub fn into_relaxed_extjson(self) -> Value {
        match self {
            Bson::Double(v) if v.is_nan() => json!({ "$numberDouble": "NaN" }),
            Bson::Double(v) if v.is_infinite() => {
                let s = if v.is_sign_negative() {
                    "-Infinity"
                } else {
                    "Infinity"
                };
                json!({ "$numberDouble": s })
            }
            Bson::Double(v) => json!(v),
            Bson::String(v) => json!(v),
            Bson::Array(v) => Value::Array(v.into_iter().map(Bson::into_relaxed_extjson).collect()),
            Bson::Document(v) => Value::Object(
                v.into_iter()
                    .map(|(k, v)| (k, v.into_relaxed_extjson()))
                    .collect(),
            ),
            Bson::Boolean(v) => json!(v),
            Bson::Null => Value::Null,
            Bson::RegularExpression(Regex { pattern, options }) => json!({
                "$regularExpression": {
                    "pattern": pattern,
                    "options": options,
                }
            }),
            Bson::JavaScriptCode(code) => json!({ "$code": code }),
            Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope }) => json!({
                "$code": code,
                "$scope": Bson::Document(scope).into_relaxed_extjson(),
            }),
            Bson::Int32(v) => v.into(),
            Bson::Int64(v) => v.into(),
            Bson::Timestamp(Timestamp { time, increment }) => json!({
                "$timestamp": {
                    "t": time,
                    "i": increment,
                }
            }),
            Bson::Binary(binary) => {
                let subtype: u8 = binary.subtype.into();
                json!({
                    "$binary": {
                        "base64": Binary::to_base64(&binary),
                        "subType": hex::encode([subtype]),
                    }
                })
            }
            Bson::ObjectId(v) => json!({ "$oid": v.to_hex() }),
            Bson::DateTime(v) => match v.to_iso_string() {
                Some(iso) if v.timestamp_millis() >= 0 => json!({ "$date": iso }),
                _ => json!({ "$date": { "$numberLong": v.timestamp_millis().to_string() } }),
            },
            Bson::Symbol(v) => json!({ "$symbol": v }),
            Bson::Decimal128(v) => json!({ "$numberDecimal": v.to_string() }),
            Bson::Undefined => json!({ "$undefined": true }),
            Bson::MinKey => json!({ "$minKey": 1 }),
            Bson::MaxKey => json!({ "$maxKey": 1 }),
            Bson::DbPointer(DbPointer { namespace, id }) => json!({
                "$dbPointer": {
                    "$ref": namespace,
                    "$id": { "$oid": id.to_hex() }
                }
            }),
        }
    }
}
