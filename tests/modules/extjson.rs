use bson_mapping::{
    Binary,
    Bson,
    DateTime,
    DbPointer,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    doc,
    extjson::{JsonOutputMode, JsonReader, JsonReaderOptions, JsonWriterOptions},
    oid::ObjectId,
    raw,
    spec::BinarySubtype,
    uuid::Uuid,
};
use pretty_assertions::assert_eq;

fn every_type() -> Document {
    doc! {
        "double": 2.5,
        "whole": 3.0,
        "inf": f64::NEG_INFINITY,
        "string": "with \"quotes\" and \\ and \u{1}",
        "doc": { "nested": [1, { "deeper": null }] },
        "array": [],
        "binary": Binary { subtype: BinarySubtype::Generic, bytes: b"bytes".to_vec() },
        "user_binary": Binary { subtype: BinarySubtype::UserDefined(0x80), bytes: vec![1] },
        "uuid": Binary::from_uuid(Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap()),
        "undefined": Bson::Undefined,
        "oid": ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap(),
        "bool": false,
        "date": DateTime::from_millis(1_286_705_410_123),
        "old_date": DateTime::from_millis(-1),
        "null": null,
        "regex": Regex::new("a/b", "mi"),
        "pointer": DbPointer {
            namespace: "db.coll".into(),
            id: ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap(),
        },
        "code": Bson::JavaScriptCode("function() {}".into()),
        "symbol": Bson::Symbol("sym".into()),
        "scoped": JavaScriptCodeWithScope { code: "x".into(), scope: doc! { "x": 1 } },
        "int32": -7,
        "timestamp": Timestamp { time: 1, increment: 2 },
        "int64": 1i64 << 40,
        "small_int64": 5i64,
        "decimal": Bson::Decimal128("1.25".parse().unwrap()),
        "min": Bson::MinKey,
        "max": Bson::MaxKey,
    }
}

#[test]
fn strict_round_trip() {
    let doc = every_type();
    let json = doc.to_json(&JsonWriterOptions::strict());
    assert_eq!(Document::from_json(&json).unwrap(), doc);

    let indented = doc.to_json(&JsonWriterOptions::strict().indent(true));
    assert!(indented.starts_with("{\n  \"double\" : 2.5,\n"), "{indented}");
    assert_eq!(Document::from_json(&indented).unwrap(), doc);
}

#[test]
fn shell_round_trip() {
    let doc = every_type();
    let json = doc.to_json(&JsonWriterOptions::shell());
    assert_eq!(Document::from_json(&json).unwrap(), doc);
    assert_eq!(doc.to_string(), json);
}

#[test]
fn json_and_binary_agree() {
    let doc = every_type();
    let bytes = raw::encode_document(&doc).unwrap();
    let decoded = raw::decode_document(&bytes).unwrap();
    assert_eq!(
        decoded.to_json(&JsonWriterOptions::strict()),
        doc.to_json(&JsonWriterOptions::strict())
    );
}

#[test]
fn shell_forms() {
    let doc = doc! {
        "date": DateTime::from_millis(1_286_705_410_000),
        "long": 1i64 << 40,
        "short": 5i64,
        "ts": Timestamp { time: 1, increment: 2 },
    };
    assert_eq!(
        doc.to_json(&JsonWriterOptions::strict().output_mode(JsonOutputMode::Shell)),
        r#"{ "date" : ISODate("2010-10-10T10:10:10Z"), "long" : NumberLong("1099511627776"), "short" : NumberLong(5), "ts" : Timestamp(1, 2) }"#
    );
}

#[test]
fn reading_documents_one_at_a_time() {
    let text = r#"{ "a" : 1 } { 'b' : NumberInt("2") }
        { c : [ MinKey, MaxKey ] }"#;
    let mut reader = JsonReader::new(text, JsonReaderOptions::default());
    let mut docs = Vec::new();
    while !reader.is_at_end() {
        docs.push(reader.read_document().unwrap());
    }
    assert_eq!(
        docs,
        vec![
            doc! { "a": 1 },
            doc! { "b": 2 },
            doc! { "c": [Bson::MinKey, Bson::MaxKey] },
        ]
    );
}

#[test]
fn single_values() {
    assert_eq!(Bson::from_json("NumberLong(7)").unwrap(), Bson::Int64(7));
    assert_eq!(
        Bson::from_json(r#"ISODate("1970-01-01T00:00:00.001Z")"#).unwrap(),
        Bson::DateTime(DateTime::from_millis(1))
    );
    assert!(Bson::from_json("1 2").is_err());
    assert!(Document::from_json("[1]").is_err());
}
