use pretty_assertions::assert_eq;
use time::macros::offset;

use crate::{
    Binary,
    Bson,
    DateTime,
    DbPointer,
    Decimal128,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    doc,
    extjson::{JsonOutputMode, JsonReader, JsonReaderOptions, JsonWriterOptions},
    oid::ObjectId,
    spec::BinarySubtype,
    tests::LOCK,
    uuid::{Uuid, UuidRepresentation},
};

const OID: &str = "56e1fc72e0c917e9c4714161";
const UUID: &str = "00112233-4455-6677-8899-aabbccddeeff";

fn read(text: &str) -> Bson {
    Bson::from_json(text).unwrap_or_else(|e| panic!("{text}: {e}"))
}

fn strict(value: &Bson) -> String {
    value.to_json(&JsonWriterOptions::strict())
}

fn shell(value: &Bson) -> String {
    value.to_json(&JsonWriterOptions::shell())
}

#[test]
fn strict_output() {
    let _guard = LOCK.run_concurrently();
    let oid = ObjectId::parse_str(OID).unwrap();
    let cases = [
        (Bson::Int32(-3), "-3"),
        (Bson::Int64(5), "{ \"$numberLong\" : \"5\" }"),
        (Bson::Double(1.0), "1.0"),
        (Bson::Double(1.5e40), "1.5E+40"),
        (Bson::Double(f64::NAN), "{ \"$numberDouble\" : \"NaN\" }"),
        (Bson::Double(f64::NEG_INFINITY), "{ \"$numberDouble\" : \"-Infinity\" }"),
        (Bson::ObjectId(oid), "{ \"$oid\" : \"56e1fc72e0c917e9c4714161\" }"),
        (Bson::DateTime(DateTime::from_millis(1500)), "{ \"$date\" : 1500 }"),
        (
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: b"hello".to_vec(),
            }),
            "{ \"$binary\" : \"aGVsbG8=\", \"$type\" : \"00\" }",
        ),
        (
            Bson::RegularExpression(Regex::new("a/b", "i")),
            "{ \"$regex\" : \"a/b\", \"$options\" : \"i\" }",
        ),
        (
            Bson::Timestamp(Timestamp {
                time: 1,
                increment: 2,
            }),
            "{ \"$timestamp\" : { \"t\" : 1, \"i\" : 2 } }",
        ),
        (Bson::Undefined, "{ \"$undefined\" : true }"),
        (Bson::MinKey, "{ \"$minKey\" : 1 }"),
        (Bson::MaxKey, "{ \"$maxKey\" : 1 }"),
        (Bson::Symbol("sym".into()), "{ \"$symbol\" : \"sym\" }"),
        (
            Bson::Decimal128("1.5".parse::<Decimal128>().unwrap()),
            "{ \"$numberDecimal\" : \"1.5\" }",
        ),
        (
            Bson::DbPointer(DbPointer {
                namespace: "db.coll".into(),
                id: oid,
            }),
            "{ \"$dbPointer\" : { \"$ref\" : \"db.coll\", \"$id\" : { \"$oid\" : \
             \"56e1fc72e0c917e9c4714161\" } } }",
        ),
    ];
    for (value, expected) in cases {
        assert_eq!(strict(&value), expected);
    }
}

#[test]
fn shell_output() {
    let _guard = LOCK.run_concurrently();
    let oid = ObjectId::parse_str(OID).unwrap();
    let uuid = Uuid::parse_str(UUID).unwrap();
    let cases = [
        (Bson::Int64(5), "NumberLong(5)".to_string()),
        (Bson::Int64(i64::MAX), format!("NumberLong(\"{}\")", i64::MAX)),
        (Bson::Double(f64::INFINITY), "Infinity".to_string()),
        (Bson::ObjectId(oid), format!("ObjectId(\"{OID}\")")),
        (
            Bson::DateTime(DateTime::from_millis(0)),
            "ISODate(\"1970-01-01T00:00:00Z\")".to_string(),
        ),
        (
            Bson::DateTime(DateTime::from_millis(1)),
            "ISODate(\"1970-01-01T00:00:00.001Z\")".to_string(),
        ),
        (Bson::DateTime(DateTime::MAX), format!("new Date({})", i64::MAX)),
        (
            Bson::Binary(Binary::from_uuid(uuid)),
            format!("UUID(\"{UUID}\")"),
        ),
        (
            Bson::Binary(Binary::from_uuid_with_representation(
                uuid,
                UuidRepresentation::PythonLegacy,
            )),
            "new BinData(3, \"ABEiM0RVZneImaq7zN3u/w==\")".to_string(),
        ),
        (Bson::RegularExpression(Regex::new("a/b", "mi")), "/a\\/b/im".to_string()),
        (Bson::RegularExpression(Regex::new("", "")), "/(?:)/".to_string()),
        (
            Bson::Timestamp(Timestamp {
                time: 7,
                increment: 8,
            }),
            "Timestamp(7, 8)".to_string(),
        ),
        (
            Bson::Decimal128("-0.25".parse::<Decimal128>().unwrap()),
            "NumberDecimal(\"-0.25\")".to_string(),
        ),
        (Bson::MaxKey, "MaxKey".to_string()),
        (Bson::Undefined, "undefined".to_string()),
    ];
    for (value, expected) in cases {
        assert_eq!(shell(&value), expected);
    }
}

#[test]
fn shell_regex_escapes() {
    let _guard = LOCK.run_concurrently();
    let cases = [
        (r"a/b", r"/a\/b/", r"a/b"),
        (r"a\/b", r"/a\/b/", r"a/b"),
        (r"\d+/\w", r"/\d+\/\w/", r"\d+/\w"),
        (r"a\\/b", r"/a\\\/b/", r"a\\/b"),
    ];
    for (pattern, text, read_back) in cases {
        let value = Bson::RegularExpression(Regex::new(pattern, ""));
        assert_eq!(shell(&value), text);
        assert_eq!(
            read(text),
            Bson::RegularExpression(Regex::new(read_back, "")),
            "{text}"
        );
    }
}

#[test]
fn code_with_scope() {
    let _guard = LOCK.run_concurrently();
    let value = Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
        code: "x + 1".into(),
        scope: doc! { "x": 1 },
    });
    let text = strict(&value);
    assert_eq!(text, "{ \"$code\" : \"x + 1\", \"$scope\" : { \"x\" : 1 } }");
    assert_eq!(read(&text), value);
    assert_eq!(read("{ \"$code\" : \"f()\" }"), Bson::JavaScriptCode("f()".into()));
}

#[test]
fn indented_output() {
    let _guard = LOCK.run_concurrently();
    let doc = doc! { "a": 1, "b": { "c": [1, 2] } };
    let options = JsonWriterOptions::default()
        .output_mode(JsonOutputMode::Shell)
        .indent(true);
    assert_eq!(
        doc.to_json(&options),
        "{\n  \"a\" : 1,\n  \"b\" : {\n    \"c\" : [1, 2]\n  }\n}"
    );
}

#[test]
fn strict_output_reads_back() {
    let _guard = LOCK.run_concurrently();
    let doc = doc! {
        "_id": ObjectId::parse_str(OID).unwrap(),
        "long": i64::MIN,
        "double": -0.5,
        "nan": f64::NAN,
        "date": DateTime::from_millis(-62_135_596_800_000),
        "bin": Binary { subtype: BinarySubtype::UserDefined(0x80), bytes: vec![0xff, 0] },
        "re": Regex::new("^x", "s"),
        "ts": Timestamp { time: u32::MAX, increment: 0 },
        "nested": { "list": [Bson::MinKey, Bson::Undefined, Bson::Symbol("s".into())] },
    };
    let text = doc.to_json(&JsonWriterOptions::strict());
    let back = Document::from_json(&text).unwrap();
    assert_eq!(back.to_json(&JsonWriterOptions::strict()), text);
    assert_eq!(back.get("long"), Some(&Bson::Int64(i64::MIN)));
    assert!(back.get_f64("nan").unwrap().is_nan());
}

#[test]
fn shell_constructors() {
    let _guard = LOCK.run_concurrently();
    let oid = ObjectId::parse_str(OID).unwrap();
    let uuid = Uuid::parse_str(UUID).unwrap();
    let cases = [
        ("NumberInt(7)", Bson::Int32(7)),
        ("NumberInt(\"7\")", Bson::Int32(7)),
        ("NumberLong(\"9007199254740993\")", Bson::Int64(9_007_199_254_740_993)),
        (
            "NumberDecimal(\"1.10\")",
            Bson::Decimal128("1.10".parse().unwrap()),
        ),
        ("ObjectId('56e1fc72e0c917e9c4714161')", Bson::ObjectId(oid)),
        (
            "ISODate(\"1970-01-01T00:00:01Z\")",
            Bson::DateTime(DateTime::from_millis(1000)),
        ),
        ("new Date(1500)", Bson::DateTime(DateTime::from_millis(1500))),
        (
            "new Date(\"1970-01-01T00:00:00.002Z\")",
            Bson::DateTime(DateTime::from_millis(2)),
        ),
        (
            "new Date(1970, 0, 2)",
            Bson::DateTime(DateTime::from_millis(86_400_000)),
        ),
        (
            "Timestamp(1, 2)",
            Bson::Timestamp(Timestamp {
                time: 1,
                increment: 2,
            }),
        ),
        ("RegExp(\"a+\")", Bson::RegularExpression(Regex::new("a+", ""))),
        ("RegExp(\"a+\", \"xi\")", Bson::RegularExpression(Regex::new("a+", "ix"))),
        ("/a\\/b/si", Bson::RegularExpression(Regex::new("a/b", "is"))),
        (
            "BinData(0, \"aGVsbG8=\")",
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: b"hello".to_vec(),
            }),
        ),
        (
            "HexData(0, \"abc\")",
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: vec![0x0a, 0xbc],
            }),
        ),
        ("UUID(\"00112233-4455-6677-8899-aabbccddeeff\")", Bson::Binary(Binary::from_uuid(uuid))),
        (
            "CSUUID(\"00112233-4455-6677-8899-aabbccddeeff\")",
            Bson::Binary(Binary::from_uuid_with_representation(
                uuid,
                UuidRepresentation::CSharpLegacy,
            )),
        ),
        (
            "JUUID(\"00112233-4455-6677-8899-aabbccddeeff\")",
            Bson::Binary(Binary::from_uuid_with_representation(
                uuid,
                UuidRepresentation::JavaLegacy,
            )),
        ),
        (
            "DBPointer(\"db.c\", ObjectId(\"56e1fc72e0c917e9c4714161\"))",
            Bson::DbPointer(DbPointer {
                namespace: "db.c".into(),
                id: oid,
            }),
        ),
        ("MinKey", Bson::MinKey),
        ("undefined", Bson::Undefined),
        ("-Infinity", Bson::Double(f64::NEG_INFINITY)),
    ];
    for (text, expected) in cases {
        assert_eq!(read(text), expected, "{text}");
    }
}

#[test]
fn strict_alternatives() {
    let _guard = LOCK.run_concurrently();
    let cases = [
        ("{ \"$numberInt\" : \"12\" }", Bson::Int32(12)),
        ("{ \"$numberLong\" : \"12\" }", Bson::Int64(12)),
        ("{ \"$numberDouble\" : \"Infinity\" }", Bson::Double(f64::INFINITY)),
        (
            "{ \"$date\" : { \"$numberLong\" : \"-1\" } }",
            Bson::DateTime(DateTime::from_millis(-1)),
        ),
        (
            "{ \"$date\" : \"1970-01-01T00:00:00.010Z\" }",
            Bson::DateTime(DateTime::from_millis(10)),
        ),
        (
            "{ \"$binary\" : { \"base64\" : \"AQI=\", \"subType\" : \"80\" } }",
            Bson::Binary(Binary {
                subtype: BinarySubtype::UserDefined(0x80),
                bytes: vec![1, 2],
            }),
        ),
        (
            "{ \"$regularExpression\" : { \"pattern\" : \"x\", \"options\" : \"mi\" } }",
            Bson::RegularExpression(Regex::new("x", "im")),
        ),
        (
            "{ \"$timestamp\" : NumberLong(4294967298) }",
            Bson::Timestamp(Timestamp {
                time: 1,
                increment: 2,
            }),
        ),
        ("{ \"$maxkey\" : 1 }", Bson::MaxKey),
        (
            "{ \"$uuid\" : \"00112233-4455-6677-8899-aabbccddeeff\" }",
            Bson::Binary(Binary::from_uuid(Uuid::parse_str(UUID).unwrap())),
        ),
    ];
    for (text, expected) in cases {
        assert_eq!(read(text), expected, "{text}");
    }
}

#[test]
fn query_operators_stay_documents() {
    let _guard = LOCK.run_concurrently();
    assert_eq!(
        read("{ \"$regex\" : \"^a\" }"),
        Bson::Document(doc! { "$regex": "^a" })
    );
    assert_eq!(
        read("{ \"$date\" : true }"),
        Bson::Document(doc! { "$date": true })
    );
    assert_eq!(
        read("{ \"$oid\" : \"56e1fc72e0c917e9c4714161\", \"x\" : 1 }"),
        Bson::Document(doc! { "$oid": OID, "x": 1 })
    );
}

#[test]
fn relaxed_syntax() {
    let _guard = LOCK.run_concurrently();
    let doc = Document::from_json("{ a : 'single', \"b\" : [1, 2.5, -3], c : { } }").unwrap();
    assert_eq!(
        doc,
        doc! { "a": "single", "b": [1, 2.5, -3], "c": {} }
    );
    assert_eq!(read("2147483648"), Bson::Int64(2_147_483_648));
    assert_eq!(read("\"\\u0041\\n\""), Bson::String("A\n".into()));
}

#[test]
fn new_date_components_use_the_local_offset() {
    let _guard = LOCK.run_concurrently();
    let options = JsonReaderOptions::default().local_offset(offset!(+2));
    let value = JsonReader::new("new Date(1970, 0, 1, 2)", options)
        .read_single_value()
        .unwrap();
    assert_eq!(value, Bson::DateTime(DateTime::from_millis(0)));
    assert!(Bson::from_json("new Date(2021, 1, 29)").is_err());
}

#[test]
fn date_function_returns_a_string() {
    let _guard = LOCK.run_concurrently();
    let value = read("Date()");
    assert!(value.as_str().is_some_and(|s| s.ends_with("UTC")), "{value:?}");
}

#[test]
fn sequences_of_documents() {
    let _guard = LOCK.run_concurrently();
    let mut reader = JsonReader::new("{ a : 1 }\n{ a : 2 }", JsonReaderOptions::default());
    assert_eq!(reader.read_document().unwrap(), doc! { "a": 1 });
    assert!(!reader.is_at_end());
    assert_eq!(reader.read_document().unwrap(), doc! { "a": 2 });
    assert!(reader.is_at_end());
}

#[test]
fn malformed_input() {
    let _guard = LOCK.run_concurrently();
    for text in [
        "{ \"a\" : }",
        "{ \"a\" 1 }",
        "[1, 2",
        "ObjectId(\"123\")",
        "NumberLong(\"x\")",
        "Bogus(1)",
        "{ \"$numberLong\" : \"1.5\" }",
        "{ \"$timestamp\" : { \"t\" : -1, \"i\" : 0 } }",
    ] {
        assert!(Bson::from_json(text).is_err(), "{text} parsed");
    }
    assert!(Document::from_json("[1]").is_err());
}
