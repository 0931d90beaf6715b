
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::{
    Binary,
    Bson,
    DbPointer,
    Decimal128,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    doc,
    error::ErrorKind,
    oid::ObjectId,
    spec::BinarySubtype,
};

fn every_type() -> Document {
    doc! {
        "double": 1.5,
        "string": "hello",
        "document": { "inner": [1, 2, 3] },
        "array": ["a", { "b": null }],
        "binary": Binary { subtype: BinarySubtype::Generic, bytes: vec![1, 2, 3] },
        "old binary": Binary { subtype: BinarySubtype::BinaryOld, bytes: vec![4, 5] },
        "undefined": Bson::Undefined,
        "oid": ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap(),
        "bool": true,
        "date": crate::DateTime::from_millis(-1_000),
        "null": null,
        "regex": Regex::new("^a.*", "mi"),
        "pointer": DbPointer {
            namespace: "db.coll".to_string(),
            id: ObjectId::from_bytes([7; 12]),
        },
        "code": Bson::JavaScriptCode("return 1;".to_string()),
        "symbol": Bson::Symbol("sym".to_string()),
        "code with scope": JavaScriptCodeWithScope {
            code: "return x;".to_string(),
            scope: doc! { "x": 1 },
        },
        "int32": 42,
        "timestamp": Timestamp { time: 1, increment: 2 },
        "int64": 42i64,
        "decimal": "1.5E+40".parse::<Decimal128>().unwrap(),
        "max": Bson::MaxKey,
        "min": Bson::MinKey,
    }
}

#[test]
fn known_encoding() {
    let bytes = encode_document(&doc! { "hi": "y'all" }).unwrap();
    assert_eq!(
        bytes,
        b"\x13\x00\x00\x00\x02hi\x00\x06\x00\x00\x00y'all\x00\x00".to_vec()
    );
}

#[test]
fn every_type_round_trips() {
    let doc = every_type();
    let bytes = encode_document(&doc).unwrap();
    let decoded = decode_document(&bytes).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(encode_document(&decoded).unwrap(), bytes);
}

#[test]
fn old_binary_writes_inner_length() {
    let doc = doc! { "b": Binary { subtype: BinarySubtype::BinaryOld, bytes: vec![9, 9] } };
    let bytes = encode_document(&doc).unwrap();
    // total length, subtype 2, inner length, payload
    assert_eq!(&bytes[7..18], &[6, 0, 0, 0, 2, 2, 0, 0, 0, 9, 9]);
}

#[test]
fn duplicate_names_survive() {
    let mut doc = Document::new();
    doc.push("a", 1);
    doc.push("a", 2);
    let decoded = decode_document(&encode_document(&doc).unwrap()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get_all("a").cloned().collect::<Vec<_>>(), vec![Bson::Int32(1), Bson::Int32(2)]);
}

fn string_doc(total_size: usize) -> Document {
    // 4 (length) + 1 (type) + 2 ("s\0") + 4 (string length) + n + 1 (\0) + 1 (terminator)
    doc! { "s": "x".repeat(total_size - 13) }
}

#[test]
fn chunk_boundary_sizes() {
    for size in [CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 2 * CHUNK_SIZE + 1] {
        let doc = string_doc(size);
        let mut buf = ChunkedBuffer::new();
        encode_document_to(&doc, &mut buf).unwrap();
        assert_eq!(buf.len(), size);

        let bytes = buf.to_vec();
        assert_eq!(i32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize, size);
        assert_eq!(decode_document(&bytes).unwrap(), doc);
        assert_eq!(decode_document_from(&buf).unwrap(), doc);
    }
}

#[test]
fn length_prefixes_straddle_chunks() {
    // shift a nested document so that its length prefix starts at every offset around the
    // first chunk boundary
    for shift in 0..8 {
        let pad = CHUNK_SIZE - 13 - 4 - shift;
        let doc = doc! {
            "p": "y".repeat(pad),
            "d": { "k": "v", "n": [1, 2] },
            "name that crosses the boundary": "value that crosses the boundary",
        };
        let bytes = encode_document(&doc).unwrap();
        assert_eq!(decode_document(&bytes).unwrap(), doc);
    }
}

#[test]
fn truncation_is_unexpected_end_of_input() {
    let bytes = encode_document(&every_type()).unwrap();
    for n in 1..bytes.len() {
        let err = decode_document(&bytes[..bytes.len() - n]).unwrap_err();
        assert!(
            err.is_unexpected_end_of_input(),
            "removing {n} bytes gave {err}"
        );
    }
}

#[test]
fn interior_null_in_key_is_rejected() {
    let err = encode_document(&doc! { "a\0b": 1 }).unwrap_err();
    assert!(err.is_format());
    assert_eq!(err.key.as_deref(), Some("a\0b"));
}

#[test]
fn failed_encode_leaves_buffer_untouched() {
    let mut buf = ChunkedBuffer::new();
    encode_document_to(&doc! { "ok": 1 }, &mut buf).unwrap();
    let len = buf.len();
    encode_document_to(&doc! { "x": { "bad\0": 1 } }, &mut buf).unwrap_err();
    assert_eq!(buf.len(), len);
}

#[test]
fn malformed_input() {
    // invalid boolean byte
    let err = decode_document(b"\x09\x00\x00\x00\x08b\x00\x02\x00").unwrap_err();
    assert!(err.is_format());
    assert_eq!(err.key.as_deref(), Some("b"));

    // unknown element type
    let err = decode_document(b"\x08\x00\x00\x00\x20a\x00\x00").unwrap_err();
    assert!(err.is_format());

    // missing terminator
    let err = decode_document(b"\x05\x00\x00\x00\x01").unwrap_err();
    assert!(err.is_format());

    // length below the minimum
    let err = decode_document(b"\x04\x00\x00\x00").unwrap_err();
    assert!(err.is_format());

    // trailing bytes
    let err = decode_document(b"\x05\x00\x00\x00\x00\x00").unwrap_err();
    assert!(err.is_format());

    // invalid utf-8 in a string
    let err = decode_document(b"\x0e\x00\x00\x00\x02s\x00\x02\x00\x00\x00\xff\x00\x00").unwrap_err();
    assert_matches!(err.kind, ErrorKind::Utf8Encoding);
}

#[test]
fn nested_length_overrunning_parent() {
    let mut bytes = encode_document(&doc! { "d": { "a": 1 } }).unwrap();
    // inflate the inner length past the end of the outer document
    bytes[7] = 0x40;
    let err = decode_document(&bytes).unwrap_err();
    assert!(err.is_unexpected_end_of_input());
    assert_eq!(err.key.as_deref(), Some("d"));
}

fn nested(levels: usize) -> Document {
    let mut doc = doc! { "v": 1 };
    for i in 0..levels {
        doc = if i % 2 == 0 {
            doc! { "v": [doc] }
        } else {
            doc! { "v": doc }
        };
    }
    doc
}

#[test]
fn nesting_depth_is_limited() {
    // `levels` wrappers around the innermost document make `levels + 1` containers
    let deepest = nested(MAX_NESTING_DEPTH - 1);
    let bytes = encode_document(&deepest).unwrap();
    assert_eq!(decode_document(&bytes).unwrap(), deepest);

    let bytes = encode_document(&nested(MAX_NESTING_DEPTH)).unwrap();
    let err = decode_document(&bytes).unwrap_err();
    assert!(err.is_format(), "{err}");
    assert!(err.to_string().contains("nested more than"), "{err}");
}

#[test]
fn document_sequence() {
    let mut buf = ChunkedBuffer::new();
    let mut writer = BsonWriter::new();
    for i in 0..3 {
        writer.write_document(&doc! { "i": i }).unwrap();
        encode_document_to(&doc! { "i": i }, &mut buf).unwrap();
    }
    let docs = decode_document_sequence(&writer.into_vec()).unwrap();
    assert_eq!(docs, vec![doc! { "i": 0 }, doc! { "i": 1 }, doc! { "i": 2 }]);
    assert_eq!(decode_document_sequence(&buf.to_vec()).unwrap(), docs);
}

proptest! {
    #[test]
    fn no_crashes(s: Vec<u8>) {
        let _ = decode_document(&s);
    }

    #[test]
    fn round_trip_bytes(bson in props::arbitrary_bson()) {
        let doc = doc! { "bson": bson };
        let bytes = encode_document(&doc)?;
        let decoded = decode_document(&bytes)?;
        prop_assert_eq!(encode_document(&decoded)?, bytes);
    }
}
