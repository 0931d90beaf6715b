use bson_mapping::{
    Binary,
    Bson,
    DateTime,
    Decimal128,
    Regex,
    Timestamp,
    doc,
    extjson::JsonWriterOptions,
    oid::ObjectId,
    raw::encode_document,
    spec::BinarySubtype,
};
use std::{
    fs,
    io::{Error, ErrorKind},
    path::Path,
    str::FromStr,
};

fn main() -> std::io::Result<()> {
    let corpus_dir = Path::new("fuzz/corpus");
    fs::create_dir_all(corpus_dir)?;

    // Generate edge cases for each fuzz target
    generate_length_edge_cases(corpus_dir)?;
    generate_type_marker_cases(corpus_dir)?;
    generate_serialization_cases(corpus_dir)?;
    generate_json_cases(corpus_dir)?;
    Ok(())
}

fn encode(doc: &bson_mapping::Document) -> std::io::Result<Vec<u8>> {
    encode_document(doc).map_err(|e| Error::new(ErrorKind::Other, e.to_string()))
}

fn generate_length_edge_cases(dir: &Path) -> std::io::Result<()> {
    let target_dir = dir.join("malformed_length");
    fs::create_dir_all(&target_dir)?;

    // Invalid length
    fs::write(target_dir.join("invalid_len"), vec![4, 5])?;

    // Minimal valid document
    fs::write(target_dir.join("min_doc"), encode(&doc! {})?)?;

    // Spans several buffer chunks
    let large_doc = doc! { "a": "b".repeat(64 * 1024) };
    fs::write(target_dir.join("large_doc"), encode(&large_doc)?)?;

    Ok(())
}

fn all_types() -> bson_mapping::Document {
    doc! {
        "double": 1.0f64,
        "double_nan": f64::NAN,
        "double_infinity": f64::INFINITY,
        "double_neg_infinity": f64::NEG_INFINITY,
        "string": "test",
        "document": doc! {},
        "array": vec![1, 2, 3],
        "binary": Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: vec![1, 2, 3] }),
        "object_id": ObjectId::new(),
        "bool": true,
        "date": DateTime::now(),
        "null": Bson::Null,
        "regex": Bson::RegularExpression(Regex::new("pattern", "i")),
        "int32": 123i32,
        "timestamp": Timestamp { time: 12345, increment: 1 },
        "int64": 123i64,
        "decimal128_nan": Decimal128::from_str("NaN").unwrap(),
        "decimal128_infinity": Decimal128::from_str("Infinity").unwrap(),
        "min_key": Bson::MinKey,
        "max_key": Bson::MaxKey,
        "undefined": Bson::Undefined,
    }
}

fn generate_type_marker_cases(dir: &Path) -> std::io::Result<()> {
    let target_dir = dir.join("decode");
    fs::create_dir_all(&target_dir)?;
    fs::write(target_dir.join("all_types"), encode(&all_types())?)?;
    Ok(())
}

fn generate_serialization_cases(dir: &Path) -> std::io::Result<()> {
    let target_dir = dir.join("serialization");
    fs::create_dir_all(&target_dir)?;

    // Deeply nested document
    let mut nested_doc = doc! { "leaf": 1 };
    for i in 0..100 {
        nested_doc = doc! { (i.to_string()): nested_doc };
    }
    fs::write(target_dir.join("nested_doc"), encode(&nested_doc)?)?;

    // Document with large binary data
    let large_binary = doc! {
        "binary": Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![0xFF; 1024 * 1024] // 1MB of data
        })
    };
    fs::write(target_dir.join("large_binary"), encode(&large_binary)?)?;

    Ok(())
}

fn generate_json_cases(dir: &Path) -> std::io::Result<()> {
    let target_dir = dir.join("json_parse");
    fs::create_dir_all(&target_dir)?;

    let doc = all_types();
    fs::write(target_dir.join("strict"), doc.to_json(&JsonWriterOptions::strict()))?;
    fs::write(target_dir.join("shell"), doc.to_json(&JsonWriterOptions::shell()))?;
    fs::write(
        target_dir.join("shell_constructors"),
        r#"{ a : NumberLong("5"), b : new Date(2010, 9, 10), c : BinData(0, "AQID"), d : /x\/y/i }"#,
    )?;

    Ok(())
}
