use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::{
    Binary,
    Bson,
    Document,
    Timestamp,
    doc,
    error::ErrorKind,
    oid::ObjectId,
    spec::BinarySubtype,
    tests::LOCK,
};

#[test]
fn ordered_insert() {
    let _guard = LOCK.run_concurrently();
    let mut doc = Document::new();
    doc.insert("first".to_owned(), Bson::Int32(1));
    doc.insert("second".to_owned(), Bson::String("foo".to_owned()));
    doc.insert("alphanumeric".to_owned(), Bson::String("bar".to_owned()));

    let keys: Vec<_> = doc.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["first", "second", "alphanumeric"]);
}

#[test]
fn insert_replaces_first_occurrence() {
    let _guard = LOCK.run_concurrently();
    let mut doc = doc! { "a": 1, "b": 2 };
    assert_eq!(doc.insert("a", 10), Some(Bson::Int32(1)));
    assert_eq!(doc, doc! { "a": 10, "b": 2 });
    assert_eq!(doc.insert("c", 3), None);
    assert_eq!(doc.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
}

#[test]
fn push_keeps_duplicates() {
    let _guard = LOCK.run_concurrently();
    let mut doc = Document::new();
    doc.push("x", 1);
    doc.push("y", 2);
    doc.push("x", 3);

    assert_eq!(doc.len(), 3);
    assert_eq!(doc.get("x"), Some(&Bson::Int32(1)));
    assert_eq!(
        doc.get_all("x").cloned().collect::<Vec<_>>(),
        [Bson::Int32(1), Bson::Int32(3)]
    );
    assert_eq!(doc.get_index(2), Some(("x", &Bson::Int32(3))));

    // removing the first occurrence exposes the second
    assert_eq!(doc.remove("x"), Some(Bson::Int32(1)));
    assert_eq!(doc.get("x"), Some(&Bson::Int32(3)));
    assert_eq!(doc.keys().collect::<Vec<_>>(), ["y", "x"]);
}

#[test]
fn test_getters() {
    let _guard = LOCK.run_concurrently();
    let datetime = crate::DateTime::from_millis(1_500_000_000_000);
    let binary = vec![0, 1, 2, 3, 4];
    let oid = ObjectId::new();
    let timestamp = Timestamp {
        time: 100,
        increment: 1,
    };
    let mut doc = doc! {
        "floating_point": 10.0,
        "string": "a value",
        "array": [10, 20, 30],
        "doc": { "key": 1 },
        "bool": true,
        "i32": 1i32,
        "i64": 1i64,
        "datetime": datetime,
        "binary": Binary { subtype: BinarySubtype::Generic, bytes: binary.clone() },
        "oid": oid,
        "timestamp": timestamp,
        "null": null,
    };

    assert_eq!(doc.get_f64("floating_point").unwrap(), 10.0);
    assert_eq!(doc.get_str("string").unwrap(), "a value");
    assert_eq!(
        doc.get_array("array").unwrap(),
        &vec![Bson::Int32(10), Bson::Int32(20), Bson::Int32(30)]
    );
    assert_eq!(doc.get_document("doc").unwrap(), &doc! { "key": 1 });
    assert!(doc.get_bool("bool").unwrap());
    assert_eq!(doc.get_i32("i32").unwrap(), 1);
    assert_eq!(doc.get_i64("i64").unwrap(), 1);
    assert_eq!(doc.get_datetime("datetime").unwrap(), datetime);
    assert_eq!(doc.get_binary("binary").unwrap().bytes, binary);
    assert_eq!(doc.get_object_id("oid").unwrap(), oid);
    assert_eq!(doc.get_timestamp("timestamp").unwrap(), timestamp);
    assert!(doc.is_null("null"));
    assert!(!doc.is_null("string"));

    assert!(doc.get_i64("i32").unwrap_err().is_type_mismatch());
    assert!(doc.get_str("missing").unwrap_err().is_not_present());

    doc.get_document_mut("doc").unwrap().insert("other", 2);
    assert_eq!(doc.get_document("doc").unwrap(), &doc! { "key": 1, "other": 2 });
}

#[test]
fn type_mismatch_names_both_types() {
    let _guard = LOCK.run_concurrently();
    let doc = doc! { "a": "text" };
    let error = doc.get_i32("a").unwrap_err();
    assert_matches!(
        error.kind,
        ErrorKind::TypeMismatch { expected, actual } if expected == crate::spec::ElementType::Int32
            && actual == crate::spec::ElementType::String
    );
}

#[test]
fn remove() {
    let _guard = LOCK.run_concurrently();
    let mut doc = Document::new();
    doc.insert("first", 1i32);
    doc.insert("second", "foo");
    doc.insert("alphanumeric", "bar".to_string());

    assert!(doc.remove("second").is_some());
    assert!(doc.remove("none").is_none());

    let keys: Vec<_> = doc.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["first", "alphanumeric"]);
    assert!(!doc.contains_key("second"));
}

#[test]
fn entry() {
    let _guard = LOCK.run_concurrently();
    let mut doc = doc! {
        "first": 1i32,
        "second": "foo",
        "alphanumeric": "bar",
    };

    {
        let first_entry = doc.entry("first");
        assert_eq!(first_entry.key(), "first");

        let v = first_entry.or_insert_with(|| Bson::Timestamp(Timestamp {
            time: 0,
            increment: 0,
        }));
        assert_eq!(v, &Bson::Int32(1));
    }

    {
        let unknown_entry = doc.entry("unknown");
        assert_eq!(unknown_entry.key(), "unknown");

        let v = unknown_entry.or_insert(Bson::Int32(0));
        *v = Bson::Int32(2);
    }

    assert_eq!(doc.get_i32("unknown").unwrap(), 2);
    assert_eq!(doc.keys().last().map(String::as_str), Some("unknown"));
}

#[test]
fn extend() {
    let _guard = LOCK.run_concurrently();
    let mut doc = doc! {
        "first": 1i32,
        "second": "foo",
    };

    doc.extend(doc! {
        "second": "bar",
        "third": [1, 2],
    });

    assert_eq!(
        doc,
        doc! {
            "first": 1i32,
            "second": "bar",
            "third": [1, 2],
        }
    );

    let collected: Document = vec![("a", 1), ("b", 2)].into_iter().collect();
    assert_eq!(collected, doc! { "a": 1, "b": 2 });
}

#[test]
fn iter_mut_and_values() {
    let _guard = LOCK.run_concurrently();
    let mut doc = doc! { "a": 1, "b": 2 };
    for (_, value) in doc.iter_mut() {
        if let Bson::Int32(i) = value {
            *i *= 10;
        }
    }
    assert_eq!(doc.values().cloned().collect::<Vec<_>>(), [Bson::Int32(10), Bson::Int32(20)]);

    let owned: Vec<(String, Bson)> = doc.clone().into_iter().collect();
    assert_eq!(owned[1], ("b".to_string(), Bson::Int32(20)));

    doc.clear();
    assert!(doc.is_empty());
    assert_eq!(doc.get("a"), None);
}

#[test]
fn equality_is_order_sensitive() {
    let _guard = LOCK.run_concurrently();
    assert_ne!(doc! { "a": 1, "b": 2 }, doc! { "b": 2, "a": 1 });
    assert_eq!(doc! { "a": 1, "b": 2 }, doc! { "a": 1, "b": 2 });
}

#[test]
fn display() {
    let _guard = LOCK.run_concurrently();
    let doc = doc! {
        "hello": "world",
        "n": 1i64,
        "nested": { "list": [1, true] },
    };
    assert_eq!(
        doc.to_string(),
        "{ \"hello\" : \"world\", \"n\" : NumberLong(1), \"nested\" : { \"list\" : [1, true] } }"
    );
    assert_eq!(Document::new().to_string(), "{ }");
}

#[test]
fn binary_round_trip_keeps_duplicates() {
    let _guard = LOCK.run_concurrently();
    let mut doc = Document::new();
    doc.push("k", 1);
    doc.push("k", "two");
    let bytes = doc.to_vec().unwrap();
    let decoded = Document::from_slice(&bytes).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(decoded.len(), 2);
}
