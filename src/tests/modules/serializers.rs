use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use crate::{
    Binary,
    Bson,
    DateTime,
    Decimal128,
    Registry,
    bson,
    bson_enum,
    error::Result,
    serializers::{BsonValue, DictionaryRepresentation, SerializationOptions},
    spec::{BinarySubtype, ElementType},
    tests::LOCK,
    uuid::{Uuid, UuidRepresentation},
};

fn write<T: BsonValue>(value: &T, options: SerializationOptions) -> Result<Bson> {
    let registry = Registry::new();
    registry
        .lookup_serializer::<T>()?
        .serialize(&registry, value, &options)
}

fn read<T: BsonValue>(bson: Bson, options: SerializationOptions) -> Result<T> {
    let registry = Registry::new();
    registry
        .lookup_serializer::<T>()?
        .deserialize(&registry, bson, &options)
}

fn options() -> SerializationOptions {
    SerializationOptions::new()
}

fn as_type(representation: ElementType) -> SerializationOptions {
    SerializationOptions::new().representation(representation)
}

#[test]
fn default_numeric_representations() {
    let _guard = LOCK.run_concurrently();
    assert_eq!(write(&7i8, options()).unwrap(), Bson::Int32(7));
    assert_eq!(write(&7i16, options()).unwrap(), Bson::Int32(7));
    assert_eq!(write(&7u8, options()).unwrap(), Bson::Int32(7));
    assert_eq!(write(&7u16, options()).unwrap(), Bson::Int32(7));
    assert_eq!(write(&7u32, options()).unwrap(), Bson::Int64(7));
    assert_eq!(write(&7i64, options()).unwrap(), Bson::Int64(7));
    assert_eq!(write(&7u64, options()).unwrap(), Bson::Int64(7));
    assert_eq!(write(&0.5f32, options()).unwrap(), Bson::Double(0.5));
    assert_eq!(write(&0.5f64, options()).unwrap(), Bson::Double(0.5));
}

#[test]
fn numeric_overflow() {
    let _guard = LOCK.run_concurrently();
    assert!(write(&u64::MAX, options()).unwrap_err().is_format());
    assert_eq!(
        write(&u64::MAX, options().allow_overflow(true)).unwrap(),
        Bson::Int64(-1)
    );
    assert!(write(&(1i64 << 40), as_type(ElementType::Int32)).is_err());

    assert!(read::<i8>(Bson::Int32(300), options()).is_err());
    assert_eq!(read::<i8>(Bson::Int32(-128), options()).unwrap(), -128);
    assert!(read::<u32>(Bson::Int64(-1), options()).is_err());
    assert_eq!(
        read::<u8>(Bson::Int32(256), options().allow_overflow(true)).unwrap(),
        0
    );
}

#[test]
fn numeric_truncation() {
    let _guard = LOCK.run_concurrently();
    assert!(write(&1.5f64, as_type(ElementType::Int32)).is_err());
    assert_eq!(
        write(&1.5f64, as_type(ElementType::Int32).allow_truncation(true)).unwrap(),
        Bson::Int32(1)
    );
    assert!(read::<i32>(Bson::Double(2.5), options()).is_err());
    assert_eq!(read::<i32>(Bson::Double(2.0), options()).unwrap(), 2);

    assert!(read::<f32>(Bson::Double(0.1), options()).is_err());
    assert_eq!(
        read::<f32>(Bson::Double(0.1), options().allow_truncation(true)).unwrap(),
        0.1f32
    );
}

#[test]
fn numeric_text_and_decimal() {
    let _guard = LOCK.run_concurrently();
    assert_eq!(
        write(&42i32, as_type(ElementType::String)).unwrap(),
        Bson::String("42".into())
    );
    assert_eq!(
        write(&1.5f64, as_type(ElementType::String)).unwrap(),
        Bson::String("1.5".into())
    );
    assert_eq!(
        write(&1.5f64, as_type(ElementType::Decimal128)).unwrap(),
        Bson::Decimal128("1.5".parse().unwrap())
    );
    assert_eq!(read::<u16>(Bson::String("12".into()), options()).unwrap(), 12);
    assert_eq!(
        read::<i64>(Bson::Decimal128("5".parse().unwrap()), options()).unwrap(),
        5
    );
    assert!(write(&1i32, as_type(ElementType::Boolean)).is_err());
    assert!(read::<i32>(Bson::Boolean(true), options()).is_err());
}

#[test]
fn durations() {
    let _guard = LOCK.run_concurrently();
    let d = Duration::from_millis(1500);
    assert_eq!(write(&d, options()).unwrap(), Bson::Int64(1500));
    assert_eq!(write(&d, as_type(ElementType::Int32)).unwrap(), Bson::Int32(1500));
    assert_eq!(write(&d, as_type(ElementType::Double)).unwrap(), Bson::Double(1.5));
    assert_eq!(
        write(&d, as_type(ElementType::String)).unwrap(),
        Bson::String("1.5".into())
    );

    let fine = Duration::from_micros(1500);
    assert!(write(&fine, options()).is_err());
    assert_eq!(
        write(&fine, options().allow_truncation(true)).unwrap(),
        Bson::Int64(1)
    );

    assert_eq!(
        read::<Duration>(Bson::Int32(250), options()).unwrap(),
        Duration::from_millis(250)
    );
    assert_eq!(
        read::<Duration>(Bson::Double(0.25), options()).unwrap(),
        Duration::from_millis(250)
    );
    assert_eq!(
        read::<Duration>(Bson::String("2".into()), options()).unwrap(),
        Duration::from_secs(2)
    );
    assert!(read::<Duration>(Bson::Int64(-1), options()).is_err());
    assert!(read::<Duration>(Bson::Boolean(false), options()).is_err());
}

#[test]
fn uuid_representations() {
    let _guard = LOCK.run_concurrently();
    let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
    let standard = Binary {
        subtype: BinarySubtype::Uuid,
        bytes: uuid.bytes().to_vec(),
    };
    assert_eq!(write(&uuid, options()).unwrap(), Bson::Binary(standard.clone()));
    assert_eq!(read::<Uuid>(Bson::Binary(standard), options()).unwrap(), uuid);

    let python = options().uuid_representation(UuidRepresentation::PythonLegacy);
    assert_eq!(
        write(&uuid, python).unwrap(),
        Bson::Binary(Binary {
            subtype: BinarySubtype::UuidOld,
            bytes: uuid.bytes().to_vec(),
        })
    );

    let csharp = options().uuid_representation(UuidRepresentation::CSharpLegacy);
    let written = write(&uuid, csharp.clone()).unwrap();
    assert_eq!(
        written,
        Bson::Binary(Binary {
            subtype: BinarySubtype::UuidOld,
            bytes: vec![
                0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff,
            ],
        })
    );
    assert_eq!(read::<Uuid>(written, csharp).unwrap(), uuid);

    assert_eq!(
        write(&uuid, as_type(ElementType::String)).unwrap(),
        Bson::String("00112233-4455-6677-8899-aabbccddeeff".into())
    );
    assert_eq!(
        read::<Uuid>(Bson::String("00112233-4455-6677-8899-aabbccddeeff".into()), options())
            .unwrap(),
        uuid
    );
    assert!(write(&uuid, as_type(ElementType::Int32)).is_err());
}

#[test]
fn dictionary_representations() {
    let _guard = LOCK.run_concurrently();
    let mut map = IndexMap::new();
    map.insert("a".to_string(), 1i32);
    map.insert("b".to_string(), 2i32);

    assert_eq!(write(&map, options()).unwrap(), bson!({ "a": 1, "b": 2 }));
    let as_dictionary = |representation: DictionaryRepresentation| {
        options().dictionary_representation(representation)
    };
    assert_eq!(
        write(&map, as_dictionary(DictionaryRepresentation::ArrayOfArrays)).unwrap(),
        bson!([["a", 1], ["b", 2]])
    );
    assert_eq!(
        write(&map, as_dictionary(DictionaryRepresentation::ArrayOfDocuments)).unwrap(),
        bson!([{ "k": "a", "v": 1 }, { "k": "b", "v": 2 }])
    );

    // every representation reads back
    for bson in [
        bson!({ "a": 1, "b": 2 }),
        bson!([["a", 1], ["b", 2]]),
        bson!([{ "k": "a", "v": 1 }, { "k": "b", "v": 2 }]),
    ] {
        assert_eq!(read::<IndexMap<String, i32>>(bson, options()).unwrap(), map);
    }
}

#[test]
fn dictionary_keys() {
    let _guard = LOCK.run_concurrently();
    let numbers = BTreeMap::from([(1i32, "one".to_string()), (2, "two".to_string())]);
    assert_eq!(
        write(&numbers, options()).unwrap(),
        bson!([[1, "one"], [2, "two"]])
    );
    assert_eq!(
        read::<BTreeMap<i32, String>>(bson!([[2, "two"], [1, "one"]]), options()).unwrap(),
        numbers
    );

    let dotted = HashMap::from([("a.b".to_string(), true)]);
    assert_eq!(write(&dotted, options()).unwrap(), bson!([["a.b", true]]));
    assert!(
        write(
            &dotted,
            options().dictionary_representation(DictionaryRepresentation::Document)
        )
        .is_err()
    );

    let error = read::<HashMap<String, i32>>(bson!({ "a": "x" }), options()).unwrap_err();
    assert_eq!(error.key.as_deref(), Some("a"));
    assert!(read::<HashMap<String, i32>>(bson!([["a"]]), options()).is_err());
    assert!(read::<HashMap<String, i32>>(bson!([{ "key": "a", "v": 1 }]), options()).is_err());
}

#[test]
fn dictionary_value_options() {
    let _guard = LOCK.run_concurrently();
    let map = BTreeMap::from([("n".to_string(), 3i64)]);
    let options = options().item_options(as_type(ElementType::String));
    assert_eq!(write(&map, options.clone()).unwrap(), bson!({ "n": "3" }));
    assert_eq!(read::<BTreeMap<String, i64>>(bson!({ "n": "3" }), options).unwrap(), map);
}

#[test]
fn sequences() {
    let _guard = LOCK.run_concurrently();
    let values = vec![Some(1i32), None];
    assert_eq!(write(&values, options()).unwrap(), bson!([1, null]));
    assert_eq!(
        read::<Vec<Option<i32>>>(bson!([1, null]), options()).unwrap(),
        values
    );

    let error = read::<Vec<i32>>(bson!([1, "x"]), options()).unwrap_err();
    assert_eq!(error.index, Some(1));
    assert!(read::<Vec<i32>>(bson!({ "a": 1 }), options()).is_err());

    let options = options().item_options(as_type(ElementType::String));
    assert_eq!(write(&vec![1i32, 2], options).unwrap(), bson!(["1", "2"]));
}

#[test]
fn tuples() {
    let _guard = LOCK.run_concurrently();
    let pair = (1i32, "a".to_string());
    assert_eq!(write(&pair, options()).unwrap(), bson!([1, "a"]));
    assert_eq!(read::<(i32, String)>(bson!([1, "a"]), options()).unwrap(), pair);

    let error = read::<(i32, String)>(bson!([1, "a", true]), options()).unwrap_err();
    assert!(
        error.to_string().contains("expected an array of 2 items, found 3"),
        "{error}"
    );

    let four = (1i32, "b".to_string(), true, 2.5f64);
    let bson = write(&four, options()).unwrap();
    assert_eq!(bson, bson!([1, "b", true, 2.5]));
    assert_eq!(read::<(i32, String, bool, f64)>(bson, options()).unwrap(), four);

    let error = read::<(i32, i32, i32)>(bson!([1, 2, "x"]), options()).unwrap_err();
    assert_eq!(error.index, Some(2));
}

bson_enum! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Color {
        Red = 1,
        Green = 2,
        Blue = 40,
    }
}

#[test]
fn enums() {
    let _guard = LOCK.run_concurrently();
    assert_eq!(write(&Color::Green, options()).unwrap(), Bson::Int32(2));
    assert_eq!(
        write(&Color::Blue, as_type(ElementType::Int64)).unwrap(),
        Bson::Int64(40)
    );
    assert_eq!(
        write(&Color::Red, as_type(ElementType::String)).unwrap(),
        Bson::String("Red".into())
    );
    assert!(write(&Color::Red, as_type(ElementType::Double)).is_err());

    assert_eq!(read::<Color>(Bson::Int32(40), options()).unwrap(), Color::Blue);
    assert_eq!(read::<Color>(Bson::Int64(1), options()).unwrap(), Color::Red);
    assert_eq!(
        read::<Color>(Bson::String("Green".into()), options()).unwrap(),
        Color::Green
    );
    assert!(read::<Color>(Bson::Int32(3), options()).is_err());
    assert!(read::<Color>(Bson::String("Purple".into()), options()).is_err());
    assert!(read::<Color>(Bson::Double(1.0), options()).is_err());
}

#[test]
fn booleans_and_chars() {
    let _guard = LOCK.run_concurrently();
    assert_eq!(write(&true, options()).unwrap(), Bson::Boolean(true));
    assert_eq!(write(&true, as_type(ElementType::Int32)).unwrap(), Bson::Int32(1));
    assert_eq!(
        write(&false, as_type(ElementType::String)).unwrap(),
        Bson::String("false".into())
    );
    assert!(!read::<bool>(Bson::Int64(0), options()).unwrap());
    assert!(read::<bool>(Bson::Double(0.5), options()).unwrap());
    assert!(read::<bool>(Bson::String("nope".into()), options()).is_err());

    assert_eq!(write(&'x', options()).unwrap(), Bson::String("x".into()));
    assert_eq!(write(&'x', as_type(ElementType::Int32)).unwrap(), Bson::Int32(120));
    assert_eq!(read::<char>(Bson::Int32(120), options()).unwrap(), 'x');
    assert!(read::<char>(Bson::String("xy".into()), options()).is_err());
    assert!(read::<char>(Bson::Int32(-1), options()).is_err());
}

#[test]
fn decimals_and_dates() {
    let _guard = LOCK.run_concurrently();
    let decimal: Decimal128 = "1.5".parse().unwrap();
    assert_eq!(write(&decimal, options()).unwrap(), Bson::Decimal128(decimal));
    assert_eq!(
        write(&decimal, as_type(ElementType::String)).unwrap(),
        Bson::String("1.5".into())
    );
    assert_eq!(
        write(&decimal, as_type(ElementType::Double)).unwrap(),
        Bson::Double(1.5)
    );
    assert_eq!(read::<Decimal128>(Bson::Int32(3), options()).unwrap().to_string(), "3");

    let date = DateTime::from_millis(1_286_705_410_000);
    assert_eq!(write(&date, options()).unwrap(), Bson::DateTime(date));
    assert_eq!(
        write(&date, as_type(ElementType::Int64)).unwrap(),
        Bson::Int64(1_286_705_410_000)
    );
    let text = write(&date, as_type(ElementType::String)).unwrap();
    assert_eq!(text, Bson::String("2010-10-10T10:10:10Z".into()));
    assert_eq!(read::<DateTime>(text, options()).unwrap(), date);
    assert_eq!(
        read::<DateTime>(Bson::Int64(1_286_705_410_000), options()).unwrap(),
        date
    );
}

#[test]
fn raw_bson_values() {
    let _guard = LOCK.run_concurrently();
    let value = bson!({ "any": [1, "thing"] });
    assert_eq!(write(&value, options()).unwrap(), value);
    assert_eq!(read::<Bson>(value.clone(), options()).unwrap(), value);
}
