#![no_main]
use bson_mapping::raw::{decode_document, encode_document};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &[u8]| {
    if let Ok(doc) = decode_document(input) {
        let out = encode_document(&doc).unwrap();
        if input != out.as_slice() {
            let reserialized = decode_document(&out).unwrap();
            // The bytes can differ while still resulting in the same Document.
            assert_eq!(doc, reserialized, "reserialization failed");
        }
    }
});
