#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate bson_mapping;
use bson_mapping::raw::decode_document_sequence;

fuzz_target!(|buf: &[u8]| {
    if let Ok(docs) = decode_document_sequence(buf) {
        for doc in docs {
            for _ in doc.iter() {}
        }
    }
});
