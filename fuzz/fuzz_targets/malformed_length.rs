#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate bson_mapping;
use bson_mapping::raw::decode_document;

fuzz_target!(|buf: &[u8]| {
    if buf.len() >= 4 {
        // Focus on document length field manipulation
        let _ = decode_document(buf);
    }
});
