#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate bson_mapping;
use bson_mapping::raw::decode_document;

fuzz_target!(|buf: &[u8]| {
    let _ = decode_document(buf);
});
