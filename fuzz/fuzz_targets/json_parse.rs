#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate bson_mapping;
use bson_mapping::extjson::{JsonReader, JsonReaderOptions};

fuzz_target!(|buf: &[u8]| {
    if let Ok(text) = std::str::from_utf8(buf) {
        let mut reader = JsonReader::new(text, JsonReaderOptions::default());
        while !reader.is_at_end() {
            if reader.read_value().is_err() {
                break;
            }
        }
    }
});
