#![no_main]
use bson_mapping::{Document, extjson::JsonWriterOptions, raw::decode_document};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &[u8]| {
    if let Ok(doc) = decode_document(input) {
        for options in [JsonWriterOptions::strict(), JsonWriterOptions::shell()] {
            let json = doc.to_json(&options);
            let _ = Document::from_json(&json);
        }
    }
});
