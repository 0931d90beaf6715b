use crate::{
    Binary,
    Bson,
    Document,
    error::{Error, Result},
    raw::{
        MAX_BSON_DOCUMENT_SIZE,
        buffer::ChunkedBuffer,
        doc_writer::{DocWriter, write_cstring},
    },
    spec::BinarySubtype,
};

/// Streams [`Document`]s into a [`ChunkedBuffer`] in the binary wire format.
///
/// Containers are written depth-first: each document or array reserves its length prefix, writes
/// its body and backpatches the prefix once it closes, so no size is computed ahead of time.
#[derive(Debug, Default)]
pub struct BsonWriter {
    buffer: ChunkedBuffer,
}

impl BsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `doc` to the output. A document larger than the maximum document size is rejected
    /// and leaves the output as it was.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        write_top_level(&mut self.buffer, doc)
    }

    /// The bytes written so far.
    pub fn buffer(&self) -> &ChunkedBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> ChunkedBuffer {
        self.buffer
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

pub(crate) fn write_top_level(buf: &mut ChunkedBuffer, doc: &Document) -> Result<()> {
    let start = buf.len();
    let result = write_document(buf, doc).and_then(|()| {
        let size = buf.len() - start;
        if size > MAX_BSON_DOCUMENT_SIZE {
            return Err(Error::format(format!(
                "document size of {size} bytes exceeds the maximum of {MAX_BSON_DOCUMENT_SIZE}"
            )));
        }
        Ok(())
    });
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

fn write_document(buf: &mut ChunkedBuffer, doc: &Document) -> Result<()> {
    let mut writer = DocWriter::open(buf);
    for (key, value) in doc {
        write_element(&mut writer, key, value).map_err(|e| e.with_key(key.as_str()))?;
    }
    Ok(())
}

fn write_array(buf: &mut ChunkedBuffer, array: &[Bson]) -> Result<()> {
    let mut writer = DocWriter::open(buf);
    for (index, value) in array.iter().enumerate() {
        write_element(&mut writer, &index.to_string(), value).map_err(|e| e.with_index(index))?;
    }
    Ok(())
}

fn write_element(writer: &mut DocWriter, key: &str, value: &Bson) -> Result<()> {
    writer.append_key(value.element_type(), key)?;
    write_value(writer.buffer(), value)
}

fn write_string(buf: &mut ChunkedBuffer, s: &str) {
    buf.write_bytes(&(s.len() as i32 + 1).to_le_bytes());
    buf.write_bytes(s.as_bytes());
    buf.push(0);
}

fn write_binary(buf: &mut ChunkedBuffer, binary: &Binary) {
    let len = binary.bytes.len() as i32;
    if let BinarySubtype::BinaryOld = binary.subtype {
        buf.write_bytes(&(len + 4).to_le_bytes());
        buf.push(binary.subtype.into());
        buf.write_bytes(&len.to_le_bytes());
    } else {
        buf.write_bytes(&len.to_le_bytes());
        buf.push(binary.subtype.into());
    }
    buf.write_bytes(&binary.bytes);
}

fn write_value(buf: &mut ChunkedBuffer, value: &Bson) -> Result<()> {
    match value {
        Bson::Double(v) => buf.write_bytes(&v.to_le_bytes()),
        Bson::String(s) | Bson::JavaScriptCode(s) | Bson::Symbol(s) => write_string(buf, s),
        Bson::Array(array) => write_array(buf, array)?,
        Bson::Document(doc) => write_document(buf, doc)?,
        Bson::Boolean(b) => buf.push(u8::from(*b)),
        Bson::Null | Bson::Undefined | Bson::MinKey | Bson::MaxKey => {}
        Bson::RegularExpression(regex) => {
            write_cstring(buf, &regex.pattern)?;
            write_cstring(buf, &regex.options)?;
        }
        Bson::JavaScriptCodeWithScope(code_with_scope) => {
            let slot = buf.reserve_length();
            let start = slot.position();
            write_string(buf, &code_with_scope.code);
            write_document(buf, &code_with_scope.scope)?;
            let len = buf.len() - start;
            buf.backpatch(slot, len as i32);
        }
        Bson::Int32(v) => buf.write_bytes(&v.to_le_bytes()),
        Bson::Int64(v) => buf.write_bytes(&v.to_le_bytes()),
        Bson::Timestamp(ts) => buf.write_bytes(&ts.to_u64().to_le_bytes()),
        Bson::Binary(binary) => write_binary(buf, binary),
        Bson::ObjectId(oid) => buf.write_bytes(&oid.bytes()),
        Bson::DateTime(dt) => buf.write_bytes(&dt.timestamp_millis().to_le_bytes()),
        Bson::Decimal128(d) => buf.write_bytes(&d.bytes()),
        Bson::DbPointer(pointer) => {
            write_string(buf, &pointer.namespace);
            buf.write_bytes(&pointer.id.bytes());
        }
    }
    Ok(())
}
