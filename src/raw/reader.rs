use crate::{
    Binary,
    Bson,
    DbPointer,
    Decimal128,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    error::{Error, Result},
    oid::ObjectId,
    raw::{MAX_BSON_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MIN_BSON_DOCUMENT_SIZE},
    spec::{BinarySubtype, ElementType},
};

/// Reads values in the binary wire format from a byte slice.
///
/// Every length prefix is checked against the bytes that remain before it is trusted; a prefix
/// that runs past the end of the input fails with
/// [`ErrorKind::UnexpectedEndOfInput`](crate::error::ErrorKind::UnexpectedEndOfInput).
/// Documents and arrays nested more than [`MAX_NESTING_DEPTH`] levels deep are rejected.
pub struct BsonReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> BsonReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            depth: 0,
        }
    }

    /// The number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Whether every byte of the input has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads one length-prefixed document.
    pub fn read_document(&mut self) -> Result<Document> {
        let mut body = self.read_container()?;
        let mut doc = Document::new();
        while let Some((element_type, key)) = body.read_element_header()? {
            let value = body
                .read_value(element_type)
                .map_err(|e| e.with_key(key))?;
            doc.push(key, value);
        }
        Ok(doc)
    }

    fn read_array(&mut self) -> Result<Vec<Bson>> {
        let mut body = self.read_container()?;
        let mut array = Vec::new();
        while let Some((element_type, _)) = body.read_element_header()? {
            let index = array.len();
            array.push(
                body.read_value(element_type)
                    .map_err(|e| e.with_index(index))?,
            );
        }
        Ok(array)
    }

    // Validates the length prefix and terminator of a document or array and returns a reader over
    // its elements.
    fn read_container(&mut self) -> Result<BsonReader<'a>> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::format(format!(
                "documents are nested more than {MAX_NESTING_DEPTH} levels deep"
            )));
        }
        let length = self.read_i32()?;
        if length < MIN_BSON_DOCUMENT_SIZE {
            return Err(Error::format(format!("invalid document length {length}")));
        }
        let length = length as usize;
        if length > MAX_BSON_DOCUMENT_SIZE {
            return Err(Error::format(format!(
                "document length {length} exceeds the maximum of {MAX_BSON_DOCUMENT_SIZE}"
            )));
        }
        // the prefix counts itself
        let body = self
            .take(length - 4)
            .map_err(|_| Error::end_of_input(length, self.remaining() + 4))?;
        match body.split_last() {
            Some((0, elements)) => Ok(BsonReader {
                bytes: elements,
                pos: 0,
                depth: self.depth + 1,
            }),
            _ => Err(Error::format("document not null terminated")),
        }
    }

    fn read_element_header(&mut self) -> Result<Option<(ElementType, &'a str)>> {
        if self.is_at_end() {
            return Ok(None);
        }
        let tag = self.read_u8()?;
        let key = self.read_cstring()?;
        match ElementType::from(tag) {
            Some(element_type) => Ok(Some((element_type, key))),
            None => Err(Error::format(format!(
                "unrecognized element type 0x{tag:02x}"
            ))
            .with_key(key)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::end_of_input(n, self.remaining()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array_of<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array_of::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_array_of().map(i32::from_le_bytes)
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.read_array_of().map(i64::from_le_bytes)
    }

    fn read_cstring(&mut self) -> Result<&'a str> {
        let rest = &self.bytes[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Error::format("cstring not null terminated"))?;
        let s = to_str(&rest[..len])?;
        self.pos += len + 1;
        Ok(s)
    }

    fn read_string(&mut self) -> Result<&'a str> {
        let length = self.read_i32()?;
        if length < 1 {
            return Err(Error::format(format!("invalid string length {length}")));
        }
        let bytes = self.take(length as usize)?;
        match bytes.split_last() {
            Some((0, s)) => to_str(s),
            _ => Err(Error::format("string not null terminated")),
        }
    }

    fn read_binary(&mut self) -> Result<Binary> {
        let length = self.read_i32()?;
        if length < 0 {
            return Err(Error::format(format!("invalid binary length {length}")));
        }
        let subtype = BinarySubtype::from(self.read_u8()?);
        let mut length = length as usize;
        if let BinarySubtype::BinaryOld = subtype {
            let inner = self.read_i32()?;
            if inner < 0 || inner as usize + 4 != length {
                return Err(Error::format(format!(
                    "binary subtype 2 inner length {inner} does not match outer length {length}"
                )));
            }
            length = inner as usize;
        }
        let bytes = self.take(length)?.to_vec();
        Ok(Binary { subtype, bytes })
    }

    fn read_value(&mut self, element_type: ElementType) -> Result<Bson> {
        let value = match element_type {
            ElementType::Double => Bson::Double(f64::from_le_bytes(self.read_array_of()?)),
            ElementType::String => Bson::String(self.read_string()?.to_string()),
            ElementType::EmbeddedDocument => Bson::Document(self.read_document()?),
            ElementType::Array => Bson::Array(self.read_array()?),
            ElementType::Binary => Bson::Binary(self.read_binary()?),
            ElementType::Undefined => Bson::Undefined,
            ElementType::ObjectId => Bson::ObjectId(ObjectId::from_bytes(self.read_array_of()?)),
            ElementType::Boolean => match self.read_u8()? {
                0 => Bson::Boolean(false),
                1 => Bson::Boolean(true),
                other => {
                    return Err(Error::format(format!("invalid boolean byte 0x{other:02x}")));
                }
            },
            ElementType::DateTime => Bson::DateTime(crate::DateTime::from_millis(self.read_i64()?)),
            ElementType::Null => Bson::Null,
            ElementType::RegularExpression => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                Bson::RegularExpression(Regex {
                    pattern: pattern.to_string(),
                    options: options.to_string(),
                })
            }
            ElementType::DbPointer => {
                let namespace = self.read_string()?.to_string();
                let id = ObjectId::from_bytes(self.read_array_of()?);
                Bson::DbPointer(DbPointer { namespace, id })
            }
            ElementType::JavaScriptCode => Bson::JavaScriptCode(self.read_string()?.to_string()),
            ElementType::Symbol => Bson::Symbol(self.read_string()?.to_string()),
            ElementType::JavaScriptCodeWithScope => {
                let start = self.pos;
                let length = self.read_i32()?;
                if length < 14 {
                    return Err(Error::format(format!(
                        "invalid code with scope length {length}"
                    )));
                }
                let code = self.read_string()?.to_string();
                let scope = self.read_document()?;
                if self.pos - start != length as usize {
                    return Err(Error::format(format!(
                        "code with scope length {length} does not match its contents"
                    )));
                }
                Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope })
            }
            ElementType::Int32 => Bson::Int32(self.read_i32()?),
            ElementType::Timestamp => {
                Bson::Timestamp(Timestamp::from_u64(u64::from_le_bytes(self.read_array_of()?)))
            }
            ElementType::Int64 => Bson::Int64(self.read_i64()?),
            ElementType::Decimal128 => Bson::Decimal128(Decimal128::from_bytes(self.read_array_of()?)),
            ElementType::MaxKey => Bson::MaxKey,
            ElementType::MinKey => Bson::MinKey,
        };
        Ok(value)
    }
}

fn to_str(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| crate::error::ErrorKind::Utf8Encoding.into())
}
