use time::UtcOffset;

use super::scanner::{JsonScanner, Token};
use crate::{
    Binary,
    Bson,
    DateTime,
    DbPointer,
    Decimal128,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    error::{Error, Result},
    oid::ObjectId,
    spec::BinarySubtype,
    uuid::{Uuid, UuidRepresentation},
};

/// Options controlling how extended JSON is parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct JsonReaderOptions {
    /// The offset in which the components of `new Date(y, m, d, ...)` are interpreted.
    pub local_offset: UtcOffset,
}

impl Default for JsonReaderOptions {
    fn default() -> Self {
        Self {
            local_offset: UtcOffset::UTC,
        }
    }
}

impl JsonReaderOptions {
    /// Sets the offset used for `new Date(y, m, d, ...)` components.
    pub fn local_offset(mut self, local_offset: UtcOffset) -> Self {
        self.local_offset = local_offset;
        self
    }
}

// Bails out of an extended `$` form whose shape does not match, so that the object is read as an
// ordinary document instead.
macro_rules! shape {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => return Ok(None),
        }
    };
}

/// A recursive-descent parser for strict and shell extended JSON.
///
/// ```
/// use bson_mapping::{Bson, extjson::{JsonReader, JsonReaderOptions}};
///
/// let mut reader = JsonReader::new("{ x : NumberLong(5) } { x : /ab/i }", JsonReaderOptions::default());
/// let first = reader.read_document()?;
/// assert_eq!(first.get("x"), Some(&Bson::Int64(5)));
/// let second = reader.read_document()?;
/// assert!(reader.is_at_end());
/// assert_eq!(second.to_string(), "{ \"x\" : /ab/i }");
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[derive(Clone)]
pub struct JsonReader<'a> {
    scanner: JsonScanner<'a>,
    options: JsonReaderOptions,
}

impl<'a> JsonReader<'a> {
    pub fn new(text: &'a str, options: JsonReaderOptions) -> Self {
        Self {
            scanner: JsonScanner::new(text),
            options,
        }
    }

    /// Whether only whitespace remains in the input.
    pub fn is_at_end(&mut self) -> bool {
        self.scanner.is_at_end()
    }

    /// Reads the next value.
    pub fn read_value(&mut self) -> Result<Bson> {
        let token = self.next()?;
        self.parse_value(token)
    }

    /// Reads the next value, which must be a document.
    pub fn read_document(&mut self) -> Result<Document> {
        match self.read_value()? {
            Bson::Document(doc) => Ok(doc),
            other => Err(self.error(format!(
                "expected a document but found a value of type {:?}",
                other.element_type()
            ))),
        }
    }

    /// Reads a value that must make up the whole input.
    pub fn read_single_value(mut self) -> Result<Bson> {
        let value = self.read_value()?;
        self.expect_end()?;
        Ok(value)
    }

    /// Reads a document that must make up the whole input.
    pub fn read_single_document(mut self) -> Result<Document> {
        let doc = self.read_document()?;
        self.expect_end()?;
        Ok(doc)
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.next()? {
            Token::EndOfFile => Ok(()),
            token => Err(self.error(format!("unexpected {token} after the end of the value"))),
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> Error {
        Error::format(format!("{message} at position {}", self.scanner.position()))
    }

    fn next(&mut self) -> Result<Token> {
        self.scanner.next_token()
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected} but found {token}")))
        }
    }

    fn parse_value(&mut self, token: Token) -> Result<Bson> {
        match token {
            Token::BeginObject => self.parse_object(),
            Token::BeginArray => self.parse_array(),
            Token::String(s) => Ok(Bson::String(s)),
            Token::Int32(i) => Ok(Bson::Int32(i)),
            Token::Int64(i) => Ok(Bson::Int64(i)),
            Token::Double(d) => Ok(Bson::Double(d)),
            Token::RegularExpression { pattern, options } => {
                Ok(Bson::RegularExpression(Regex::new(pattern, options)))
            }
            Token::UnquotedString(name) => self.parse_keyword(&name),
            token => Err(self.error(format!("unexpected {token}"))),
        }
    }

    fn parse_array(&mut self) -> Result<Bson> {
        let mut array = Vec::new();
        let mut token = self.next()?;
        if token == Token::EndArray {
            return Ok(Bson::Array(array));
        }
        loop {
            array.push(self.parse_value(token)?);
            match self.next()? {
                Token::Comma => token = self.next()?,
                Token::EndArray => return Ok(Bson::Array(array)),
                token => return Err(self.error(format!("expected ',' or ']' but found {token}"))),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Bson> {
        let checkpoint = self.scanner.clone();
        if let Token::String(name) | Token::UnquotedString(name) = self.next()? {
            if name.starts_with('$') && self.next()? == Token::Colon {
                if let Some(value) = self.parse_extended(&name)? {
                    return Ok(value);
                }
            }
        }
        self.scanner = checkpoint;
        self.parse_document_body().map(Bson::Document)
    }

    // Reads the elements of a document whose opening brace has been consumed.
    fn parse_document_body(&mut self) -> Result<Document> {
        let mut doc = Document::new();
        let mut token = self.next()?;
        if token == Token::EndObject {
            return Ok(doc);
        }
        loop {
            let name = match token {
                Token::String(name) | Token::UnquotedString(name) => name,
                token => return Err(self.error(format!("expected an element name but found {token}"))),
            };
            self.expect(Token::Colon)?;
            let value = self.read_value().map_err(|e| e.with_key(name.as_str()))?;
            doc.push(name, value);
            match self.next()? {
                Token::Comma => token = self.next()?,
                Token::EndObject => return Ok(doc),
                token => return Err(self.error(format!("expected ',' or '}}' but found {token}"))),
            }
        }
    }

    fn string(&mut self) -> Result<Option<String>> {
        Ok(match self.next()? {
            Token::String(s) => Some(s),
            _ => None,
        })
    }

    fn integer(&mut self) -> Result<Option<i64>> {
        Ok(match self.next()? {
            Token::Int32(i) => Some(i.into()),
            Token::Int64(i) => Some(i),
            _ => None,
        })
    }

    // The literal text of a string or number token.
    fn number_text(&mut self) -> Result<Option<String>> {
        Ok(match self.next()? {
            Token::String(s) => Some(s),
            Token::Int32(i) => Some(i.to_string()),
            Token::Int64(i) => Some(i.to_string()),
            Token::Double(d) => Some(d.to_string()),
            _ => None,
        })
    }

    fn end_object(&mut self) -> Result<Option<()>> {
        Ok((self.next()? == Token::EndObject).then_some(()))
    }

    // Reads `, "name" :`.
    fn next_key(&mut self, name: &str) -> Result<Option<()>> {
        if self.next()? != Token::Comma {
            return Ok(None);
        }
        self.key(name)
    }

    // Reads `"name" :`.
    fn key(&mut self, name: &str) -> Result<Option<()>> {
        match self.next()? {
            Token::String(n) | Token::UnquotedString(n) if n == name => {}
            _ => return Ok(None),
        }
        Ok((self.next()? == Token::Colon).then_some(()))
    }

    // Reads `{ "a" : <v>, "b" : <v> }` with the two names in either order.
    fn pair(
        &mut self,
        names: [&str; 2],
        mut read: impl FnMut(&mut Self, usize) -> Result<Option<()>>,
    ) -> Result<Option<()>> {
        if self.next()? != Token::BeginObject {
            return Ok(None);
        }
        let mut seen = [false; 2];
        for position in 0..2 {
            if position > 0 && self.next()? != Token::Comma {
                return Ok(None);
            }
            let name = match self.next()? {
                Token::String(n) | Token::UnquotedString(n) => n,
                _ => return Ok(None),
            };
            let Some(index) = names.iter().position(|n| *n == name) else {
                return Ok(None);
            };
            if seen[index] || self.next()? != Token::Colon {
                return Ok(None);
            }
            seen[index] = true;
            shape!(read(self, index)?);
        }
        self.end_object()
    }

    fn parse_extended(&mut self, name: &str) -> Result<Option<Bson>> {
        let value = match name {
            "$binary" => shape!(self.parse_extended_binary()?),
            "$code" => {
                let code = shape!(self.string()?);
                match self.next()? {
                    Token::EndObject => return Ok(Some(Bson::JavaScriptCode(code))),
                    Token::Comma => {}
                    _ => return Ok(None),
                }
                shape!(self.key("$scope")?);
                let scope = match self.read_value()? {
                    Bson::Document(scope) => scope,
                    _ => return Ok(None),
                };
                Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope })
            }
            "$date" => {
                let millis = match self.next()? {
                    Token::Int32(i) => i64::from(i),
                    Token::Int64(i) => i,
                    Token::Double(d) => d as i64,
                    Token::String(s) => DateTime::parse_iso8601(&s)?.timestamp_millis(),
                    Token::BeginObject => {
                        shape!(self.key("$numberLong")?);
                        let text = shape!(self.number_text()?);
                        shape!(self.end_object()?);
                        text.parse()
                            .map_err(|_| self.error(format!("invalid $numberLong {text:?}")))?
                    }
                    _ => return Ok(None),
                };
                Bson::DateTime(DateTime::from_millis(millis))
            }
            "$maxKey" | "$maxkey" | "$minKey" | "$minkey" => {
                shape!(self.integer()?);
                if name.starts_with("$max") {
                    Bson::MaxKey
                } else {
                    Bson::MinKey
                }
            }
            "$numberDecimal" => {
                let text = shape!(self.number_text()?);
                Bson::Decimal128(text.parse::<Decimal128>()?)
            }
            "$numberDouble" => {
                let text = shape!(self.number_text()?);
                Bson::Double(
                    text.parse()
                        .map_err(|_| self.error(format!("invalid $numberDouble {text:?}")))?,
                )
            }
            "$numberInt" => {
                let text = shape!(self.number_text()?);
                Bson::Int32(
                    text.parse()
                        .map_err(|_| self.error(format!("invalid $numberInt {text:?}")))?,
                )
            }
            "$numberLong" => {
                let text = shape!(self.number_text()?);
                Bson::Int64(
                    text.parse()
                        .map_err(|_| self.error(format!("invalid $numberLong {text:?}")))?,
                )
            }
            "$oid" => Bson::ObjectId(ObjectId::parse_str(shape!(self.string()?))?),
            "$regex" => {
                // without $options this is the query operator, not a regular expression
                let pattern = shape!(self.string()?);
                shape!(self.next_key("$options")?);
                let options = shape!(self.string()?);
                Bson::RegularExpression(Regex::new(pattern, options))
            }
            "$regularExpression" => {
                let mut parts = [String::new(), String::new()];
                shape!(self.pair(["pattern", "options"], |r, i| {
                    Ok(r.string()?.map(|s| parts[i] = s))
                })?);
                let [pattern, options] = parts;
                Bson::RegularExpression(Regex::new(pattern, options))
            }
            "$symbol" => Bson::Symbol(shape!(self.string()?)),
            "$timestamp" => match self.peek()? {
                Token::BeginObject => {
                    let mut parts = [0u32; 2];
                    let mut valid = true;
                    shape!(self.pair(["t", "i"], |r, i| {
                        Ok(r.integer()?.map(|n| match u32::try_from(n) {
                            Ok(n) => parts[i] = n,
                            Err(_) => valid = false,
                        }))
                    })?);
                    if !valid {
                        return Err(self.error("$timestamp components must fit in 32 bits"));
                    }
                    Bson::Timestamp(Timestamp {
                        time: parts[0],
                        increment: parts[1],
                    })
                }
                Token::UnquotedString(ctor) if ctor == "NumberLong" => {
                    self.next()?;
                    let Bson::Int64(n) = self.parse_number_long()? else {
                        return Ok(None);
                    };
                    Bson::Timestamp(Timestamp::from_u64(n as u64))
                }
                _ => return Ok(None),
            },
            "$undefined" => match self.next()? {
                Token::UnquotedString(b) if b == "true" => Bson::Undefined,
                _ => return Ok(None),
            },
            "$dbPointer" => {
                let mut namespace = None;
                let mut id = None;
                shape!(self.pair(["$ref", "$id"], |r, i| {
                    if i == 0 {
                        Ok(r.string()?.map(|s| namespace = Some(s)))
                    } else {
                        Ok(match r.read_value()? {
                            Bson::ObjectId(oid) => {
                                id = Some(oid);
                                Some(())
                            }
                            _ => None,
                        })
                    }
                })?);
                Bson::DbPointer(DbPointer {
                    namespace: shape!(namespace),
                    id: shape!(id),
                })
            }
            "$uuid" => {
                let uuid = Uuid::parse_str(shape!(self.string()?))?;
                Bson::Binary(Binary::from_uuid(uuid))
            }
            _ => return Ok(None),
        };
        shape!(self.end_object()?);
        Ok(Some(value))
    }

    fn parse_extended_binary(&mut self) -> Result<Option<Bson>> {
        match self.peek()? {
            Token::String(_) => {
                let base64 = shape!(self.string()?);
                shape!(self.next_key("$type")?);
                let subtype = shape!(self.string()?);
                Ok(Some(Bson::Binary(Binary::from_base64(
                    base64,
                    parse_subtype(&subtype)?,
                )?)))
            }
            Token::BeginObject => {
                let mut parts = [String::new(), String::new()];
                shape!(self.pair(["base64", "subType"], |r, i| {
                    Ok(r.string()?.map(|s| parts[i] = s))
                })?);
                let [base64, subtype] = parts;
                Ok(Some(Bson::Binary(Binary::from_base64(
                    base64,
                    parse_subtype(&subtype)?,
                )?)))
            }
            _ => Ok(None),
        }
    }

    fn parse_keyword(&mut self, name: &str) -> Result<Bson> {
        match name {
            "true" => Ok(Bson::Boolean(true)),
            "false" => Ok(Bson::Boolean(false)),
            "null" => Ok(Bson::Null),
            "undefined" => Ok(Bson::Undefined),
            "NaN" => Ok(Bson::Double(f64::NAN)),
            "Infinity" => Ok(Bson::Double(f64::INFINITY)),
            "MinKey" => Ok(Bson::MinKey),
            "MaxKey" => Ok(Bson::MaxKey),
            "new" => match self.next()? {
                Token::UnquotedString(ctor) => self.parse_constructor(&ctor, true),
                token => Err(self.error(format!("expected a constructor name but found {token}"))),
            },
            ctor => self.parse_constructor(ctor, false),
        }
    }

    fn parse_constructor(&mut self, name: &str, with_new: bool) -> Result<Bson> {
        match name {
            "BinData" => {
                self.expect(Token::LeftParen)?;
                let subtype = self.subtype_arg()?;
                self.expect(Token::Comma)?;
                let base64 = self.string_arg()?;
                self.expect(Token::RightParen)?;
                Ok(Bson::Binary(Binary::from_base64(base64, subtype)?))
            }
            "HexData" => {
                self.expect(Token::LeftParen)?;
                let subtype = self.subtype_arg()?;
                self.expect(Token::Comma)?;
                let mut hex = self.string_arg()?;
                self.expect(Token::RightParen)?;
                if hex.len() % 2 != 0 {
                    hex.insert(0, '0');
                }
                Ok(Bson::Binary(Binary::from_hex(hex, subtype)?))
            }
            "UUID" | "GUID" => self.parse_uuid(UuidRepresentation::Standard),
            "CSUUID" | "CSGUID" => self.parse_uuid(UuidRepresentation::CSharpLegacy),
            "JUUID" | "JGUID" => self.parse_uuid(UuidRepresentation::JavaLegacy),
            "PYUUID" | "PYGUID" => self.parse_uuid(UuidRepresentation::PythonLegacy),
            "ObjectId" => {
                self.expect(Token::LeftParen)?;
                let hex = self.string_arg()?;
                self.expect(Token::RightParen)?;
                Ok(Bson::ObjectId(ObjectId::parse_str(hex)?))
            }
            "ISODate" => {
                self.expect(Token::LeftParen)?;
                if self.peek()? == Token::RightParen {
                    self.next()?;
                    return Ok(Bson::DateTime(DateTime::now()));
                }
                let text = self.string_arg()?;
                self.expect(Token::RightParen)?;
                Ok(Bson::DateTime(DateTime::parse_iso8601(text)?))
            }
            "Date" if with_new => self.parse_new_date(),
            "Date" => {
                self.expect(Token::LeftParen)?;
                self.expect(Token::RightParen)?;
                let now = DateTime::now();
                Ok(Bson::String(
                    now.to_shell_date_string()
                        .unwrap_or_else(|| now.timestamp_millis().to_string()),
                ))
            }
            "NumberInt" => {
                self.expect(Token::LeftParen)?;
                let text = self.number_arg()?;
                self.expect(Token::RightParen)?;
                text.parse()
                    .map(Bson::Int32)
                    .map_err(|_| self.error(format!("invalid NumberInt {text:?}")))
            }
            "NumberLong" => self.parse_number_long(),
            "NumberDecimal" => {
                self.expect(Token::LeftParen)?;
                let text = self.number_arg()?;
                self.expect(Token::RightParen)?;
                Ok(Bson::Decimal128(text.parse()?))
            }
            "Timestamp" => {
                self.expect(Token::LeftParen)?;
                let time = self.u32_arg()?;
                self.expect(Token::Comma)?;
                let increment = self.u32_arg()?;
                self.expect(Token::RightParen)?;
                Ok(Bson::Timestamp(Timestamp { time, increment }))
            }
            "RegExp" => {
                self.expect(Token::LeftParen)?;
                let pattern = self.string_arg()?;
                let options = match self.next()? {
                    Token::RightParen => String::new(),
                    Token::Comma => {
                        let options = self.string_arg()?;
                        self.expect(Token::RightParen)?;
                        options
                    }
                    token => return Err(self.error(format!("expected ',' or ')' but found {token}"))),
                };
                Ok(Bson::RegularExpression(Regex::new(pattern, options)))
            }
            "DBPointer" => {
                self.expect(Token::LeftParen)?;
                let namespace = self.string_arg()?;
                self.expect(Token::Comma)?;
                let Bson::ObjectId(id) = self.read_value()? else {
                    return Err(self.error("expected an ObjectId as the second DBPointer argument"));
                };
                self.expect(Token::RightParen)?;
                Ok(Bson::DbPointer(DbPointer { namespace, id }))
            }
            name => Err(self.error(format!("unknown keyword or constructor {name:?}"))),
        }
    }

    fn peek(&self) -> Result<Token> {
        self.scanner.clone().next_token()
    }

    fn parse_uuid(&mut self, representation: UuidRepresentation) -> Result<Bson> {
        self.expect(Token::LeftParen)?;
        let text = self.string_arg()?;
        self.expect(Token::RightParen)?;
        let uuid = Uuid::parse_str(text)?;
        Ok(Bson::Binary(Binary::from_uuid_with_representation(
            uuid,
            representation,
        )))
    }

    fn parse_number_long(&mut self) -> Result<Bson> {
        self.expect(Token::LeftParen)?;
        let text = self.number_arg()?;
        self.expect(Token::RightParen)?;
        text.parse()
            .map(Bson::Int64)
            .map_err(|_| self.error(format!("invalid NumberLong {text:?}")))
    }

    fn parse_new_date(&mut self) -> Result<Bson> {
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        loop {
            match self.next()? {
                Token::RightParen if args.is_empty() => return Ok(Bson::DateTime(DateTime::now())),
                Token::String(text) if args.is_empty() => {
                    self.expect(Token::RightParen)?;
                    return Ok(Bson::DateTime(DateTime::parse_iso8601(text)?));
                }
                Token::Int32(i) => args.push(i64::from(i)),
                Token::Int64(i) => args.push(i),
                Token::Double(d) => args.push(d as i64),
                token => return Err(self.error(format!("invalid Date argument {token}"))),
            }
            match self.next()? {
                Token::Comma if args.len() < 7 => {}
                Token::RightParen => break,
                token => return Err(self.error(format!("expected ',' or ')' but found {token}"))),
            }
        }

        if let [millis] = args[..] {
            return Ok(Bson::DateTime(DateTime::from_millis(millis)));
        }
        let component = |index: usize, default: i64| args.get(index).copied().unwrap_or(default);
        let narrow = |value: i64| {
            u8::try_from(value).map_err(|_| self.error(format!("Date component {value} is out of range")))
        };
        let year = i32::try_from(args[0])
            .map_err(|_| self.error(format!("Date year {} is out of range", args[0])))?;
        let millisecond = u16::try_from(component(6, 0))
            .map_err(|_| self.error("Date millisecond is out of range"))?;
        // the month is zero-based
        let dt = DateTime::builder()
            .year(year)
            .month(narrow(component(1, 0) + 1)?)
            .day(narrow(component(2, 1))?)
            .hour(narrow(component(3, 0))?)
            .minute(narrow(component(4, 0))?)
            .second(narrow(component(5, 0))?)
            .millisecond(millisecond)
            .offset(self.options.local_offset)
            .build()?;
        Ok(Bson::DateTime(dt))
    }

    fn string_arg(&mut self) -> Result<String> {
        match self.next()? {
            Token::String(s) => Ok(s),
            token => Err(self.error(format!("expected a string but found {token}"))),
        }
    }

    fn number_arg(&mut self) -> Result<String> {
        match self.number_text()? {
            Some(text) => Ok(text),
            None => Err(self.error("expected a number or a string")),
        }
    }

    fn u32_arg(&mut self) -> Result<u32> {
        match self.next()? {
            Token::Int32(i) => u32::try_from(i).map_err(|_| self.error(format!("{i} is out of range"))),
            Token::Int64(i) => u32::try_from(i).map_err(|_| self.error(format!("{i} is out of range"))),
            token => Err(self.error(format!("expected an integer but found {token}"))),
        }
    }

    fn subtype_arg(&mut self) -> Result<BinarySubtype> {
        match self.next()? {
            Token::Int32(i) => u8::try_from(i)
                .map(BinarySubtype::from)
                .map_err(|_| self.error(format!("invalid binary subtype {i}"))),
            token => Err(self.error(format!("expected a binary subtype but found {token}"))),
        }
    }
}

fn parse_subtype(hex: &str) -> Result<BinarySubtype> {
    if hex.is_empty() || hex.len() > 2 {
        return Err(Error::format(format!("invalid binary subtype {hex:?}")));
    }
    u8::from_str_radix(hex, 16)
        .map(BinarySubtype::from)
        .map_err(|_| Error::format(format!("invalid binary subtype {hex:?}")))
}
