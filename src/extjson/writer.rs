use std::fmt::{self, Write};

use crate::{Binary, Bson, Document, spec::BinarySubtype};

/// The flavor of extended JSON produced by the writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum JsonOutputMode {
    /// Only `$`-prefixed object forms. Reading the output back yields the same values.
    #[default]
    Strict,

    /// The constructor syntax understood by the mongo shell, e.g. `ObjectId("...")`.
    ///
    /// Regular expressions are written as `/pattern/options` literals. An escaped slash in a
    /// pattern reads back as a plain slash, which matches the same text.
    Shell,
}

/// Options controlling how values are rendered as extended JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct JsonWriterOptions {
    /// Which flavor of extended JSON to emit.
    pub output_mode: JsonOutputMode,

    /// Place each document element on its own line, indented by two spaces per level.
    pub indent: bool,
}

impl JsonWriterOptions {
    /// Strict output on a single line.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Shell output on a single line.
    pub fn shell() -> Self {
        Self {
            output_mode: JsonOutputMode::Shell,
            indent: false,
        }
    }

    /// Sets the output mode.
    pub fn output_mode(mut self, output_mode: JsonOutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    /// Sets whether documents are indented.
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }
}

enum Root<'a> {
    Value(&'a Bson),
    Document(&'a Document),
}

/// A value or document paired with writer options, rendered through [`fmt::Display`].
pub(crate) struct Json<'a> {
    root: Root<'a>,
    options: &'a JsonWriterOptions,
}

impl<'a> Json<'a> {
    pub(crate) fn value(value: &'a Bson, options: &'a JsonWriterOptions) -> Self {
        Self {
            root: Root::Value(value),
            options,
        }
    }

    pub(crate) fn document(document: &'a Document, options: &'a JsonWriterOptions) -> Self {
        Self {
            root: Root::Document(document),
            options,
        }
    }
}

impl fmt::Display for Json<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = JsonWriter {
            out: f,
            options: self.options,
            depth: 0,
        };
        match self.root {
            Root::Value(value) => writer.write_value(value),
            Root::Document(doc) => writer.write_document(doc),
        }
    }
}

struct JsonWriter<'a, 'f> {
    out: &'a mut fmt::Formatter<'f>,
    options: &'a JsonWriterOptions,
    depth: usize,
}

impl JsonWriter<'_, '_> {
    fn shell(&self) -> bool {
        self.options.output_mode == JsonOutputMode::Shell
    }

    fn newline(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        for _ in 0..self.depth {
            self.out.write_str("  ")?;
        }
        Ok(())
    }

    fn write_document(&mut self, doc: &Document) -> fmt::Result {
        if doc.is_empty() {
            return self.out.write_str("{ }");
        }
        self.out.write_char('{')?;
        self.depth += 1;
        for (i, (key, value)) in doc.iter().enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            if self.options.indent {
                self.newline()?;
            } else {
                self.out.write_char(' ')?;
            }
            write_string(self.out, key)?;
            self.out.write_str(" : ")?;
            self.write_value(value)?;
        }
        self.depth -= 1;
        if self.options.indent {
            self.newline()?;
            self.out.write_char('}')
        } else {
            self.out.write_str(" }")
        }
    }

    fn write_array(&mut self, array: &[Bson]) -> fmt::Result {
        self.out.write_char('[')?;
        for (i, value) in array.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            self.write_value(value)?;
        }
        self.out.write_char(']')
    }

    // Writes `{ "$name" : <body> }`.
    fn wrapped(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> fmt::Result,
    ) -> fmt::Result {
        write!(self.out, "{{ \"{name}\" : ")?;
        body(self)?;
        self.out.write_str(" }")
    }

    fn write_value(&mut self, value: &Bson) -> fmt::Result {
        let shell = self.shell();
        match value {
            Bson::Double(d) if d.is_finite() => self.out.write_str(&format_double(*d)),
            Bson::Double(d) => {
                let name = if d.is_nan() {
                    "NaN"
                } else if *d > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                if shell {
                    self.out.write_str(name)
                } else {
                    self.wrapped("$numberDouble", |w| write!(w.out, "\"{name}\""))
                }
            }
            Bson::String(s) => write_string(self.out, s),
            Bson::Array(array) => self.write_array(array),
            Bson::Document(doc) => self.write_document(doc),
            Bson::Boolean(b) => write!(self.out, "{b}"),
            Bson::Null => self.out.write_str("null"),
            Bson::RegularExpression(regex) => {
                if shell {
                    self.out.write_char('/')?;
                    if regex.pattern.is_empty() {
                        self.out.write_str("(?:)")?;
                    } else {
                        // Escape pairs are copied as they are; an unescaped slash is escaped.
                        let mut chars = regex.pattern.chars();
                        while let Some(c) = chars.next() {
                            match c {
                                '\\' => {
                                    self.out.write_char('\\')?;
                                    self.out.write_char(chars.next().unwrap_or('\\'))?;
                                }
                                '/' => self.out.write_str("\\/")?,
                                c => self.out.write_char(c)?,
                            }
                        }
                    }
                    write!(self.out, "/{}", regex.options)
                } else {
                    self.out.write_str("{ \"$regex\" : ")?;
                    write_string(self.out, &regex.pattern)?;
                    self.out.write_str(", \"$options\" : ")?;
                    write_string(self.out, &regex.options)?;
                    self.out.write_str(" }")
                }
            }
            Bson::JavaScriptCode(code) => {
                self.wrapped("$code", |w| write_string(w.out, code))
            }
            Bson::JavaScriptCodeWithScope(code) => {
                self.out.write_str("{ \"$code\" : ")?;
                write_string(self.out, &code.code)?;
                self.out.write_str(", \"$scope\" : ")?;
                self.write_document(&code.scope)?;
                self.out.write_str(" }")
            }
            Bson::Int32(i) => write!(self.out, "{i}"),
            Bson::Int64(i) => {
                if !shell {
                    self.wrapped("$numberLong", |w| write!(w.out, "\"{i}\""))
                } else if i32::try_from(*i).is_ok() {
                    write!(self.out, "NumberLong({i})")
                } else {
                    write!(self.out, "NumberLong(\"{i}\")")
                }
            }
            Bson::Timestamp(ts) => {
                if shell {
                    write!(self.out, "Timestamp({}, {})", ts.time, ts.increment)
                } else {
                    write!(
                        self.out,
                        "{{ \"$timestamp\" : {{ \"t\" : {}, \"i\" : {} }} }}",
                        ts.time, ts.increment
                    )
                }
            }
            Bson::Binary(binary) => self.write_binary(binary),
            Bson::ObjectId(oid) => {
                if shell {
                    write!(self.out, "ObjectId(\"{oid}\")")
                } else {
                    self.wrapped("$oid", |w| write!(w.out, "\"{oid}\""))
                }
            }
            Bson::DateTime(dt) => {
                let millis = dt.timestamp_millis();
                if !shell {
                    return self.wrapped("$date", |w| write!(w.out, "{millis}"));
                }
                match dt.to_iso_string() {
                    Some(iso) if millis % 1000 == 0 => {
                        write!(self.out, "ISODate(\"{}Z\")", iso.trim_end_matches(".000Z"))
                    }
                    Some(iso) => write!(self.out, "ISODate(\"{iso}\")"),
                    None => write!(self.out, "new Date({millis})"),
                }
            }
            Bson::Symbol(symbol) => {
                self.wrapped("$symbol", |w| write_string(w.out, symbol))
            }
            Bson::Decimal128(d) => {
                if shell {
                    write!(self.out, "NumberDecimal(\"{d}\")")
                } else {
                    self.wrapped("$numberDecimal", |w| write!(w.out, "\"{d}\""))
                }
            }
            Bson::Undefined => {
                if shell {
                    self.out.write_str("undefined")
                } else {
                    self.out.write_str("{ \"$undefined\" : true }")
                }
            }
            Bson::MaxKey => {
                if shell {
                    self.out.write_str("MaxKey")
                } else {
                    self.out.write_str("{ \"$maxKey\" : 1 }")
                }
            }
            Bson::MinKey => {
                if shell {
                    self.out.write_str("MinKey")
                } else {
                    self.out.write_str("{ \"$minKey\" : 1 }")
                }
            }
            Bson::DbPointer(pointer) => {
                if shell {
                    self.out.write_str("DBPointer(")?;
                    write_string(self.out, &pointer.namespace)?;
                    write!(self.out, ", ObjectId(\"{}\"))", pointer.id)
                } else {
                    self.out.write_str("{ \"$dbPointer\" : { \"$ref\" : ")?;
                    write_string(self.out, &pointer.namespace)?;
                    write!(self.out, ", \"$id\" : {{ \"$oid\" : \"{}\" }} }} }}", pointer.id)
                }
            }
        }
    }

    fn write_binary(&mut self, binary: &Binary) -> fmt::Result {
        let subtype = u8::from(binary.subtype);
        if self.shell() {
            if binary.subtype == BinarySubtype::Uuid && binary.bytes.len() == 16 {
                let hex = hex::encode(&binary.bytes);
                return write!(
                    self.out,
                    "UUID(\"{}-{}-{}-{}-{}\")",
                    &hex[0..8],
                    &hex[8..12],
                    &hex[12..16],
                    &hex[16..20],
                    &hex[20..32]
                );
            }
            write!(self.out, "new BinData({subtype}, \"{}\")", binary.to_base64())
        } else {
            write!(
                self.out,
                "{{ \"$binary\" : \"{}\", \"$type\" : \"{subtype:02x}\" }}",
                binary.to_base64()
            )
        }
    }
}

fn write_string(out: &mut impl Write, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\u{8}' => out.write_str("\\b")?,
            '\u{c}' => out.write_str("\\f")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if c < '\u{20}' || ('\u{7f}'..='\u{9f}').contains(&c) => {
                write!(out, "\\u{:04x}", c as u32)?
            }
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

/// Formats a finite double so that it always reads back as a double: `1.0`, `0.5`, `1.5E+40`.
pub(crate) fn format_double(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let magnitude = value.abs();
    if (1e-5..1e16).contains(&magnitude) {
        let mut s = value.to_string();
        if !s.contains('.') {
            s.push_str(".0");
        }
        s
    } else {
        let s = format!("{value:E}");
        match s.split_once('E') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}E+{exponent}")
            }
            _ => s,
        }
    }
}
