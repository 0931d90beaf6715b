use std::fmt;

use crate::error::{Error, Result};

/// A lexical token of the extended JSON grammar.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    LeftParen,
    RightParen,
    Colon,
    Comma,
    String(String),
    UnquotedString(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    RegularExpression { pattern: String, options: String },
    EndOfFile,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BeginObject => f.write_str("'{'"),
            Token::EndObject => f.write_str("'}'"),
            Token::BeginArray => f.write_str("'['"),
            Token::EndArray => f.write_str("']'"),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::Colon => f.write_str("':'"),
            Token::Comma => f.write_str("','"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::UnquotedString(s) => write!(f, "'{s}'"),
            Token::Int32(i) => write!(f, "'{i}'"),
            Token::Int64(i) => write!(f, "'{i}'"),
            Token::Double(d) => write!(f, "'{d}'"),
            Token::RegularExpression { pattern, options } => write!(f, "'/{pattern}/{options}'"),
            Token::EndOfFile => f.write_str("end of file"),
        }
    }
}

/// Splits extended JSON text into [`Token`]s. Cloning a scanner is cheap and is used by the reader
/// to backtrack.
#[derive(Clone)]
pub(crate) struct JsonScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> JsonScanner<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl fmt::Display) -> Error {
        Error::format(format!("{message} at position {}", self.pos))
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.next_char();
        }
    }

    /// Whether only whitespace remains.
    pub(crate) fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos == self.text.len()
    }

    pub(crate) fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.next_char() else {
            return Ok(Token::EndOfFile);
        };
        let token = match c {
            '{' => Token::BeginObject,
            '}' => Token::EndObject,
            '[' => Token::BeginArray,
            ']' => Token::EndArray,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '"' | '\'' => Token::String(self.scan_string(c)?),
            '/' => self.scan_regex()?,
            '-' | '0'..='9' => self.scan_number(start)?,
            c if c == '$' || c == '_' || c.is_alphabetic() => {
                while self
                    .peek_char()
                    .is_some_and(|c| c == '$' || c == '_' || c.is_alphanumeric())
                {
                    self.next_char();
                }
                Token::UnquotedString(self.text[start..self.pos].to_string())
            }
            c => {
                self.pos = start;
                return Err(self.error(format!("invalid JSON input {c:?}")));
            }
        };
        Ok(token)
    }

    fn scan_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.next_char() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let c = match self.next_char() {
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.scan_unicode_escape()?,
                        Some(c) => return Err(self.error(format!("invalid escape sequence \\{c}"))),
                        None => return Err(self.error("unterminated string")),
                    };
                    out.push(c);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn scan_hex4(&mut self) -> Result<u32> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid \\u escape sequence"))?;
        self.pos += 4;
        u32::from_str_radix(digits, 16).map_err(|e| self.error(e))
    }

    fn scan_unicode_escape(&mut self) -> Result<char> {
        let first = self.scan_hex4()?;
        let code = if (0xD800..0xDC00).contains(&first) {
            // a high surrogate must be followed by an escaped low surrogate
            if !self.text[self.pos..].starts_with("\\u") {
                return Err(self.error("unpaired surrogate in \\u escape sequence"));
            }
            self.pos += 2;
            let second = self.scan_hex4()?;
            if !(0xDC00..0xE000).contains(&second) {
                return Err(self.error("unpaired surrogate in \\u escape sequence"));
            }
            0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
        } else {
            first
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape sequence"))
    }

    fn scan_regex(&mut self) -> Result<Token> {
        let mut pattern = String::new();
        loop {
            match self.next_char() {
                None => return Err(self.error("unterminated regular expression")),
                Some('/') => break,
                Some('\\') => match self.next_char() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(self.error("unterminated regular expression")),
                },
                Some(c) => pattern.push(c),
            }
        }
        let mut options = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                'i' | 'm' | 'x' | 's' | 'l' | 'u' => {
                    options.push(c);
                    self.next_char();
                }
                c if c.is_alphanumeric() => {
                    return Err(self.error(format!("invalid regular expression option {c:?}")));
                }
                _ => break,
            }
        }
        Ok(Token::RegularExpression { pattern, options })
    }

    fn scan_number(&mut self, start: usize) -> Result<Token> {
        if self.text[start..].starts_with("-Infinity") {
            self.pos = start + "-Infinity".len();
            return Ok(Token::Double(f64::NEG_INFINITY));
        }
        let mut is_double = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_double = true,
                '+' | '-' if matches!(self.text[..self.pos].chars().last(), Some('e' | 'E')) => {}
                _ => break,
            }
            self.next_char();
        }
        let literal = &self.text[start..self.pos];
        let invalid = || self.error(format!("invalid number {literal:?}"));
        if literal == "-" {
            return Err(invalid());
        }
        if is_double {
            return literal.parse().map(Token::Double).map_err(|_| invalid());
        }
        if let Ok(i) = literal.parse::<i32>() {
            return Ok(Token::Int32(i));
        }
        literal.parse::<i64>().map(Token::Int64).map_err(|_| invalid())
    }
}
