//! Parses the attribute literal carried by a `// ts(...)` annotation into plain
//! `serde_json` data. The accepted syntax is a JSON superset in the shape
//! shader authors write by hand: bare identifier keys, single-quoted strings,
//! trailing commas, comments, hex integers, and numbers such as `.5` or `1.`.
//!
//! Nothing is ever evaluated: the parser only recognises literals, so an
//! annotation like `ts(alert(1))` is a syntax error rather than a call.
use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parses a complete literal; trailing input other than whitespace or comments
/// is rejected.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia()?;
    if parser.at_end() {
        return Err(parser.error("expected a literal"));
    }
    let value = parser.parse_value(0)?;
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Parses a literal that must be an object, returning its attribute map.
pub fn parse_object(input: &str) -> Result<Map<String, Value>, LiteralError> {
    match parse(input)? {
        Value::Object(map) => Ok(map),
        other => Err(LiteralError {
            offset: 0,
            message: format!("expected an object literal, found {}", describe(&other)),
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                return Err(LiteralError {
                                    offset: start,
                                    message: "unterminated block comment".into(),
                                })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("literal nests too deeply"));
        }
        match self.peek() {
            Some(b'{') => self.parse_object(depth + 1),
            Some(b'[') => self.parse_array(depth + 1),
            Some(quote @ (b'"' | b'\'')) => self.parse_string(quote).map(Value::String),
            Some(b) if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.') => {
                self.parse_number()
            }
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                let ident = self.parse_identifier();
                match ident {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    "Infinity" | "NaN" => Err(LiteralError {
                        offset: start,
                        message: format!("non-finite number '{ident}' is not supported"),
                    }),
                    other => Err(LiteralError {
                        offset: start,
                        message: format!("unexpected identifier '{other}'"),
                    }),
                }
            }
            Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key = self.parse_key()?;
            self.skip_trivia()?;
            self.expect(b':')?;
            self.skip_trivia()?;
            let value = self.parse_value(depth)?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                None => return Err(self.error("unterminated object")),
                Some(_) => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, LiteralError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.parse_string(quote),
            Some(b) if is_ident_start(b) => Ok(self.parse_identifier().to_string()),
            Some(b) if b.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(self.text[start..self.pos].to_string())
            }
            Some(b'}') | None => Err(self.error("expected a key")),
            Some(b) => Err(self.error(format!("unexpected character '{}' in key", b as char))),
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value(depth)?);

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                None => return Err(self.error("unterminated array")),
                Some(_) => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn parse_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn parse_string(&mut self, quote: u8) -> Result<String, LiteralError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(ch) = self.text[self.pos..].chars().next() else {
                return Err(LiteralError {
                    offset: start,
                    message: "unterminated string".into(),
                });
            };
            match ch {
                c if c as u32 == quote as u32 => {
                    self.pos += 1;
                    return Ok(out);
                }
                '\n' | '\r' => {
                    return Err(LiteralError {
                        offset: start,
                        message: "unterminated string".into(),
                    })
                }
                '\\' => {
                    self.pos += 1;
                    out.push(self.parse_escape()?);
                }
                c => {
                    self.pos += c.len_utf8();
                    out.push(c);
                }
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, LiteralError> {
        let Some(ch) = self.text[self.pos..].chars().next() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.pos += ch.len_utf8();
        let decoded = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'u' => return self.parse_unicode_escape(),
            other => other,
        };
        Ok(decoded)
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
        let high = self.parse_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            if self.peek() == Some(b'\\') && self.peek_at(1) == Some(b'u') {
                self.pos += 2;
                let low = self.parse_hex4()?;
                if (0xDC00..0xE000).contains(&low) {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(code).ok_or_else(|| self.error("invalid surrogate pair"));
                }
            }
            return Err(self.error("unpaired surrogate in escape"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn parse_hex4(&mut self) -> Result<u32, LiteralError> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = &self.text[digits_start..self.pos];
            let magnitude = i64::from_str_radix(digits, 16).map_err(|_| LiteralError {
                offset: start,
                message: "invalid hex literal".into(),
            })?;
            self.reject_trailing_identifier(start)?;
            return Ok(Value::Number(Number::from(if negative {
                -magnitude
            } else {
                magnitude
            })));
        }

        let mut mantissa_digits = 0usize;
        let mut is_float = false;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            mantissa_digits += 1;
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
                mantissa_digits += 1;
            }
        }
        if mantissa_digits == 0 {
            return Err(LiteralError {
                offset: start,
                message: "invalid number".into(),
            });
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                return Err(self.error("missing exponent digits"));
            }
        }
        self.reject_trailing_identifier(start)?;

        let raw = self.text[start..self.pos].trim_start_matches('+');
        if !is_float {
            if let Ok(int) = raw.parse::<i64>() {
                return Ok(Value::Number(Number::from(int)));
            }
        }
        let float: f64 = raw.parse().map_err(|_| LiteralError {
            offset: start,
            message: format!("invalid number '{raw}'"),
        })?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("number '{raw}' is out of range"),
            })
    }

    fn reject_trailing_identifier(&self, start: usize) -> Result<(), LiteralError> {
        if self.peek().is_some_and(is_ident_continue) {
            return Err(LiteralError {
                offset: start,
                message: "invalid number".into(),
            });
        }
        Ok(())
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
