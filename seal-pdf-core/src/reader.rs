//! Lenient PDF reading.
//!
//! The loader scans the byte stream for `N G obj` headers instead of
//! trusting the cross-reference table; files with broken or truncated xref
//! offsets are common in the wild and the flat object store does not need
//! the table. Object streams stay opaque: their payload is a stream like any
//! other, which is exactly how encryption treats them.

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};

pub fn parse_document(bytes: &[u8]) -> Result<Document> {
    Parser::new(bytes).parse()
}

const fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\0' | b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

const fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn parse(mut self) -> Result<Document> {
        let mut document = Document::new();

        if let Some(version) = self.read_header_version() {
            document.set_version(version);
        }

        loop {
            self.skip_whitespace_and_comments();
            if self.at_eof() {
                break;
            }

            if self.try_keyword(b"xref") {
                self.skip_to(b"trailer");
                continue;
            }
            if self.try_keyword(b"trailer") {
                let dict = self.parse_object()?;
                if let Object::Dictionary(dict) = dict {
                    // Incremental updates append newer trailers; later
                    // entries win.
                    for (key, value) in dict.entries() {
                        document.trailer_mut().set(key.clone(), value.clone());
                    }
                }
                continue;
            }
            if self.try_keyword(b"startxref") {
                self.skip_whitespace_and_comments();
                let _ = self.try_parse_unsigned();
                continue;
            }

            match self.try_parse_indirect()? {
                Some((id, object)) => {
                    // An xref stream doubles as the trailer.
                    if object.type_name() == Some("XRef") {
                        if let Some(dict) = object.dict() {
                            for key in ["Root", "Info", "ID", "Encrypt"] {
                                if let Some(value) = dict.get(key) {
                                    document.trailer_mut().set(key, value.clone());
                                }
                            }
                        }
                    }
                    document.set_object(id, object);
                }
                // Unrecognized byte: step over it and keep scanning.
                None => self.pos += 1,
            }
        }

        Ok(document)
    }

    fn error(&self, message: impl Into<String>) -> PdfError {
        PdfError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn read_header_version(&mut self) -> Option<String> {
        if !self.data.starts_with(b"%PDF-") {
            return None;
        }
        self.pos = 5;

        let start = self.pos;
        while self.peek().map(is_regular).unwrap_or(false) {
            self.pos += 1;
        }
        Some(String::from_utf8_lossy(&self.data[start..self.pos]).to_string())
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(byte) = self.peek() {
            if is_whitespace(byte) {
                self.pos += 1;
            } else if byte == b'%' {
                while let Some(b) = self.peek() {
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Consume a keyword if it is next and properly delimited.
    fn try_keyword(&mut self, keyword: &[u8]) -> bool {
        if !self.data[self.pos.min(self.data.len())..].starts_with(keyword) {
            return false;
        }
        if self
            .peek_at(keyword.len())
            .map(is_regular)
            .unwrap_or(false)
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn try_parse_unsigned(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Advance to the next occurrence of `needle`, or to the end of input.
    fn skip_to(&mut self, needle: &[u8]) {
        let remaining = &self.data[self.pos.min(self.data.len())..];
        match remaining
            .windows(needle.len())
            .position(|window| window == needle)
        {
            Some(offset) => self.pos += offset,
            None => self.pos = self.data.len(),
        }
    }

    fn try_parse_indirect(&mut self) -> Result<Option<(ObjectId, Object)>> {
        let start = self.pos;

        let Some(number) = self.try_parse_unsigned() else {
            return Ok(None);
        };
        self.skip_whitespace_and_comments();
        let Some(generation) = self.try_parse_unsigned() else {
            self.pos = start;
            return Ok(None);
        };
        self.skip_whitespace_and_comments();
        if !self.try_keyword(b"obj") {
            self.pos = start;
            return Ok(None);
        }

        let mut object = self.parse_object()?;

        self.skip_whitespace_and_comments();
        if self.try_keyword(b"stream") {
            let Object::Dictionary(dict) = object else {
                return Err(self.error("stream keyword without a dictionary"));
            };

            // The keyword is followed by CRLF or LF.
            if self.peek() == Some(b'\r') {
                self.pos += 1;
            }
            if self.peek() == Some(b'\n') {
                self.pos += 1;
            }

            let data = self.read_stream_data(&dict);
            object = Object::Stream(dict, data);
            self.skip_whitespace_and_comments();
            self.try_keyword(b"endstream");
        }

        self.skip_whitespace_and_comments();
        self.try_keyword(b"endobj");

        Ok(Some((
            ObjectId::new(number as u32, generation as u16),
            object,
        )))
    }

    /// Read stream payload bytes. A plausible `/Length` is trusted after
    /// verifying `endstream` follows; otherwise the payload runs to the next
    /// `endstream` keyword.
    fn read_stream_data(&mut self, dict: &Dictionary) -> Vec<u8> {
        if let Some(length) = dict.get_integer("Length") {
            if length >= 0 {
                let end = self.pos + length as usize;
                if end <= self.data.len() {
                    let save = self.pos;
                    self.pos = end;
                    let mut lookahead = self.pos;
                    while self.data.get(lookahead).copied().map(is_whitespace).unwrap_or(false) {
                        lookahead += 1;
                    }
                    if self.data[lookahead.min(self.data.len())..].starts_with(b"endstream") {
                        return self.data[save..end].to_vec();
                    }
                    self.pos = save;
                }
            }
        }

        // Length missing, indirect, or wrong: scan for the keyword.
        let start = self.pos;
        self.skip_to(b"endstream");
        let mut end = self.pos;

        // Strip the end-of-line that precedes the keyword.
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }

        self.data[start..end].to_vec()
    }

    fn parse_object(&mut self) -> Result<Object> {
        self.skip_whitespace_and_comments();

        match self.peek().ok_or_else(|| self.error("unexpected end of input"))? {
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.parse_dictionary()
                } else {
                    self.parse_hex_string()
                }
            }
            b'(' => self.parse_literal_string(),
            b'/' => self.parse_name(),
            b'[' => self.parse_array(),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.parse_number_or_reference(),
            _ => {
                if self.try_keyword(b"true") {
                    Ok(Object::Boolean(true))
                } else if self.try_keyword(b"false") {
                    Ok(Object::Boolean(false))
                } else if self.try_keyword(b"null") {
                    Ok(Object::Null)
                } else {
                    Err(self.error("unrecognized object"))
                }
            }
        }
    }

    fn parse_dictionary(&mut self) -> Result<Object> {
        self.pos += 2; // <<
        let mut dict = Dictionary::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.peek() == Some(b'>') && self.peek_at(1) == Some(b'>') {
                self.pos += 2;
                break;
            }
            if self.at_eof() {
                return Err(self.error("unterminated dictionary"));
            }

            let key = match self.parse_name()? {
                Object::Name(name) => name,
                _ => unreachable!(),
            };
            let value = self.parse_object()?;
            dict.set(key, value);
        }

        Ok(Object::Dictionary(dict))
    }

    fn parse_array(&mut self) -> Result<Object> {
        self.pos += 1; // [
        let mut items = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }
            if self.at_eof() {
                return Err(self.error("unterminated array"));
            }
            items.push(self.parse_object()?);
        }

        Ok(Object::Array(items))
    }

    fn parse_name(&mut self) -> Result<Object> {
        if self.peek() != Some(b'/') {
            return Err(self.error("expected name"));
        }
        self.pos += 1;

        let mut bytes = Vec::new();
        while let Some(byte) = self.peek() {
            if !is_regular(byte) {
                break;
            }
            self.pos += 1;

            if byte == b'#' {
                let high = self.peek().and_then(hex_value);
                let low = self.peek_at(1).and_then(hex_value);
                if let (Some(high), Some(low)) = (high, low) {
                    bytes.push(high << 4 | low);
                    self.pos += 2;
                    continue;
                }
            }
            bytes.push(byte);
        }

        Ok(Object::Name(String::from_utf8_lossy(&bytes).to_string()))
    }

    fn parse_hex_string(&mut self) -> Result<Object> {
        self.pos += 1; // <
        let mut nibbles = Vec::new();

        loop {
            let byte = self.peek().ok_or_else(|| self.error("unterminated hex string"))?;
            self.pos += 1;

            if byte == b'>' {
                break;
            }
            if is_whitespace(byte) {
                continue;
            }
            nibbles.push(
                hex_value(byte).ok_or_else(|| self.error("invalid hex digit in string"))?,
            );
        }

        // An odd final digit acts as if followed by zero.
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }

        let bytes = nibbles
            .chunks_exact(2)
            .map(|pair| pair[0] << 4 | pair[1])
            .collect();
        Ok(Object::String(bytes))
    }

    fn parse_literal_string(&mut self) -> Result<Object> {
        self.pos += 1; // (
        let mut bytes = Vec::new();
        let mut depth = 1usize;

        loop {
            let byte = self
                .peek()
                .ok_or_else(|| self.error("unterminated literal string"))?;
            self.pos += 1;

            match byte {
                b'(' => {
                    depth += 1;
                    bytes.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    bytes.push(byte);
                }
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += 1;

                    match escaped {
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0C),
                        b'(' | b')' | b'\\' => bytes.push(escaped),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(digit @ b'0'..=b'7') => {
                                        value = value * 8 + (digit - b'0') as u16;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            bytes.push(value as u8);
                        }
                        // Escaped end-of-line continues the string.
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        other => bytes.push(other),
                    }
                }
                _ => bytes.push(byte),
            }
        }

        Ok(Object::String(bytes))
    }

    fn parse_number_or_reference(&mut self) -> Result<Object> {
        let number = self.parse_number()?;

        if let Object::Integer(value) = number {
            if value >= 0 {
                let save = self.pos;
                self.skip_whitespace_and_comments();
                if let Some(generation) = self.try_parse_unsigned() {
                    self.skip_whitespace_and_comments();
                    if self.try_keyword(b"R") {
                        return Ok(Object::Reference(ObjectId::new(
                            value as u32,
                            generation as u16,
                        )));
                    }
                }
                self.pos = save;
            }
        }

        Ok(number)
    }

    fn parse_number(&mut self) -> Result<Object> {
        let start = self.pos;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }

        let mut saw_dot = false;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_digit() {
                self.pos += 1;
            } else if byte == b'.' && !saw_dot {
                saw_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        if text.is_empty() || text == "+" || text == "-" || text == "." {
            return Err(self.error("invalid number"));
        }

        if saw_dot {
            text.parse::<f64>()
                .map(Object::Real)
                .map_err(|_| self.error("invalid real number"))
        } else {
            text.parse::<i64>()
                .map(Object::Integer)
                .map_err(|_| self.error("integer out of range"))
        }
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
