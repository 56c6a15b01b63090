//! Boundary splitting over raw JSON buffers. The splitter finds the byte
//! extents of top-level list elements or dict entries in a single linear
//! scan without materializing any values; the fragments are decoded later,
//! on demand.

use crate::error::DecodeError;

/// Byte extent of one element inside a larger buffer, trimmed of
/// surrounding whitespace. Slicing the original buffer with it yields a
/// standalone JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub offset: usize,
    pub length: usize,
}

impl Boundary {
    pub fn slice<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        &buf[self.offset..self.offset + self.length]
    }
}

/// Splits the JSON list at `buf[offset..offset + length]` into the
/// boundaries of its elements. Offsets in the result are absolute into
/// `buf`, so boundaries from nested splits all index the same buffer.
pub fn split_list(buf: &[u8], offset: usize, length: usize) -> Result<Vec<Boundary>, DecodeError> {
    let mut scanner = Scanner::new(buf, offset, length)?;
    scanner.skip_whitespace();
    scanner.expect(b'[')?;
    scanner.skip_whitespace();

    let mut boundaries = Vec::new();
    if scanner.peek() == Some(b']') {
        scanner.pos += 1;
        scanner.finish()?;
        return Ok(boundaries);
    }
    loop {
        boundaries.push(scanner.value()?);
        scanner.skip_whitespace();
        match scanner.bump() {
            Some(b',') => scanner.skip_whitespace(),
            Some(b']') => break,
            Some(other) => {
                return Err(scanner.malformed_at(
                    scanner.pos - 1,
                    format!("expected ',' or ']', found '{}'", other as char),
                ))
            }
            None => return Err(scanner.unterminated("list")),
        }
    }
    scanner.finish()?;
    Ok(boundaries)
}

/// Splits the JSON dict at `buf[offset..offset + length]` into its decoded
/// keys and the boundaries of the corresponding values.
pub fn split_dict(
    buf: &[u8],
    offset: usize,
    length: usize,
) -> Result<Vec<(String, Boundary)>, DecodeError> {
    let mut scanner = Scanner::new(buf, offset, length)?;
    scanner.skip_whitespace();
    scanner.expect(b'{')?;
    scanner.skip_whitespace();

    let mut entries = Vec::new();
    if scanner.peek() == Some(b'}') {
        scanner.pos += 1;
        scanner.finish()?;
        return Ok(entries);
    }
    loop {
        let key_extent = scanner.value()?;
        if buf[key_extent.offset] != b'"' {
            return Err(scanner.malformed_at(key_extent.offset, "expected string key"));
        }
        let key: String = serde_json::from_slice(key_extent.slice(buf)).map_err(|err| {
            scanner.malformed_at(key_extent.offset, format!("invalid key: {err}"))
        })?;

        scanner.skip_whitespace();
        scanner.expect(b':')?;
        scanner.skip_whitespace();
        entries.push((key, scanner.value()?));

        scanner.skip_whitespace();
        match scanner.bump() {
            Some(b',') => scanner.skip_whitespace(),
            Some(b'}') => break,
            Some(other) => {
                return Err(scanner.malformed_at(
                    scanner.pos - 1,
                    format!("expected ',' or '}}', found '{}'", other as char),
                ))
            }
            None => return Err(scanner.unterminated("dict")),
        }
    }
    scanner.finish()?;
    Ok(entries)
}

struct Scanner<'b> {
    buf: &'b [u8],
    pos: usize,
    end: usize,
}

impl<'b> Scanner<'b> {
    fn new(buf: &'b [u8], offset: usize, length: usize) -> Result<Self, DecodeError> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= buf.len())
            .ok_or(DecodeError::MalformedDocument {
                offset,
                message: "range exceeds buffer".to_string(),
            })?;
        Ok(Scanner {
            buf,
            pos: offset,
            end,
        })
    }

    fn peek(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.buf[self.pos])
        } else {
            None
        }
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), DecodeError> {
        match self.bump() {
            Some(found) if found == byte => Ok(()),
            Some(found) => Err(self.malformed_at(
                self.pos - 1,
                format!("expected '{}', found '{}'", byte as char, found as char),
            )),
            None => Err(self.malformed_at(self.pos, format!("expected '{}'", byte as char))),
        }
    }

    /// Consumes exactly one JSON value and returns its extent. Only the
    /// structure is checked; fragment contents are validated when decoded.
    fn value(&mut self) -> Result<Boundary, DecodeError> {
        let start = self.pos;
        match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                self.skip_string()?;
            }
            Some(b'[' | b'{') => {
                // Stack of expected closers, so a '}' can never close a '['.
                let mut stack: Vec<u8> = Vec::new();
                loop {
                    match self.bump() {
                        Some(b'"') => self.skip_string()?,
                        Some(b'[') => stack.push(b']'),
                        Some(b'{') => stack.push(b'}'),
                        Some(close @ (b']' | b'}')) => match stack.pop() {
                            Some(expected) if expected == close => {
                                if stack.is_empty() {
                                    break;
                                }
                            }
                            _ => {
                                return Err(self.malformed_at(
                                    self.pos - 1,
                                    format!("mismatched '{}'", close as char),
                                ))
                            }
                        },
                        Some(_) => {}
                        None => return Err(self.unterminated("value")),
                    }
                }
            }
            Some(_) => {
                // Number or bare literal: runs until a structural delimiter.
                while let Some(b) = self.peek() {
                    if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b':') {
                        break;
                    }
                    self.pos += 1;
                }
            }
            None => return Err(self.unterminated("value")),
        }
        Ok(Boundary {
            offset: start,
            length: self.pos - start,
        })
    }

    /// Consumes the remainder of a string whose opening quote has already
    /// been read. Backslashes consume the byte that follows, so escaped
    /// quotes never terminate the scan.
    fn skip_string(&mut self) -> Result<(), DecodeError> {
        loop {
            match self.bump() {
                Some(b'\\') => {
                    self.pos += 1;
                }
                Some(b'"') => return Ok(()),
                Some(_) => {}
                None => return Err(self.unterminated("string")),
            }
        }
    }

    /// Rejects any non-whitespace bytes after the closing bracket.
    fn finish(&mut self) -> Result<(), DecodeError> {
        self.skip_whitespace();
        if self.pos != self.end {
            return Err(self.malformed_at(self.pos, "unexpected trailing data"));
        }
        Ok(())
    }

    fn malformed_at(&self, offset: usize, message: impl Into<String>) -> DecodeError {
        DecodeError::MalformedDocument {
            offset,
            message: message.into(),
        }
    }

    fn unterminated(&self, what: &str) -> DecodeError {
        DecodeError::MalformedDocument {
            offset: self.end,
            message: format!("unterminated {what}"),
        }
    }
}
