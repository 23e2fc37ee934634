// literal.rs — Parser for the value literals the REPL echoes back.
//
// The remote procedures return Python values and the console prints
// their repr: lists, dicts, quoted strings, bytes literals, None. The
// host side needs that data as structure, and evaluating remote-produced
// text is not an option — so this is a small recursive-descent parser
// over exactly the grammar the echo can produce. Anything outside it is
// a malformed response, reported as an error, never a panic.

use crate::error::ReplError;
use crate::remote_fs::{EntryKind, RemoteEntry};

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    None,
    List(Vec<Value>),
    Dict(Vec<(String, Value)>),
}

/// Parse the bracketed record sequence produced by
/// `list_files_recursively` into directory entries.
pub fn parse_entries(input: &str) -> Result<Vec<RemoteEntry>, ReplError> {
    let value = parse(input)?;
    let Value::List(items) = value else {
        return Err(malformed("expected a list of records"));
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let Value::Dict(fields) = item else {
            return Err(malformed("expected a record dict"));
        };
        entries.push(entry_from_fields(fields)?);
    }
    Ok(entries)
}

fn entry_from_fields(fields: Vec<(String, Value)>) -> Result<RemoteEntry, ReplError> {
    let mut path = None;
    let mut kind = None;
    let mut contents = None;

    for (key, value) in fields {
        match (key.as_str(), value) {
            ("path", Value::Str(p)) => path = Some(p),
            ("type", Value::Str(t)) => {
                kind = Some(match t.as_str() {
                    "file" => EntryKind::File,
                    "directory" => EntryKind::Directory,
                    other => return Err(malformed(&format!("unknown entry type {other:?}"))),
                })
            }
            ("contents", Value::Bytes(b)) => contents = Some(b),
            ("contents", Value::None) => contents = None,
            (key, value) => {
                return Err(malformed(&format!(
                    "unexpected record field {key:?} = {value:?}"
                )))
            }
        }
    }

    match (path, kind) {
        (Some(path), Some(kind)) => Ok(RemoteEntry {
            path,
            kind,
            contents,
        }),
        _ => Err(malformed("record missing 'path' or 'type'")),
    }
}

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse(input: &str) -> Result<Value, ReplError> {
    let mut p = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    let value = p.value()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return Err(malformed("trailing data after literal"));
    }
    Ok(value)
}

/// Decode a bytes literal (`b'..'` or `b".."`) to raw bytes.
pub fn unescape_bytes(input: &str) -> Result<Vec<u8>, ReplError> {
    match parse(input)? {
        Value::Bytes(b) => Ok(b),
        _ => Err(malformed("expected a bytes literal")),
    }
}

/// Render raw bytes as a Python bytes literal safe to embed in a
/// command line: quotes, backslashes, control bytes and non-ASCII all
/// escaped.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 3);
    out.push_str("b'");
    for &b in data {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}

fn malformed(reason: &str) -> ReplError {
    ReplError::Parse {
        reason: reason.to_string(),
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> Result<(), ReplError> {
        match self.bump() {
            Some(b) if b == expected => Ok(()),
            Some(b) => Err(malformed(&format!(
                "expected {:?}, found {:?} at offset {}",
                expected as char,
                b as char,
                self.pos - 1
            ))),
            None => Err(malformed("unexpected end of input")),
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.bytes[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Value, ReplError> {
        self.skip_ws();
        match self.peek() {
            Some(b'[') => self.list(),
            Some(b'{') => self.dict(),
            Some(b'\'') | Some(b'"') => Ok(Value::Str(self.quoted()?)),
            Some(b'b') if matches!(self.bytes.get(self.pos + 1), Some(b'\'' | b'"')) => {
                self.pos += 1;
                Ok(Value::Bytes(self.quoted_bytes()?))
            }
            Some(b'N' | b'T' | b'F') => self.keyword(),
            Some(b) if b == b'-' || b.is_ascii_digit() => self.int(),
            Some(b) => Err(malformed(&format!(
                "unexpected character {:?} at offset {}",
                b as char, self.pos
            ))),
            None => Err(malformed("unexpected end of input")),
        }
    }

    fn keyword(&mut self) -> Result<Value, ReplError> {
        if self.eat_keyword("None") {
            Ok(Value::None)
        } else if self.eat_keyword("True") {
            Ok(Value::Bool(true))
        } else if self.eat_keyword("False") {
            Ok(Value::Bool(false))
        } else {
            Err(malformed(&format!("unknown keyword at offset {}", self.pos)))
        }
    }

    fn list(&mut self) -> Result<Value, ReplError> {
        self.eat(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::List(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {}
                _ => return Err(malformed("expected ',' or ']' in list")),
            }
        }
    }

    fn dict(&mut self) -> Result<Value, ReplError> {
        self.eat(b'{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Dict(fields));
            }
            let key = self.quoted()?;
            self.skip_ws();
            self.eat(b':')?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {}
                _ => return Err(malformed("expected ',' or '}' in dict")),
            }
        }
    }

    fn int(&mut self) -> Result<Value, ReplError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        text.parse()
            .map(Value::Int)
            .map_err(|_| malformed("invalid integer"))
    }

    fn quoted(&mut self) -> Result<String, ReplError> {
        let raw = self.quoted_bytes()?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Body of a quoted literal with Python escape sequences decoded.
    /// Unknown escapes keep the backslash, matching how the REPL's repr
    /// round-trips them.
    fn quoted_bytes(&mut self) -> Result<Vec<u8>, ReplError> {
        let quote = match self.bump() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(malformed("expected a quote")),
        };
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(malformed("unterminated string literal")),
                Some(b) if b == quote => return Ok(out),
                Some(b'\\') => match self.bump() {
                    None => return Err(malformed("unterminated escape sequence")),
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'0') => out.push(0),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'\'') => out.push(b'\''),
                    Some(b'"') => out.push(b'"'),
                    Some(b'x') => {
                        let hi = self.bump().ok_or_else(|| malformed("truncated \\x escape"))?;
                        let lo = self.bump().ok_or_else(|| malformed("truncated \\x escape"))?;
                        let pair = [hi, lo];
                        let text = std::str::from_utf8(&pair)
                            .map_err(|_| malformed("invalid \\x escape"))?;
                        let byte = u8::from_str_radix(text, 16)
                            .map_err(|_| malformed("invalid \\x escape"))?;
                        out.push(byte);
                    }
                    Some(other) => {
                        out.push(b'\\');
                        out.push(other);
                    }
                },
                Some(b) => out.push(b),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_without_contents() {
        // The shape documented by the remote procedure contract.
        let input = "[{'path': 'index.html', 'type': 'file', 'contents': None}, \
                     {'path': 'src', 'type': 'directory', 'contents': None}, \
                     {'path': 'src/testfile.txt', 'type': 'file', 'contents': None}]";
        let entries = parse_entries(input).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "index.html");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert!(entries[2].contents.is_none());
    }

    #[test]
    fn parses_listing_with_contents() {
        let input = "[{'path': 'a.txt', 'type': 'file', 'contents': b'hi\\n'}]";
        let entries = parse_entries(input).unwrap();
        assert_eq!(entries[0].contents.as_deref(), Some(b"hi\n".as_slice()));
    }

    #[test]
    fn empty_listing_is_valid() {
        assert!(parse_entries("[]").unwrap().is_empty());
    }

    #[test]
    fn key_order_does_not_matter() {
        let input = "[{'type': 'file', 'contents': None, 'path': 'x'}]";
        let entries = parse_entries(input).unwrap();
        assert_eq!(entries[0].path, "x");
    }

    #[test]
    fn rejects_non_list_input() {
        assert!(matches!(
            parse_entries("{'path': 'x'}"),
            Err(ReplError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_truncated_listing() {
        assert!(parse_entries("[{'path': 'x', 'type': 'fi").is_err());
    }

    #[test]
    fn unescapes_bytes_literal() {
        assert_eq!(unescape_bytes(r"b'a\x00b\nc\\d\''").unwrap(), b"a\x00b\nc\\d'");
    }

    #[test]
    fn unescapes_double_quoted_bytes() {
        assert_eq!(unescape_bytes(r#"b"a\"b""#).unwrap(), b"a\"b");
    }

    #[test]
    fn unknown_escape_keeps_backslash() {
        assert_eq!(unescape_bytes(r"b'\q'").unwrap(), b"\\q");
    }

    #[test]
    fn escape_bytes_round_trips_through_unescape() {
        let data: Vec<u8> = (0u8..=255).collect();
        let literal = escape_bytes(&data);
        assert_eq!(unescape_bytes(&literal).unwrap(), data);
    }

    #[test]
    fn escape_bytes_quotes_and_backslashes() {
        assert_eq!(escape_bytes(b"a'b\\c"), r"b'a\'b\\c'");
    }

    #[test]
    fn parses_ints_and_bools() {
        assert_eq!(parse("[-3, 42, True, False]").unwrap(),
            Value::List(vec![
                Value::Int(-3),
                Value::Int(42),
                Value::Bool(true),
                Value::Bool(false),
            ]));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("[] oops").is_err());
    }
}
