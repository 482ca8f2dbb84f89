//! Recursive-descent parser for the textual type grammar:
//!
//! ```text
//! type      := ident ( '(' args ')' )?
//! args      := arg (',' arg)*
//! arg       := type | quoted_string ('=' integer)? | integer | named_arg
//! named_arg := (ident | backticked | quoted_string) type
//! ```
//!
//! Whitespace between tokens is ignored. Unknown string escapes pass
//! through with their backslash intact, matching server-rendered enum keys.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::info::{TypeArg, TypeInfo};

pub fn parse(input: &str) -> Result<TypeInfo> {
    let mut p = Parser {
        src: input,
        bytes: input.as_bytes(),
        pos: 0,
    };
    let t = p.parse_type()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return Err(p.fail("unexpected trailing characters"));
    }
    Ok(t)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn fail(&self, reason: &str) -> Error {
        Error::MalformedTypeName {
            name: self.src.to_string(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn parse_type(&mut self) -> Result<TypeInfo> {
        self.skip_ws();
        let name = self.parse_ident()?;
        self.skip_ws();

        if self.peek() != Some(b'(') {
            return Ok(TypeInfo::new(name, Vec::new(), Vec::new()));
        }
        self.pos += 1;

        let mut generics = Vec::new();
        let mut args = Vec::new();
        loop {
            let arg = self.parse_arg()?;
            match &arg {
                TypeArg::Type(t) | TypeArg::NamedType(_, t) => generics.push(Arc::clone(t)),
                _ => {}
            }
            args.push(arg);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.fail("expected `,` or `)`")),
            }
        }
        Ok(TypeInfo::new(name, generics, args))
    }

    fn parse_arg(&mut self) -> Result<TypeArg> {
        self.skip_ws();
        match self.peek() {
            Some(b'\'') => {
                let s = self.parse_quoted(b'\'')?;
                self.skip_ws();
                match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        let value = self.parse_int()?;
                        Ok(TypeArg::EnumMember(s, value))
                    }
                    Some(c) if is_ident_start(c) => {
                        let ty = self.parse_type()?;
                        Ok(TypeArg::NamedType(s, Arc::new(ty)))
                    }
                    _ => Ok(TypeArg::Str(s)),
                }
            }
            Some(b'`') => {
                let name = self.parse_quoted(b'`')?;
                let ty = self.parse_type()?;
                Ok(TypeArg::NamedType(name, Arc::new(ty)))
            }
            Some(c) if c == b'-' || c.is_ascii_digit() => Ok(TypeArg::Int(self.parse_int()?)),
            Some(c) if is_ident_start(c) => {
                let ty = self.parse_type()?;
                self.skip_ws();
                if matches!(self.peek(), Some(c) if is_ident_start(c)) {
                    // The ident just parsed was a tuple-element name.
                    if !ty.args.is_empty() {
                        return Err(self.fail("parametric type used as a tuple-element name"));
                    }
                    let real = self.parse_type()?;
                    return Ok(TypeArg::NamedType(ty.name, Arc::new(real)));
                }
                Ok(TypeArg::Type(Arc::new(ty)))
            }
            _ => Err(self.fail("expected a type argument")),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => self.pos += 1,
            _ => return Err(self.fail("expected an identifier")),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_int(&mut self) -> Result<i64> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.fail("expected an integer"));
        }
        self.src[start..self.pos]
            .parse::<i64>()
            .map_err(|_| self.fail("integer argument overflows"))
    }

    /// Quoted literal delimited by `quote`; backslash escapes `\t` `\n`
    /// `\r`, the quote character and the backslash itself, and passes any
    /// other escaped character through with its backslash.
    fn parse_quoted(&mut self, quote: u8) -> Result<String> {
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fail("unterminated quoted literal")),
                Some(b'\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        return Err(self.fail("unterminated escape"));
                    };
                    match escaped {
                        b't' if quote == b'\'' => out.push('\t'),
                        b'n' if quote == b'\'' => out.push('\n'),
                        b'r' if quote == b'\'' => out.push('\r'),
                        b'\\' => out.push('\\'),
                        c if c == quote => out.push(quote as char),
                        _ => {
                            out.push('\\');
                            // Escaped char may be multi-byte; copy it whole.
                            let rest = &self.src[self.pos..];
                            let c = rest.chars().next().ok_or_else(|| self.fail("bad escape"))?;
                            out.push(c);
                            self.pos += c.len_utf8() - 1;
                        }
                    }
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => {
                    let rest = &self.src[self.pos..];
                    let c = rest
                        .chars()
                        .next()
                        .ok_or_else(|| self.fail("invalid utf-8"))?;
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}
