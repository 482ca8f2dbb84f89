//! Textual query-parameter substitution. `{name:Type}` placeholders
//! outside string literals are replaced with ClickHouse literals rendered
//! from the bound values; the declared type must at least parse.

use crate::column::Value;
use crate::error::{Error, Result};
use crate::types::parse_type;

/// Insertion-ordered parameter bag.
#[derive(Debug, Clone, Default)]
pub struct Params {
    items: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.items.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces every placeholder in `query` with a rendered literal.
    pub fn substitute(&self, query: &str) -> Result<String> {
        if self.is_empty() && !query.contains('{') {
            return Ok(query.to_string());
        }

        let mut out = String::with_capacity(query.len());
        let mut chars = query.char_indices().peekable();
        let mut in_string = false;
        while let Some((pos, c)) = chars.next() {
            match c {
                '\\' if in_string => {
                    out.push(c);
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '\'' => {
                    in_string = !in_string;
                    out.push(c);
                }
                '{' if !in_string => {
                    let rest = &query[pos + 1..];
                    let close = rest.find('}').ok_or_else(|| {
                        Error::NotSupported(format!(
                            "unterminated query parameter at offset {pos}"
                        ))
                    })?;
                    let placeholder = &rest[..close];
                    out.push_str(&self.render(placeholder)?);
                    // Consume up to and including the closing brace.
                    while let Some(&(next_pos, _)) = chars.peek() {
                        if next_pos > pos + close + 1 {
                            break;
                        }
                        chars.next();
                    }
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }

    fn render(&self, placeholder: &str) -> Result<String> {
        let (name, type_str) = placeholder.split_once(':').ok_or_else(|| {
            Error::NotSupported(format!("malformed query parameter `{{{placeholder}}}`"))
        })?;
        let name = name.trim();
        let type_str = type_str.trim();
        // The declared type must be a valid expression even though the
        // substitution is textual.
        parse_type(type_str)?;
        let value = self.get(name).ok_or_else(|| {
            Error::NotSupported(format!("no value bound for query parameter `{name}`"))
        })?;
        Ok(value.render_literal())
    }
}
