use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::types::parser;

/// Scalar or type-valued argument of a parametric type.
///
/// A wrapper's inner type shows up twice on purpose: once in `generics`
/// (structural children) and once here as [`TypeArg::Type`] (the declared
/// argument list); `Decimal(19, 6)` has two scalar args and no generics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Int(i64),
    Str(String),
    Type(Arc<TypeInfo>),
    NamedType(String, Arc<TypeInfo>),
    EnumMember(String, i64),
}

/// One node of a parsed type expression. Interned and immutable; shared
/// freely across sessions.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeInfo {
    /// Canonical base name, e.g. `Array`, `Int32`, `DateTime64`.
    pub name: String,
    /// Canonical rendering of the whole expression; parsing it again
    /// reproduces this string byte-for-byte.
    pub full_name: String,
    pub generics: Vec<Arc<TypeInfo>>,
    pub args: Vec<TypeArg>,
}

impl TypeInfo {
    pub fn new(name: String, generics: Vec<Arc<TypeInfo>>, args: Vec<TypeArg>) -> Self {
        let full_name = render(&name, &args);
        Self {
            name,
            full_name,
            generics,
            args,
        }
    }

    pub fn generic(&self, i: usize) -> Result<&Arc<TypeInfo>> {
        self.generics
            .get(i)
            .ok_or_else(|| Error::TypeNotFullySpecified(self.full_name.clone()))
    }

    pub fn int_arg(&self, i: usize) -> Option<i64> {
        match self.args.get(i) {
            Some(TypeArg::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_arg(&self, i: usize) -> Option<&str> {
        match self.args.get(i) {
            Some(TypeArg::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn enum_members(&self) -> impl Iterator<Item = (&str, i64)> {
        self.args.iter().filter_map(|arg| match arg {
            TypeArg::EnumMember(name, value) => Some((name.as_str(), *value)),
            _ => None,
        })
    }

    /// Element names of a named tuple, `None` for the positional form.
    pub fn tuple_names(&self) -> Option<Vec<&str>> {
        let names: Vec<&str> = self
            .args
            .iter()
            .filter_map(|arg| match arg {
                TypeArg::NamedType(name, _) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if names.len() == self.args.len() && !names.is_empty() {
            Some(names)
        } else {
            None
        }
    }
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Single-quoted literal with the escapes the parser understands.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn quote_tuple_name(s: &str) -> String {
    if is_plain_ident(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('`');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            other => out.push(other),
        }
    }
    out.push('`');
    out
}

/// Canonical rendering: single space after each comma, spaces around the
/// enum `=`, no space inside parentheses.
fn render(name: &str, args: &[TypeArg]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let mut out = String::from(name);
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match arg {
            TypeArg::Int(v) => out.push_str(&v.to_string()),
            TypeArg::Str(s) => out.push_str(&quote_string(s)),
            TypeArg::Type(t) => out.push_str(&t.full_name),
            TypeArg::NamedType(n, t) => {
                out.push_str(&quote_tuple_name(n));
                out.push(' ');
                out.push_str(&t.full_name);
            }
            TypeArg::EnumMember(key, value) => {
                out.push_str(&quote_string(key));
                out.push_str(" = ");
                out.push_str(&value.to_string());
            }
        }
    }
    out.push(')');
    out
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<TypeInfo>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Parses a textual type expression through the process-wide intern table.
/// Both the spelling received and the canonical rendering become keys, so
/// repeated columns of the same type share one node.
pub fn parse_type(input: &str) -> Result<Arc<TypeInfo>> {
    {
        let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
        if let Some(t) = registry.get(input) {
            return Ok(Arc::clone(t));
        }
    }
    let parsed = Arc::new(parser::parse(input)?);
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    let interned = registry
        .entry(parsed.full_name.clone())
        .or_insert_with(|| Arc::clone(&parsed))
        .clone();
    registry.insert(input.to_string(), Arc::clone(&interned));
    Ok(interned)
}
