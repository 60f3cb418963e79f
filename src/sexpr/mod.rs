//! S-expression values exchanged with djvused.
//!
//! Hidden text, annotations and outlines all travel as s-expressions made of
//! symbols, integers, strings and lists. [`Expr`] is the owned value type;
//! [`parse`] and [`parse_all`] read djvused output and the [`fmt::Display`]
//! implementation writes text djvused accepts back.
//!
//! ```
//! use redjvu::sexpr::{self, Expr};
//!
//! let expr = sexpr::parse("(word 0 0 30 10 \"foo\")").unwrap();
//! assert_eq!(expr.head_symbol(), Some("word"));
//! assert_eq!(expr.to_string(), "(word 0 0 30 10 \"foo\")");
//! ```

mod parser;

pub use parser::{parse, parse_all};

use serde::Serialize;
use std::fmt::{self, Write as _};

/// A single s-expression value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Expr {
    /// A bare symbol such as `page`, `maparea` or `#FF0000`.
    Symbol(String),
    /// A decimal integer.
    Int(i64),
    /// A string literal, decoded to UTF-8.
    Str(String),
    /// A parenthesised list.
    List(Vec<Expr>),
}

impl Expr {
    /// Create a symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// Create a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    /// Create a list.
    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::List(items.into_iter().collect())
    }

    /// Create a list whose first element is the symbol `head`.
    pub fn tagged(head: &str, rest: impl IntoIterator<Item = Expr>) -> Self {
        let mut items = vec![Expr::symbol(head)];
        items.extend(rest);
        Expr::List(items)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check whether this is the symbol `name`.
    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }

    /// Get the leading symbol of a list, e.g. `maparea` for `(maparea ...)`.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(Expr::as_symbol)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Int(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Str(s.to_string())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(s) if needs_bars(s) => write!(f, "|{}|", s),
            Expr::Symbol(s) => f.write_str(s),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Str(s) => write_string(f, s),
            Expr::List(items) => {
                f.write_char('(')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(')')
            }
        }
    }
}

/// Symbols that would not read back as the same bare symbol.
fn needs_bars(s: &str) -> bool {
    s.is_empty()
        || s.parse::<i64>().is_ok()
        || s
            .bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"' | b'|' | b';'))
}

/// Write a string literal. Control characters are escaped so a serialized
/// expression never spans more than one line of a djvused script.
fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\x0c' => f.write_str("\\f")?,
            '\x0b' => f.write_str("\\v")?,
            c if (c as u32) < 0x20 || c == '\x7f' => write!(f, "\\{:03o}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
