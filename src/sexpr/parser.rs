//! Reader for djvused-flavoured s-expressions.

use super::Expr;
use crate::error::{Error, Result};

/// Parse exactly one expression. Surrounding whitespace and `;` comments are
/// allowed, anything else after the expression is an error.
pub fn parse(input: &str) -> Result<Expr> {
    let mut reader = Reader::new(input);
    let expr = reader
        .next_expr()?
        .ok_or_else(|| reader.error("expected an expression"))?;
    if reader.next_expr()?.is_some() {
        return Err(reader.error("trailing data after expression"));
    }
    Ok(expr)
}

/// Parse a sequence of top-level expressions, such as `print-ant` output.
pub fn parse_all(input: &str) -> Result<Vec<Expr>> {
    let mut reader = Reader::new(input);
    let mut exprs = Vec::new();
    while let Some(expr) = reader.next_expr()? {
        exprs.push(expr);
    }
    Ok(exprs)
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Syntax {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b';' {
                while let Some(b) = self.peek() {
                    self.pos += 1;
                    if b == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_expr(&mut self) -> Result<Option<Expr>> {
        self.skip_blank();
        match self.peek() {
            None => Ok(None),
            Some(b')') => Err(self.error("unbalanced ')'")),
            Some(_) => self.expr().map(Some),
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        self.skip_blank();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'(') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_blank();
                    match self.peek() {
                        None => return Err(self.error("unterminated list")),
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(Expr::List(items));
                        }
                        Some(_) => items.push(self.expr()?),
                    }
                }
            }
            Some(b')') => Err(self.error("unbalanced ')'")),
            Some(b'"') => self.string(),
            Some(b'|') => self.quoted_symbol(),
            Some(_) => Ok(self.atom()),
        }
    }

    fn string(&mut self) -> Result<Expr> {
        // Escapes may encode raw bytes, so collect bytes and decode at the end.
        let start = self.pos;
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            let b = match self.peek() {
                Some(b) => b,
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
            };
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => self.escape(&mut bytes)?,
                _ => bytes.push(b),
            }
        }
        Ok(Expr::Str(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn escape(&mut self, bytes: &mut Vec<u8>) -> Result<()> {
        let b = self
            .peek()
            .ok_or_else(|| self.error("unterminated escape sequence"))?;
        self.pos += 1;
        let decoded = match b {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'\n' => return Ok(()),
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                (value & 0xff) as u8
            }
            b'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match self.peek().and_then(|d| (d as char).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            self.pos += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return Err(self.error("\\x escape without hex digits"));
                }
                value as u8
            }
            other => other,
        };
        bytes.push(decoded);
        Ok(())
    }

    fn quoted_symbol(&mut self) -> Result<Expr> {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'|' {
                let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok(Expr::Symbol(name));
            }
            self.pos += 1;
        }
        Err(self.error("unterminated |symbol|"))
    }

    fn atom(&mut self) -> Expr {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"') {
                break;
            }
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        if is_integer(&text) {
            if let Ok(n) = text.parse::<i64>() {
                return Expr::Int(n);
            }
        }
        Expr::Symbol(text)
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let expr = parse("(page 0 0 100 50\n (line 0 0 100 50 (word 0 0 30 10 \"foo\")))").unwrap();
        let items = expr.as_list().unwrap();
        assert_eq!(items.len(), 6);
        assert!(items[0].is_symbol("page"));
        assert_eq!(items[3].as_int(), Some(100));
        assert_eq!(items[5].head_symbol(), Some("line"));
    }

    #[test]
    fn test_parse_escapes() {
        let expr = parse(r#""a\"b\\c\nd\037e\x41""#).unwrap();
        assert_eq!(expr.as_str(), Some("a\"b\\c\nd\x1feA"));
    }

    #[test]
    fn test_parse_octal_utf8_bytes() {
        // djvused without -u escapes UTF-8 bytes one by one.
        let expr = parse(r#""\305\274""#).unwrap();
        assert_eq!(expr.as_str(), Some("ż"));
    }

    #[test]
    fn test_parse_symbols_and_numbers() {
        let exprs = parse_all("(hilite #FF00ff) (opacity -5) 12abc ; comment\n|two words|").unwrap();
        assert_eq!(exprs.len(), 4);
        assert_eq!(exprs[0].as_list().unwrap()[1].as_symbol(), Some("#FF00ff"));
        assert_eq!(exprs[1].as_list().unwrap()[1].as_int(), Some(-5));
        assert_eq!(exprs[2].as_symbol(), Some("12abc"));
        assert_eq!(exprs[3].as_symbol(), Some("two words"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("(a b"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("a)"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("\"abc"), Err(Error::Syntax { .. })));
        assert!(matches!(parse(""), Err(Error::Syntax { .. })));
        assert!(matches!(parse("a b"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_parse_all_empty() {
        assert!(parse_all("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_serialized_text_reads_back() {
        let original = Expr::tagged(
            "word",
            [
                1.into(),
                Expr::string("tab\there \x0c \u{7f} \"quoted\" ąę"),
            ],
        );
        let reparsed = parse(&original.to_string()).unwrap();
        assert_eq!(reparsed, original);
    }
}
