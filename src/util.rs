//! Small text helpers shared by the models and the command line tool.

/// Percent-escape characters not allowed in a URI. Reserved characters and
/// existing escapes are kept, so fixing an already valid URI is a no-op.
pub fn fix_uri(uri: &str) -> String {
    let mut fixed = String::with_capacity(uri.len());
    for b in uri.bytes() {
        if is_uri_safe(b) {
            fixed.push(b as char);
        } else {
            fixed.push_str(&format!("%{:02X}", b));
        }
    }
    fixed
}

fn is_uri_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-._~:/?#[]@!$&'()*+,;=%".contains(&b)
}

/// Expand tabs to the next multiple of `width` columns.
pub fn expand_tabs(line: &str, width: usize) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        match c {
            '\t' if width > 0 => {
                let pad = width - column % width;
                expanded.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                expanded.push(c);
                column = 0;
            }
            c => {
                expanded.push(c);
                column += 1;
            }
        }
    }
    expanded
}

/// Make text safe to print on a terminal: zone separators and other control
/// characters become `^X` notation, newlines are kept.
pub fn display_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            c if (c as u32) < 0x20 => {
                out.push('^');
                out.push(char::from(b'@' + c as u8));
            }
            '\x7f' => out.push_str("^?"),
            c => out.push(c),
        }
    }
    out
}
