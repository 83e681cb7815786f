//! Finding `${ ... }` spans in configuration strings
//!
//! A regex cannot balance braces, so spans are found with a single pass that
//! tracks brace depth and whether it is inside a quoted string. Braces inside
//! quotes are not counted, which allows table constructors and quoted braces
//! inside an expression.

use crate::error::{ExpressionError, ExpressionResult};

/// One `${ ... }` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the `$`
    pub start: usize,
    /// Byte offset one past the closing `}`
    pub end: usize,
    /// Text between `${` and the closing `}`
    pub inner: String,
}

/// Find every `${ ... }` span in `s`, left to right.
///
/// Fails if a `${` is never closed.
pub fn find_spans(s: &str) -> ExpressionResult<Vec<Span>> {
    let bytes = s.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' {
            let close = find_close(bytes, i + 2).ok_or(ExpressionError::Unterminated(i))?;
            spans.push(Span {
                start: i,
                end: close + 1,
                inner: s[i + 2..close].to_string(),
            });
            i = close + 1;
        } else {
            i += 1;
        }
    }

    Ok(spans)
}

/// Position of the `}` that balances an already-open `{`, starting at `from`
fn find_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, &b) in bytes[from..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset);
                }
            }
            _ => {}
        }
    }

    None
}
