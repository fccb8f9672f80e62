//! Smalltalk literal parsing
//!
//! Recipe directives carry their arguments as Smalltalk literals: strings
//! are `'…'` with `''` escaping a quote, symbols are `#` followed by a
//! string literal. Nothing else is recognized.

/// Parse a complete Smalltalk string literal, rejecting trailing content
pub fn parse_string_literal(text: &str) -> Result<String, String> {
    let mut chars = text.chars();
    if chars.next() != Some('\'') {
        return Err("expected a string literal starting with '".to_string());
    }

    let mut out = String::new();
    let mut closed = false;
    while let Some(c) = chars.next() {
        if c == '\'' {
            match chars.next() {
                Some('\'') => out.push('\''),
                Some(extra) => {
                    return Err(format!("unexpected '{}' after closing quote", extra));
                }
                None => {
                    closed = true;
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }

    if closed {
        Ok(out)
    } else {
        Err("unterminated string literal".to_string())
    }
}

/// Parse a symbol literal of the form `#'…'`
pub fn parse_symbol_literal(text: &str) -> Result<String, String> {
    match text.strip_prefix('#') {
        Some(rest) => parse_string_literal(rest),
        None => Err("expected a symbol literal starting with #".to_string()),
    }
}

/// Encode a string back into Smalltalk literal syntax
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
