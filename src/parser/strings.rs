//! String literal decoding
//!
//! The lexer only finds the extent of a literal. Here the raw lexeme is split
//! into literal segments and interpolation holes, and escapes are decoded.

use super::lexer::scan_interpolation;
use super::span::Span;
use crate::diagnostics::ErrorCode;

/// An interpolation hole inside a string literal
#[derive(Debug, Clone, PartialEq)]
pub enum Hole {
    /// `$name`
    Identifier { name: String, span: Span },
    /// `${ ... }`; offsets of the expression text between the braces
    Expr { start: usize, end: usize },
}

/// Decoded literal: `strings.len() == holes.len() + 1`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringParts {
    pub strings: Vec<String>,
    pub holes: Vec<Hole>,
}

impl StringParts {
    /// Append another adjacent literal; its first segment joins our last one
    pub fn append(&mut self, other: StringParts) {
        let mut strings = other.strings.into_iter();
        if let (Some(last), Some(first)) = (self.strings.last_mut(), strings.next()) {
            last.push_str(&first);
        }
        self.strings.extend(strings);
        self.holes.extend(other.holes);
    }
}

/// Decode the lexeme of a string literal starting at byte `offset`.
///
/// Malformed escapes and dangling `$` are pushed to `errors`; decoding
/// always produces a best-effort value.
pub fn decode(lexeme: &str, offset: usize, errors: &mut Vec<(ErrorCode, Span)>) -> StringParts {
    let bytes = lexeme.as_bytes();
    let raw = matches!(bytes.first(), Some(b'@') | Some(b'r'));
    let prefix = usize::from(raw);
    let quote = bytes.get(prefix).copied().unwrap_or(b'"');
    let triple = bytes.len() >= prefix + 3 && bytes[prefix..prefix + 3].iter().all(|b| *b == quote);
    let delim = if triple { 3 } else { 1 };
    let mut start = (prefix + delim).min(bytes.len());
    let closed = bytes.len() >= start + delim && bytes[bytes.len() - delim..].iter().all(|b| *b == quote);
    let end = if closed { bytes.len() - delim } else { bytes.len() };

    if triple {
        // a line break right after the opening quotes is not part of the value
        if lexeme[start..end].starts_with("\r\n") {
            start += 2;
        } else if lexeme[start..end].starts_with('\n') {
            start += 1;
        }
    }

    let mut parts = StringParts { strings: vec![String::new()], holes: Vec::new() };
    let content = &lexeme[start..end];
    if raw {
        parts.strings[0].push_str(content);
        return parts;
    }

    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let abs = offset + start + i;
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => push(&mut parts, '\n'),
                Some((_, 'r')) => push(&mut parts, '\r'),
                Some((_, 't')) => push(&mut parts, '\t'),
                Some((_, 'b')) => push(&mut parts, '\u{8}'),
                Some((_, 'f')) => push(&mut parts, '\u{C}'),
                Some((_, 'v')) => push(&mut parts, '\u{B}'),
                Some((_, 'x')) => {
                    let digits = take_hex(&mut chars, 2);
                    match decode_code_point(&digits, 2) {
                        Some(ch) => push(&mut parts, ch),
                        None => errors.push((ErrorCode::InvalidEscape(format!("\\x{}", digits)), Span::new(abs, 2 + digits.len()))),
                    }
                }
                Some((_, 'u')) => {
                    let (digits, braced) = if chars.peek().map(|(_, c)| *c) == Some('{') {
                        chars.next();
                        let digits = take_hex(&mut chars, 6);
                        let closed = chars.peek().map(|(_, c)| *c) == Some('}');
                        if closed {
                            chars.next();
                        }
                        (digits, closed)
                    } else {
                        (take_hex(&mut chars, 4), true)
                    };
                    let expected = if braced && digits.len() != 4 { digits.len().max(1) } else { 4 };
                    match decode_code_point(&digits, expected).filter(|_| braced) {
                        Some(ch) => push(&mut parts, ch),
                        None => errors.push((ErrorCode::InvalidEscape(format!("\\u{}", digits)), Span::new(abs, 2 + digits.len()))),
                    }
                }
                Some((_, other)) => push(&mut parts, other),
                None => errors.push((ErrorCode::InvalidEscape("\\".into()), Span::new(abs, 1))),
            },
            '$' => match chars.peek().map(|(_, c)| *c) {
                Some('{') => {
                    let hole_start = start + i + 2;
                    let close = match scan_interpolation(bytes, hole_start) {
                        Ok(past) => past.min(end + 1),
                        Err(stop) => stop + 1,
                    };
                    let hole_end = (close - 1).min(end).max(hole_start);
                    parts.holes.push(Hole::Expr { start: offset + hole_start, end: offset + hole_end });
                    parts.strings.push(String::new());
                    while chars.peek().map_or(false, |(j, _)| start + *j < close) {
                        chars.next();
                    }
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some((_, c)) = chars.peek().copied() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let span = Span::new(abs + 1, name.len());
                    parts.holes.push(Hole::Identifier { name, span });
                    parts.strings.push(String::new());
                }
                _ => {
                    errors.push((ErrorCode::InvalidInterpolation, Span::new(abs, 1)));
                    push(&mut parts, '$');
                }
            },
            other => push(&mut parts, other),
        }
    }
    parts
}

fn push(parts: &mut StringParts, c: char) {
    if let Some(last) = parts.strings.last_mut() {
        last.push(c);
    }
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, max: usize) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some((_, c)) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

fn decode_code_point(digits: &str, expected: usize) -> Option<char> {
    if digits.len() != expected {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}

/// Render `value` as a double-quoted literal that decodes back to `value`
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7F => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(lexeme: &str) -> (StringParts, Vec<(ErrorCode, Span)>) {
        let mut errors = Vec::new();
        let parts = decode(lexeme, 0, &mut errors);
        (parts, errors)
    }

    #[test]
    fn decodes_escapes() {
        let (p, errors) = parts(r#""a\n\t\$\x41B\u{1F600}\q""#);
        assert!(errors.is_empty());
        assert_eq!(p.strings, vec!["a\n\t$AB\u{1F600}q".to_string()]);
    }

    #[test]
    fn raw_and_triple_strings() {
        assert_eq!(parts(r#"@"a\n$x""#).0.strings, vec![r"a\n$x".to_string()]);
        assert_eq!(parts("'''\nline\n'''").0.strings, vec!["line\n".to_string()]);
    }

    #[test]
    fn splits_interpolation() {
        let (p, errors) = parts(r#""a $b c ${d + "}"} e""#);
        assert!(errors.is_empty());
        assert_eq!(p.strings, vec!["a ", " c ", " e"]);
        assert_eq!(p.holes.len(), 2);
        assert_eq!(p.holes[0], Hole::Identifier { name: "b".into(), span: Span::new(4, 1) });
        assert_eq!(p.holes[1], Hole::Expr { start: 10, end: 17 });
    }

    #[test]
    fn dangling_dollar_is_reported() {
        let (p, errors) = parts(r#""cost: $ 5""#);
        assert_eq!(p.strings, vec!["cost: $ 5"]);
        assert_eq!(errors[0].0, ErrorCode::InvalidInterpolation);
    }

    #[test]
    fn unterminated_literal_still_decodes() {
        let (p, _) = parts("'abc");
        assert_eq!(p.strings, vec!["abc"]);
    }

    #[test]
    fn quote_escapes_for_reparse() {
        assert_eq!(quote("a\"$\\\n"), r#""a\"\$\\\n""#);
    }
}
