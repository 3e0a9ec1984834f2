//! Tokenizer for the supported Java subset. Whitespace and comments are not
//! thrown away: every token carries the raw trivia that preceded it.

use quill_tree::{ParseError, SourceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    /// String, char, or numeric literal.
    Literal,
    Punct,
    Eof,
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub prefix: String,
    pub text: String,
    /// Byte offset of `text` within the source (diagnostics and raw slices).
    pub offset: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

pub(crate) fn lex(text: &str, source: &SourceId) -> Result<Vec<Token>, ParseError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut offset = 0usize;

    loop {
        let prefix_start = offset;
        offset = skip_trivia(text, offset, source)?;
        let prefix = text[prefix_start..offset].to_string();

        if offset >= bytes.len() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                prefix,
                text: String::new(),
                offset,
            });
            return Ok(tokens);
        }

        let start = offset;
        let c = bytes[offset];
        let kind = if is_ident_start(c) {
            offset += 1;
            while offset < bytes.len() && is_ident_part(bytes[offset]) {
                offset += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            offset = lex_number(bytes, offset);
            TokenKind::Literal
        } else if c == b'"' || c == b'\'' {
            offset = lex_quoted(bytes, offset, c).ok_or_else(|| {
                ParseError::at_offset(source.clone(), text, start, "unterminated literal")
            })?;
            TokenKind::Literal
        } else {
            // `...` is the only multi-byte punctuator this subset needs.
            if text[offset..].starts_with("...") {
                offset += 3;
            } else {
                offset += utf8_len(c);
            }
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            prefix,
            text: text[start..offset].to_string(),
            offset: start,
        });
    }
}

fn skip_trivia(text: &str, mut offset: usize, source: &SourceId) -> Result<usize, ParseError> {
    let bytes = text.as_bytes();
    loop {
        if offset < bytes.len() && (bytes[offset] as char).is_whitespace() {
            offset += utf8_len(bytes[offset]);
        } else if text[offset..].starts_with("//") {
            while offset < bytes.len() && bytes[offset] != b'\n' {
                offset += 1;
            }
        } else if text[offset..].starts_with("/*") {
            match text[offset + 2..].find("*/") {
                Some(i) => offset += 2 + i + 2,
                None => {
                    return Err(ParseError::at_offset(
                        source.clone(),
                        text,
                        offset,
                        "unterminated block comment",
                    ))
                }
            }
        } else {
            return Ok(offset);
        }
    }
}

fn lex_number(bytes: &[u8], mut offset: usize) -> usize {
    offset += 1;
    while offset < bytes.len() {
        let c = bytes[offset];
        if c.is_ascii_alphanumeric() || c == b'_' {
            offset += 1;
        } else if c == b'.' && offset + 1 < bytes.len() && bytes[offset + 1].is_ascii_digit() {
            offset += 1;
        } else {
            break;
        }
    }
    offset
}

fn lex_quoted(bytes: &[u8], mut offset: usize, quote: u8) -> Option<usize> {
    offset += 1;
    while offset < bytes.len() {
        match bytes[offset] {
            // The escaped character may be multi-byte; step over all of it
            // so the final slice stays on a char boundary.
            b'\\' => match bytes.get(offset + 1) {
                Some(&escaped) => offset += 1 + utf8_len(escaped),
                None => return None,
            },
            c if c == quote => return Some(offset + 1),
            c => offset += utf8_len(c),
        }
    }
    None
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_part(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b < 0xE0 => 2,
        b if b < 0xF0 => 3,
        _ => 4,
    }
}
