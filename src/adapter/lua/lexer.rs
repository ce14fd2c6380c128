//! Lua tokenizer

use crate::adapter::framework::{Language, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Keyword,
    String,
    Number,
    Symbol,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Multi-byte symbols first so the longest match wins.
const SYMBOLS: &[&str] = &[
    "...", "..", "==", "~=", "<=", ">=", "<<", ">>", "//", "::", "+", "-", "*", "/", "%", "^", "#",
    "&", "~", "|", "<", ">", "=", "(", ")", "{", "}", "[", "]", ";", ":", ",", ".",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>, at: usize) -> ParseError {
        ParseError::new(Language::Lua, message, self.source, at)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        if self.bytes.starts_with(b"#!") {
            self.skip_line();
        }

        while let Some(b) = self.peek_at(0) {
            let start = self.pos;
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => self.pos += 1,
                b'-' if self.peek_at(1) == Some(b'-') => self.comment()?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    while matches!(self.peek_at(0), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                        self.pos += 1;
                    }
                    let kind = if KEYWORDS.contains(&&self.source[start..self.pos]) {
                        TokenKind::Keyword
                    } else {
                        TokenKind::Name
                    };
                    self.push(kind, start);
                }
                b'0'..=b'9' => {
                    self.number();
                    self.push(TokenKind::Number, start);
                }
                b'.' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                    self.number();
                    self.push(TokenKind::Number, start);
                }
                b'"' | b'\'' => {
                    self.short_string(b)?;
                    self.push(TokenKind::String, start);
                }
                b'[' if matches!(self.peek_at(1), Some(b'[') | Some(b'=')) && self.long_bracket_level().is_some() => {
                    self.long_bracket()?;
                    self.push(TokenKind::String, start);
                }
                _ => {
                    let rest = &self.source[start..];
                    match SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
                        Some(symbol) => {
                            self.pos += symbol.len();
                            self.push(TokenKind::Symbol, start);
                        }
                        None => {
                            let shown = rest.chars().next().unwrap_or('?');
                            return Err(self.error(format!("unexpected symbol '{}'", shown), start));
                        }
                    }
                }
            }
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            start: self.bytes.len(),
            end: self.bytes.len(),
        });
        Ok(self.tokens)
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek_at(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn comment(&mut self) -> Result<(), ParseError> {
        self.pos += 2;
        if self.peek_at(0) == Some(b'[') && self.long_bracket_level().is_some() {
            self.long_bracket()
        } else {
            self.skip_line();
            Ok(())
        }
    }

    /// Level of a `[==[` opener at the current position.
    fn long_bracket_level(&self) -> Option<usize> {
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn long_bracket(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let level = self.long_bracket_level().unwrap_or(0);
        self.pos += level + 2;

        let mut closer = String::from("]");
        closer.push_str(&"=".repeat(level));
        closer.push(']');

        match self.source[self.pos..].find(&closer) {
            Some(at) => {
                self.pos += at + closer.len();
                Ok(())
            }
            None => Err(self.error("unfinished long string or comment", start)),
        }
    }

    fn short_string(&mut self, quote: u8) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => return Err(self.error("unfinished string", start)),
                Some(b'\\') => {
                    // \z skips following whitespace, including newlines
                    if self.peek_at(1) == Some(b'z') {
                        self.pos += 2;
                        while matches!(self.peek_at(0), Some(c) if c.is_ascii_whitespace()) {
                            self.pos += 1;
                        }
                    } else {
                        self.pos += 2;
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn number(&mut self) {
        let hex = self.peek_at(0) == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X'));
        if hex {
            self.pos += 2;
        }
        let exponent: &[u8] = if hex { b"pP" } else { b"eE" };
        while let Some(c) = self.peek_at(0) {
            if exponent.contains(&c) && matches!(self.peek_at(1), Some(b'+') | Some(b'-')) {
                self.pos += 2;
            } else if c.is_ascii_alphanumeric() || c == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, &source[t.start..t.end]))
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = kinds_and_text("local x = a.b .. 'str' -- comment\nreturn x");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "local"),
                (TokenKind::Name, "x"),
                (TokenKind::Symbol, "="),
                (TokenKind::Name, "a"),
                (TokenKind::Symbol, "."),
                (TokenKind::Name, "b"),
                (TokenKind::Symbol, ".."),
                (TokenKind::String, "'str'"),
                (TokenKind::Keyword, "return"),
                (TokenKind::Name, "x"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_long_strings_and_comments() {
        let tokens = kinds_and_text("--[==[ skipped ]] still ]==] s = [[a\nb]] .. [=[c]=]");
        let texts: Vec<&str> = tokens.iter().map(|(_, t)| *t).collect();
        assert_eq!(texts, vec!["s", "=", "[[a\nb]]", "..", "[=[c]=]", ""]);
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds_and_text("0x1F 3.14 1e-3 .5 0x1p+4");
        assert!(tokens[..5].iter().all(|(k, _)| *k == TokenKind::Number));
        assert_eq!(tokens[2].1, "1e-3");
        assert_eq!(tokens[4].1, "0x1p+4");
    }

    #[test]
    fn test_escapes() {
        let tokens = kinds_and_text(r#"s = "a\"b" .. 'c\\'"#);
        assert_eq!(tokens[2].1, r#""a\"b""#);
        assert_eq!(tokens[4].1, r"'c\\'");
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("s = 'open").is_err());
        assert!(tokenize("s = [[never closed").is_err());
        let err = tokenize("x = 1\ny = $").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_shebang() {
        let tokens = kinds_and_text("#!/usr/bin/lua\nprint(1)");
        assert_eq!(tokens[0], (TokenKind::Name, "print"));
    }
}
