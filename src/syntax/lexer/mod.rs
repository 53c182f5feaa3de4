use num_bigint::BigInt;

use crate::error::LexError;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    file_id: u16,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            text: source,
            source: source.as_bytes(),
            file_id,
            pos: 0,
        }
    }

    /// Lex the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned<Lexeme>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tracing::debug!(tokens = tokens.len(), "lexed source");
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Spanned<Lexeme>, LexError> {
        self.skip_whitespace_and_comments()?;

        if self.pos >= self.source.len() {
            return Ok(self.make_token(Lexeme::Eof, self.pos, self.pos));
        }

        let start = self.pos;
        let ch = self.source[self.pos];

        if is_ident_start(ch) {
            return Ok(self.scan_ident_or_keyword());
        }
        if ch.is_ascii_digit() {
            return self.scan_number();
        }
        if ch == b'"' || ch == b'\'' {
            return self.scan_string(ch);
        }
        self.scan_symbol(start)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'/') {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos + 1 >= self.source.len() {
                        return Err(LexError {
                            span: self.span(start, self.source.len()),
                            ch: '/',
                            message: "unterminated block comment".to_string(),
                        });
                    }
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            return Ok(());
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = &self.text[start..self.pos];
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Result<Spanned<Lexeme>, LexError> {
        let start = self.pos;

        if self.source[self.pos] == b'0' && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            let digits = &self.text[digits_start..self.pos];
            if digits.is_empty() || self.peek().is_some_and(is_ident_continue) {
                let bad = self.char_at(self.pos).unwrap_or('x');
                return Err(LexError {
                    span: self.span(start, self.pos + 1),
                    ch: bad,
                    message: format!("invalid hex literal: unexpected {:?}", bad),
                });
            }
            let bytes = crate::tree::parse::decode_hex(digits).unwrap_or_default();
            return Ok(self.make_token(Lexeme::Hex(bytes), start, self.pos));
        }

        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek().is_some_and(is_ident_start) {
            let bad = self.char_at(self.pos).unwrap_or('?');
            return Err(LexError {
                span: self.span(start, self.pos + 1),
                ch: bad,
                message: format!("invalid digit {:?} in integer literal", bad),
            });
        }
        let text = &self.text[start..self.pos];
        let value = text.parse::<BigInt>().map_err(|_| LexError {
            span: self.span(start, self.pos),
            ch: self.source[start] as char,
            message: format!("invalid integer literal '{}'", text),
        })?;
        Ok(self.make_token(Lexeme::Integer(value), start, self.pos))
    }

    fn scan_string(&mut self, quote: u8) -> Result<Spanned<Lexeme>, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.char_at(self.pos) else {
                return Err(LexError {
                    span: self.span(start, self.source.len()),
                    ch: quote as char,
                    message: "unterminated string literal".to_string(),
                });
            };
            if ch as u32 == quote as u32 {
                self.pos += 1;
                break;
            }
            if ch != '\\' {
                value.push(ch);
                self.pos += ch.len_utf8();
                continue;
            }

            let esc_start = self.pos;
            self.pos += 1;
            let esc = self.char_at(self.pos).unwrap_or('\\');
            self.pos += esc.len_utf8();
            let decoded = match esc {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                '\'' => '\'',
                'x' => self.scan_hex_escape(esc_start)?,
                other => {
                    return Err(LexError {
                        span: self.span(esc_start, self.pos),
                        ch: other,
                        message: format!("unknown escape sequence '\\{}'", other),
                    })
                }
            };
            value.push(decoded);
        }
        Ok(self.make_token(Lexeme::Str(value), start, self.pos))
    }

    /// `\xNN`, ASCII only so string bytes stay valid UTF-8.
    fn scan_hex_escape(&mut self, esc_start: usize) -> Result<char, LexError> {
        let digits = self.source.get(self.pos..self.pos + 2);
        let value = digits
            .filter(|d| d.iter().all(u8::is_ascii_hexdigit))
            .and_then(|d| std::str::from_utf8(d).ok())
            .and_then(|d| u8::from_str_radix(d, 16).ok())
            .filter(|v| v.is_ascii());
        match value {
            Some(v) => {
                self.pos += 2;
                Ok(v as char)
            }
            None => Err(LexError {
                span: self.span(esc_start, (self.pos + 2).min(self.source.len())),
                ch: 'x',
                message: "invalid '\\x' escape: expected two hex digits below 0x80".to_string(),
            }),
        }
    }

    fn scan_symbol(&mut self, start: usize) -> Result<Spanned<Lexeme>, LexError> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            b':' => Lexeme::Colon,
            b';' => Lexeme::Semicolon,
            b'.' => Lexeme::Dot,
            b'@' => Lexeme::At,
            b'~' => Lexeme::Tilde,
            b'^' => Lexeme::Caret,
            b'=' => self.pick(b'=', Lexeme::EqEq, Lexeme::Eq),
            b'!' => self.pick(b'=', Lexeme::NotEq, Lexeme::Bang),
            b'+' => self.pick(b'=', Lexeme::PlusEq, Lexeme::Plus),
            b'*' => self.pick(b'=', Lexeme::StarEq, Lexeme::Star),
            b'/' => self.pick(b'=', Lexeme::SlashEq, Lexeme::Slash),
            b'%' => self.pick(b'=', Lexeme::PercentEq, Lexeme::Percent),
            b'&' => self.pick(b'&', Lexeme::AndAnd, Lexeme::Amp),
            b'|' => self.pick(b'|', Lexeme::OrOr, Lexeme::Pipe),
            b'-' => match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    Lexeme::Arrow
                }
                Some(b'=') => {
                    self.pos += 1;
                    Lexeme::MinusEq
                }
                _ => Lexeme::Minus,
            },
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    Lexeme::LtEq
                }
                Some(b'<') => {
                    self.pos += 1;
                    Lexeme::Shl
                }
                _ => Lexeme::Lt,
            },
            b'>' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    Lexeme::GtEq
                }
                Some(b'>') => {
                    self.pos += 1;
                    Lexeme::Shr
                }
                // `>s` only when `s` is not the start of an identifier.
                Some(b's') if !self.peek_at(1).is_some_and(is_ident_continue) => {
                    self.pos += 1;
                    Lexeme::StrGt
                }
                _ => Lexeme::Gt,
            },
            _ => {
                let bad = self.char_at(start).unwrap_or(ch as char);
                return Err(LexError::unexpected(
                    bad,
                    self.span(start, start + bad.len_utf8()),
                ));
            }
        };

        Ok(self.make_token(token, start, self.pos))
    }

    /// Consume `next` if present and return `yes`, else `no`.
    fn pick(&mut self, next: u8, yes: Lexeme, no: Lexeme) -> Lexeme {
        if self.peek() == Some(next) {
            self.pos += 1;
            yes
        } else {
            no
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..)?.chars().next()
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.file_id, start as u32, end as u32)
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, self.span(start, end))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests;
