// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::SourceError;

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;

/// Template text together with a line table used for diagnostics and for
/// selecting line ranges.
#[derive(Clone)]
pub struct Source {
    file: String,
    contents: String,
    lines: Vec<(usize, usize)>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.file.fmt(f)
    }
}

impl Source {
    pub fn new(file: String, contents: String) -> Source {
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0usize;
        let mut start = 0usize;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i,
                };
                lines.push((start, end));
                start = i + 1;
            }
            prev_ch = ch;
            prev_pos = i;
        }
        // The last line is kept even when empty so that offsets at EOF map to a line.
        lines.push((start, contents.len()));

        Self {
            file,
            contents,
            lines,
        }
    }

    #[cfg(not(target_family = "wasm"))]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Source> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => anyhow::bail!("Failed to read {}. {e}", path.as_ref().display()),
        };
        Ok(Self::new(
            path.as_ref().to_string_lossy().to_string(),
            contents,
        ))
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the line at zero-based `idx`, without its terminator.
    pub fn line(&self, idx: usize) -> &str {
        match self.lines.get(idx) {
            Some((start, end)) => &self.contents[*start..*end],
            None => "",
        }
    }

    /// One-based line and column of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.contents.len());
        let idx = self
            .lines
            .partition_point(|(start, _)| *start <= offset)
            .saturating_sub(1);
        let start = self.lines.get(idx).map(|(s, _)| *s).unwrap_or(0);
        let col = self.contents[start..offset].chars().count() + 1;
        (idx + 1, col)
    }

    /// Text spanning the one-based, inclusive line range `first..=last`.
    pub fn slice_lines(&self, first: usize, last: usize) -> Result<&str, SourceError> {
        if first == 0 || last < first {
            return Err(SourceError::InvalidRange { first, last });
        }
        let count = self.lines.len();
        let (Some((start, _)), Some((_, end))) =
            (self.lines.get(first - 1), self.lines.get(last - 1))
        else {
            return Err(SourceError::LineOutOfBounds {
                file: self.file.clone(),
                line: if first > count { first } else { last },
                count,
            });
        };
        Ok(&self.contents[*start..*end])
    }

    pub fn message(&self, line: usize, col: usize, kind: &str, msg: &str) -> String {
        if line == 0 || line > self.lines.len() {
            return format!("{}: invalid line {} specified", self.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.saturating_sub(1);

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn message_at(&self, offset: usize, kind: &str, msg: &str) -> String {
        let (line, col) = self.position(offset);
        self.message(line, col, kind, msg)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Span<'source> {
    pub text: &'source str,
    pub start: usize,
    pub end: usize,
}

impl Debug for Span<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text.escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = match t.char_indices().nth(max) {
            Some((cut, _)) => (&t[0..cut], "..."),
            None => (t.as_str(), ""),
        };

        f.write_fmt(format_args!(
            "{}:{}, \"{}{}\"",
            self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

/// A token of expression or statement text. For strings the span covers
/// the contents without the quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'source>(pub TokenKind, pub Span<'source>);

impl<'source> Token<'source> {
    pub fn text(&self) -> &'source str {
        self.1.text
    }

    pub fn is_symbol(&self, text: &str) -> bool {
        self.0 == TokenKind::Symbol && self.1.text == text
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.0 == TokenKind::Ident && self.1.text == text
    }
}

/// Lexer for the code inside `{{ }}` and `{% %}`.
///
/// The lexer never fails: characters it does not understand become single
/// character symbols and unterminated strings run to the end of input.
#[derive(Clone)]
pub struct Lexer<'source> {
    text: &'source str,
    iter: Peekable<CharIndices<'source>>,
}

impl<'source> Lexer<'source> {
    pub fn new(text: &'source str) -> Self {
        Self {
            text,
            iter: text.char_indices().peekable(),
        }
    }

    /// All tokens of `text`, excluding the trailing `Eof`.
    pub fn tokenize(text: &'source str) -> Vec<Token<'source>> {
        let mut lexer = Lexer::new(text);
        let mut tokens = vec![];
        loop {
            let tok = lexer.next_token();
            if tok.0 == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        tokens
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.text.len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.text.len(), '\x00'),
        }
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token<'source> {
        Token(
            kind,
            Span {
                text: &self.text[start..end],
                start,
                end,
            },
        )
    }

    fn read_ident(&mut self) -> Token<'source> {
        let start = self.peek().0;
        loop {
            let ch = self.peek().1;
            if ch.is_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.token(TokenKind::Ident, start, end)
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() || self.peek().1 == '_' {
            self.iter.next();
        }
    }

    fn read_number(&mut self) -> Token<'source> {
        let start = self.peek().0;
        self.read_digits();

        // . must be followed by at least 1 digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next();
            self.read_digits();
        }

        let ch = self.peek().1;
        if (ch == 'e' || ch == 'E')
            && (self.peekahead(1).1.is_ascii_digit()
                || (matches!(self.peekahead(1).1, '+' | '-')
                    && self.peekahead(2).1.is_ascii_digit()))
        {
            self.iter.next();
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            self.read_digits();
        }

        let end = self.peek().0;
        self.token(TokenKind::Number, start, end)
    }

    fn read_string(&mut self) -> Token<'source> {
        let (_, quote) = self.peek();
        self.iter.next();
        let start = self.peek().0;
        loop {
            let (offset, ch) = self.peek();
            match ch {
                '\x00' if offset >= self.text.len() => {
                    // Unterminated string runs to the end of input.
                    return self.token(TokenKind::String, start, offset);
                }
                '\\' => {
                    self.iter.next();
                    self.iter.next();
                }
                _ if ch == quote => {
                    self.iter.next();
                    return self.token(TokenKind::String, start, offset);
                }
                _ => {
                    self.iter.next();
                }
            }
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().1.is_whitespace() {
            self.iter.next();
        }
    }

    pub fn next_token(&mut self) -> Token<'source> {
        self.skip_ws();

        let (start, chr) = self.peek();
        if start >= self.text.len() {
            return self.token(TokenKind::Eof, start, start);
        }

        match chr {
            '"' | '\'' => self.read_string(),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_alphabetic() || chr == '_' => self.read_ident(),
            // == != <= >= ** //
            '=' | '!' | '<' | '>' if self.peekahead(1).1 == '=' => {
                self.iter.next();
                self.iter.next();
                let end = self.peek().0;
                self.token(TokenKind::Symbol, start, end)
            }
            '*' | '/' if self.peekahead(1).1 == chr => {
                self.iter.next();
                self.iter.next();
                let end = self.peek().0;
                self.token(TokenKind::Symbol, start, end)
            }
            _ => {
                self.iter.next();
                let end = self.peek().0;
                self.token(TokenKind::Symbol, start, end)
            }
        }
    }
}
