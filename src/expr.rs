// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extraction of variable access paths from expression text.
//!
//! The parser does not build an expression tree. It walks the token stream,
//! recognizes the postfix chains that make up an access path (`a.b[0].c`)
//! and looks at the tokens around each chain to decide how the value is
//! used. Filters, tests, keyword arguments, keywords and method names are
//! skipped so that they never surface as variables.

use crate::builtins::{self, filters, FilterEffect, METHODS, TESTS};
use crate::lexer::{Lexer, Token, TokenKind};

use core::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Index {
    Literal(i64),
    Name(String),
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PathSegment {
    /// `.name`
    Attr(String),
    /// `["name"]`
    Key(String),
    /// `[0]`, `[i]`, `[expr]`
    Index(Index),
    /// An element produced by iterating the value.
    Element,
}

/// A root variable followed by the accesses applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPath {
    pub root: String,
    pub segments: Vec<PathSegment>,
}

impl AccessPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: vec![],
        }
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// The path of the values produced by iterating this one.
    pub fn element(mut self) -> Self {
        self.segments.push(PathSegment::Element);
        self
    }

    pub fn join(&self, segments: &[PathSegment]) -> Self {
        let mut path = self.clone();
        path.segments.extend_from_slice(segments);
        path
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            match segment {
                PathSegment::Attr(name) => write!(f, ".{name}")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
                PathSegment::Index(Index::Literal(n)) => write!(f, "[{n}]")?,
                PathSegment::Index(Index::Name(name)) => write!(f, "[{name}]")?,
                PathSegment::Index(Index::Dynamic) => f.write_str("[*]")?,
                PathSegment::Element => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// How a referenced value is used, as far as the surrounding syntax tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Plain,
    Number,
    String,
    Boolean,
    Null,
    Array,
    Object,
}

/// Position an expression occupies in its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Output or assigned value.
    Value,
    /// `if`/`elif` condition or the test of a conditional expression.
    Condition,
    /// Source of a `for` loop.
    Iterable,
    /// Slice bounds and arguments that must be numbers.
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub path: AccessPath,
    pub usage: Usage,
}

/// All variable references in `text`, in source order.
pub fn references(text: &str, context: Context) -> Vec<Reference> {
    let mut parser = ExprParser::new(text);
    parser.parse_range(0, parser.tokens.len(), context);
    parser.references
}

/// References of a loop source plus the path whose elements the loop
/// variable takes, when the source is a plain path (optionally sorted or
/// filtered).
pub fn iteration(text: &str) -> (Vec<Reference>, Option<AccessPath>) {
    let mut parser = ExprParser::new(text);
    parser.parse_range(0, parser.tokens.len(), Context::Iterable);
    (parser.references, parser.source)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    /// Comparison, arithmetic, concatenation or membership, with the usage it
    /// implies for the operand if any.
    Tight(Option<Usage>),
    /// `and`, `or`, `not`.
    Connective,
    Other,
}

struct ExprParser<'source> {
    tokens: Vec<Token<'source>>,
    references: Vec<Reference>,
    source: Option<AccessPath>,
}

fn next_after(close: usize, hi: usize) -> usize {
    if close < hi {
        close + 1
    } else {
        hi
    }
}

fn literal_index(text: &str) -> Index {
    match text.replace('_', "").parse::<i64>() {
        Ok(n) => Index::Literal(n),
        Err(_) => Index::Dynamic,
    }
}

impl<'source> ExprParser<'source> {
    fn new(text: &'source str) -> Self {
        Self {
            tokens: Lexer::tokenize(text),
            references: vec![],
            source: None,
        }
    }

    fn tok(&self, idx: usize, hi: usize) -> Option<Token<'source>> {
        if idx < hi {
            self.tokens.get(idx).copied()
        } else {
            None
        }
    }

    fn is_symbol(&self, idx: usize, hi: usize, text: &str) -> bool {
        self.tok(idx, hi).is_some_and(|t| t.is_symbol(text))
    }

    fn is_ident(&self, idx: usize, hi: usize, text: &str) -> bool {
        self.tok(idx, hi).is_some_and(|t| t.is_ident(text))
    }

    fn ident(&self, idx: usize, hi: usize) -> Option<&'source str> {
        self.tok(idx, hi)
            .filter(|t| t.0 == TokenKind::Ident)
            .map(|t| t.text())
    }

    /// Index of the bracket closing the one at `open`, or `hi` when unbalanced.
    fn matching(&self, open: usize, hi: usize) -> usize {
        let mut depth = 0i32;
        for idx in open..hi {
            let tok = &self.tokens[idx];
            if tok.0 != TokenKind::Symbol {
                continue;
            }
            match tok.text() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth <= 0 {
                        return idx;
                    }
                }
                _ => (),
            }
        }
        hi
    }

    /// Positions of a top-level `if` and its optional `else`.
    fn find_conditional(&self, lo: usize, hi: usize) -> Option<(usize, Option<usize>)> {
        let mut depth = 0i32;
        let mut if_idx = None;
        for idx in lo..hi {
            let tok = &self.tokens[idx];
            match tok.0 {
                TokenKind::Symbol => match tok.text() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    _ => (),
                },
                TokenKind::Ident if depth == 0 => match (tok.text(), if_idx) {
                    ("if", None) if idx > lo => if_idx = Some(idx),
                    ("else", Some(i)) => return Some((i, Some(idx))),
                    _ => (),
                },
                _ => (),
            }
        }
        if_idx.map(|i| (i, None))
    }

    fn parse_range(&mut self, lo: usize, hi: usize, context: Context) {
        if lo >= hi {
            return;
        }
        // X if C else Y
        if let Some((if_idx, else_idx)) = self.find_conditional(lo, hi) {
            self.parse_range(lo, if_idx, context);
            self.parse_range(if_idx + 1, else_idx.unwrap_or(hi), Context::Condition);
            if let Some(else_idx) = else_idx {
                self.parse_range(else_idx + 1, hi, context);
            }
            return;
        }
        // (X if C else Y)
        if self.is_symbol(lo, hi, "(")
            && self.matching(lo, hi) == hi - 1
            && self.find_conditional(lo + 1, hi - 1).is_some()
        {
            self.parse_range(lo + 1, hi - 1, context);
            return;
        }
        self.scan(lo, hi, context);
    }

    fn scan(&mut self, lo: usize, hi: usize, context: Context) {
        // Argument lists of bare calls: (closing index, usage implied for arguments).
        let mut calls: Vec<(usize, Option<Usage>)> = vec![];
        let mut i = lo;
        while i < hi {
            while calls.last().is_some_and(|(close, _)| *close <= i) {
                calls.pop();
            }

            let tok = self.tokens[i];
            match tok.0 {
                // Filter applied to a literal or a parenthesized group.
                TokenKind::Symbol if tok.text() == "|" => {
                    i += if self.ident(i + 1, hi).is_some() { 2 } else { 1 };
                }
                TokenKind::Ident => {
                    let name = tok.text();
                    let enclosing = calls.last().and_then(|(_, hint)| *hint);
                    if i > lo && self.tokens[i - 1].is_symbol(".") {
                        // Attribute of a literal or of a call result.
                        i += 1;
                    } else if name == "is" {
                        i = self.skip_test(i, hi);
                    } else if builtins::is_keyword(name) || self.is_symbol(i + 1, hi, "=") {
                        // Keywords and keyword-argument names.
                        i += 1;
                    } else if self.is_symbol(i + 1, hi, "(") {
                        // Macros and global functions are not context values.
                        let close = self.matching(i + 1, hi);
                        let hint = builtins::call_argument_hint(name).or(enclosing);
                        calls.push((close, hint));
                        i += 2;
                    } else {
                        i = self.parse_operand(i, lo, hi, context, enclosing, !calls.is_empty());
                    }
                }
                _ => i += 1,
            }
        }
    }

    fn skip_test(&mut self, is_idx: usize, hi: usize) -> usize {
        let mut k = is_idx + 1;
        if self.is_ident(k, hi, "not") {
            k += 1;
        }
        if self.ident(k, hi).is_some() {
            k += 1;
        }
        k
    }

    fn parse_operand(
        &mut self,
        start: usize,
        lo: usize,
        hi: usize,
        context: Context,
        enclosing: Option<Usage>,
        nested: bool,
    ) -> usize {
        let mark = self.references.len();
        let mut path = AccessPath::new(self.tokens[start].text());
        let mut chain_hint = None;
        // No calls or slices: iterating the chain yields the path's elements.
        let mut plain_chain = true;

        let mut j = start + 1;
        while j < hi {
            let tok = self.tokens[j];
            if tok.is_symbol(".") {
                let Some(next) = self.tok(j + 1, hi) else {
                    break;
                };
                match next.0 {
                    TokenKind::Ident => {
                        let attr = next.text();
                        if self.is_symbol(j + 2, hi, "(") {
                            if let Some(usage) = METHODS.get(attr) {
                                chain_hint = Some(*usage);
                                let close = self.matching(j + 2, hi);
                                self.parse_range(j + 3, close, Context::Value);
                                j = next_after(close, hi);
                                plain_chain = false;
                                break;
                            }
                        }
                        path.push(PathSegment::Attr(attr.to_string()));
                        j += 2;
                    }
                    TokenKind::Number => {
                        path.push(PathSegment::Index(literal_index(next.text())));
                        j += 2;
                    }
                    _ => break,
                }
            } else if tok.is_symbol("[") {
                let close = self.matching(j, hi);
                let sliced = self.parse_subscript(&mut path, j + 1, close);
                j = next_after(close, hi);
                if sliced {
                    chain_hint = Some(Usage::Array);
                    plain_chain = false;
                    break;
                }
            } else if tok.is_symbol("(") {
                // Call through a path. The callee stays a field; arguments stand alone.
                let close = self.matching(j, hi);
                self.parse_range(j + 1, close, Context::Value);
                j = next_after(close, hi);
                plain_chain = false;
                break;
            } else {
                break;
            }
        }

        let (end, filter_hint, filtered, keeps_elements) = self.parse_filters(j, hi);
        // A converted or tested operand is not the value operators and the
        // context see. Loop sources are iterated whatever filters follow them.
        let usage = chain_hint
            .or(filter_hint)
            .or_else(|| {
                (!filtered)
                    .then(|| self.operator_hint(start, end, lo, hi))
                    .flatten()
            })
            .or(enclosing)
            .or_else(|| {
                (!filtered || context == Context::Iterable)
                    .then(|| self.context_hint(context, start, end, lo, hi, nested))
                    .flatten()
            })
            .unwrap_or(Usage::Plain);

        if context == Context::Iterable && start == lo && end == hi && plain_chain && keeps_elements
        {
            self.source = Some(path.clone());
        }

        self.references.insert(mark, Reference { path, usage });
        end
    }

    /// Adds the subscript between `lo` and `hi` to `path`. Returns true for slices.
    fn parse_subscript(&mut self, path: &mut AccessPath, lo: usize, hi: usize) -> bool {
        let mut depth = 0i32;
        let mut colons = vec![];
        for idx in lo..hi {
            let tok = &self.tokens[idx];
            match tok.text() {
                _ if tok.0 != TokenKind::Symbol => (),
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                ":" if depth == 0 => colons.push(idx),
                _ => (),
            }
        }

        if !colons.is_empty() {
            let mut part_lo = lo;
            for part_hi in colons.into_iter().chain(core::iter::once(hi)) {
                self.parse_range(part_lo, part_hi, Context::Number);
                part_lo = part_hi + 1;
            }
            return true;
        }

        let inner = self.tokens[lo..hi].to_vec();
        let segment = match inner.as_slice() {
            [t] if t.0 == TokenKind::String => PathSegment::Key(t.text().to_string()),
            [t] if t.0 == TokenKind::Number => PathSegment::Index(literal_index(t.text())),
            [m, t] if m.is_symbol("-") && t.0 == TokenKind::Number => {
                match literal_index(t.text()) {
                    Index::Literal(n) => PathSegment::Index(Index::Literal(-n)),
                    index => PathSegment::Index(index),
                }
            }
            [t] if t.0 == TokenKind::Ident && !builtins::is_keyword(t.text()) => {
                self.references.push(Reference {
                    path: AccessPath::new(t.text()),
                    usage: Usage::Number,
                });
                PathSegment::Index(Index::Name(t.text().to_string()))
            }
            _ => {
                self.parse_range(lo, hi, Context::Value);
                PathSegment::Index(Index::Dynamic)
            }
        };
        path.push(segment);
        false
    }

    /// Consumes `|filter(...)` and `is test` chains following an operand.
    /// Returns the end position, the usage implied for the operand, whether a
    /// filter or test other than a pass-through one was applied and whether
    /// iterating the filtered value still yields the operand's elements.
    fn parse_filters(&mut self, mut j: usize, hi: usize) -> (usize, Option<Usage>, bool, bool) {
        let mut hint = None;
        let mut decided = false;
        let mut keeps_elements = true;

        loop {
            if self.is_symbol(j, hi, "|") {
                let Some(name) = self.ident(j + 1, hi) else {
                    j += 1;
                    break;
                };
                let filter = filters::lookup(name);
                keeps_elements &= filter.keeps_elements;
                if !decided {
                    match filter.effect {
                        FilterEffect::Hint(usage) => {
                            hint = Some(usage);
                            decided = true;
                        }
                        FilterEffect::Transparent => (),
                        FilterEffect::Opaque => decided = true,
                    }
                }
                j += 2;
                if self.is_symbol(j, hi, "(") {
                    let close = self.matching(j, hi);
                    self.parse_range(j + 1, close, Context::Value);
                    j = next_after(close, hi);
                }
            } else if self.is_ident(j, hi, "is") {
                let mut k = j + 1;
                let negated = self.is_ident(k, hi, "not");
                if negated {
                    k += 1;
                }
                if let Some(test) = self.ident(k, hi) {
                    if !decided {
                        if !negated {
                            hint = TESTS.get(test).copied();
                        }
                        decided = true;
                    }
                    k += 1;
                    if self.is_symbol(k, hi, "(") {
                        let close = self.matching(k, hi);
                        self.parse_range(k + 1, close, Context::Value);
                        k = next_after(close, hi);
                    }
                }
                keeps_elements = false;
                j = k;
            } else {
                break;
            }
        }

        (j, hint, decided, keeps_elements)
    }

    fn literal_usage(&self, idx: Option<usize>, hi: usize) -> Option<Usage> {
        let tok = self.tok(idx?, hi)?;
        match tok.0 {
            TokenKind::String => Some(Usage::String),
            TokenKind::Number => Some(Usage::Number),
            TokenKind::Ident => match tok.text() {
                "true" | "false" | "True" | "False" => Some(Usage::Boolean),
                "none" | "None" => Some(Usage::Null),
                _ => None,
            },
            _ => None,
        }
    }

    /// The operator on one side of an operand. `other` is the position of
    /// the operator's other operand.
    fn operator(&self, op: Token<'_>, other: Option<usize>, hi: usize, before: bool) -> Operator {
        match op.0 {
            TokenKind::Symbol => match op.text() {
                "<" | "<=" | ">" | ">=" | "-" | "*" | "/" | "//" | "%" | "**" => {
                    Operator::Tight(Some(Usage::Number))
                }
                "~" => Operator::Tight(Some(Usage::String)),
                "+" => Operator::Tight(
                    self.literal_usage(other, hi)
                        .filter(|u| matches!(u, Usage::String | Usage::Number)),
                ),
                "==" | "!=" => Operator::Tight(self.literal_usage(other, hi)),
                _ => Operator::Other,
            },
            TokenKind::Ident => match op.text() {
                "and" | "or" => Operator::Connective,
                "not" if before => Operator::Connective,
                // `x not in xs`
                "not" => Operator::Tight(None),
                "in" if before => Operator::Tight(Some(Usage::Array)),
                "in" => Operator::Tight(None),
                _ => Operator::Other,
            },
            _ => Operator::Other,
        }
    }

    /// Comparison, arithmetic and membership bind tighter than `and`, `or`
    /// and `not`, so they decide the operand's usage whenever they touch it.
    fn operator_hint(&self, start: usize, end: usize, lo: usize, hi: usize) -> Option<Usage> {
        let before = if start > lo {
            let other = (start >= lo + 2).then(|| start - 2);
            self.operator(self.tokens[start - 1], other, hi, true)
        } else {
            Operator::Other
        };
        let after = self
            .tok(end, hi)
            .map_or(Operator::Other, |op| self.operator(op, Some(end + 1), hi, false));

        match (before, after) {
            (Operator::Tight(usage), Operator::Tight(other)) => usage.or(other),
            (Operator::Tight(usage), _) | (_, Operator::Tight(usage)) => usage,
            (Operator::Connective, _) | (_, Operator::Connective) => Some(Usage::Boolean),
            _ => None,
        }
    }

    /// Whether the operand stands alone between boolean connectives.
    fn is_bare(&self, start: usize, end: usize, lo: usize, hi: usize) -> bool {
        let before = start == lo || {
            let t = self.tokens[start - 1];
            t.is_symbol("(") || t.is_ident("and") || t.is_ident("or") || t.is_ident("not")
        };
        let after = match self.tok(end, hi) {
            None => true,
            Some(t) => t.is_symbol(")") || t.is_ident("and") || t.is_ident("or"),
        };
        before && after
    }

    fn context_hint(
        &self,
        context: Context,
        start: usize,
        end: usize,
        lo: usize,
        hi: usize,
        nested: bool,
    ) -> Option<Usage> {
        match context {
            Context::Value => None,
            Context::Number => Some(Usage::Number),
            Context::Iterable => (start == lo && !nested).then_some(Usage::Array),
            Context::Condition => self.is_bare(start, end, lo, hi).then_some(Usage::Boolean),
        }
    }
}
