// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Source;
use crate::options::RawBlocks;

use log::warn;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Literal,
    Expression,
    Statement,
    Comment,
}

impl SegmentKind {
    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            SegmentKind::Literal => ("", ""),
            SegmentKind::Expression => ("{{", "}}"),
            SegmentKind::Statement => ("{%", "%}"),
            SegmentKind::Comment => ("{#", "#}"),
        }
    }
}

/// A contiguous piece of template text.
///
/// `text` is the raw slice including delimiters and whitespace-control
/// modifiers; `inner` is the content between them. Consecutive segments
/// cover the input without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment<'source> {
    pub kind: SegmentKind,
    pub text: &'source str,
    pub inner: &'source str,
    pub start: usize,
    pub end: usize,
    pub trim_left: bool,
    pub trim_right: bool,
    pub terminated: bool,
}

impl<'source> Segment<'source> {
    fn literal(contents: &'source str, start: usize, end: usize) -> Self {
        Segment {
            kind: SegmentKind::Literal,
            text: &contents[start..end],
            inner: &contents[start..end],
            start,
            end,
            trim_left: false,
            trim_right: false,
            terminated: true,
        }
    }
}

/// Splits template text into segments.
pub struct Segmenter<'source> {
    source: &'source Source,
    contents: &'source str,
    raw_blocks: RawBlocks,
}

impl<'source> Segmenter<'source> {
    pub fn new(source: &'source Source, raw_blocks: RawBlocks) -> Self {
        Self {
            source,
            contents: source.contents(),
            raw_blocks,
        }
    }

    pub fn segments(&self) -> Vec<Segment<'source>> {
        let len = self.contents.len();
        let mut segments = vec![];
        let mut pos = 0;

        while pos < len {
            let Some((open, kind)) = self.find_open(pos) else {
                segments.push(Segment::literal(self.contents, pos, len));
                break;
            };
            if open > pos {
                segments.push(Segment::literal(self.contents, pos, open));
            }

            let segment = self.read_delimited(open, kind);
            pos = segment.end;
            let raw_body = kind == SegmentKind::Statement
                && segment.terminated
                && self.raw_blocks == RawBlocks::Inert
                && segment.inner.trim() == "raw";
            segments.push(segment);

            if raw_body {
                // The body of a raw block is plain text up to its endraw tag.
                let body_end = self.find_endraw(pos).unwrap_or(len);
                if body_end > pos {
                    segments.push(Segment::literal(self.contents, pos, body_end));
                }
                pos = body_end;
            }
        }

        segments
    }

    fn find_open(&self, from: usize) -> Option<(usize, SegmentKind)> {
        let bytes = self.contents.as_bytes();
        let mut pos = from;
        while let Some(idx) = self.contents[pos..].find('{') {
            let at = pos + idx;
            match bytes.get(at + 1) {
                Some(b'{') => return Some((at, SegmentKind::Expression)),
                Some(b'%') => return Some((at, SegmentKind::Statement)),
                Some(b'#') => return Some((at, SegmentKind::Comment)),
                _ => pos = at + 1,
            }
        }
        None
    }

    fn read_delimited(&self, open: usize, kind: SegmentKind) -> Segment<'source> {
        let bytes = self.contents.as_bytes();
        let len = bytes.len();
        let (_, close) = kind.delimiters();
        let close_first = close.as_bytes()[0];
        let track_quotes = kind != SegmentKind::Comment;

        let mut inner_start = open + 2;
        let trim_left = matches!(bytes.get(inner_start), Some(b'-' | b'+'));
        if trim_left {
            inner_start += 1;
        }

        let mut quote: Option<u8> = None;
        let mut i = inner_start;
        while i < len {
            let b = bytes[i];
            if let Some(q) = quote {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            if track_quotes && (b == b'"' || b == b'\'') {
                quote = Some(b);
            } else if b == close_first && bytes.get(i + 1) == Some(&b'}') {
                let trim_right = i > inner_start && matches!(bytes[i - 1], b'-' | b'+');
                let inner_end = if trim_right { i - 1 } else { i };
                return Segment {
                    kind,
                    text: &self.contents[open..i + 2],
                    inner: &self.contents[inner_start..inner_end],
                    start: open,
                    end: i + 2,
                    trim_left,
                    trim_right,
                    terminated: true,
                };
            }
            i += 1;
        }

        let opener = &self.contents[open..open + 2];
        let msg = format!("unterminated `{opener}`; treating the rest of the input as one segment");
        warn!("{}", self.source.message_at(open, "warning", &msg));
        let inner_start = inner_start.min(len);
        Segment {
            kind,
            text: &self.contents[open..],
            inner: &self.contents[inner_start..],
            start: open,
            end: len,
            trim_left,
            trim_right: false,
            terminated: false,
        }
    }

    /// Offset of the `{%` starting the next `endraw` tag.
    fn find_endraw(&self, from: usize) -> Option<usize> {
        let mut pos = from;
        while let Some(idx) = self.contents[pos..].find("{%") {
            let at = pos + idx;
            let rest = self.contents[at + 2..].trim_start_matches(['-', '+']);
            let rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix("endraw") {
                let after = after.trim_start().trim_start_matches(['-', '+']);
                if after.starts_with("%}") {
                    return Some(at);
                }
            }
            pos = at + 2;
        }
        None
    }
}
