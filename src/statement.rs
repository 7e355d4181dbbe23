// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Classification of `{% ... %}` statements.
//!
//! Statements are split on their top-level keywords and punctuation only;
//! the sub-expressions they carry are handed to the expression parser as
//! text slices.

use serde::Serialize;

/// Kind of block an end tag closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    For,
    If,
    Set,
    With,
    Macro,
    Call,
    Block,
    Filter,
    Autoescape,
    Trans,
    Raw,
}

impl BlockKind {
    fn from_end_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "endfor" => Self::For,
            "endif" => Self::If,
            "endset" => Self::Set,
            "endwith" => Self::With,
            "endmacro" => Self::Macro,
            "endcall" => Self::Call,
            "endblock" => Self::Block,
            "endfilter" => Self::Filter,
            "endautoescape" => Self::Autoescape,
            "endtrans" => Self::Trans,
            "endraw" => Self::Raw,
            _ => return None,
        })
    }
}

/// What a sub-expression stands for in its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Iterable,
    Condition,
    Value,
    /// Default value of a macro or call parameter.
    Default,
    Callee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    For { targets: Vec<String>, recursive: bool },
    If,
    Elif,
    Else,
    /// Inline assignment. Attribute assignments (`ns.x = ...`) have no targets.
    Set { targets: Vec<String> },
    SetBlock { targets: Vec<String> },
    With { names: Vec<String> },
    Macro { name: String, params: Vec<String> },
    Call { params: Vec<String> },
    Import { target: String, alias: String },
    From { target: String, names: Vec<String> },
    Block { name: String },
    Extends { target: String },
    Include { target: String },
    Raw,
    Autoescape,
    Filter,
    Trans { names: Vec<String> },
    Pluralize,
    Do,
    Break,
    Continue,
    End(BlockKind),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement<'source> {
    pub tag: Tag,
    pub raw: &'source str,
    pub expressions: Vec<(Role, &'source str)>,
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(ch) if ch.is_alphabetic() || ch == '_') && chars.all(is_ident_char)
}

/// Splits off the leading identifier of `text`.
fn leading_ident(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|(_, ch)| !is_ident_char(*ch))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (&text[..end], text[end..].trim_start())
}

/// Calls `f` with every byte offset of `text` that is outside string
/// literals and brackets. Closing brackets that do not match an opening one
/// are offered too. Stops at the first offset for which `f` is true.
fn find_top_level(text: &str, mut f: impl FnMut(usize) -> bool) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote = None;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            _ if depth == 0 && f(i) => return Some(i),
            _ => (),
        }
    }
    None
}

fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    find_top_level(text, |i| {
        text[i..].starts_with(keyword)
            && !text[..i].chars().next_back().is_some_and(is_ident_char)
            && !text[i + keyword.len()..].chars().next().is_some_and(is_ident_char)
    })
}

/// Offset of a top-level single `=`.
fn find_assign(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    find_top_level(text, |i| {
        bytes[i] == b'='
            && !matches!(i.checked_sub(1).map(|p| bytes[p]), Some(b'=' | b'!' | b'<' | b'>'))
            && bytes.get(i + 1) != Some(&b'=')
    })
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut rest = text;
    while let Some(i) = find_top_level(rest, |i| rest[i..].starts_with(sep)) {
        parts.push(rest[..i].trim());
        rest = &rest[i + sep.len_utf8()..];
    }
    parts.push(rest.trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Names of an assignment target list such as `a`, `a, b` or `(k, v)`.
fn parse_targets(text: &str) -> Vec<String> {
    let text = text.trim();
    let text = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text);
    split_top_level(text, ',')
        .into_iter()
        .flat_map(|part| {
            if part.starts_with('(') {
                parse_targets(part)
            } else if is_name(part) {
                vec![part.to_string()]
            } else {
                vec![]
            }
        })
        .collect()
}

fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    let quote = text.chars().next().filter(|ch| matches!(ch, '\'' | '"'))?;
    let body = &text[1..];
    Some(body.strip_suffix(quote).unwrap_or(body))
}

/// Cuts `with context`, `without context` and `ignore missing` modifiers.
fn strip_modifiers(text: &str) -> &str {
    let mut end = text.len();
    for keyword in ["ignore", "with", "without"] {
        if let Some(i) = find_keyword(text, keyword) {
            end = end.min(i);
        }
    }
    text[..end].trim()
}

impl<'source> Statement<'source> {
    pub fn parse(raw: &'source str) -> Self {
        let text = raw.trim();
        let (keyword, rest) = leading_ident(text);
        let mut expressions = vec![];

        let tag = match keyword {
            "for" => Self::parse_for(rest, &mut expressions),
            "if" => {
                expressions.push((Role::Condition, rest));
                Tag::If
            }
            "elif" => {
                expressions.push((Role::Condition, rest));
                Tag::Elif
            }
            "else" => Tag::Else,
            "set" => Self::parse_set(rest, &mut expressions),
            "with" => {
                let mut names = vec![];
                for part in split_top_level(rest, ',') {
                    if let Some(eq) = find_assign(part) {
                        names.extend(parse_targets(&part[..eq]));
                        expressions.push((Role::Value, part[eq + 1..].trim()));
                    }
                }
                Tag::With { names }
            }
            "macro" => {
                let (name, after) = leading_ident(rest);
                let params = Self::parse_params(after, &mut expressions).0;
                Tag::Macro {
                    name: name.to_string(),
                    params,
                }
            }
            "call" => {
                let (params, callee) = Self::parse_params(rest, &mut expressions);
                if !callee.is_empty() {
                    expressions.push((Role::Callee, callee));
                }
                Tag::Call { params }
            }
            "import" => match find_keyword(rest, "as") {
                Some(i) => {
                    let target = Self::template_target(&rest[..i], &mut expressions);
                    let alias = leading_ident(rest[i + 2..].trim_start()).0;
                    Tag::Import {
                        target,
                        alias: alias.to_string(),
                    }
                }
                None => Tag::Unknown(text.to_string()),
            },
            "from" => match find_keyword(rest, "import") {
                Some(i) => {
                    let target = Self::template_target(&rest[..i], &mut expressions);
                    let mut list = &rest[i + "import".len()..];
                    for modifier in ["with", "without"] {
                        if let Some(j) = find_keyword(list, modifier) {
                            list = &list[..j];
                        }
                    }
                    let names = split_top_level(list, ',')
                        .into_iter()
                        .filter_map(|item| {
                            let local = match find_keyword(item, "as") {
                                Some(j) => item[j + 2..].trim(),
                                None => item,
                            };
                            is_name(local).then(|| local.to_string())
                        })
                        .collect();
                    Tag::From { target, names }
                }
                None => Tag::Unknown(text.to_string()),
            },
            "block" => Tag::Block {
                name: leading_ident(rest).0.to_string(),
            },
            "extends" => Tag::Extends {
                target: Self::template_target(rest, &mut expressions),
            },
            "include" => Tag::Include {
                target: Self::template_target(rest, &mut expressions),
            },
            "raw" => Tag::Raw,
            "autoescape" => {
                expressions.push((Role::Value, rest));
                Tag::Autoescape
            }
            "filter" => {
                // The first filter name applies to the body; its arguments and
                // any chained filters are ordinary expressions.
                let after = leading_ident(rest).1;
                if !after.is_empty() {
                    expressions.push((Role::Value, after));
                }
                Tag::Filter
            }
            "trans" => {
                let mut names = vec![];
                for part in split_top_level(rest, ',') {
                    match find_assign(part) {
                        Some(eq) => {
                            names.extend(parse_targets(&part[..eq]));
                            expressions.push((Role::Value, part[eq + 1..].trim()));
                        }
                        None => {
                            // `trans name` borrows `name` from the context.
                            let (name, _) = leading_ident(part);
                            if is_name(name) && !matches!(name, "trimmed" | "notrimmed") {
                                names.push(name.to_string());
                                expressions.push((Role::Value, name));
                            }
                        }
                    }
                }
                Tag::Trans { names }
            }
            "pluralize" => {
                if !rest.is_empty() {
                    expressions.push((Role::Value, rest));
                }
                Tag::Pluralize
            }
            "do" => {
                expressions.push((Role::Value, rest));
                Tag::Do
            }
            "break" => Tag::Break,
            "continue" => Tag::Continue,
            _ => match BlockKind::from_end_tag(keyword) {
                Some(kind) => Tag::End(kind),
                None => Tag::Unknown(text.to_string()),
            },
        };

        expressions.retain(|(_, e)| !e.trim().is_empty());
        Self {
            tag,
            raw,
            expressions,
        }
    }

    fn parse_for(rest: &'source str, expressions: &mut Vec<(Role, &'source str)>) -> Tag {
        let Some(in_pos) = find_keyword(rest, "in") else {
            return Tag::For {
                targets: parse_targets(rest),
                recursive: false,
            };
        };
        let targets = parse_targets(&rest[..in_pos]);
        let mut after = rest[in_pos + 2..].trim();

        let mut recursive = false;
        if let Some(stripped) = after.strip_suffix("recursive") {
            if stripped.is_empty() || stripped.ends_with(char::is_whitespace) {
                recursive = true;
                after = stripped.trim_end();
            }
        }

        match find_keyword(after, "if") {
            Some(if_pos) => {
                expressions.push((Role::Iterable, after[..if_pos].trim()));
                expressions.push((Role::Condition, after[if_pos + 2..].trim()));
            }
            None => expressions.push((Role::Iterable, after)),
        }
        Tag::For { targets, recursive }
    }

    fn parse_set(rest: &'source str, expressions: &mut Vec<(Role, &'source str)>) -> Tag {
        match find_assign(rest) {
            Some(eq) => {
                let lhs = rest[..eq].trim();
                expressions.push((Role::Value, rest[eq + 1..].trim()));
                let targets = if lhs.contains(['.', '[']) {
                    vec![]
                } else {
                    parse_targets(lhs)
                };
                Tag::Set { targets }
            }
            None => {
                // {% set name | filter %}...{% endset %}
                let (lhs, filters) = match find_top_level(rest, |i| rest[i..].starts_with('|')) {
                    Some(i) => (&rest[..i], &rest[i..]),
                    None => (rest, ""),
                };
                if !filters.is_empty() {
                    expressions.push((Role::Value, filters));
                }
                Tag::SetBlock {
                    targets: parse_targets(lhs),
                }
            }
        }
    }

    /// Parses `(a, b=default, ...)` at the start of `text`. Returns the
    /// parameter names and the text following the list.
    fn parse_params(
        text: &'source str,
        expressions: &mut Vec<(Role, &'source str)>,
    ) -> (Vec<String>, &'source str) {
        let Some(body) = text.strip_prefix('(') else {
            return (vec![], text.trim());
        };
        let close = find_top_level(body, |i| body[i..].starts_with(')'));
        let (list, after) = match close {
            Some(i) => (&body[..i], body[i + 1..].trim()),
            None => (body, ""),
        };

        let mut params = vec![];
        for part in split_top_level(list, ',') {
            match find_assign(part) {
                Some(eq) => {
                    let name = part[..eq].trim();
                    if is_name(name) {
                        params.push(name.to_string());
                    }
                    expressions.push((Role::Default, part[eq + 1..].trim()));
                }
                None if is_name(part) => params.push(part.to_string()),
                None => (),
            }
        }
        (params, after)
    }

    /// Literal template name of an `include`-like statement. Computed
    /// targets are recorded as value expressions instead.
    fn template_target(text: &'source str, expressions: &mut Vec<(Role, &'source str)>) -> String {
        let text = strip_modifiers(text);
        match unquote(text) {
            Some(name) => name.to_string(),
            None => {
                expressions.push((Role::Value, text));
                text.to_string()
            }
        }
    }

    /// Names this statement binds in the scope it opens or runs in.
    pub fn bindings(&self) -> Vec<&str> {
        match &self.tag {
            Tag::For { targets, .. }
            | Tag::Set { targets }
            | Tag::SetBlock { targets }
            | Tag::With { names: targets }
            | Tag::From { names: targets, .. }
            | Tag::Trans { names: targets } => targets.iter().map(String::as_str).collect(),
            Tag::Macro { params, .. } | Tag::Call { params } => {
                params.iter().map(String::as_str).collect()
            }
            Tag::Import { alias, .. } if !alias.is_empty() => vec![alias.as_str()],
            _ => vec![],
        }
    }

    pub fn expressions_of(&self, role: Role) -> impl Iterator<Item = &'source str> + '_ {
        self.expressions
            .iter()
            .filter(move |(r, _)| *r == role)
            .map(|(_, e)| *e)
    }
}
