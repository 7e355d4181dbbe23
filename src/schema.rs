// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::{AccessPath, Index, PathSegment, Usage};
use crate::lexer::{Lexer, TokenKind};
use crate::shape::ShapeNode;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Free variables of a template and their inferred shapes, in the order the
/// template first mentions them.
///
/// Serializing a schema yields a sample context: strings and unknown leaves
/// become `""`, numbers `0`, booleans `false`, nulls `null`, arrays a single
/// sample element. Use [`VariableSchema::describe`] for the structural form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSchema {
    roots: IndexMap<String, ShapeNode>,
}

impl VariableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ShapeNode> {
        self.roots.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShapeNode)> {
        self.roots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges one free reference into the schema.
    pub fn record(&mut self, path: &AccessPath, usage: Usage) {
        self.roots
            .entry(path.root.clone())
            .or_default()
            .insert(&path.segments, usage);
    }

    pub fn apply_name_hints(&mut self) {
        for (name, node) in self.roots.iter_mut() {
            node.apply_name_hints(name);
        }
    }

    /// Shape at a path such as `user.address.city`, `items.0.title`,
    /// `items[0].title` or `config["key"]`.
    pub fn resolve(&self, path: &str) -> Option<&ShapeNode> {
        let path = parse_path(path)?;
        let mut node = self.roots.get(&path.root)?;
        for segment in &path.segments {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Keys available next to the last component of `path`: the root names
    /// for a bare name, otherwise the fields of the enclosing object.
    pub fn sibling_keys(&self, path: &str) -> Vec<&str> {
        let Some(mut path) = parse_path(path) else {
            return vec![];
        };
        if path.segments.pop().is_none() {
            return self.names().collect();
        }
        let parent = path
            .segments
            .iter()
            .fold(self.roots.get(&path.root), |node, segment| {
                node.and_then(|n| n.child(segment))
            });
        match parent {
            Some(ShapeNode::Object { fields }) => fields.keys().map(String::as_str).collect(),
            Some(ShapeNode::Array { element }) => match element.as_ref() {
                ShapeNode::Object { fields } => fields.keys().map(String::as_str).collect(),
                _ => vec![],
            },
            _ => vec![],
        }
    }

    pub fn to_sample(&self) -> Value {
        Value::Object(
            self.roots
                .iter()
                .map(|(name, node)| (name.clone(), node.sample()))
                .collect(),
        )
    }

    /// Adds placeholders for variables missing from an existing sample
    /// context. Values already present are never replaced.
    pub fn fill_sample(&self, existing: &Value) -> Value {
        let Value::Object(map) = existing else {
            return self.to_sample();
        };
        let mut out: Map<String, Value> = map.clone();
        for (name, node) in &self.roots {
            let value = match map.get(name) {
                Some(value) => node.fill(value),
                None => node.sample(),
            };
            out.insert(name.clone(), value);
        }
        Value::Object(out)
    }

    /// Structural view: every node as `{"kind": ..., ...}`.
    pub fn describe(&self) -> Describe<'_> {
        Describe(self)
    }
}

impl Serialize for VariableSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_sample().serialize(serializer)
    }
}

pub struct Describe<'a>(&'a VariableSchema);

impl Serialize for Describe<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.roots.serialize(serializer)
    }
}

fn parse_path(text: &str) -> Option<AccessPath> {
    let tokens = Lexer::tokenize(text);
    let (first, mut rest) = tokens.split_first()?;
    if first.0 != TokenKind::Ident {
        return None;
    }
    let mut path = AccessPath::new(first.text());
    while let Some(tok) = rest.first() {
        match (tok.text(), rest.get(1), rest.get(2)) {
            (".", Some(next), _) if next.0 == TokenKind::Ident => {
                path.push(PathSegment::Attr(next.text().to_string()));
                rest = &rest[2..];
            }
            (".", Some(next), _) if next.0 == TokenKind::Number => {
                path.push(PathSegment::Index(Index::Literal(next.text().parse().ok()?)));
                rest = &rest[2..];
            }
            ("[", Some(close), _) if close.is_symbol("]") => {
                path.push(PathSegment::Element);
                rest = &rest[2..];
            }
            ("[", Some(inner), Some(close)) if close.is_symbol("]") => {
                let segment = match inner.0 {
                    TokenKind::String => PathSegment::Key(inner.text().to_string()),
                    TokenKind::Number => {
                        PathSegment::Index(Index::Literal(inner.text().parse().ok()?))
                    }
                    TokenKind::Ident => PathSegment::Index(Index::Name(inner.text().to_string())),
                    _ => return None,
                };
                path.push(segment);
                rest = &rest[3..];
            }
            _ => return None,
        }
    }
    Some(path)
}
