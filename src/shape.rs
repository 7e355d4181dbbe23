// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::names;
use crate::expr::{PathSegment, Usage};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

/// Type of a leaf value. `Unknown` leaves are rendered as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Null,
    Unknown,
}

impl ScalarType {
    fn from_usage(usage: Usage) -> Option<Self> {
        match usage {
            Usage::String => Some(Self::String),
            Usage::Number => Some(Self::Number),
            Usage::Boolean => Some(Self::Boolean),
            Usage::Null => Some(Self::Null),
            Usage::Plain | Usage::Array | Usage::Object => None,
        }
    }
}

/// Inferred structure of a template variable.
///
/// Structure only grows: a scalar can become an array or an object when a
/// later access requires it, but an array never turns into an object or the
/// other way round. Object fields keep the order they were first seen in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeNode {
    Scalar {
        #[serde(rename = "type")]
        ty: ScalarType,
    },
    Array {
        element: Box<ShapeNode>,
    },
    Object {
        fields: IndexMap<String, ShapeNode>,
    },
}

impl Default for ShapeNode {
    fn default() -> Self {
        Self::unknown()
    }
}

impl ShapeNode {
    pub fn unknown() -> Self {
        ShapeNode::Scalar {
            ty: ScalarType::Unknown,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ShapeNode::Scalar { ty } => match ty {
                ScalarType::String => "string",
                ScalarType::Number => "number",
                ScalarType::Boolean => "boolean",
                ScalarType::Null => "null",
                ScalarType::Unknown => "unknown",
            },
            ShapeNode::Array { .. } => "array",
            ShapeNode::Object { .. } => "object",
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, ShapeNode::Scalar { .. })
    }

    /// Node reached by one access, if the shape has it.
    pub fn child(&self, segment: &PathSegment) -> Option<&ShapeNode> {
        match (self, segment) {
            (ShapeNode::Object { fields }, PathSegment::Attr(name) | PathSegment::Key(name)) => {
                fields.get(name)
            }
            (ShapeNode::Array { element }, PathSegment::Index(_) | PathSegment::Element) => {
                Some(element)
            }
            _ => None,
        }
    }

    fn fields_mut(&mut self) -> Option<&mut IndexMap<String, ShapeNode>> {
        if let ShapeNode::Scalar { .. } = self {
            *self = ShapeNode::Object {
                fields: IndexMap::new(),
            };
        }
        match self {
            ShapeNode::Object { fields } => Some(fields),
            _ => None,
        }
    }

    fn element_mut(&mut self) -> Option<&mut ShapeNode> {
        if let ShapeNode::Scalar { .. } = self {
            *self = ShapeNode::Array {
                element: Box::new(ShapeNode::unknown()),
            };
        }
        match self {
            ShapeNode::Array { element } => Some(element),
            _ => None,
        }
    }

    /// Merges a usage observed on this node.
    pub fn apply(&mut self, usage: Usage) {
        match usage {
            Usage::Plain => (),
            Usage::Array => {
                if self.element_mut().is_none() {
                    debug!("ignoring array usage of an object");
                }
            }
            Usage::Object => {
                if self.fields_mut().is_none() {
                    debug!("ignoring object usage of an array");
                }
            }
            scalar => {
                if let ShapeNode::Scalar { ty } = self {
                    if *ty == ScalarType::Unknown {
                        if let Some(known) = ScalarType::from_usage(scalar) {
                            *ty = known;
                        }
                    }
                }
            }
        }
    }

    /// Merges an access path below this node, applying `usage` at its end.
    pub fn insert(&mut self, segments: &[PathSegment], usage: Usage) {
        let Some((first, rest)) = segments.split_first() else {
            self.apply(usage);
            return;
        };

        match first {
            PathSegment::Attr(name) | PathSegment::Key(name) => match self.fields_mut() {
                Some(fields) => fields
                    .entry(name.clone())
                    .or_default()
                    .insert(rest, usage),
                None => debug!("ignoring field `{name}` of an array"),
            },
            PathSegment::Index(_) | PathSegment::Element => match self.element_mut() {
                Some(element) => element.insert(rest, usage),
                None => debug!("ignoring element access on an object"),
            },
        }
    }

    /// Assigns name-derived types to leaves nothing else typed.
    pub fn apply_name_hints(&mut self, name: &str) {
        match self {
            ShapeNode::Scalar { ty } => {
                if *ty == ScalarType::Unknown {
                    if let Some(guess) = names::guess(name) {
                        *ty = guess;
                    }
                }
            }
            ShapeNode::Object { fields } => {
                for (field, node) in fields.iter_mut() {
                    node.apply_name_hints(field);
                }
            }
            // Element leaves have no name of their own.
            ShapeNode::Array { element } => {
                if element.is_structural() {
                    element.apply_name_hints(name);
                }
            }
        }
    }

    /// Placeholder value of this shape.
    pub fn sample(&self) -> Value {
        match self {
            ShapeNode::Scalar { ty } => match ty {
                ScalarType::String | ScalarType::Unknown => Value::String(String::new()),
                ScalarType::Number => Value::from(0),
                ScalarType::Boolean => Value::Bool(false),
                ScalarType::Null => Value::Null,
            },
            ShapeNode::Array { element } => Value::Array(vec![element.sample()]),
            ShapeNode::Object { fields } => Value::Object(
                fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.sample()))
                    .collect(),
            ),
        }
    }

    /// Completes `existing` with placeholders for what it lacks. Values that
    /// are present are kept as they are.
    pub fn fill(&self, existing: &Value) -> Value {
        match (self, existing) {
            (ShapeNode::Object { fields }, Value::Object(map)) => {
                let mut out: Map<String, Value> = map.clone();
                for (name, node) in fields {
                    let filled = match map.get(name) {
                        Some(value) => node.fill(value),
                        None => node.sample(),
                    };
                    out.insert(name.clone(), filled);
                }
                Value::Object(out)
            }
            (ShapeNode::Array { element }, Value::Array(items)) => {
                Value::Array(items.iter().map(|item| element.fill(item)).collect())
            }
            (_, value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Index;
    use serde_json::json;

    fn attr(name: &str) -> PathSegment {
        PathSegment::Attr(name.to_string())
    }

    #[test]
    fn structure_beats_scalar() {
        let mut node = ShapeNode::unknown();
        node.apply(Usage::Number);
        node.insert(&[attr("a")], Usage::Plain);
        assert_eq!(node.sample(), json!({"a": ""}));
    }

    #[test]
    fn first_scalar_type_wins() {
        let mut node = ShapeNode::unknown();
        node.apply(Usage::Plain);
        node.apply(Usage::Boolean);
        node.apply(Usage::Number);
        assert_eq!(node.type_name(), "boolean");
    }

    #[test]
    fn array_and_object_do_not_mix() {
        let mut node = ShapeNode::unknown();
        node.insert(&[PathSegment::Element, attr("name")], Usage::Plain);
        node.insert(&[attr("length")], Usage::Number);
        node.apply(Usage::Object);
        assert_eq!(node.sample(), json!([{"name": ""}]));
    }

    #[test]
    fn index_accesses_share_the_element() {
        let mut node = ShapeNode::unknown();
        node.insert(&[PathSegment::Index(Index::Literal(0)), attr("a")], Usage::Plain);
        node.insert(&[PathSegment::Index(Index::Literal(3)), attr("b")], Usage::Number);
        assert_eq!(node.sample(), json!([{"a": "", "b": 0}]));
    }

    #[test]
    fn field_order_is_first_seen() {
        let mut node = ShapeNode::unknown();
        for name in ["z", "a", "m", "a"] {
            node.insert(&[attr(name)], Usage::Plain);
        }
        let keys: Vec<_> = match node.sample() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => vec![],
        };
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn name_hints_only_fill_unknowns() {
        let mut node = ShapeNode::unknown();
        node.insert(&[attr("age")], Usage::Plain);
        node.insert(&[attr("count")], Usage::String);
        node.insert(&[attr("tags"), PathSegment::Element], Usage::Plain);
        node.apply_name_hints("user");
        assert_eq!(node.sample(), json!({"age": 0, "count": "", "tags": [""]}));
    }

    #[test]
    fn fill_keeps_existing_values() {
        let mut node = ShapeNode::unknown();
        node.insert(&[attr("name")], Usage::Plain);
        node.insert(&[attr("tags"), PathSegment::Element, attr("id")], Usage::Number);
        let filled = node.fill(&json!({"name": "Ada", "tags": [{"label": "x"}]}));
        assert_eq!(
            filled,
            json!({"name": "Ada", "tags": [{"label": "x", "id": 0}]})
        );
    }

    #[test]
    fn describe_form() {
        let mut node = ShapeNode::unknown();
        node.insert(&[attr("n")], Usage::Number);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"kind": "object", "fields": {"n": {"kind": "scalar", "type": "number"}}})
        );
    }
}
