// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::{self, AccessPath, Context, Reference};
use crate::options::EngineOptions;
use crate::schema::VariableSchema;
use crate::scope::{Lookup, ScopeKind, ScopeStack};
use crate::segments::{Segment, SegmentKind};
use crate::statement::{BlockKind, Role, Statement, Tag};

use log::{debug, trace};

/// Single pass over a template's segments that folds every free reference
/// into a [`VariableSchema`].
pub struct Analyzer<'a> {
    options: &'a EngineOptions,
    scopes: ScopeStack,
    /// Open `for` and `if` blocks, to tell which one an `else` belongs to.
    branches: Vec<BlockKind>,
    schema: VariableSchema,
}

impl<'a> Analyzer<'a> {
    pub fn new(options: &'a EngineOptions) -> Self {
        Self {
            options,
            scopes: ScopeStack::new(options.max_scope_depth),
            branches: vec![],
            schema: VariableSchema::new(),
        }
    }

    pub fn analyze(mut self, segments: &[Segment<'_>]) -> VariableSchema {
        for segment in segments {
            match segment.kind {
                SegmentKind::Expression => self.expression(segment.inner, Context::Value),
                SegmentKind::Statement => self.statement(&Statement::parse(segment.inner)),
                SegmentKind::Literal | SegmentKind::Comment => (),
            }
        }

        if self.scopes.depth() > 0 {
            debug!("{} block(s) left open at end of template", self.scopes.depth());
        }
        if self.options.name_hints {
            self.schema.apply_name_hints();
        }
        self.schema
    }

    /// Path to record for a reference, or None when its root is not a
    /// context variable.
    fn resolve(&self, path: AccessPath) -> Option<AccessPath> {
        match self.scopes.lookup(&path.root) {
            Lookup::Bound => None,
            Lookup::Alias(base) => Some(base.join(&path.segments)),
            Lookup::Free if self.options.is_global(&path.root) => None,
            Lookup::Free => Some(path),
        }
    }

    fn record(&mut self, references: Vec<Reference>) {
        for Reference { path, usage } in references {
            if let Some(path) = self.resolve(path) {
                trace!("free reference {path} ({usage:?})");
                self.schema.record(&path, usage);
            }
        }
    }

    fn expression(&mut self, text: &str, context: Context) {
        self.record(expr::references(text, context));
    }

    fn expressions(&mut self, statement: &Statement<'_>, role: Role, context: Context) {
        for text in statement.expressions_of(role) {
            self.expression(text, context);
        }
    }

    fn bind_all(&mut self, names: &[String]) {
        for name in names {
            self.scopes.bind(name.as_str());
        }
    }

    fn statement(&mut self, statement: &Statement<'_>) {
        // Expressions are evaluated before the statement's own bindings exist.
        match &statement.tag {
            Tag::For { targets, .. } => self.for_loop(statement, targets),
            Tag::If => {
                self.expressions(statement, Role::Condition, Context::Condition);
                self.branches.push(BlockKind::If);
            }
            Tag::Elif => self.expressions(statement, Role::Condition, Context::Condition),
            Tag::Else => {
                // The `else` of a loop runs when there was nothing to iterate.
                if self.branches.last() == Some(&BlockKind::For) {
                    self.scopes.clear(ScopeKind::For);
                }
            }
            Tag::Set { targets } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.bind_all(targets);
            }
            Tag::SetBlock { targets } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes
                    .push_pending(ScopeKind::SetBlock, targets.clone());
            }
            Tag::With { names } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes.push(ScopeKind::With);
                self.bind_all(names);
            }
            Tag::Macro { name, params } => {
                self.expressions(statement, Role::Default, Context::Value);
                if !name.is_empty() {
                    self.scopes.bind(name.as_str());
                }
                self.scopes.push(ScopeKind::Macro);
                self.bind_all(params);
            }
            Tag::Call { params } => {
                self.expressions(statement, Role::Default, Context::Value);
                self.expressions(statement, Role::Callee, Context::Value);
                self.scopes.push(ScopeKind::Call);
                self.bind_all(params);
            }
            Tag::Import { alias, .. } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes.bind(alias.as_str());
            }
            Tag::From { names, .. } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.bind_all(names);
            }
            Tag::Block { .. } => self.scopes.push(ScopeKind::Block),
            Tag::Filter => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes.push(ScopeKind::Filter);
            }
            Tag::Autoescape => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes.push(ScopeKind::Autoescape);
            }
            Tag::Trans { names } => {
                self.expressions(statement, Role::Value, Context::Value);
                self.scopes.push(ScopeKind::Trans);
                self.bind_all(names);
            }
            Tag::Pluralize | Tag::Do | Tag::Extends { .. } | Tag::Include { .. } => {
                self.expressions(statement, Role::Value, Context::Value)
            }
            Tag::End(kind) => self.end(*kind),
            Tag::Raw | Tag::Break | Tag::Continue => (),
            Tag::Unknown(raw) => debug!("skipping unrecognized statement `{raw}`"),
        }
    }

    fn for_loop(&mut self, statement: &Statement<'_>, targets: &[String]) {
        let mut source = None;
        for text in statement.expressions_of(Role::Iterable) {
            let (references, primary) = expr::iteration(text);
            self.record(references);
            source = primary.and_then(|path| self.resolve(path));
        }

        self.scopes.push(ScopeKind::For);
        self.branches.push(BlockKind::For);
        match (targets, source) {
            // Accesses on the loop variable describe the iterable's elements.
            ([target], Some(path)) => self.scopes.alias(target.as_str(), path.element()),
            _ => self.bind_all(targets),
        }

        self.expressions(statement, Role::Condition, Context::Condition);
    }

    fn end(&mut self, kind: BlockKind) {
        if matches!(kind, BlockKind::For | BlockKind::If) {
            if let Some(pos) = self.branches.iter().rposition(|k| *k == kind) {
                self.branches.truncate(pos);
            }
        }
        let scope = match kind {
            BlockKind::For => ScopeKind::For,
            BlockKind::Set => ScopeKind::SetBlock,
            BlockKind::With => ScopeKind::With,
            BlockKind::Macro => ScopeKind::Macro,
            BlockKind::Call => ScopeKind::Call,
            BlockKind::Block => ScopeKind::Block,
            BlockKind::Filter => ScopeKind::Filter,
            BlockKind::Autoescape => ScopeKind::Autoescape,
            BlockKind::Trans => ScopeKind::Trans,
            BlockKind::If | BlockKind::Raw => return,
        };
        self.scopes.pop(scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Source;
    use crate::options::RawBlocks;
    use crate::segments::Segmenter;
    use serde_json::json;

    fn analyze(text: &str) -> VariableSchema {
        let source = Source::new("test".to_string(), text.to_string());
        let options = EngineOptions::default();
        let segments = Segmenter::new(&source, RawBlocks::Inert).segments();
        Analyzer::new(&options).analyze(&segments)
    }

    #[test]
    fn loop_variables_alias_their_source() {
        let schema = analyze(
            "{% for u in users %}{{ u.name }}\
             {% for t in u.tags %}{{ t.label }}{% endfor %}{% endfor %}",
        );
        assert_eq!(
            schema.to_sample(),
            json!({"users": [{"name": "", "tags": [{"label": ""}]}]})
        );
    }

    #[test]
    fn set_value_is_read_before_binding() {
        let schema = analyze("{% set C = C + 1 %}{{ C }}");
        assert_eq!(schema.to_sample(), json!({"C": 0}));
    }

    #[test]
    fn sibling_loops_release_their_names() {
        let schema = analyze(
            "{% for x in a %}{{ x }}{% endfor %}{% for x in b %}{{ x }}{% endfor %}{{ x }}",
        );
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b", "x"]);
    }

    #[test]
    fn macro_defaults_use_the_defining_scope() {
        let schema = analyze(
            "{% macro field(name, size=default_size) %}{{ name }}{{ label }}{% endmacro %}\
             {{ field('a') }}",
        );
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["default_size", "label"]);
    }

    #[test]
    fn loop_else_does_not_see_the_loop_variable() {
        let schema = analyze(
            "{% for x in xs %}{% if x %}{% else %}{{ x.a }}{% endif %}\
             {% else %}{{ x }}{% endfor %}",
        );
        assert_eq!(schema.to_sample(), json!({"xs": [{"a": ""}], "x": ""}));
    }

    #[test]
    fn set_block_binds_at_end() {
        let schema = analyze("{% set body %}{{ body }}{{ x }}{% endset %}{{ body }}");
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["body", "x"]);
    }
}
