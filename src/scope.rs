// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::AccessPath;

use std::collections::BTreeMap;

use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    For,
    With,
    Macro,
    Call,
    Block,
    Filter,
    Autoescape,
    Trans,
    SetBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local,
    /// Loop variable standing for the elements of another path.
    Alias(AccessPath),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    bindings: BTreeMap<String, Binding>,
    /// Names bound in the enclosing scope once this one closes.
    pending: Vec<String>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: BTreeMap::new(),
            pending: vec![],
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// A scope past the depth limit. Its bindings live in the innermost real
/// scope; `shadowed` remembers what they replaced so closing it undoes them.
#[derive(Debug, Clone)]
struct Overflow {
    kind: ScopeKind,
    shadowed: Vec<(String, Option<Binding>)>,
    pending: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Free,
    Bound,
    Alias(&'a AccessPath),
}

/// Stack of active lexical scopes. The root scope is always present.
///
/// Scopes past `max_depth` are not materialized: names bound inside them are
/// written to the innermost real scope and taken back out by their end tag.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    overflow: Vec<Overflow>,
    max_depth: usize,
}

impl ScopeStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Root)],
            overflow: vec![],
            max_depth,
        }
    }

    /// Number of open scopes, not counting the root.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1 + self.overflow.len()
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.push_pending(kind, vec![]);
    }

    /// Opens a scope whose `names` become bound outside it when it closes.
    pub fn push_pending(&mut self, kind: ScopeKind, names: Vec<String>) {
        if self.scopes.len() > self.max_depth {
            debug!("scope depth limit {} reached, not tracking {kind:?}", self.max_depth);
            self.overflow.push(Overflow {
                kind,
                shadowed: vec![],
                pending: names,
            });
            return;
        }
        let mut scope = Scope::new(kind);
        scope.pending = names;
        self.scopes.push(scope);
    }

    fn top(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new(ScopeKind::Root));
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn insert(&mut self, name: String, binding: Binding) {
        let previous = self.top().bindings.insert(name.clone(), binding);
        if let Some(overflow) = self.overflow.last_mut() {
            overflow.shadowed.push((name, previous));
        }
    }

    pub fn bind(&mut self, name: impl Into<String>) {
        self.insert(name.into(), Binding::Local);
    }

    pub fn alias(&mut self, name: impl Into<String>, path: AccessPath) {
        self.insert(name.into(), Binding::Alias(path));
    }

    /// Undoes the bindings made while `overflow` was the innermost scope.
    fn restore(&mut self, shadowed: Vec<(String, Option<Binding>)>) {
        let top = self.top();
        for (name, previous) in shadowed.into_iter().rev() {
            match previous {
                Some(binding) => top.bindings.insert(name, binding),
                None => top.bindings.remove(&name),
            };
        }
    }

    /// Drops the bindings of the innermost scope when it is of `kind`, as in
    /// the `else` branch of a loop. Returns false otherwise.
    pub fn clear(&mut self, kind: ScopeKind) -> bool {
        if let Some(overflow) = self.overflow.last_mut() {
            if overflow.kind != kind {
                return false;
            }
            let shadowed = std::mem::take(&mut overflow.shadowed);
            self.restore(shadowed);
            return true;
        }
        let top = self.top();
        if top.kind != kind || kind == ScopeKind::Root {
            return false;
        }
        top.bindings.clear();
        true
    }

    /// Closes the innermost scope of `kind` together with any scopes left
    /// open inside it. Returns false when no such scope is open.
    pub fn pop(&mut self, kind: ScopeKind) -> bool {
        if let Some(pos) = self.overflow.iter().rposition(|o| o.kind == kind) {
            while self.overflow.len() > pos {
                if let Some(overflow) = self.overflow.pop() {
                    self.restore(overflow.shadowed);
                    for name in overflow.pending {
                        self.bind(name);
                    }
                }
            }
            return true;
        }

        let Some(pos) = self.scopes.iter().rposition(|s| s.kind == kind) else {
            trace!("ignoring unmatched end of {kind:?}");
            return false;
        };
        if pos == 0 {
            return false;
        }

        while let Some(overflow) = self.overflow.pop() {
            self.restore(overflow.shadowed);
        }
        while self.scopes.len() > pos {
            if let Some(scope) = self.scopes.pop() {
                for name in scope.pending {
                    self.bind(name);
                }
            }
        }
        true
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        for scope in self.scopes.iter().rev() {
            match scope.bindings.get(name) {
                Some(Binding::Local) => return Lookup::Bound,
                Some(Binding::Alias(path)) => return Lookup::Alias(path),
                None => (),
            }
        }
        Lookup::Free
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name) != Lookup::Free
    }
}
