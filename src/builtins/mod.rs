// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-only lookup tables describing the template language's built-ins.

pub mod filters;
pub mod methods;
pub mod names;
pub mod predicates;

use crate::expr::Usage;

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;

pub use filters::{Filter, FilterEffect};

#[rustfmt::skip]
lazy_static! {
    /// Words that never name a variable.
    pub static ref KEYWORDS: BTreeSet<&'static str> = [
	"and", "or", "not", "in", "is", "if", "else", "elif",
	"true", "false", "none", "True", "False", "None",
	"for", "endfor", "endif", "set", "endset", "with", "endwith", "without",
	"block", "endblock", "macro", "endmacro", "call", "endcall",
	"import", "from", "as", "context", "ignore", "missing", "recursive",
	"include", "extends", "filter", "endfilter", "do", "break", "continue",
	"raw", "endraw", "autoescape", "endautoescape",
	"trans", "endtrans", "pluralize", "trimmed", "notrimmed", "scoped", "required",
    ].into_iter().collect();

    /// Names provided by the rendering environment.
    pub static ref GLOBALS: BTreeSet<&'static str> = [
	"range", "dict", "lipsum", "cycler", "joiner", "namespace",
	"loop", "self", "super", "caller", "varargs", "kwargs",
	"_", "gettext", "ngettext",
    ].into_iter().collect();

    pub static ref FILTERS: BTreeMap<&'static str, Filter> = {
	let mut m = BTreeMap::new();
	filters::register(&mut m);
	m
    };

    pub static ref METHODS: BTreeMap<&'static str, Usage> = {
	let mut m = BTreeMap::new();
	methods::register(&mut m);
	m
    };

    pub static ref TESTS: BTreeMap<&'static str, Usage> = {
	let mut m = BTreeMap::new();
	predicates::register(&mut m);
	m
    };
}

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(name)
}

/// Usage implied for the arguments of a call to a global function.
pub fn call_argument_hint(function: &str) -> Option<Usage> {
    match function {
        "range" => Some(Usage::Number),
        _ => None,
    }
}
