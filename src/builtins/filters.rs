// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::Usage;

use std::collections::BTreeMap;

/// What a filter reveals about the value it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEffect {
    /// The operand must have this shape.
    Hint(Usage),
    /// The filter passes the operand through; look at the next filter.
    Transparent,
    /// The filter converts its operand; later filters describe something else.
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub effect: FilterEffect,
    /// Iterating the result yields the operand's own elements.
    pub keeps_elements: bool,
}

fn hint(usage: Usage) -> Filter {
    Filter {
        effect: FilterEffect::Hint(usage),
        keeps_elements: false,
    }
}

fn sequence(keeps_elements: bool) -> Filter {
    Filter {
        effect: FilterEffect::Hint(Usage::Array),
        keeps_elements,
    }
}

fn transparent() -> Filter {
    Filter {
        effect: FilterEffect::Transparent,
        keeps_elements: true,
    }
}

fn opaque() -> Filter {
    Filter {
        effect: FilterEffect::Opaque,
        keeps_elements: false,
    }
}

pub fn register(m: &mut BTreeMap<&'static str, Filter>) {
    for name in [
        "length", "count", "join", "first", "last", "min", "max", "sum", "map", "batch",
        "slice", "random", "groupby",
    ] {
        m.insert(name, sequence(false));
    }
    for name in [
        "sort", "reverse", "unique", "select", "reject", "selectattr", "rejectattr",
    ] {
        m.insert(name, sequence(true));
    }

    for name in [
        "lower", "upper", "trim", "title", "capitalize", "replace", "truncate", "wordcount",
        "wordwrap", "center", "striptags", "urlize", "indent", "format", "split",
    ] {
        m.insert(name, hint(Usage::String));
    }

    for name in ["items", "dictsort", "xmlattr"] {
        m.insert(name, hint(Usage::Object));
    }

    for name in ["round", "abs", "filesizeformat"] {
        m.insert(name, hint(Usage::Number));
    }

    for name in ["default", "d", "safe", "e", "escape", "forceescape"] {
        m.insert(name, transparent());
    }

    for name in ["string", "int", "float", "bool", "tojson", "pprint", "urlencode"] {
        m.insert(name, opaque());
    }
    m.insert(
        "list",
        Filter {
            effect: FilterEffect::Opaque,
            keeps_elements: true,
        },
    );
}

/// Effect of a filter by name. Unknown filters are treated as conversions.
pub fn lookup(name: &str) -> Filter {
    super::FILTERS.get(name).copied().unwrap_or_else(opaque)
}
