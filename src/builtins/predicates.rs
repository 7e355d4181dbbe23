// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::Usage;

use std::collections::BTreeMap;

/// Tests usable after `is`. Only tests that constrain their operand are listed.
pub fn register(m: &mut BTreeMap<&'static str, Usage>) {
    for name in [
        "number", "integer", "float", "divisibleby", "even", "odd", "gt", "ge", "lt", "le",
        "greaterthan", "lessthan",
    ] {
        m.insert(name, Usage::Number);
    }
    for name in ["string", "lower", "upper"] {
        m.insert(name, Usage::String);
    }
    for name in ["boolean", "true", "false"] {
        m.insert(name, Usage::Boolean);
    }
    m.insert("mapping", Usage::Object);
    m.insert("sequence", Usage::Array);
    m.insert("iterable", Usage::Array);
    m.insert("none", Usage::Null);
}
