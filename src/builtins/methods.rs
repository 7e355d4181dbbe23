// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::expr::Usage;

use std::collections::BTreeMap;

/// Methods callable on template values. A call `x.name(...)` on one of these
/// describes `x` and never introduces a field called `name`.
pub fn register(m: &mut BTreeMap<&'static str, Usage>) {
    for name in ["items", "keys", "values", "get", "update", "setdefault", "iteritems"] {
        m.insert(name, Usage::Object);
    }

    for name in [
        "append", "extend", "pop", "insert", "remove", "index", "count", "sort", "reverse", "clear",
    ] {
        m.insert(name, Usage::Array);
    }

    for name in [
        "lower", "upper", "strip", "lstrip", "rstrip", "split", "rsplit", "splitlines",
        "startswith", "endswith", "replace", "format", "title", "capitalize", "casefold", "find",
        "rfind", "isdigit", "isalpha", "isalnum", "isspace", "islower", "isupper", "center",
        "ljust", "rjust", "zfill", "encode", "partition",
    ] {
        m.insert(name, Usage::String);
    }
}

