// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Scalar type guesses from variable names, used only when usage is silent.

use crate::shape::ScalarType;

use std::collections::BTreeSet;

use lazy_static::lazy_static;

#[rustfmt::skip]
lazy_static! {
    static ref NUMBER_NAMES: BTreeSet<&'static str> = [
	"age", "count", "total", "amount", "price", "cost", "quantity", "qty", "num", "number",
	"size", "index", "year", "score", "rating", "width", "height", "weight", "limit", "page",
	"percent", "percentage", "balance", "duration", "level", "rank", "port",
    ].into_iter().collect();

    static ref BOOLEAN_NAMES: BTreeSet<&'static str> = [
	"active", "enabled", "disabled", "visible", "hidden", "checked", "selected", "verified",
    ].into_iter().collect();
}

const NUMBER_SUFFIXES: [&str; 6] = ["_count", "_total", "_amount", "_price", "_num", "_age"];
const BOOLEAN_PREFIXES: [&str; 5] = ["is_", "has_", "can_", "should_", "show_"];

pub fn guess(name: &str) -> Option<ScalarType> {
    let name = name.to_ascii_lowercase();
    let name = name.as_str();
    if NUMBER_NAMES.contains(name) || NUMBER_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        Some(ScalarType::Number)
    } else if BOOLEAN_NAMES.contains(name) || BOOLEAN_PREFIXES.iter().any(|p| name.starts_with(p))
    {
        Some(ScalarType::Boolean)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses() {
        assert_eq!(guess("age"), Some(ScalarType::Number));
        assert_eq!(guess("item_count"), Some(ScalarType::Number));
        assert_eq!(guess("is_admin"), Some(ScalarType::Boolean));
        assert_eq!(guess("Active"), Some(ScalarType::Boolean));
        assert_eq!(guess("name"), None);
        assert_eq!(guess("items"), None);
    }
}
