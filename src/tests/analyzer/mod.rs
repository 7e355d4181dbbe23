// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::indexing_slicing
)] // extraction tests rely on asserts/unwraps and std conveniences

use crate::*;
use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value;
use test_generator::test_resources;

use std::collections::BTreeMap;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    template: String,
    /// Expected sample context. Its key order is the expected root order.
    sample: Value,
    /// Names that must not be reported.
    #[serde(default)]
    absent: Vec<String>,
    /// Expected type names of selected paths.
    #[serde(default)]
    types: BTreeMap<String, String>,
    #[serde(default)]
    options: Option<EngineOptions>,
}

#[derive(Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn check_case(case: &TestCase) -> Result<()> {
    let engine = Engine::with_options(case.options.clone().unwrap_or_default());
    let schema = engine.extract(&case.template);

    let actual = schema.to_sample();
    if actual != case.sample {
        bail!(
            "sample mismatch\nexpected: {}\n  actual: {}",
            serde_json::to_string_pretty(&case.sample)?,
            serde_json::to_string_pretty(&actual)?
        );
    }

    let expected_order: Vec<&str> = match &case.sample {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => bail!("sample must be a mapping"),
    };
    let order: Vec<&str> = schema.names().collect();
    if order != expected_order {
        bail!("root order mismatch\nexpected: {expected_order:?}\n  actual: {order:?}");
    }

    for name in &case.absent {
        if schema.get(name).is_some() {
            bail!("`{name}` must not be reported");
        }
    }

    for (path, expected) in &case.types {
        match schema.resolve(path) {
            Some(node) if node.type_name() == expected => (),
            Some(node) => bail!("`{path}` is {} instead of {expected}", node.type_name()),
            None => bail!("`{path}` not found"),
        }
    }

    // Every pass starts from scratch.
    if engine.extract(&case.template) != schema {
        bail!("repeated extraction differs");
    }

    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let _ = env_logger::try_init();
    std::println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        std::print!("\ncase {} ", case.note);
        check_case(case)?;
        std::println!("passed");
    }

    std::println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/analyzer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
