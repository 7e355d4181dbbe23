// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use jinja_vars::unstable::*;
use jinja_vars::RawBlocks;
use serde::Deserialize;
use test_generator::test_resources;

fn get_segments(source: &Source) -> Vec<Segment<'_>> {
    Segmenter::new(source, RawBlocks::Inert).segments()
}

/// Checks that the diagnostic caret for a segment points at its first character.
fn check_loc(source: &Source, segment: &Segment) -> Result<()> {
    let (line, col) = source.position(segment.start);
    let msg = source.message(line, col, "", "");
    let lines: Vec<&str> = msg.split('\n').collect();
    let (Some(source_line), Some(caret_line)) = (lines.get(3), lines.get(4)) else {
        bail!("malformed message {msg}");
    };
    let Some(prefix) = source_line.find("| ").map(|p| p + 2) else {
        bail!("missing gutter in {msg}");
    };
    let Some(caret) = caret_line.get(prefix..).and_then(|c| c.find('^')) else {
        bail!("could not find caret for {segment:?} {msg}");
    };

    let at: String = source_line[prefix..].chars().skip(caret).collect();
    let first_line = segment.text.split('\n').next().unwrap_or_default();
    let first_line = first_line.trim_end_matches('\r');
    assert!(
        at.starts_with(first_line),
        "location mismatch for {segment:?} {msg}\n{first_line}\n{at}"
    );
    Ok(())
}

#[derive(Deserialize, Debug)]
struct Case {
    pub template: String,
    pub note: String,
    pub kinds: Vec<String>,
    pub inner: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        let source = Source::new("case.html".to_string(), case.template.clone());
        print!("case {} ", &case.note);

        let segments = get_segments(&source);
        let mut pos = 0;
        for (idx, segment) in segments.iter().enumerate() {
            if segment.start != pos {
                bail!("gap or overlap before segment {idx}: {segment:?}");
            }
            pos = segment.end;

            if let Some(kind) = case.kinds.get(idx) {
                assert_eq!(
                    &serde_json::to_value(segment.kind)?,
                    kind,
                    "{}",
                    source.message_at(segment.start, "mismatch-error", "segment kind mismatch")
                );
            }
            if let Some(inner) = case.inner.as_ref().and_then(|i| i.get(idx)) {
                assert_eq!(
                    segment.inner,
                    inner,
                    "{}",
                    source.message_at(segment.start, "mismatch-error", inner)
                );
            }
            check_loc(&source, segment)?;
        }
        assert_eq!(pos, case.template.len(), "segments do not reach the end");
        assert_eq!(
            segments.len(),
            case.kinds.len(),
            "\n. Segment count mismatch.\nSegments:{:?}",
            segments
        );

        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
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

#[test_resources("tests/lexer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn expression_tokens_have_offsets() {
    let text = "user.name | default('x') >= 10";
    for tok in Lexer::tokenize(text) {
        let Span { start, end, .. } = tok.1;
        match tok.0 {
            // Strings exclude their quotes.
            TokenKind::String => assert_eq!(&text[start - 1..end + 1], "'x'"),
            _ => assert_eq!(&text[start..end], tok.text()),
        }
    }
}
